//! Captured network traffic adapter.
//!
//! Accepts either a HAR document (`{"log": {"entries": [...]}}`) or the bare
//! entry array a capture bookmarklet posts. Each entry may use the HAR shape
//! (`request.url`, `response.content.mimeType`, `response.content.text`) or
//! the flat capture shape (`url`, `contentType`, `body`).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use supcat_core::{DataProvenance, RawItem, RawPayload};
use uuid::Uuid;

use super::{PullOutcome, SourceAdapter};
use crate::error::SourceError;

static PRODUCT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(?:api|products?|catalog(?:ue)?|items?|vorur)(?:[/?.#]|$)")
        .expect("valid product path regex")
});

#[derive(Debug, Clone)]
pub struct HarAdapter {
    supplier_id: Uuid,
    capture: String,
}

impl HarAdapter {
    #[must_use]
    pub fn from_text(supplier_id: Uuid, capture: impl Into<String>) -> Self {
        Self {
            supplier_id,
            capture: capture.into(),
        }
    }
}

/// One recorded request/response pair, reduced to what extraction needs.
#[derive(Debug, PartialEq)]
struct CapturedEntry {
    url: String,
    content_type: String,
    body: Option<Value>,
    body_text: Option<String>,
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn captured_entry(entry: &Value) -> Option<CapturedEntry> {
    let url = str_at(entry, "/request/url").or_else(|| str_at(entry, "/url"))?;
    let content_type = str_at(entry, "/response/content/mimeType")
        .or_else(|| str_at(entry, "/contentType"))
        .or_else(|| str_at(entry, "/content_type"))
        .unwrap_or("");

    let (body, body_text) = match entry
        .pointer("/response/content/text")
        .or_else(|| entry.get("body"))
    {
        Some(Value::String(text)) => (None, Some(text.clone())),
        Some(Value::Null) | None => (None, None),
        Some(other) => (Some(other.clone()), None),
    };

    Some(CapturedEntry {
        url: url.to_string(),
        content_type: content_type.to_ascii_lowercase(),
        body,
        body_text,
    })
}

fn entries_of(document: &Value) -> Option<&Vec<Value>> {
    match document {
        Value::Array(entries) => Some(entries),
        Value::Object(_) => document.pointer("/log/entries").and_then(Value::as_array),
        _ => None,
    }
}

/// Item arrays known to appear in captured catalog responses.
fn response_items(body: &Value) -> Option<&Vec<Value>> {
    body.get("items")
        .and_then(Value::as_array)
        .or_else(|| body.pointer("/data/items").and_then(Value::as_array))
}

#[async_trait]
impl SourceAdapter for HarAdapter {
    fn name(&self) -> &'static str {
        "har"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Manual
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        let document: Value =
            serde_json::from_str(&self.capture).map_err(|e| SourceError::Deserialize {
                context: "captured traffic".to_owned(),
                source: e,
            })?;
        let entries = entries_of(&document).ok_or_else(|| SourceError::UnexpectedShape {
            context: "captured traffic".to_owned(),
            reason: "expected log.entries or an array of entries".to_owned(),
        })?;

        let mut items = Vec::new();
        let mut warnings = Vec::new();
        let mut matched = 0usize;

        for entry in entries.iter().filter_map(captured_entry) {
            if !PRODUCT_PATH.is_match(&entry.url) || !entry.content_type.contains("json") {
                continue;
            }
            matched += 1;

            let body = match (entry.body, entry.body_text) {
                (Some(body), _) => body,
                (None, Some(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(body) => body,
                    Err(e) => {
                        warnings.push(format!("response {}: invalid JSON: {e}", entry.url));
                        continue;
                    }
                },
                (None, None) => continue,
            };

            let Some(found) = response_items(&body) else {
                continue;
            };
            items.extend(found.iter().map(|item| {
                RawItem::new(
                    self.supplier_id,
                    Some(entry.url.clone()),
                    RawPayload::CapturedResponse {
                        url: entry.url.clone(),
                        item: item.clone(),
                    },
                )
            }));
        }

        tracing::info!(
            supplier_id = %self.supplier_id,
            entries = entries.len(),
            matched,
            items = items.len(),
            "captured traffic parsed"
        );

        Ok(PullOutcome { items, warnings })
    }
}
