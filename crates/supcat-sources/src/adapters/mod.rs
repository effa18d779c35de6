//! Source adapters: one per supplier data channel.
//!
//! Every adapter pulls a batch of [`RawItem`]s and normalizes them into
//! [`NormalizedItem`]s. A pull error aborts only the calling supplier's run.
//! Normalization never fails: rows without a usable sku or name are skipped.

pub mod api;
pub mod csv;
pub mod har;
pub mod sitemap;

use async_trait::async_trait;
use supcat_core::{DataProvenance, NormalizedItem, RawItem, RawPayload};

use crate::error::SourceError;
use crate::fields::{fields_from_json, fields_from_row};

pub use api::ApiAdapter;
pub use csv::CsvAdapter;
pub use har::HarAdapter;
pub use sitemap::SitemapAdapter;

/// Result of one successful pull.
#[derive(Debug, Clone, Default)]
pub struct PullOutcome {
    pub items: Vec<RawItem>,
    /// Recoverable problems met while pulling, such as a skipped sitemap page.
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short adapter name recorded on the ingest job (`api`, `csv`, ...).
    fn name(&self) -> &'static str;

    fn provenance(&self) -> DataProvenance;

    /// Fetch the current batch of raw items.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] on network, status, or parse failures of the
    /// source as a whole.
    async fn pull(&self) -> Result<PullOutcome, SourceError>;

    /// Map raw items to normalized items, skipping unusable rows.
    fn normalize(&self, raw: &[RawItem]) -> Vec<NormalizedItem> {
        normalize_raw_items(self.provenance(), raw)
    }
}

/// Normalize a batch under one provenance. Total over its input.
#[must_use]
pub fn normalize_raw_items(provenance: DataProvenance, raw: &[RawItem]) -> Vec<NormalizedItem> {
    raw.iter()
        .filter_map(|raw_item| {
            let mut fields = match &raw_item.payload {
                RawPayload::Api { item } | RawPayload::CapturedResponse { item, .. } => {
                    fields_from_json(item)
                }
                RawPayload::SitemapPage { body, .. } => fields_from_json(body),
                RawPayload::CsvRow { row } => fields_from_row(row),
            };
            // API items always carry the synthesized `{base}/products/{id}` URL.
            let synthesized = matches!(raw_item.payload, RawPayload::Api { .. })
                && raw_item.source_url.is_some();
            if synthesized || fields.source_url.is_none() {
                fields.source_url.clone_from(&raw_item.source_url);
            }

            let hash = raw_item.content_hash();
            match NormalizedItem::build(raw_item.supplier_id, provenance, hash, fields) {
                Ok(normalized) => Some(normalized),
                Err(reason) => {
                    tracing::debug!(
                        supplier_id = %raw_item.supplier_id,
                        kind = raw_item.payload.kind(),
                        source_url = raw_item.source_url.as_deref().unwrap_or(""),
                        %reason,
                        "skipping raw item"
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn csv_row(sku: &str, name: &str) -> RawItem {
        let row: BTreeMap<String, String> = [("sku", sku), ("name", name)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawItem::new(Uuid::nil(), None, RawPayload::CsvRow { row })
    }

    #[test]
    fn batch_with_one_nameless_row_keeps_the_other_nine() {
        let mut raw: Vec<RawItem> = (1..=9)
            .map(|i| csv_row(&format!("SKU-{i}"), &format!("Product {i}")))
            .collect();
        raw.insert(4, csv_row("SKU-X", ""));

        let items = normalize_raw_items(DataProvenance::Csv, &raw);
        assert_eq!(items.len(), 9);
        assert!(items.iter().all(|i| i.supplier_sku != "SKU-X"));
    }

    #[test]
    fn raw_source_url_fills_missing_item_url() {
        let raw = RawItem::new(
            Uuid::nil(),
            Some("https://api.example/products/5".into()),
            RawPayload::Api {
                item: json!({"id": 5, "name": "Milk"}),
            },
        );
        let items = normalize_raw_items(DataProvenance::Api, &[raw.clone()]);
        assert_eq!(
            items[0].source_url.as_deref(),
            Some("https://api.example/products/5")
        );
        assert_eq!(items[0].raw_hash, raw.content_hash());
    }
}
