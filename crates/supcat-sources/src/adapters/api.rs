//! REST product-listing adapter.

use async_trait::async_trait;
use serde_json::Value;
use supcat_core::{DataProvenance, RawItem, RawPayload};
use uuid::Uuid;

use super::{PullOutcome, SourceAdapter};
use crate::client::HttpFetcher;
use crate::error::SourceError;
use crate::fields::json_record_id;

/// Pulls a supplier's product listing with one authenticated GET.
#[derive(Debug, Clone)]
pub struct ApiAdapter {
    supplier_id: Uuid,
    base_url: String,
    products_path: String,
    api_key: Option<String>,
    fetcher: HttpFetcher,
}

impl ApiAdapter {
    #[must_use]
    pub fn new(
        supplier_id: Uuid,
        base_url: &str,
        products_path: &str,
        api_key: Option<String>,
        fetcher: HttpFetcher,
    ) -> Self {
        Self {
            supplier_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            products_path: format!("/{}", products_path.trim_start_matches('/')),
            api_key,
            fetcher,
        }
    }

    fn listing_url(&self) -> String {
        format!("{}{}", self.base_url, self.products_path)
    }

    fn product_url(&self, id: &str) -> String {
        format!("{}/products/{id}", self.base_url)
    }
}

/// Locate the item array in a listing response.
///
/// Accepts a bare array or an object wrapping it in `items`, `products` or
/// `data` (itself either the array or an object with `items`).
fn listing_items(body: Value, context: &str) -> Result<Vec<Value>, SourceError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            for key in ["items", "products"] {
                if let Some(Value::Array(items)) = object.remove(key) {
                    return Ok(items);
                }
            }
            match object.remove("data") {
                Some(Value::Array(items)) => Ok(items),
                Some(Value::Object(mut data)) => match data.remove("items") {
                    Some(Value::Array(items)) => Ok(items),
                    _ => Err(unexpected_shape(context)),
                },
                _ => Err(unexpected_shape(context)),
            }
        }
        _ => Err(unexpected_shape(context)),
    }
}

fn unexpected_shape(context: &str) -> SourceError {
    SourceError::UnexpectedShape {
        context: context.to_owned(),
        reason: "expected an array or an object with items, products or data".to_owned(),
    }
}

#[async_trait]
impl SourceAdapter for ApiAdapter {
    fn name(&self) -> &'static str {
        "api"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Api
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        let url = self.listing_url();
        let body = self.fetcher.get_json(&url, self.api_key.as_deref()).await?;
        let items = listing_items(body, &url)?;

        let raw = items
            .into_iter()
            .map(|item| {
                let source_url = json_record_id(&item).map(|id| self.product_url(&id));
                RawItem::new(self.supplier_id, source_url, RawPayload::Api { item })
            })
            .collect::<Vec<_>>();

        tracing::info!(
            supplier_id = %self.supplier_id,
            url = %url,
            items = raw.len(),
            "api listing pulled"
        );

        Ok(PullOutcome {
            items: raw,
            warnings: Vec::new(),
        })
    }
}
