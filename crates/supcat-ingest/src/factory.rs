//! Turns supplier registry entries and inbound payloads into adapters.

use std::fmt;
use std::str::FromStr;

use supcat_core::{SourceConfig, SupplierConfig};
use supcat_sources::{
    ApiAdapter, CsvAdapter, HarAdapter, HttpFetcher, SitemapAdapter, SourceAdapter, SourceError,
};
use uuid::Uuid;

use crate::error::IngestError;

/// Build the adapter a registry entry describes, reading API keys from the
/// process environment.
///
/// # Errors
///
/// Returns [`SourceError::MissingApiKey`] when the entry names an API key
/// variable that is unset or empty.
pub fn adapter_for_supplier(
    supplier: &SupplierConfig,
    fetcher: &HttpFetcher,
    sitemap_concurrency: usize,
) -> Result<Box<dyn SourceAdapter>, SourceError> {
    adapter_for_supplier_with(supplier, fetcher, sitemap_concurrency, |key| {
        std::env::var(key).ok()
    })
}

/// Same as [`adapter_for_supplier`] with an injectable variable lookup.
///
/// # Errors
///
/// Returns [`SourceError::MissingApiKey`] when the API key cannot be resolved.
pub fn adapter_for_supplier_with<F>(
    supplier: &SupplierConfig,
    fetcher: &HttpFetcher,
    sitemap_concurrency: usize,
    lookup: F,
) -> Result<Box<dyn SourceAdapter>, SourceError>
where
    F: Fn(&str) -> Option<String>,
{
    let adapter: Box<dyn SourceAdapter> = match &supplier.source {
        SourceConfig::Api {
            base_url,
            products_path,
            api_key_env,
        } => {
            let api_key = match api_key_env {
                Some(var) => Some(
                    lookup(var)
                        .filter(|v| !v.trim().is_empty())
                        .ok_or_else(|| SourceError::MissingApiKey { var: var.clone() })?,
                ),
                None => None,
            };
            Box::new(ApiAdapter::new(
                supplier.id,
                base_url,
                products_path,
                api_key,
                fetcher.clone(),
            ))
        }
        SourceConfig::Csv { url } => {
            Box::new(CsvAdapter::from_url(supplier.id, url, fetcher.clone()))
        }
        SourceConfig::Sitemap { sitemap_url } => Box::new(SitemapAdapter::new(
            supplier.id,
            sitemap_url,
            fetcher.clone(),
            sitemap_concurrency,
        )),
    };
    Ok(adapter)
}

/// Shape of a payload posted to the HTTP entry point or read from a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    #[default]
    Csv,
    Har,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadFormat::Csv => write!(f, "csv"),
            PayloadFormat::Har => write!(f, "har"),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(PayloadFormat::Csv),
            "har" | "capture" => Ok(PayloadFormat::Har),
            other => Err(IngestError::UnknownFormat(other.to_string())),
        }
    }
}

/// Wrap an in-memory payload in the adapter for its format.
#[must_use]
pub fn adapter_for_payload(
    supplier_id: Uuid,
    format: PayloadFormat,
    body: String,
) -> Box<dyn SourceAdapter> {
    match format {
        PayloadFormat::Csv => Box::new(CsvAdapter::from_text(supplier_id, body)),
        PayloadFormat::Har => Box::new(HarAdapter::from_text(supplier_id, body)),
    }
}
