//! Sitemap-driven product page crawl.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use supcat_core::{DataProvenance, RawItem, RawPayload};
use uuid::Uuid;

use super::{PullOutcome, SourceAdapter};
use crate::client::HttpFetcher;
use crate::error::SourceError;
use crate::sitemap::parse_sitemap_locs;

/// Fetches a sitemap, then each listed URL as a JSON product page.
///
/// A page that fails to fetch or parse is skipped and reported as a pull
/// warning. The pull fails when the sitemap itself cannot be read, or when
/// every listed page fails.
#[derive(Debug, Clone)]
pub struct SitemapAdapter {
    supplier_id: Uuid,
    sitemap_url: String,
    fetcher: HttpFetcher,
    concurrency: usize,
}

impl SitemapAdapter {
    /// `concurrency` bounds in-flight page fetches; `0` is treated as `1`.
    #[must_use]
    pub fn new(
        supplier_id: Uuid,
        sitemap_url: &str,
        fetcher: HttpFetcher,
        concurrency: usize,
    ) -> Self {
        Self {
            supplier_id,
            sitemap_url: sitemap_url.to_string(),
            fetcher,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl SourceAdapter for SitemapAdapter {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Sitemap
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        let xml = self.fetcher.get_text(&self.sitemap_url, None).await?;
        let locs = parse_sitemap_locs(&xml).map_err(|source| SourceError::Sitemap {
            url: self.sitemap_url.clone(),
            source,
        })?;
        let pages = locs.len();

        // `buffered` keeps sitemap order regardless of completion order.
        let results: Vec<(String, Result<serde_json::Value, SourceError>)> = stream::iter(locs)
            .map(|url| async move {
                let body = self.fetcher.get_json(&url, None).await;
                (url, body)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut items = Vec::with_capacity(pages);
        let mut warnings = Vec::new();
        for (url, result) in results {
            match result {
                Ok(body) => items.push(RawItem::new(
                    self.supplier_id,
                    Some(url.clone()),
                    RawPayload::SitemapPage { url, body },
                )),
                Err(e) => {
                    tracing::warn!(
                        supplier_id = %self.supplier_id,
                        url = %url,
                        error = %e,
                        "sitemap page skipped"
                    );
                    warnings.push(format!("page {url}: {e}"));
                }
            }
        }

        if pages > 0 && items.is_empty() {
            return Err(SourceError::AllPagesFailed {
                sitemap_url: self.sitemap_url.clone(),
                pages,
            });
        }

        tracing::info!(
            supplier_id = %self.supplier_id,
            pages,
            fetched = items.len(),
            skipped = warnings.len(),
            "sitemap crawl finished"
        );

        Ok(PullOutcome { items, warnings })
    }
}
