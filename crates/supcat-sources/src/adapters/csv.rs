//! Delimited-text export adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use supcat_core::{DataProvenance, RawItem, RawPayload};
use uuid::Uuid;

use super::{PullOutcome, SourceAdapter};
use crate::client::HttpFetcher;
use crate::error::SourceError;

#[derive(Debug, Clone)]
enum CsvSource {
    /// Text already in hand, e.g. an HTTP request body or a local file.
    Inline(String),
    Remote { url: String, fetcher: HttpFetcher },
}

/// One raw item per data row of a CSV document with a header row.
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    supplier_id: Uuid,
    source: CsvSource,
}

impl CsvAdapter {
    #[must_use]
    pub fn from_text(supplier_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            supplier_id,
            source: CsvSource::Inline(text.into()),
        }
    }

    #[must_use]
    pub fn from_url(supplier_id: Uuid, url: &str, fetcher: HttpFetcher) -> Self {
        Self {
            supplier_id,
            source: CsvSource::Remote {
                url: url.to_string(),
                fetcher,
            },
        }
    }
}

/// Parse CSV text into header-keyed rows.
///
/// Rows may be shorter or longer than the header; missing cells are absent
/// from the row map and extra cells are dropped. Fully blank lines are skipped.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if the header or a record cannot be read.
pub fn parse_csv_rows(
    text: &str,
    context: &str,
) -> Result<Vec<BTreeMap<String, String>>, SourceError> {
    let csv_error = |source| SourceError::Csv {
        context: context.to_owned(),
        source,
    };

    // A UTF-8 BOM would otherwise become part of the first header name.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[async_trait]
impl SourceAdapter for CsvAdapter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Csv
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        let (text, source_url) = match &self.source {
            CsvSource::Inline(text) => (text.clone(), None),
            CsvSource::Remote { url, fetcher } => {
                let text = fetcher.get_text(url, None).await?;
                (text, Some(url))
            }
        };

        let context = source_url.map_or("inline CSV payload", String::as_str);
        let rows = parse_csv_rows(&text, context)?;

        let items = rows
            .into_iter()
            .map(|row| {
                RawItem::new(
                    self.supplier_id,
                    source_url.cloned(),
                    RawPayload::CsvRow { row },
                )
            })
            .collect::<Vec<_>>();

        tracing::info!(
            supplier_id = %self.supplier_id,
            rows = items.len(),
            "csv rows parsed"
        );

        Ok(PullOutcome {
            items,
            warnings: Vec::new(),
        })
    }
}
