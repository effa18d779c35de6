//! One end-to-end ingestion run for one supplier and one adapter.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use supcat_core::{AppConfig, ItemFailurePolicy, JobSummary, JobTrigger, NormalizedItem};
use supcat_db::IngestStore;
use supcat_sources::SourceAdapter;
use uuid::Uuid;

use crate::error::IngestError;
use crate::images::ImageDispatcher;
use crate::matcher::{match_or_create_catalog, MatchKind};

const DEFAULT_PULL_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound on the whole `pull()` call.
    pub pull_timeout: Duration,
    pub item_failure_policy: ItemFailurePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pull_timeout: Duration::from_secs(DEFAULT_PULL_TIMEOUT_SECS),
            item_failure_policy: ItemFailurePolicy::Isolate,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            pull_timeout: Duration::from_secs(config.pull_timeout_secs),
            item_failure_policy: config.item_failure_policy,
        }
    }
}

/// How many items resolved through each matcher stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub gtin: u32,
    pub fuzzy: u32,
    pub created: u32,
}

impl MatchCounts {
    fn record(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::Gtin => self.gtin += 1,
            MatchKind::Fuzzy => self.fuzzy += 1,
            MatchKind::Created => self.created += 1,
        }
    }
}

/// What a successful run reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub job_id: Uuid,
    pub supplier_id: Uuid,
    pub adapter: &'static str,
    pub summary: JobSummary,
    pub matches: MatchCounts,
    pub images_dispatched: u32,
}

/// Drives runs against an explicit store handle.
///
/// Runs share nothing but the store, so one runner may serve concurrent runs
/// for different suppliers.
#[derive(Clone)]
pub struct IngestRunner {
    store: Arc<dyn IngestStore>,
    images: ImageDispatcher,
    options: RunOptions,
}

impl IngestRunner {
    #[must_use]
    pub fn new(store: Arc<dyn IngestStore>, images: ImageDispatcher, options: RunOptions) -> Self {
        Self {
            store,
            images,
            options,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn IngestStore> {
        &self.store
    }

    #[must_use]
    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Execute one run: job, pull, raw staging, normalize, match and upsert.
    ///
    /// The job row always ends in a terminal state when this returns, except
    /// when the store itself refuses the terminal write.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Pull`] / [`IngestError::PullTimeout`] when the adapter
    ///   fails; nothing is staged for that run.
    /// - [`IngestError::Db`] when the job cannot be created, raw staging fails,
    ///   or the success status cannot be written.
    /// - [`IngestError::Item`] on the first item failure under
    ///   [`ItemFailurePolicy::Abort`].
    pub async fn run(
        &self,
        supplier_id: Uuid,
        trigger: JobTrigger,
        adapter: &dyn SourceAdapter,
    ) -> Result<IngestReport, IngestError> {
        let adapter_name = adapter.name();
        let job = self
            .store
            .create_job(supplier_id, adapter_name, trigger)
            .await?;
        tracing::info!(
            job_id = %job.id,
            %supplier_id,
            adapter = adapter_name,
            %trigger,
            "ingest run started"
        );

        let mut summary = JobSummary::default();

        let pulled = match tokio::time::timeout(self.options.pull_timeout, adapter.pull()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => {
                let err = IngestError::Pull {
                    adapter: adapter_name,
                    source,
                };
                self.fail_job_best_effort(job.id, &err, &summary).await;
                return Err(err);
            }
            Err(_) => {
                let err = IngestError::PullTimeout {
                    adapter: adapter_name,
                    secs: self.options.pull_timeout.as_secs(),
                };
                self.fail_job_best_effort(job.id, &err, &summary).await;
                return Err(err);
            }
        };

        summary.items_pulled = count(pulled.items.len());
        summary.warnings.extend(pulled.warnings);

        for raw in &pulled.items {
            match self.store.insert_raw_item(raw, &raw.content_hash()).await {
                Ok(true) => summary.raw_inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    let err = IngestError::Db(e);
                    self.fail_job_best_effort(job.id, &err, &summary).await;
                    return Err(err);
                }
            }
        }

        let normalized = adapter.normalize(&pulled.items);
        summary.items_normalized = count(normalized.len());
        let skipped = pulled.items.len().saturating_sub(normalized.len());
        if skipped > 0 {
            summary
                .warnings
                .push(format!("{skipped} item(s) skipped: missing sku or name"));
        }

        let mut matches = MatchCounts::default();
        let mut images_dispatched = 0u32;
        for item in &normalized {
            match self.ingest_item(item).await {
                Ok((kind, catalog_product_id)) => {
                    summary.items_upserted += 1;
                    matches.record(kind);
                    if let Some(url) = item.image_url.as_deref() {
                        if self.images.dispatch(catalog_product_id, url) {
                            images_dispatched += 1;
                        }
                    }
                }
                Err(err) => {
                    summary.items_failed += 1;
                    match self.options.item_failure_policy {
                        ItemFailurePolicy::Isolate => {
                            tracing::warn!(
                                job_id = %job.id,
                                sku = %item.supplier_sku,
                                error = %err,
                                "item failed, continuing"
                            );
                            summary.warnings.push(err.to_string());
                        }
                        ItemFailurePolicy::Abort => {
                            self.fail_job_best_effort(job.id, &err, &summary).await;
                            return Err(err);
                        }
                    }
                }
            }
        }

        if let Err(e) = self.store.complete_job(job.id, &summary).await {
            let err = IngestError::Db(e);
            self.fail_job_best_effort(job.id, &err, &summary).await;
            return Err(err);
        }
        tracing::info!(
            job_id = %job.id,
            %supplier_id,
            adapter = adapter_name,
            pulled = summary.items_pulled,
            raw_inserted = summary.raw_inserted,
            upserted = summary.items_upserted,
            failed = summary.items_failed,
            warnings = summary.warnings.len(),
            "ingest run finished"
        );

        Ok(IngestReport {
            job_id: job.id,
            supplier_id,
            adapter: adapter_name,
            summary,
            matches,
            images_dispatched,
        })
    }

    async fn ingest_item(&self, item: &NormalizedItem) -> Result<(MatchKind, Uuid), IngestError> {
        let item_error = |source| IngestError::Item {
            sku: item.supplier_sku.clone(),
            source,
        };

        let outcome = match_or_create_catalog(self.store.as_ref(), item)
            .await
            .map_err(item_error)?;
        self.store
            .upsert_supplier_product(item, outcome.catalog_product_id)
            .await
            .map_err(item_error)?;
        Ok((outcome.kind, outcome.catalog_product_id))
    }

    /// Mark the job failed; a store error here is logged, never raised.
    async fn fail_job_best_effort(&self, job_id: Uuid, err: &IngestError, summary: &JobSummary) {
        tracing::error!(%job_id, error = %err, "ingest run failed");
        if let Err(e) = self
            .store
            .fail_job(job_id, &err.to_string(), summary)
            .await
        {
            tracing::error!(%job_id, error = %e, "failed to mark ingest job as failed");
        }
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
