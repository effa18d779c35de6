//! Ingest command handlers.
//!
//! A real run writes to Postgres and drains the image queue before the
//! process exits. A dry run executes the same pipeline against an in-memory
//! store with image dispatch disabled, then prints what it would have written.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use supcat_core::{AppConfig, JobTrigger};
use supcat_db::{IngestStore, MemoryStore, PgStore};
use supcat_ingest::{
    adapter_for_payload, adapter_for_supplier, start_image_queue, ImageDispatcher, IngestReport,
    IngestRunner, PayloadFormat, RunOptions,
};
use supcat_sources::{HttpFetcher, SourceAdapter};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Pull a supplier from the registry by UUID or name.
///
/// # Errors
///
/// Returns an error if the registry cannot be loaded, the supplier is not in
/// it, its adapter cannot be built, or the run fails.
pub(crate) async fn run_ingest_supplier(
    config: &AppConfig,
    supplier_key: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let registry = supcat_core::load_suppliers(&config.suppliers_path)?;
    let supplier = registry.find(supplier_key).ok_or_else(|| {
        anyhow::anyhow!(
            "supplier '{supplier_key}' not found in {}",
            config.suppliers_path.display()
        )
    })?;

    let fetcher = HttpFetcher::from_app_config(config)?;
    let adapter = adapter_for_supplier(supplier, &fetcher, config.sitemap_concurrency)?;
    tracing::info!(
        supplier = %supplier.name,
        supplier_id = %supplier.id,
        adapter = adapter.name(),
        dry_run,
        "starting ingest"
    );

    execute(config, supplier.id, adapter.as_ref(), dry_run).await
}

/// Ingest a CSV export or captured-traffic file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the run fails.
pub(crate) async fn run_ingest_file(
    config: &AppConfig,
    supplier_id: Uuid,
    format: PayloadFormat,
    path: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let adapter = adapter_for_payload(supplier_id, format, body);
    tracing::info!(%supplier_id, %format, path = %path.display(), dry_run, "starting file ingest");

    execute(config, supplier_id, adapter.as_ref(), dry_run).await
}

async fn execute(
    config: &AppConfig,
    supplier_id: Uuid,
    adapter: &dyn SourceAdapter,
    dry_run: bool,
) -> anyhow::Result<()> {
    let options = RunOptions::from_app_config(config);

    if dry_run {
        let store = Arc::new(MemoryStore::new());
        let runner = IngestRunner::new(
            Arc::clone(&store) as Arc<dyn IngestStore>,
            ImageDispatcher::disabled(),
            options,
        );
        let report = runner.run(supplier_id, JobTrigger::Manual, adapter).await?;
        print_report(&report, true)?;
        println!(
            "dry-run: {} catalog product(s), {} supplier product(s) would be written",
            store.catalog_products().await.len(),
            store.supplier_products().await.len()
        );
        return Ok(());
    }

    let (runner, image_worker) = postgres_runner(config, options).await?;
    let result = runner.run(supplier_id, JobTrigger::Manual, adapter).await;
    drain_images(runner, image_worker).await;

    print_report(&result?, false)
}

async fn postgres_runner(
    config: &AppConfig,
    options: RunOptions,
) -> anyhow::Result<(IngestRunner, Option<JoinHandle<()>>)> {
    let pool = crate::jobs::connect(config).await?;
    let store: Arc<dyn IngestStore> = Arc::new(PgStore::new(pool));
    let (images, worker) = start_image_queue(Arc::clone(&store), config)?;
    Ok((IngestRunner::new(store, images, options), worker))
}

/// Dropping the runner closes the queue; the worker finishes what is queued.
async fn drain_images(runner: IngestRunner, worker: Option<JoinHandle<()>>) {
    drop(runner);
    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "image worker did not shut down cleanly");
        }
    }
}

fn print_report(report: &IngestReport, dry_run: bool) -> anyhow::Result<()> {
    let prefix = if dry_run { "dry-run: " } else { "" };
    println!(
        "{prefix}job {} ({}) pulled={} raw_inserted={} normalized={} upserted={} failed={}",
        report.job_id,
        report.adapter,
        report.summary.items_pulled,
        report.summary.raw_inserted,
        report.summary.items_normalized,
        report.summary.items_upserted,
        report.summary.items_failed,
    );
    println!(
        "{prefix}matches: gtin={} fuzzy={} created={}; images dispatched={}",
        report.matches.gtin, report.matches.fuzzy, report.matches.created, report.images_dispatched
    );
    for warning in &report.summary.warnings {
        println!("{prefix}warning: {warning}");
    }
    tracing::debug!(report = %serde_json::to_string(report)?, "ingest report");
    Ok(())
}
