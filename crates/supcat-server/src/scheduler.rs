//! Background job scheduler.
//!
//! Every supplier in the registry with a `schedule` gets one cron job that
//! runs the full pipeline with trigger `scheduler`. Runs for different
//! suppliers are independent tasks sharing only the store.

use std::sync::Arc;

use supcat_core::{JobTrigger, SupplierConfig, SuppliersFile};
use supcat_ingest::{adapter_for_supplier, IngestRunner};
use supcat_sources::HttpFetcher;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a schedule does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: IngestRunner,
    suppliers: Arc<SuppliersFile>,
    fetcher: HttpFetcher,
    sitemap_concurrency: usize,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let mut registered = 0usize;
    for supplier in &suppliers.suppliers {
        let Some(schedule) = supplier.schedule.as_deref() else {
            continue;
        };
        register_supplier_job(
            &scheduler,
            schedule,
            Arc::new(supplier.clone()),
            runner.clone(),
            fetcher.clone(),
            sitemap_concurrency,
        )
        .await?;
        registered += 1;
    }

    scheduler.start().await?;
    tracing::info!(jobs = registered, "scheduler started");
    Ok(scheduler)
}

async fn register_supplier_job(
    scheduler: &JobScheduler,
    schedule: &str,
    supplier: Arc<SupplierConfig>,
    runner: IngestRunner,
    fetcher: HttpFetcher,
    sitemap_concurrency: usize,
) -> Result<(), JobSchedulerError> {
    let name = supplier.name.clone();

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let supplier = Arc::clone(&supplier);
        let runner = runner.clone();
        let fetcher = fetcher.clone();

        Box::pin(async move {
            tracing::info!(supplier = %supplier.name, "scheduler: starting supplier run");
            run_supplier(&runner, &supplier, &fetcher, sitemap_concurrency).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(supplier = %name, schedule, "scheduler: registered supplier job");
    Ok(())
}

/// One scheduled run. Failures are already on the job row; here they are logged.
async fn run_supplier(
    runner: &IngestRunner,
    supplier: &SupplierConfig,
    fetcher: &HttpFetcher,
    sitemap_concurrency: usize,
) {
    let adapter = match adapter_for_supplier(supplier, fetcher, sitemap_concurrency) {
        Ok(adapter) => adapter,
        Err(e) => {
            tracing::error!(
                supplier = %supplier.name,
                error = %e,
                "scheduler: cannot build adapter"
            );
            return;
        }
    };

    match runner
        .run(supplier.id, JobTrigger::Scheduler, adapter.as_ref())
        .await
    {
        Ok(report) => tracing::info!(
            supplier = %supplier.name,
            job_id = %report.job_id,
            upserted = report.summary.items_upserted,
            failed = report.summary.items_failed,
            "scheduler: supplier run complete"
        ),
        Err(e) => tracing::error!(
            supplier = %supplier.name,
            error = %e,
            "scheduler: supplier run failed"
        ),
    }
}
