use supcat_core::AppConfig;
use supcat_db::{IngestStore, PgStore};
use uuid::Uuid;

/// Connect using the pool settings from the environment config.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = supcat_db::PoolConfig::from_app_config(config);
    let pool = supcat_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

/// Print the most recent ingest jobs, newest first.
pub(crate) async fn run_list_jobs(
    config: &AppConfig,
    supplier_id: Option<Uuid>,
    limit: i64,
) -> anyhow::Result<()> {
    if limit < 1 {
        anyhow::bail!("--limit must be at least 1");
    }

    let store = PgStore::new(connect(config).await?);
    let jobs = store.list_jobs(supplier_id, limit).await?;

    if jobs.is_empty() {
        println!("no ingest jobs found");
        return Ok(());
    }

    for job in jobs {
        let finished = job
            .finished_at
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        println!(
            "{}  {:<8} {:<9} {:<7} supplier={} started={} finished={} upserted={} failed={} warnings={}",
            job.id,
            job.adapter,
            job.trigger,
            job.status,
            job.supplier_id,
            job.started_at.to_rfc3339(),
            finished,
            job.summary.items_upserted,
            job.summary.items_failed,
            job.summary.warnings.len(),
        );
        if let Some(error) = job.error {
            println!("    error: {error}");
        }
    }

    Ok(())
}
