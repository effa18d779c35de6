mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use supcat_core::SuppliersFile;
use supcat_db::{IngestStore, PgStore};
use supcat_ingest::{start_image_queue, IngestRunner, RunOptions};
use supcat_sources::HttpFetcher;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(supcat_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = supcat_db::PoolConfig::from_app_config(&config);
    let pool = supcat_db::connect_pool(&config.database_url, pool_config).await?;
    supcat_db::run_migrations(&pool).await?;
    let store: Arc<dyn IngestStore> = Arc::new(PgStore::new(pool));

    let (images, _image_worker) = start_image_queue(Arc::clone(&store), &config)?;
    let runner = IngestRunner::new(store, images, RunOptions::from_app_config(&config));

    let suppliers = Arc::new(load_registry(&config)?);
    let fetcher = HttpFetcher::from_app_config(&config)?;
    let _scheduler = scheduler::build_scheduler(
        runner.clone(),
        suppliers,
        fetcher,
        config.sitemap_concurrency,
    )
    .await?;

    let app = build_app(AppState { runner });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, env = ?config.env, "supcat-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// A missing registry file only disables scheduled runs; HTTP ingest still works.
fn load_registry(config: &supcat_core::AppConfig) -> anyhow::Result<SuppliersFile> {
    if !config.suppliers_path.exists() {
        tracing::warn!(
            path = %config.suppliers_path.display(),
            "supplier registry not found; no scheduled runs"
        );
        return Ok(SuppliersFile {
            suppliers: Vec::new(),
        });
    }
    Ok(supcat_core::load_suppliers(&config.suppliers_path)?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
