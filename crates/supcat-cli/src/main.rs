mod ingest;
mod jobs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use supcat_ingest::PayloadFormat;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "supcat-cli")]
#[command(about = "Supplier catalog ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pull one registry supplier through the full pipeline
    Ingest {
        /// Supplier UUID or name from the registry
        #[arg(long)]
        supplier: String,
        /// Run against an in-memory store and print the outcome
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Ingest a local CSV export or captured-traffic file
    IngestFile {
        #[arg(long)]
        supplier_id: Uuid,
        /// csv or har
        #[arg(long, default_value = "csv")]
        format: PayloadFormat,
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// List recent ingest jobs
    Jobs {
        #[arg(long)]
        supplier_id: Option<Uuid>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("supcat-cli: no command given; see --help");
        return Ok(());
    };

    let config = supcat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Ingest { supplier, dry_run } => {
            ingest::run_ingest_supplier(&config, &supplier, dry_run).await
        }
        Commands::IngestFile {
            supplier_id,
            format,
            path,
            dry_run,
        } => ingest::run_ingest_file(&config, supplier_id, format, &path, dry_run).await,
        Commands::Jobs { supplier_id, limit } => {
            jobs::run_list_jobs(&config, supplier_id, limit).await
        }
        Commands::Migrate => {
            let pool = jobs::connect(&config).await?;
            let applied = supcat_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
            Ok(())
        }
    }
}
