//! Offline unit tests for supcat-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use sqlx::types::Json;
use supcat_core::{
    AppConfig, AvailabilityStatus, DataProvenance, Environment, IngestJob, ItemFailurePolicy,
    JobStatus, SupplierProduct,
};
use supcat_db::{DbError, IngestJobRow, PoolConfig, SupplierProductRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        suppliers_path: PathBuf::from("./config/suppliers.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_timeout_secs: 30,
        http_user_agent: "ua".to_string(),
        http_max_retries: 2,
        http_retry_backoff_base_secs: 1,
        pull_timeout_secs: 300,
        sitemap_concurrency: 4,
        item_failure_policy: ItemFailurePolicy::Isolate,
        image_fetch_url: None,
        image_queue_capacity: 256,
        image_fetch_max_retries: 3,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn job_row(status: &str) -> IngestJobRow {
    IngestJobRow {
        id: Uuid::new_v4(),
        supplier_id: Uuid::new_v4(),
        adapter: "csv".to_string(),
        trigger: "http".to_string(),
        status: status.to_string(),
        started_at: Utc::now(),
        finished_at: None,
        error: None,
        items_pulled: 4,
        raw_inserted: 3,
        items_normalized: 3,
        items_upserted: 2,
        items_failed: 1,
        warnings: Json(vec!["sku X1: upsert failed".to_string()]),
    }
}

#[test]
fn ingest_job_row_converts_status_and_summary() {
    let job = IngestJob::try_from(job_row("failed")).expect("conversion failed");

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.summary.items_pulled, 4);
    assert_eq!(job.summary.items_failed, 1);
    assert_eq!(job.summary.warnings, vec!["sku X1: upsert failed"]);
}

#[test]
fn ingest_job_row_with_unknown_status_is_rejected() {
    let err = IngestJob::try_from(job_row("queued")).expect_err("should reject status");
    assert!(matches!(
        err,
        DbError::InvalidColumn {
            column: "status",
            ..
        }
    ));
}

#[test]
fn supplier_product_row_parses_enum_columns() {
    let now = Utc::now();
    let row = SupplierProductRow {
        id: Uuid::new_v4(),
        supplier_id: Uuid::new_v4(),
        supplier_sku: "A1".to_string(),
        catalog_product_id: Uuid::new_v4(),
        name: "Oat Milk".to_string(),
        brand: Some("Oatly".to_string()),
        pack_size: Some("1l".to_string()),
        pack_quantity: Some(1.0),
        pack_unit: Some("L".to_string()),
        gtin: None,
        category_path: vec!["Dairy".to_string(), "Milk".to_string()],
        image_url: None,
        availability_text: Some("low stock".to_string()),
        availability_status: "LOW_STOCK".to_string(),
        price: Some(3.5),
        currency: Some("EUR".to_string()),
        source_url: None,
        data_provenance: "sitemap".to_string(),
        provenance_confidence: 0.7,
        raw_hash: "abc".to_string(),
        first_seen_at: now,
        last_seen_at: now,
    };

    let product = SupplierProduct::try_from(row).expect("conversion failed");
    assert_eq!(product.availability_status, AvailabilityStatus::LowStock);
    assert_eq!(product.data_provenance, DataProvenance::Sitemap);
    assert_eq!(product.category_path, vec!["Dairy", "Milk"]);
}
