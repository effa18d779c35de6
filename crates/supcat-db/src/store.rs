//! The store handle the matcher, runner and HTTP layer are given.
//!
//! Every write is either insert-ignore-on-conflict or upsert-by-natural-key,
//! so implementations never hold locks across adapter I/O.

use async_trait::async_trait;
use sqlx::PgPool;
use supcat_core::{
    CatalogProduct, IngestJob, JobSummary, JobTrigger, NewCatalogProduct, NormalizedItem,
    RawItem, SupplierProduct, UpsertOutcome,
};
use uuid::Uuid;

use crate::DbError;

#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Cheap liveness probe.
    async fn health(&self) -> Result<(), DbError>;

    async fn create_job(
        &self,
        supplier_id: Uuid,
        adapter: &str,
        trigger: JobTrigger,
    ) -> Result<IngestJob, DbError>;

    async fn complete_job(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), DbError>;

    async fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
        summary: &JobSummary,
    ) -> Result<(), DbError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<IngestJob>, DbError>;

    async fn list_jobs(
        &self,
        supplier_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IngestJob>, DbError>;

    /// Returns `false` when `(supplier_id, content_hash)` was already staged.
    async fn insert_raw_item(&self, item: &RawItem, content_hash: &str) -> Result<bool, DbError>;

    async fn find_catalog_by_gtin(&self, gtin: &str) -> Result<Option<CatalogProduct>, DbError>;

    /// Case-insensitive substring match on name, in creation order.
    async fn search_catalog_by_name(
        &self,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<CatalogProduct>, DbError>;

    async fn insert_catalog_product(&self, product: &NewCatalogProduct) -> Result<Uuid, DbError>;

    async fn upsert_supplier_product(
        &self,
        item: &NormalizedItem,
        catalog_product_id: Uuid,
    ) -> Result<UpsertOutcome, DbError>;

    async fn get_supplier_product(
        &self,
        supplier_id: Uuid,
        supplier_sku: &str,
    ) -> Result<Option<SupplierProduct>, DbError>;

    async fn record_image_task(
        &self,
        task_id: Uuid,
        catalog_product_id: Uuid,
        image_url: &str,
    ) -> Result<(), DbError>;

    async fn finish_image_task(
        &self,
        task_id: Uuid,
        succeeded: bool,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<(), DbError>;
}

/// [`IngestStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IngestStore for PgStore {
    async fn health(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }

    async fn create_job(
        &self,
        supplier_id: Uuid,
        adapter: &str,
        trigger: JobTrigger,
    ) -> Result<IngestJob, DbError> {
        crate::create_ingest_job(&self.pool, supplier_id, adapter, trigger)
            .await?
            .try_into()
    }

    async fn complete_job(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), DbError> {
        crate::complete_ingest_job(&self.pool, job_id, summary).await
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
        summary: &JobSummary,
    ) -> Result<(), DbError> {
        crate::fail_ingest_job(&self.pool, job_id, error, summary).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<IngestJob>, DbError> {
        match crate::get_ingest_job(&self.pool, job_id).await {
            Ok(row) => Ok(Some(row.try_into()?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_jobs(
        &self,
        supplier_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IngestJob>, DbError> {
        crate::list_ingest_jobs(&self.pool, supplier_id, limit)
            .await?
            .into_iter()
            .map(IngestJob::try_from)
            .collect()
    }

    async fn insert_raw_item(&self, item: &RawItem, content_hash: &str) -> Result<bool, DbError> {
        crate::insert_raw_item(&self.pool, item, content_hash).await
    }

    async fn find_catalog_by_gtin(&self, gtin: &str) -> Result<Option<CatalogProduct>, DbError> {
        Ok(crate::find_catalog_product_by_gtin(&self.pool, gtin)
            .await?
            .map(CatalogProduct::from))
    }

    async fn search_catalog_by_name(
        &self,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<CatalogProduct>, DbError> {
        Ok(
            crate::search_catalog_products_by_name(&self.pool, fragment, limit)
                .await?
                .into_iter()
                .map(CatalogProduct::from)
                .collect(),
        )
    }

    async fn insert_catalog_product(&self, product: &NewCatalogProduct) -> Result<Uuid, DbError> {
        crate::insert_catalog_product(&self.pool, product).await
    }

    async fn upsert_supplier_product(
        &self,
        item: &NormalizedItem,
        catalog_product_id: Uuid,
    ) -> Result<UpsertOutcome, DbError> {
        crate::upsert_supplier_product(&self.pool, item, catalog_product_id).await
    }

    async fn get_supplier_product(
        &self,
        supplier_id: Uuid,
        supplier_sku: &str,
    ) -> Result<Option<SupplierProduct>, DbError> {
        crate::get_supplier_product(&self.pool, supplier_id, supplier_sku).await
    }

    async fn record_image_task(
        &self,
        task_id: Uuid,
        catalog_product_id: Uuid,
        image_url: &str,
    ) -> Result<(), DbError> {
        crate::record_image_task(&self.pool, task_id, catalog_product_id, image_url).await
    }

    async fn finish_image_task(
        &self,
        task_id: Uuid,
        succeeded: bool,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<(), DbError> {
        crate::finish_image_task(&self.pool, task_id, succeeded, attempts, last_error).await
    }
}
