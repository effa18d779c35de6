//! In-process [`IngestStore`] used for dry runs and tests.
//!
//! Mirrors the uniqueness rules of the Postgres schema: raw items are unique
//! per `(supplier_id, content_hash)`, catalog GTINs are unique when present,
//! and supplier products are keyed by `(supplier_id, supplier_sku)`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use supcat_core::{
    CatalogProduct, IngestJob, JobStatus, JobSummary, JobTrigger, NewCatalogProduct,
    NormalizedItem, RawItem, SupplierProduct, UpsertOutcome,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::IngestStore;
use crate::DbError;

/// An image task as tracked by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImageTask {
    pub id: Uuid,
    pub catalog_product_id: Uuid,
    pub image_url: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    raw_keys: HashSet<(Uuid, String)>,
    raw_items: Vec<RawItem>,
    // Insertion order doubles as creation order for name search.
    catalog: Vec<CatalogProduct>,
    supplier_products: HashMap<(Uuid, String), SupplierProduct>,
    jobs: Vec<IngestJob>,
    image_tasks: Vec<MemoryImageTask>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog product directly, bypassing matching.
    pub async fn seed_catalog_product(&self, product: NewCatalogProduct) -> Uuid {
        let mut state = self.state.lock().await;
        push_catalog(&mut state, product)
    }

    pub async fn raw_item_count(&self) -> usize {
        self.state.lock().await.raw_items.len()
    }

    pub async fn catalog_products(&self) -> Vec<CatalogProduct> {
        self.state.lock().await.catalog.clone()
    }

    /// All supplier products, ordered by `(supplier_id, supplier_sku)`.
    pub async fn supplier_products(&self) -> Vec<SupplierProduct> {
        let state = self.state.lock().await;
        let mut products: Vec<SupplierProduct> =
            state.supplier_products.values().cloned().collect();
        products.sort_by(|a, b| {
            (a.supplier_id, &a.supplier_sku).cmp(&(b.supplier_id, &b.supplier_sku))
        });
        products
    }

    pub async fn image_tasks(&self) -> Vec<MemoryImageTask> {
        self.state.lock().await.image_tasks.clone()
    }
}

fn push_catalog(state: &mut State, product: NewCatalogProduct) -> Uuid {
    let id = Uuid::new_v4();
    state.catalog.push(CatalogProduct {
        id,
        gtin: product.gtin,
        brand: product.brand,
        name: product.name,
        size: product.size,
        created_at: Utc::now(),
    });
    id
}

fn finish_job(
    state: &mut State,
    job_id: Uuid,
    status: JobStatus,
    error: Option<&str>,
    summary: &JobSummary,
) -> Result<(), DbError> {
    let job = state
        .jobs
        .iter_mut()
        .find(|j| j.id == job_id && j.status == JobStatus::Running)
        .ok_or(DbError::InvalidJobTransition {
            id: job_id,
            expected_status: "running",
        })?;
    job.status = status;
    job.finished_at = Some(Utc::now());
    job.error = error.map(str::to_string);
    job.summary = summary.clone();
    Ok(())
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn health(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn create_job(
        &self,
        supplier_id: Uuid,
        adapter: &str,
        trigger: JobTrigger,
    ) -> Result<IngestJob, DbError> {
        let job = IngestJob {
            id: Uuid::new_v4(),
            supplier_id,
            adapter: adapter.to_string(),
            trigger: trigger.as_str().to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
            summary: JobSummary::default(),
        };
        self.state.lock().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn complete_job(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        finish_job(&mut state, job_id, JobStatus::Success, None, summary)
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
        summary: &JobSummary,
    ) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        finish_job(&mut state, job_id, JobStatus::Failed, Some(error), summary)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<IngestJob>, DbError> {
        let state = self.state.lock().await;
        Ok(state.jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn list_jobs(
        &self,
        supplier_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IngestJob>, DbError> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(state
            .jobs
            .iter()
            .rev()
            .filter(|j| supplier_id.is_none_or(|id| j.supplier_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_raw_item(&self, item: &RawItem, content_hash: &str) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let inserted = state
            .raw_keys
            .insert((item.supplier_id, content_hash.to_string()));
        if inserted {
            state.raw_items.push(item.clone());
        }
        Ok(inserted)
    }

    async fn find_catalog_by_gtin(&self, gtin: &str) -> Result<Option<CatalogProduct>, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .catalog
            .iter()
            .find(|p| p.gtin.as_deref() == Some(gtin))
            .cloned())
    }

    async fn search_catalog_by_name(
        &self,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<CatalogProduct>, DbError> {
        let state = self.state.lock().await;
        let needle = fragment.to_lowercase();
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(state
            .catalog
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_catalog_product(&self, product: &NewCatalogProduct) -> Result<Uuid, DbError> {
        let mut state = self.state.lock().await;
        if let Some(gtin) = product.gtin.as_deref() {
            if let Some(existing) = state.catalog.iter().find(|p| p.gtin.as_deref() == Some(gtin))
            {
                return Ok(existing.id);
            }
        }
        Ok(push_catalog(&mut state, product.clone()))
    }

    async fn upsert_supplier_product(
        &self,
        item: &NormalizedItem,
        catalog_product_id: Uuid,
    ) -> Result<UpsertOutcome, DbError> {
        let mut state = self.state.lock().await;
        if !state.catalog.iter().any(|p| p.id == catalog_product_id) {
            return Err(DbError::NotFound);
        }

        let now = Utc::now();
        let key = (item.supplier_id, item.supplier_sku.clone());
        let previous = state.supplier_products.get(&key);
        let inserted = previous.is_none();
        let id = previous.map_or_else(Uuid::new_v4, |p| p.id);
        let first_seen_at = previous.map_or(now, |p| p.first_seen_at);

        state.supplier_products.insert(
            key,
            SupplierProduct {
                id,
                supplier_id: item.supplier_id,
                supplier_sku: item.supplier_sku.clone(),
                catalog_product_id,
                name: item.name.clone(),
                brand: item.brand.clone(),
                pack_size: item.pack_size.clone(),
                pack_quantity: item.pack_quantity,
                pack_unit: item.pack_unit.clone(),
                gtin: item.gtin.clone(),
                category_path: item.category_path.clone(),
                image_url: item.image_url.clone(),
                availability_text: item.availability_text.clone(),
                availability_status: item.availability_status,
                price: item.price,
                currency: item.currency.clone(),
                source_url: item.source_url.clone(),
                data_provenance: item.data_provenance,
                provenance_confidence: item.provenance_confidence,
                raw_hash: item.raw_hash.clone(),
                first_seen_at,
                last_seen_at: now,
            },
        );

        Ok(UpsertOutcome { id, inserted })
    }

    async fn get_supplier_product(
        &self,
        supplier_id: Uuid,
        supplier_sku: &str,
    ) -> Result<Option<SupplierProduct>, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .supplier_products
            .get(&(supplier_id, supplier_sku.to_string()))
            .cloned())
    }

    async fn record_image_task(
        &self,
        task_id: Uuid,
        catalog_product_id: Uuid,
        image_url: &str,
    ) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        if state.image_tasks.iter().any(|t| t.id == task_id) {
            return Ok(());
        }
        state.image_tasks.push(MemoryImageTask {
            id: task_id,
            catalog_product_id,
            image_url: image_url.to_string(),
            status: "pending".to_string(),
            attempts: 0,
            last_error: None,
        });
        Ok(())
    }

    async fn finish_image_task(
        &self,
        task_id: Uuid,
        succeeded: bool,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        let task = state
            .image_tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(DbError::NotFound)?;
        task.status = if succeeded { "done" } else { "failed" }.to_string();
        task.attempts = attempts;
        task.last_error = last_error.map(str::to_string);
        Ok(())
    }
}
