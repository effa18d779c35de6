//! End-to-end pipeline properties, run against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use supcat_core::{
    CatalogProduct, DataProvenance, IngestJob, ItemFailurePolicy, JobStatus, JobSummary,
    JobTrigger, NewCatalogProduct, NormalizedItem, RawItem, SupplierProduct, UpsertOutcome,
};
use supcat_db::{DbError, IngestStore, MemoryStore};
use supcat_ingest::{
    HttpImageFetcher, ImageDispatcher, ImageFetchWorker, IngestError, IngestRunner, RunOptions,
};
use supcat_sources::{
    CsvAdapter, HarAdapter, HttpFetcher, PullOutcome, SourceAdapter, SourceError,
};
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_CSV: &str = "\
sku,name,brand,pack_size,gtin,image_url
A1,Whole Milk,Acme,1 L,5690000000017,https://cdn.example/a1.jpg
A2,Orange Juice,Acme,1 L,,
A3,Rye Bread,Baker,500 g,,https://cdn.example/a3.jpg
";

fn supplier() -> Uuid {
    Uuid::parse_str("7f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0").expect("valid uuid")
}

fn runner(store: Arc<MemoryStore>) -> IngestRunner {
    IngestRunner::new(store, ImageDispatcher::disabled(), RunOptions::default())
}

fn csv(text: &str) -> CsvAdapter {
    CsvAdapter::from_text(supplier(), text)
}

async fn job(store: &MemoryStore, id: Uuid) -> IngestJob {
    store
        .get_job(id)
        .await
        .expect("store")
        .expect("job exists")
}

async fn latest_job(store: &MemoryStore) -> IngestJob {
    store
        .list_jobs(Some(supplier()), 1)
        .await
        .expect("store")
        .pop()
        .expect("a job was recorded")
}

/// Adapter whose pull always fails.
struct FailingAdapter;

#[async_trait]
impl SourceAdapter for FailingAdapter {
    fn name(&self) -> &'static str {
        "api"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Api
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        Err(SourceError::NotFound {
            url: "https://api.acme.example/products".to_string(),
        })
    }
}

/// Adapter whose pull never finishes in time.
struct StalledAdapter;

#[async_trait]
impl SourceAdapter for StalledAdapter {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn provenance(&self) -> DataProvenance {
        DataProvenance::Sitemap
    }

    async fn pull(&self) -> Result<PullOutcome, SourceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(PullOutcome::default())
    }
}

/// Delegates to a [`MemoryStore`] but rejects upserts for one SKU and,
/// optionally, the write that marks a job successful.
struct RejectingStore {
    inner: Arc<MemoryStore>,
    bad_sku: &'static str,
    reject_complete: bool,
}

#[async_trait]
impl IngestStore for RejectingStore {
    async fn health(&self) -> Result<(), DbError> {
        self.inner.health().await
    }

    async fn create_job(
        &self,
        supplier_id: Uuid,
        adapter: &str,
        trigger: JobTrigger,
    ) -> Result<IngestJob, DbError> {
        self.inner.create_job(supplier_id, adapter, trigger).await
    }

    async fn complete_job(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), DbError> {
        if self.reject_complete {
            return Err(DbError::NotFound);
        }
        self.inner.complete_job(job_id, summary).await
    }

    async fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
        summary: &JobSummary,
    ) -> Result<(), DbError> {
        self.inner.fail_job(job_id, error, summary).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<IngestJob>, DbError> {
        self.inner.get_job(job_id).await
    }

    async fn list_jobs(
        &self,
        supplier_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IngestJob>, DbError> {
        self.inner.list_jobs(supplier_id, limit).await
    }

    async fn insert_raw_item(&self, item: &RawItem, content_hash: &str) -> Result<bool, DbError> {
        self.inner.insert_raw_item(item, content_hash).await
    }

    async fn find_catalog_by_gtin(&self, gtin: &str) -> Result<Option<CatalogProduct>, DbError> {
        self.inner.find_catalog_by_gtin(gtin).await
    }

    async fn search_catalog_by_name(
        &self,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<CatalogProduct>, DbError> {
        self.inner.search_catalog_by_name(fragment, limit).await
    }

    async fn insert_catalog_product(&self, product: &NewCatalogProduct) -> Result<Uuid, DbError> {
        self.inner.insert_catalog_product(product).await
    }

    async fn upsert_supplier_product(
        &self,
        item: &NormalizedItem,
        catalog_product_id: Uuid,
    ) -> Result<UpsertOutcome, DbError> {
        if item.supplier_sku == self.bad_sku {
            return Err(DbError::NotFound);
        }
        self.inner
            .upsert_supplier_product(item, catalog_product_id)
            .await
    }

    async fn get_supplier_product(
        &self,
        supplier_id: Uuid,
        supplier_sku: &str,
    ) -> Result<Option<SupplierProduct>, DbError> {
        self.inner
            .get_supplier_product(supplier_id, supplier_sku)
            .await
    }

    async fn record_image_task(
        &self,
        task_id: Uuid,
        catalog_product_id: Uuid,
        image_url: &str,
    ) -> Result<(), DbError> {
        self.inner
            .record_image_task(task_id, catalog_product_id, image_url)
            .await
    }

    async fn finish_image_task(
        &self,
        task_id: Uuid,
        succeeded: bool,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<(), DbError> {
        self.inner
            .finish_image_task(task_id, succeeded, attempts, last_error)
            .await
    }
}

// ---------------------------------------------------------------------------
// Idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerunning_unchanged_data_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let runner = runner(Arc::clone(&store));

    let first = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect("first run");
    assert_eq!(first.summary.raw_inserted, 3);
    assert_eq!(first.summary.items_upserted, 3);
    let before = store.supplier_products().await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect("second run");
    assert_eq!(second.summary.items_pulled, 3);
    assert_eq!(second.summary.raw_inserted, 0, "raw staging must dedup");
    assert_eq!(second.matches.gtin, 1);
    assert_eq!(second.matches.created, 0);

    let after = store.supplier_products().await;
    assert_eq!(after.len(), 3, "one row per (supplier, sku)");
    assert_eq!(store.raw_item_count().await, 3);
    assert_eq!(store.catalog_products().await.len(), 3);
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.catalog_product_id, new.catalog_product_id);
        assert_eq!(old.first_seen_at, new.first_seen_at);
        assert!(new.last_seen_at > old.last_seen_at);
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gtin_match_takes_precedence_over_name() {
    let store = Arc::new(MemoryStore::new());
    let seeded = store
        .seed_catalog_product(NewCatalogProduct {
            gtin: Some("5690000000017".to_string()),
            brand: Some("Dairy Co".to_string()),
            name: "Milk 3.5%".to_string(),
            size: Some("2 L".to_string()),
        })
        .await;

    let report = runner(Arc::clone(&store))
        .run(
            supplier(),
            JobTrigger::Manual,
            &csv("sku,name,brand,gtin\nM1,Completely Different,Acme,5690000000017\n"),
        )
        .await
        .expect("run");

    assert_eq!(report.matches.gtin, 1);
    let product = store
        .get_supplier_product(supplier(), "M1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.catalog_product_id, seeded);
    assert_eq!(store.catalog_products().await.len(), 1);
}

#[tokio::test]
async fn conflicting_brand_creates_a_separate_catalog_product() {
    let store = Arc::new(MemoryStore::new());
    let seeded = store
        .seed_catalog_product(NewCatalogProduct {
            gtin: None,
            brand: Some("Other".to_string()),
            name: "Orange Juice".to_string(),
            size: Some("1 L".to_string()),
        })
        .await;

    let report = runner(Arc::clone(&store))
        .run(
            supplier(),
            JobTrigger::Manual,
            &csv("sku,name,brand,size\nOJ,Orange Juice,Acme,1 L\nOJ2,Orange Juice,Other,1l\n"),
        )
        .await
        .expect("run");

    assert_eq!(report.matches.created, 1);
    assert_eq!(report.matches.fuzzy, 1);

    let acme = store
        .get_supplier_product(supplier(), "OJ")
        .await
        .unwrap()
        .unwrap();
    let other = store
        .get_supplier_product(supplier(), "OJ2")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(acme.catalog_product_id, seeded);
    assert_eq!(other.catalog_product_id, seeded);
}

// ---------------------------------------------------------------------------
// Batch resilience
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_invalid_row_does_not_sink_the_batch() {
    let mut text = String::from("sku,name\n");
    for i in 0..10 {
        let name = if i == 4 {
            String::new()
        } else {
            format!("Product {i}")
        };
        text.push_str(&format!("S{i},{name}\n"));
    }

    let store = Arc::new(MemoryStore::new());
    let report = runner(Arc::clone(&store))
        .run(supplier(), JobTrigger::Manual, &csv(&text))
        .await
        .expect("run");

    assert_eq!(report.summary.items_pulled, 10);
    assert_eq!(report.summary.items_normalized, 9);
    assert_eq!(report.summary.items_upserted, 9);
    assert_eq!(report.summary.items_failed, 0);
    assert!(report.summary.warnings.iter().any(|w| w.contains("1 item")));
    assert_eq!(store.supplier_products().await.len(), 9);
    assert!(store
        .get_supplier_product(supplier(), "S4")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn captured_traffic_runs_through_the_same_pipeline() {
    let capture = json!({"log": {"entries": [{
        "request": {"url": "https://shop.example/api/products?page=1"},
        "response": {"content": {
            "mimeType": "application/json",
            "text": json!({"items": [
                {"sku": "H1", "name": "Skyr", "brand": "MS"},
                {"sku": "H2", "name": "Butter", "brand": "MS"}
            ]}).to_string()
        }}
    }]}});

    let store = Arc::new(MemoryStore::new());
    let report = runner(Arc::clone(&store))
        .run(
            supplier(),
            JobTrigger::Http,
            &HarAdapter::from_text(supplier(), capture.to_string()),
        )
        .await
        .expect("run");

    assert_eq!(report.adapter, "har");
    assert_eq!(report.summary.items_upserted, 2);
    let product = store
        .get_supplier_product(supplier(), "H1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.data_provenance, DataProvenance::Manual);
    assert_eq!(
        product.source_url.as_deref(),
        Some("https://shop.example/api/products?page=1")
    );
    assert_eq!(latest_job(&store).await.trigger, "http");
}

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_run_finishes_job_with_counts() {
    let store = Arc::new(MemoryStore::new());
    let report = runner(Arc::clone(&store))
        .run(supplier(), JobTrigger::Scheduler, &csv(CATALOG_CSV))
        .await
        .expect("run");

    let job = job(&store, report.job_id).await;
    assert_eq!(job.status, JobStatus::Success);
    assert!(job.finished_at.is_some());
    assert!(job.error.is_none());
    assert_eq!(job.adapter, "csv");
    assert_eq!(job.trigger, "scheduler");
    assert_eq!(job.summary, report.summary);
}

#[tokio::test]
async fn pull_failure_fails_job_and_stages_nothing() {
    let store = Arc::new(MemoryStore::new());
    let err = runner(Arc::clone(&store))
        .run(supplier(), JobTrigger::Manual, &FailingAdapter)
        .await
        .expect_err("pull failure should propagate");
    assert!(matches!(
        err,
        IngestError::Pull {
            adapter: "api",
            source: SourceError::NotFound { .. }
        }
    ));

    let job = latest_job(&store).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.finished_at.is_some());
    assert!(job.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(store.raw_item_count().await, 0);
    assert!(store.supplier_products().await.is_empty());
}

#[tokio::test]
async fn stalled_pull_times_out_as_pull_failure() {
    let store = Arc::new(MemoryStore::new());
    let runner = IngestRunner::new(
        Arc::clone(&store) as Arc<dyn IngestStore>,
        ImageDispatcher::disabled(),
        RunOptions {
            pull_timeout: Duration::from_millis(50),
            ..RunOptions::default()
        },
    );

    let err = runner
        .run(supplier(), JobTrigger::Scheduler, &StalledAdapter)
        .await
        .expect_err("timeout");
    assert!(matches!(
        err,
        IngestError::PullTimeout {
            adapter: "sitemap",
            ..
        }
    ));

    let job = latest_job(&store).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().is_some_and(|e| e.contains("timed out")));
}

// ---------------------------------------------------------------------------
// Item failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn isolate_policy_records_item_failure_and_succeeds() {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(RejectingStore {
        inner: Arc::clone(&memory),
        bad_sku: "A2",
        reject_complete: false,
    });
    let runner = IngestRunner::new(store, ImageDispatcher::disabled(), RunOptions::default());

    let report = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect("isolated failures do not fail the run");

    assert_eq!(report.summary.items_upserted, 2);
    assert_eq!(report.summary.items_failed, 1);
    assert!(report.summary.warnings.iter().any(|w| w.contains("A2")));

    let job = job(&memory, report.job_id).await;
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.summary.items_failed, 1);
    assert_eq!(memory.supplier_products().await.len(), 2);
}

#[tokio::test]
async fn abort_policy_fails_job_on_first_item_error() {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(RejectingStore {
        inner: Arc::clone(&memory),
        bad_sku: "A2",
        reject_complete: false,
    });
    let runner = IngestRunner::new(
        store,
        ImageDispatcher::disabled(),
        RunOptions {
            item_failure_policy: ItemFailurePolicy::Abort,
            ..RunOptions::default()
        },
    );

    let err = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect_err("abort propagates");
    assert!(matches!(err, IngestError::Item { ref sku, .. } if sku == "A2"));

    let job = latest_job(&memory).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().is_some_and(|e| e.contains("A2")));
    assert_eq!(job.summary.items_upserted, 1);
    // Items ahead of the failure stay upserted; nothing after it is touched.
    let skus: Vec<String> = memory
        .supplier_products()
        .await
        .into_iter()
        .map(|p| p.supplier_sku)
        .collect();
    assert_eq!(skus, vec!["A1".to_string()]);
}

#[tokio::test]
async fn failed_success_write_still_leaves_job_terminal() {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(RejectingStore {
        inner: Arc::clone(&memory),
        bad_sku: "",
        reject_complete: true,
    });
    let runner = IngestRunner::new(store, ImageDispatcher::disabled(), RunOptions::default());

    let err = runner
        .run(supplier(), JobTrigger::Manual, &csv("sku,name\nA1,Oat Milk\n"))
        .await
        .expect_err("success write failure propagates");
    assert!(matches!(err, IngestError::Db(DbError::NotFound)));

    let job = latest_job(&memory).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.finished_at.is_some());
    assert!(job.error.is_some());
    assert_eq!(job.summary.items_upserted, 1);
}

// ---------------------------------------------------------------------------
// Image side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn items_with_images_are_dispatched_with_their_catalog_id() {
    let store = Arc::new(MemoryStore::new());
    let (dispatcher, mut receiver) = ImageDispatcher::channel(8);
    let runner = IngestRunner::new(
        Arc::clone(&store) as Arc<dyn IngestStore>,
        dispatcher,
        RunOptions::default(),
    );

    let report = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect("run");
    assert_eq!(report.images_dispatched, 2);

    let first = receiver.try_recv().expect("first task");
    let second = receiver.try_recv().expect("second task");
    assert!(receiver.try_recv().is_err());

    let a1 = store
        .get_supplier_product(supplier(), "A1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.catalog_product_id, a1.catalog_product_id);
    assert_eq!(first.image_url, "https://cdn.example/a1.jpg");
    assert_eq!(second.image_url, "https://cdn.example/a3.jpg");
}

#[tokio::test]
async fn full_image_queue_never_fails_the_run() {
    let store = Arc::new(MemoryStore::new());
    let (dispatcher, _receiver) = ImageDispatcher::channel(1);
    let runner = IngestRunner::new(
        Arc::clone(&store) as Arc<dyn IngestStore>,
        dispatcher,
        RunOptions::default(),
    );

    let report = runner
        .run(supplier(), JobTrigger::Manual, &csv(CATALOG_CSV))
        .await
        .expect("run");
    assert_eq!(report.images_dispatched, 1);
    assert_eq!(report.summary.items_upserted, 3);
    assert!(report.summary.warnings.is_empty());
}

#[tokio::test]
async fn http_image_worker_posts_task_and_retries() {
    let server = MockServer::start().await;
    let catalog_product_id = Uuid::new_v4();
    let body = json!({
        "catalog_product_id": catalog_product_id,
        "image_url": "https://cdn.example/a1.jpg",
    });

    Mock::given(method("POST"))
        .and(path("/fetch-image"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch-image"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let http = HttpFetcher::new(5, "supcat-test/0.1", 0, 0).expect("fetcher");
    let worker = ImageFetchWorker::new(
        Arc::clone(&store) as Arc<dyn IngestStore>,
        Arc::new(HttpImageFetcher::new(
            http,
            &format!("{}/fetch-image", server.uri()),
        )),
        2,
        Duration::ZERO,
    );

    let (dispatcher, receiver) = ImageDispatcher::channel(4);
    let handle = tokio::spawn(worker.run(receiver));
    assert!(dispatcher.dispatch(catalog_product_id, "https://cdn.example/a1.jpg"));
    drop(dispatcher);
    handle.await.expect("worker exits cleanly");

    let tasks = store.image_tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, "done");
    assert_eq!(tasks[0].attempts, 2);
    assert_eq!(tasks[0].catalog_product_id, catalog_product_id);
}
