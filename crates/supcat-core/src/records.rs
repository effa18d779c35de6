//! Persisted entities shared by the store, the runner, and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::items::DataProvenance;
use crate::normalize::AvailabilityStatus;

/// Canonical, supplier-independent product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub gtin: Option<String>,
    pub brand: Option<String>,
    pub name: String,
    pub size: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogProduct {
    pub gtin: Option<String>,
    pub brand: Option<String>,
    pub name: String,
    pub size: Option<String>,
}

/// Link between one supplier SKU and its catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierProduct {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_sku: String,
    pub catalog_product_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub pack_size: Option<String>,
    pub pack_quantity: Option<f64>,
    pub pack_unit: Option<String>,
    pub gtin: Option<String>,
    pub category_path: Vec<String>,
    pub image_url: Option<String>,
    pub availability_text: Option<String>,
    pub availability_status: AvailabilityStatus,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub source_url: Option<String>,
    pub data_provenance: DataProvenance,
    pub provenance_confidence: f64,
    pub raw_hash: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: Uuid,
    /// `true` when the row did not exist before this upsert.
    pub inserted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// What started an ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobTrigger {
    Scheduler,
    Manual,
    Http,
}

impl JobTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobTrigger::Scheduler => "scheduler",
            JobTrigger::Manual => "manual",
            JobTrigger::Http => "http",
        }
    }
}

impl std::fmt::Display for JobTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters and warnings written onto a job when it reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub items_pulled: i32,
    pub raw_inserted: i32,
    pub items_normalized: i32,
    pub items_upserted: i32,
    pub items_failed: i32,
    pub warnings: Vec<String>,
}

/// One execution record of the ingestion runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestJob {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub adapter: String,
    pub trigger: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub summary: JobSummary,
}
