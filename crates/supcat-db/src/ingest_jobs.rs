//! Database operations for `ingest_jobs`.
//!
//! A job is inserted as `running` and moves exactly once to `success` or
//! `failed`. Both terminal updates are guarded on the current status, so a
//! second transition reports [`DbError::InvalidJobTransition`].

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use supcat_core::{IngestJob, JobSummary, JobTrigger};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ingest_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestJobRow {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub adapter: String,
    pub trigger: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub items_pulled: i32,
    pub raw_inserted: i32,
    pub items_normalized: i32,
    pub items_upserted: i32,
    pub items_failed: i32,
    pub warnings: Json<Vec<String>>,
}

impl TryFrom<IngestJobRow> for IngestJob {
    type Error = DbError;

    fn try_from(row: IngestJobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|reason| DbError::InvalidColumn {
                column: "status",
                reason,
            })?;

        Ok(Self {
            id: row.id,
            supplier_id: row.supplier_id,
            adapter: row.adapter,
            trigger: row.trigger,
            status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            error: row.error,
            summary: JobSummary {
                items_pulled: row.items_pulled,
                raw_inserted: row.raw_inserted,
                items_normalized: row.items_normalized,
                items_upserted: row.items_upserted,
                items_failed: row.items_failed,
                warnings: row.warnings.0,
            },
        })
    }
}

const JOB_COLUMNS: &str = "id, supplier_id, adapter, trigger, status, started_at, finished_at, \
                           error, items_pulled, raw_inserted, items_normalized, items_upserted, \
                           items_failed, warnings";

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Creates a new job in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ingest_job(
    pool: &PgPool,
    supplier_id: Uuid,
    adapter: &str,
    trigger: JobTrigger,
) -> Result<IngestJobRow, DbError> {
    let row = sqlx::query_as::<_, IngestJobRow>(&format!(
        "INSERT INTO ingest_jobs (id, supplier_id, adapter, trigger, status, started_at) \
         VALUES ($1, $2, $3, $4, 'running', NOW()) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(supplier_id)
    .bind(adapter)
    .bind(trigger.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a running job as `success`, stamping `finished_at` and the summary.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_ingest_job(
    pool: &PgPool,
    id: Uuid,
    summary: &JobSummary,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingest_jobs \
         SET status = 'success', finished_at = NOW(), error = NULL, \
             items_pulled = $2, raw_inserted = $3, items_normalized = $4, \
             items_upserted = $5, items_failed = $6, warnings = $7 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(summary.items_pulled)
    .bind(summary.raw_inserted)
    .bind(summary.items_normalized)
    .bind(summary.items_upserted)
    .bind(summary.items_failed)
    .bind(Json(&summary.warnings))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running job as `failed` with an error message and partial summary.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_ingest_job(
    pool: &PgPool,
    id: Uuid,
    error: &str,
    summary: &JobSummary,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingest_jobs \
         SET status = 'failed', finished_at = NOW(), error = $2, \
             items_pulled = $3, raw_inserted = $4, items_normalized = $5, \
             items_upserted = $6, items_failed = $7, warnings = $8 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error)
    .bind(summary.items_pulled)
    .bind(summary.raw_inserted)
    .bind(summary.items_normalized)
    .bind(summary.items_upserted)
    .bind(summary.items_failed)
    .bind(Json(&summary.warnings))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Fetches a single job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ingest_job(pool: &PgPool, id: Uuid) -> Result<IngestJobRow, DbError> {
    let row = sqlx::query_as::<_, IngestJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM ingest_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, newest first, optionally for one supplier.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingest_jobs(
    pool: &PgPool,
    supplier_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<IngestJobRow>, DbError> {
    let rows = sqlx::query_as::<_, IngestJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM ingest_jobs \
         WHERE ($1::uuid IS NULL OR supplier_id = $1) \
         ORDER BY started_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(supplier_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
