//! Audit rows for the image-fetch work queue.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `image_fetch_tasks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageTaskRow {
    pub id: Uuid,
    pub catalog_product_id: Uuid,
    pub image_url: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Records a dequeued image task as `pending`. Re-recording the same id is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_image_task(
    pool: &PgPool,
    id: Uuid,
    catalog_product_id: Uuid,
    image_url: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO image_fetch_tasks (id, catalog_product_id, image_url, status) \
         VALUES ($1, $2, $3, 'pending') \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(id)
    .bind(catalog_product_id)
    .bind(image_url)
    .execute(pool)
    .await?;
    Ok(())
}

/// Stores the final outcome of an image task.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the task was never recorded, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn finish_image_task(
    pool: &PgPool,
    id: Uuid,
    succeeded: bool,
    attempts: i32,
    last_error: Option<&str>,
) -> Result<(), DbError> {
    let status = if succeeded { "done" } else { "failed" };
    let result = sqlx::query(
        "UPDATE image_fetch_tasks \
         SET status = $2, attempts = $3, last_error = $4, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(attempts)
    .bind(last_error)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Fetches one image task by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_image_task(pool: &PgPool, id: Uuid) -> Result<Option<ImageTaskRow>, DbError> {
    let row = sqlx::query_as::<_, ImageTaskRow>(
        "SELECT id, catalog_product_id, image_url, status, attempts, last_error, \
                created_at, updated_at \
         FROM image_fetch_tasks \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
