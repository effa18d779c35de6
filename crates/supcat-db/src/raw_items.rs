//! Database operations for the `raw_items` staging table.

use sqlx::PgPool;
use supcat_core::RawItem;
use uuid::Uuid;

use crate::DbError;

/// Stages one raw item keyed by `(supplier_id, content_hash)`.
///
/// Returns `true` when a row was written and `false` when the pair already
/// existed; a duplicate is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_raw_item(
    pool: &PgPool,
    item: &RawItem,
    content_hash: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO raw_items (supplier_id, content_hash, payload_kind, source_url, payload) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (supplier_id, content_hash) DO NOTHING",
    )
    .bind(item.supplier_id)
    .bind(content_hash)
    .bind(item.payload.kind())
    .bind(item.source_url.as_deref())
    .bind(item.payload.to_value())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of staged raw rows for one supplier.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_raw_items(pool: &PgPool, supplier_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw_items WHERE supplier_id = $1")
        .bind(supplier_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
