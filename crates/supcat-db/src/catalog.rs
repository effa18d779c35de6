//! Database operations for `catalog_products`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use supcat_core::{CatalogProduct, NewCatalogProduct};
use uuid::Uuid;

use crate::DbError;

/// A row from the `catalog_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogProductRow {
    pub id: Uuid,
    pub gtin: Option<String>,
    pub brand: Option<String>,
    pub name: String,
    pub size: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CatalogProductRow> for CatalogProduct {
    fn from(row: CatalogProductRow) -> Self {
        Self {
            id: row.id,
            gtin: row.gtin,
            brand: row.brand,
            name: row.name,
            size: row.size,
            created_at: row.created_at,
        }
    }
}

/// Point lookup by exact GTIN.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_catalog_product_by_gtin(
    pool: &PgPool,
    gtin: &str,
) -> Result<Option<CatalogProductRow>, DbError> {
    let row = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, gtin, brand, name, size, created_at \
         FROM catalog_products \
         WHERE gtin = $1",
    )
    .bind(gtin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Case-insensitive substring search on `name`, oldest first, capped at `limit`.
///
/// `%`, `_` and `\` in `fragment` match literally.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_catalog_products_by_name(
    pool: &PgPool,
    fragment: &str,
    limit: i64,
) -> Result<Vec<CatalogProductRow>, DbError> {
    let rows = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, gtin, brand, name, size, created_at \
         FROM catalog_products \
         WHERE name ILIKE '%' || $1 || '%' ESCAPE '\\' \
         ORDER BY created_at, id \
         LIMIT $2",
    )
    .bind(escape_like(fragment))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a catalog product and returns its id.
///
/// When another writer already holds the same non-null GTIN, the existing
/// row's id is returned instead.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_catalog_product(
    pool: &PgPool,
    product: &NewCatalogProduct,
) -> Result<Uuid, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO catalog_products (id, gtin, brand, name, size) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (gtin) WHERE gtin IS NOT NULL \
         DO UPDATE SET gtin = EXCLUDED.gtin \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(product.gtin.as_deref())
    .bind(product.brand.as_deref())
    .bind(&product.name)
    .bind(product.size.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
