//! Database operations for `supplier_products`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use supcat_core::{NormalizedItem, SupplierProduct, UpsertOutcome};
use uuid::Uuid;

use crate::DbError;

/// A row from the `supplier_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierProductRow {
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
    pub availability_status: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub source_url: Option<String>,
    pub data_provenance: String,
    pub provenance_confidence: f64,
    pub raw_hash: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl TryFrom<SupplierProductRow> for SupplierProduct {
    type Error = DbError;

    fn try_from(row: SupplierProductRow) -> Result<Self, Self::Error> {
        let availability_status =
            row.availability_status
                .parse()
                .map_err(|reason| DbError::InvalidColumn {
                    column: "availability_status",
                    reason,
                })?;
        let data_provenance = row
            .data_provenance
            .parse()
            .map_err(|reason| DbError::InvalidColumn {
                column: "data_provenance",
                reason,
            })?;

        Ok(Self {
            id: row.id,
            supplier_id: row.supplier_id,
            supplier_sku: row.supplier_sku,
            catalog_product_id: row.catalog_product_id,
            name: row.name,
            brand: row.brand,
            pack_size: row.pack_size,
            pack_quantity: row.pack_quantity,
            pack_unit: row.pack_unit,
            gtin: row.gtin,
            category_path: row.category_path,
            image_url: row.image_url,
            availability_text: row.availability_text,
            availability_status,
            price: row.price,
            currency: row.currency,
            source_url: row.source_url,
            data_provenance,
            provenance_confidence: row.provenance_confidence,
            raw_hash: row.raw_hash,
            first_seen_at: row.first_seen_at,
            last_seen_at: row.last_seen_at,
        })
    }
}

/// Upserts the supplier-product row keyed by `(supplier_id, supplier_sku)`.
///
/// An existing row keeps its `id` and `first_seen_at`; every observed
/// attribute is overwritten and `last_seen_at` is set to `NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails (for example, an unknown
/// `catalog_product_id`).
pub async fn upsert_supplier_product(
    pool: &PgPool,
    item: &NormalizedItem,
    catalog_product_id: Uuid,
) -> Result<UpsertOutcome, DbError> {
    let (id, inserted) = sqlx::query_as::<_, (Uuid, bool)>(
        "INSERT INTO supplier_products ( \
             id, supplier_id, supplier_sku, catalog_product_id, name, brand, \
             pack_size, pack_quantity, pack_unit, gtin, category_path, image_url, \
             availability_text, availability_status, price, currency, source_url, \
             data_provenance, provenance_confidence, raw_hash, first_seen_at, last_seen_at \
         ) VALUES ( \
             $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20, NOW(), NOW() \
         ) \
         ON CONFLICT (supplier_id, supplier_sku) DO UPDATE SET \
             catalog_product_id = EXCLUDED.catalog_product_id, \
             name = EXCLUDED.name, \
             brand = EXCLUDED.brand, \
             pack_size = EXCLUDED.pack_size, \
             pack_quantity = EXCLUDED.pack_quantity, \
             pack_unit = EXCLUDED.pack_unit, \
             gtin = EXCLUDED.gtin, \
             category_path = EXCLUDED.category_path, \
             image_url = EXCLUDED.image_url, \
             availability_text = EXCLUDED.availability_text, \
             availability_status = EXCLUDED.availability_status, \
             price = EXCLUDED.price, \
             currency = EXCLUDED.currency, \
             source_url = EXCLUDED.source_url, \
             data_provenance = EXCLUDED.data_provenance, \
             provenance_confidence = EXCLUDED.provenance_confidence, \
             raw_hash = EXCLUDED.raw_hash, \
             last_seen_at = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(Uuid::new_v4())
    .bind(item.supplier_id)
    .bind(&item.supplier_sku)
    .bind(catalog_product_id)
    .bind(&item.name)
    .bind(item.brand.as_deref())
    .bind(item.pack_size.as_deref())
    .bind(item.pack_quantity)
    .bind(item.pack_unit.as_deref())
    .bind(item.gtin.as_deref())
    .bind(&item.category_path)
    .bind(item.image_url.as_deref())
    .bind(item.availability_text.as_deref())
    .bind(item.availability_status.as_str())
    .bind(item.price)
    .bind(item.currency.as_deref())
    .bind(item.source_url.as_deref())
    .bind(item.data_provenance.as_str())
    .bind(item.provenance_confidence)
    .bind(&item.raw_hash)
    .fetch_one(pool)
    .await?;

    Ok(UpsertOutcome { id, inserted })
}

/// Fetches one supplier product by its natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::InvalidColumn`] if a stored enum value is unrecognized.
pub async fn get_supplier_product(
    pool: &PgPool,
    supplier_id: Uuid,
    supplier_sku: &str,
) -> Result<Option<SupplierProduct>, DbError> {
    let row = sqlx::query_as::<_, SupplierProductRow>(
        "SELECT id, supplier_id, supplier_sku, catalog_product_id, name, brand, \
                pack_size, pack_quantity, pack_unit, gtin, category_path, image_url, \
                availability_text, availability_status, price, currency, source_url, \
                data_provenance, provenance_confidence, raw_hash, first_seen_at, last_seen_at \
         FROM supplier_products \
         WHERE supplier_id = $1 AND supplier_sku = $2",
    )
    .bind(supplier_id)
    .bind(supplier_sku)
    .fetch_optional(pool)
    .await?;

    row.map(SupplierProduct::try_from).transpose()
}

/// Number of supplier-product rows for one supplier.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_supplier_products(pool: &PgPool, supplier_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM supplier_products WHERE supplier_id = $1",
    )
    .bind(supplier_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
