//! Catalog matching: resolve a normalized item to a catalog product id.
//!
//! Resolution runs in three stages and stops at the first hit:
//!
//! 1. exact GTIN lookup;
//! 2. a bounded case-insensitive search on the first
//!    [`FUZZY_NAME_PREFIX_CHARS`] characters of the name, accepting the first
//!    candidate whose brand and size agree with whatever the item supplies;
//! 3. creation of a new catalog product.
//!
//! The attribute filter never scores candidates. Splitting one product into
//! two catalog rows is preferred over merging two different products.

use supcat_core::{CatalogProduct, NewCatalogProduct, NormalizedItem};
use supcat_db::{DbError, IngestStore};
use uuid::Uuid;

pub const FUZZY_NAME_PREFIX_CHARS: usize = 32;
pub const FUZZY_CANDIDATE_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Gtin,
    Fuzzy,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub catalog_product_id: Uuid,
    pub kind: MatchKind,
}

/// Resolve `item` to a catalog product, creating one when nothing matches.
///
/// # Errors
///
/// Returns [`DbError`] if any lookup or the final insert fails. A failed
/// insert is never swallowed: the item would otherwise have nothing to link to.
pub async fn match_or_create_catalog(
    store: &dyn IngestStore,
    item: &NormalizedItem,
) -> Result<MatchOutcome, DbError> {
    if let Some(gtin) = item.gtin.as_deref() {
        if let Some(product) = store.find_catalog_by_gtin(gtin).await? {
            return Ok(MatchOutcome {
                catalog_product_id: product.id,
                kind: MatchKind::Gtin,
            });
        }
    }

    let prefix: String = item.name.chars().take(FUZZY_NAME_PREFIX_CHARS).collect();
    let candidates = store
        .search_catalog_by_name(&prefix, FUZZY_CANDIDATE_LIMIT)
        .await?;
    if let Some(candidate) = candidates.iter().find(|c| candidate_agrees(c, item)) {
        return Ok(MatchOutcome {
            catalog_product_id: candidate.id,
            kind: MatchKind::Fuzzy,
        });
    }

    let id = store
        .insert_catalog_product(&NewCatalogProduct {
            gtin: item.gtin.clone(),
            brand: item.brand.clone(),
            name: item.name.clone(),
            size: item.pack_size.clone(),
        })
        .await?;
    Ok(MatchOutcome {
        catalog_product_id: id,
        kind: MatchKind::Created,
    })
}

/// Attributes the item lacks are not held against a candidate.
fn candidate_agrees(candidate: &CatalogProduct, item: &NormalizedItem) -> bool {
    let brand_agrees = item.brand.as_deref().is_none_or(|brand| {
        candidate
            .brand
            .as_deref()
            .is_some_and(|other| other.to_lowercase() == brand.to_lowercase())
    });

    let size_agrees = item.pack_size.as_deref().is_none_or(|pack| {
        candidate.size.as_deref().is_some_and(|size| {
            let compact: String = size.chars().filter(|c| !c.is_whitespace()).collect();
            compact.to_lowercase() == pack
        })
    });

    brand_agrees && size_agrees
}
