//! Field extraction from loosely-shaped supplier records.
//!
//! Suppliers disagree on column and key names (`sku` / `SKU` / `item_number`,
//! `name` / `Title`). Keys are compared after lower-casing and dropping every
//! non-alphanumeric character, so `Pack Size`, `pack_size` and `packSize` all
//! resolve to the same alias.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use supcat_core::ItemFields;

const SKU_KEYS: &[&str] = &["sku", "suppliersku", "itemnumber", "productnumber", "id"];
const NAME_KEYS: &[&str] = &["name", "title", "productname"];
const BRAND_KEYS: &[&str] = &["brand", "vendor", "manufacturer"];
const PACK_KEYS: &[&str] = &["packsize", "size", "pack", "unitsize"];
const GTIN_KEYS: &[&str] = &["gtin", "ean", "barcode", "upc", "gtin13"];
const CATEGORY_KEYS: &[&str] = &["categorypath", "category", "categories"];
const IMAGE_KEYS: &[&str] = &["imageurl", "image", "imagelink"];
const AVAILABILITY_KEYS: &[&str] = &["availability", "stockstatus", "stock", "instock"];
const PRICE_KEYS: &[&str] = &["price", "unitprice", "netprice"];
const CURRENCY_KEYS: &[&str] = &["currency", "currencycode"];
const URL_KEYS: &[&str] = &["url", "producturl", "link"];

/// Keys that identify an API record for its synthesized source URL.
const ID_KEYS: &[&str] = &["id", "sku", "productid"];

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// JSON records
// ---------------------------------------------------------------------------

fn json_lookup<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .find(|(k, v)| normalize_key(k) == *alias && !v.is_null())
            .map(|(_, v)| v)
    })
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_string(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    json_lookup(object, aliases).and_then(json_scalar)
}

fn json_availability(object: &Map<String, Value>) -> Option<String> {
    match json_lookup(object, AVAILABILITY_KEYS)? {
        Value::Bool(true) => Some("in stock".to_string()),
        Value::Bool(false) => Some("out of stock".to_string()),
        other => json_scalar(other),
    }
}

fn json_category(object: &Map<String, Value>) -> Vec<String> {
    match json_lookup(object, CATEGORY_KEYS) {
        Some(Value::Array(parts)) => parts.iter().filter_map(json_scalar).collect(),
        Some(Value::String(path)) => split_category_path(path),
        _ => Vec::new(),
    }
}

fn json_price(object: &Map<String, Value>) -> Option<f64> {
    match json_lookup(object, PRICE_KEYS)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn json_image(object: &Map<String, Value>) -> Option<String> {
    match json_lookup(object, IMAGE_KEYS)? {
        Value::Object(inner) => json_string(inner, URL_KEYS),
        Value::Array(list) => list.iter().find_map(|v| match v {
            Value::Object(inner) => json_string(inner, URL_KEYS),
            other => json_scalar(other),
        }),
        other => json_scalar(other),
    }
}

/// Extract [`ItemFields`] from one JSON product object.
///
/// Non-object values yield empty fields, which the normalizer then skips.
#[must_use]
pub fn fields_from_json(value: &Value) -> ItemFields {
    let Some(object) = value.as_object() else {
        return ItemFields::default();
    };

    ItemFields {
        sku: json_string(object, SKU_KEYS),
        name: json_string(object, NAME_KEYS),
        brand: json_string(object, BRAND_KEYS),
        pack_size: json_string(object, PACK_KEYS),
        gtin: json_string(object, GTIN_KEYS),
        category_path: json_category(object),
        image_url: json_image(object),
        availability_text: json_availability(object),
        price: json_price(object),
        currency: json_string(object, CURRENCY_KEYS),
        source_url: json_string(object, URL_KEYS),
    }
}

/// The identifier used in an API item's synthesized `{base}/products/{id}` URL.
#[must_use]
pub fn json_record_id(value: &Value) -> Option<String> {
    value
        .as_object()
        .and_then(|object| json_string(object, ID_KEYS))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// CSV rows
// ---------------------------------------------------------------------------

fn row_lookup(row: &BTreeMap<String, String>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        row.iter()
            .find(|(k, v)| normalize_key(k) == *alias && !v.trim().is_empty())
            .map(|(_, v)| v.clone())
    })
}

/// Extract [`ItemFields`] from one CSV row keyed by its header names.
#[must_use]
pub fn fields_from_row(row: &BTreeMap<String, String>) -> ItemFields {
    ItemFields {
        sku: row_lookup(row, SKU_KEYS),
        name: row_lookup(row, NAME_KEYS),
        brand: row_lookup(row, BRAND_KEYS),
        pack_size: row_lookup(row, PACK_KEYS),
        gtin: row_lookup(row, GTIN_KEYS),
        category_path: row_lookup(row, CATEGORY_KEYS)
            .map(|path| split_category_path(&path))
            .unwrap_or_default(),
        image_url: row_lookup(row, IMAGE_KEYS),
        availability_text: row_lookup(row, AVAILABILITY_KEYS),
        price: row_lookup(row, PRICE_KEYS).and_then(|p| parse_price(&p)),
        currency: row_lookup(row, CURRENCY_KEYS),
        source_url: row_lookup(row, URL_KEYS),
    }
}

// ---------------------------------------------------------------------------
// Shared parsing
// ---------------------------------------------------------------------------

/// Split `"Drinks > Juice"` or `"Drinks/Juice"` into its segments.
fn split_category_path(path: &str) -> Vec<String> {
    path.split(['>', '/', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a price such as `"1 299,50 kr."` or `"$12.99"`.
///
/// A lone comma is read as the decimal separator; when both separators are
/// present the last one is the decimal separator.
fn parse_price(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    let kept = kept.trim_matches(['.', ',']).to_string();
    if kept.is_empty() {
        return None;
    }

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (None, Some(_)) => kept.replace(',', "."),
        _ => kept,
    };
    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}
