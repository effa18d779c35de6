//! Raw and normalized item shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::hash::content_hash;
use crate::normalize::{
    classify_availability, clean_availability_text, clean_gtin, collapse_whitespace,
    normalize_basics, AvailabilityStatus, BasicFields,
};
use crate::pack::parse_pack;

/// Where a normalized item's data came from. Drives provenance confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvenance {
    Api,
    Csv,
    Sitemap,
    Manual,
}

impl DataProvenance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataProvenance::Api => "api",
            DataProvenance::Csv => "csv",
            DataProvenance::Sitemap => "sitemap",
            DataProvenance::Manual => "manual",
        }
    }

    /// Confidence that an item from this source resolves to the right
    /// catalog product. A GTIN dominates the source kind.
    #[must_use]
    pub fn confidence(self, has_gtin: bool) -> f64 {
        match (self, has_gtin) {
            (DataProvenance::Api, true) => 0.95,
            (_, true) => 0.9,
            (DataProvenance::Api, false) => 0.8,
            (DataProvenance::Sitemap, false) => 0.7,
            (DataProvenance::Csv | DataProvenance::Manual, false) => 0.6,
        }
    }
}

impl std::fmt::Display for DataProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataProvenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(DataProvenance::Api),
            "csv" => Ok(DataProvenance::Csv),
            "sitemap" => Ok(DataProvenance::Sitemap),
            "manual" => Ok(DataProvenance::Manual),
            other => Err(format!("unknown data provenance '{other}'")),
        }
    }
}

/// Source-specific body of a raw item.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// One element of a supplier API listing.
    Api { item: Value },
    /// One CSV data row, keyed by the header as written in the file.
    CsvRow { row: BTreeMap<String, String> },
    /// One JSON product page fetched from a sitemap `<loc>`.
    SitemapPage { url: String, body: Value },
    /// One item extracted from a captured JSON response.
    CapturedResponse { url: String, item: Value },
}

impl RawPayload {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::Api { .. } => "api",
            RawPayload::CsvRow { .. } => "csv_row",
            RawPayload::SitemapPage { .. } => "sitemap_page",
            RawPayload::CapturedResponse { .. } => "captured_response",
        }
    }

    /// JSON form persisted to the raw staging store and fed to the hash.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            RawPayload::Api { item } => json!({ "kind": self.kind(), "item": item }),
            RawPayload::CsvRow { row } => json!({ "kind": self.kind(), "row": row }),
            RawPayload::SitemapPage { url, body } => {
                json!({ "kind": self.kind(), "url": url, "body": body })
            }
            RawPayload::CapturedResponse { url, item } => {
                json!({ "kind": self.kind(), "url": url, "item": item })
            }
        }
    }
}

/// One unprocessed record pulled from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub supplier_id: Uuid,
    pub source_url: Option<String>,
    pub payload: RawPayload,
}

impl RawItem {
    #[must_use]
    pub fn new(supplier_id: Uuid, source_url: Option<String>, payload: RawPayload) -> Self {
        Self {
            supplier_id,
            source_url,
            payload,
        }
    }

    #[must_use]
    pub fn content_hash(&self) -> String {
        content_hash(&self.payload.to_value())
    }
}

/// Fields an adapter lifts out of one raw record, before cleanup.
#[derive(Debug, Clone, Default)]
pub struct ItemFields {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub pack_size: Option<String>,
    pub gtin: Option<String>,
    pub category_path: Vec<String>,
    pub image_url: Option<String>,
    pub availability_text: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub source_url: Option<String>,
}

/// Why a raw record produced no normalized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingSku,
    MissingName,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingSku => write!(f, "missing supplier sku"),
            SkipReason::MissingName => write!(f, "missing product name"),
        }
    }
}

/// Canonical representation of one supplier's product listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    pub supplier_id: Uuid,
    pub supplier_sku: String,
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
}

impl NormalizedItem {
    /// Build a normalized item from extracted fields.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the sku or name is blank after trimming.
    pub fn build(
        supplier_id: Uuid,
        provenance: DataProvenance,
        raw_hash: String,
        fields: ItemFields,
    ) -> Result<Self, SkipReason> {
        let supplier_sku = fields
            .sku
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingSku)?;

        let basics = normalize_basics(BasicFields {
            name: fields.name.unwrap_or_default(),
            brand: fields.brand,
            pack_size: fields.pack_size,
        });
        if basics.name.is_empty() {
            return Err(SkipReason::MissingName);
        }

        let gtin = fields.gtin.as_deref().and_then(clean_gtin);
        let pack = basics.pack_size.as_deref().map(parse_pack);
        let availability_text = fields
            .availability_text
            .map(|t| clean_availability_text(&t))
            .filter(|t| !t.is_empty());
        let availability_status = availability_text
            .as_deref()
            .map_or(AvailabilityStatus::Unknown, classify_availability);
        let category_path = fields
            .category_path
            .iter()
            .map(|c| collapse_whitespace(c))
            .filter(|c| !c.is_empty())
            .collect();

        Ok(Self {
            supplier_id,
            supplier_sku,
            name: basics.name,
            brand: basics.brand,
            pack_size: basics.pack_size,
            pack_quantity: pack.as_ref().map(|p| p.quantity),
            pack_unit: pack.map(|p| p.unit),
            provenance_confidence: provenance.confidence(gtin.is_some()),
            gtin,
            category_path,
            image_url: non_blank(fields.image_url),
            availability_text,
            availability_status,
            price: fields.price.filter(|p| p.is_finite() && *p >= 0.0),
            currency: non_blank(fields.currency).map(|c| c.to_uppercase()),
            source_url: non_blank(fields.source_url),
            data_provenance: provenance,
            raw_hash,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier() -> Uuid {
        Uuid::parse_str("6a3c1e7e-2f7b-4b0e-9a51-0d7f4f0b9a11").unwrap()
    }

    fn fields(sku: &str, name: &str) -> ItemFields {
        ItemFields {
            sku: Some(sku.to_string()),
            name: Some(name.to_string()),
            ..ItemFields::default()
        }
    }

    #[test]
    fn confidence_policy_prefers_gtin_then_api() {
        assert!((DataProvenance::Api.confidence(true) - 0.95).abs() < f64::EPSILON);
        assert!((DataProvenance::Csv.confidence(true) - 0.9).abs() < f64::EPSILON);
        assert!((DataProvenance::Api.confidence(false) - 0.8).abs() < f64::EPSILON);
        assert!((DataProvenance::Sitemap.confidence(false) - 0.7).abs() < f64::EPSILON);
        assert!((DataProvenance::Csv.confidence(false) - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn build_rejects_blank_sku() {
        let err = NormalizedItem::build(
            supplier(),
            DataProvenance::Csv,
            "h".into(),
            fields("  ", "Milk"),
        )
        .unwrap_err();
        assert_eq!(err, SkipReason::MissingSku);
    }

    #[test]
    fn build_rejects_blank_name() {
        let err = NormalizedItem::build(
            supplier(),
            DataProvenance::Csv,
            "h".into(),
            fields("A1", " \n "),
        )
        .unwrap_err();
        assert_eq!(err, SkipReason::MissingName);
    }

    #[test]
    fn build_applies_basics_pack_and_availability() {
        let mut f = fields(" A1 ", "  Orange   Juice ");
        f.brand = Some(" Acme ".into());
        f.pack_size = Some("6 x 0.5 L".into());
        f.availability_text = Some("<b>Til</b> á lager".into());
        f.gtin = Some("5690000123456".into());

        let item =
            NormalizedItem::build(supplier(), DataProvenance::Api, "hash".into(), f).unwrap();

        assert_eq!(item.supplier_sku, "A1");
        assert_eq!(item.name, "Orange Juice");
        assert_eq!(item.brand.as_deref(), Some("Acme"));
        assert_eq!(item.pack_size.as_deref(), Some("6x0.5l"));
        assert_eq!(item.pack_quantity, Some(3.0));
        assert_eq!(item.pack_unit.as_deref(), Some("L"));
        assert_eq!(item.availability_text.as_deref(), Some("til á lager"));
        assert_eq!(item.availability_status, AvailabilityStatus::InStock);
        assert!((item.provenance_confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn build_drops_invalid_gtin_and_lowers_confidence() {
        let mut f = fields("A1", "Milk");
        f.gtin = Some("n/a".into());
        let item =
            NormalizedItem::build(supplier(), DataProvenance::Sitemap, "h".into(), f).unwrap();
        assert!(item.gtin.is_none());
        assert!((item.provenance_confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_item_hash_depends_on_payload_only() {
        let payload = RawPayload::Api {
            item: json!({"id": 1, "name": "Milk"}),
        };
        let a = RawItem::new(supplier(), Some("https://a".into()), payload.clone());
        let b = RawItem::new(supplier(), Some("https://b".into()), payload);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn payload_kinds_hash_differently() {
        let api = RawItem::new(
            supplier(),
            None,
            RawPayload::Api {
                item: json!({"id": 1}),
            },
        );
        let captured = RawItem::new(
            supplier(),
            None,
            RawPayload::CapturedResponse {
                url: String::new(),
                item: json!({"id": 1}),
            },
        );
        assert_ne!(api.content_hash(), captured.content_hash());
    }
}
