//! Field cleanup shared by every source adapter.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKUP_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

/// Phrases are matched against cleaned text. Out-of-stock phrases are checked
/// first because several of them contain an in-stock phrase ("ekki til á lager").
const OUT_OF_STOCK_PHRASES: &[&str] = &[
    "ekki til á lager",
    "ekki á lager",
    "ekki til",
    "uppselt",
    "out of stock",
    "not in stock",
    "sold out",
    "not available",
    "unavailable",
    "ikke på lager",
    "udsolgt",
    "utsolgt",
    "slutsåld",
];

const LOW_STOCK_PHRASES: &[&str] = &[
    "fá eintök",
    "fá stykki",
    "lítið til",
    "lítið magn",
    "low stock",
    "few left",
    "limited stock",
    "only a few",
    "få på lager",
];

const IN_STOCK_PHRASES: &[&str] = &[
    "til á lager",
    "á lager",
    "in stock",
    "available",
    "på lager",
    "i lager",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    InStock,
    LowStock,
    OutOfStock,
    Unknown,
}

impl AvailabilityStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "IN_STOCK",
            AvailabilityStatus::LowStock => "LOW_STOCK",
            AvailabilityStatus::OutOfStock => "OUT_OF_STOCK",
            AvailabilityStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AvailabilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_STOCK" => Ok(AvailabilityStatus::InStock),
            "LOW_STOCK" => Ok(AvailabilityStatus::LowStock),
            "OUT_OF_STOCK" => Ok(AvailabilityStatus::OutOfStock),
            "UNKNOWN" => Ok(AvailabilityStatus::Unknown),
            other => Err(format!("unknown availability status '{other}'")),
        }
    }
}

/// The three identity fields every adapter normalizes the same way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicFields {
    pub name: String,
    pub brand: Option<String>,
    pub pack_size: Option<String>,
}

/// Collapse every whitespace run to a single space and trim both ends.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize name, brand, and pack size.
///
/// - `name`: whitespace runs collapsed, trimmed.
/// - `brand`: trimmed only; case is preserved. Blank becomes `None`.
/// - `pack_size`: lower-cased with all whitespace removed. Blank becomes `None`.
#[must_use]
pub fn normalize_basics(fields: BasicFields) -> BasicFields {
    let name = collapse_whitespace(&fields.name);
    let brand = fields
        .brand
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());
    let pack_size = fields
        .pack_size
        .map(|p| {
            p.chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|p| !p.is_empty());

    BasicFields {
        name,
        brand,
        pack_size,
    }
}

/// Strip `<...>` spans, lower-case, and collapse whitespace.
#[must_use]
pub fn clean_availability_text(raw: &str) -> String {
    let stripped = MARKUP_SPAN.replace_all(raw, " ");
    collapse_whitespace(&stripped.to_lowercase())
}

/// Classify text already passed through [`clean_availability_text`].
///
/// Anything not recognized, including empty input and text that was never
/// cleaned, is [`AvailabilityStatus::Unknown`].
#[must_use]
pub fn classify_availability(cleaned: &str) -> AvailabilityStatus {
    if cleaned.is_empty() {
        return AvailabilityStatus::Unknown;
    }
    if OUT_OF_STOCK_PHRASES.iter().any(|p| cleaned.contains(p)) {
        return AvailabilityStatus::OutOfStock;
    }
    if LOW_STOCK_PHRASES.iter().any(|p| cleaned.contains(p)) {
        return AvailabilityStatus::LowStock;
    }
    if IN_STOCK_PHRASES.iter().any(|p| cleaned.contains(p)) {
        return AvailabilityStatus::InStock;
    }
    AvailabilityStatus::Unknown
}

/// Reduce a GTIN candidate to its digits.
///
/// Spaces and hyphens are dropped. Anything that is not 8, 12, 13 or 14
/// digits afterwards is rejected.
#[must_use]
pub fn clean_gtin(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if !compact.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match compact.len() {
        8 | 12 | 13 | 14 => Some(compact),
        _ => None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
