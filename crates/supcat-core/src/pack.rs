//! Pack descriptor parsing ("6x0.5L", "250g", "12 stk").

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static PACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)\s*[xX×*]\s*)?(\d+(?:[.,]\d+)?)\s*([a-zA-Z]+)$")
        .expect("valid pack regex")
});

/// Total quantity of a pack expressed in a base unit (`L`, `kg` or `each`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackQuantity {
    pub quantity: f64,
    pub unit: String,
}

impl PackQuantity {
    fn each() -> Self {
        Self {
            quantity: 1.0,
            unit: "each".to_string(),
        }
    }
}

/// Parse a free-text pack descriptor into a total quantity and base unit.
///
/// Volumes convert to litres and weights to kilograms, multiplied by an
/// optional `N x` count prefix. Anything unparseable is one `each`.
#[must_use]
pub fn parse_pack(descriptor: &str) -> PackQuantity {
    let trimmed = descriptor.trim();
    let Some(caps) = PACK_PATTERN.captures(trimmed) else {
        return PackQuantity::each();
    };

    let count = match caps.get(1) {
        Some(m) => match m.as_str().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return PackQuantity::each(),
        },
        None => 1.0,
    };
    let Some(amount) = caps
        .get(2)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
    else {
        return PackQuantity::each();
    };
    let unit = caps
        .get(3)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let (divisor, base_unit) = match unit.as_str() {
        "l" | "lt" | "ltr" | "liter" | "litre" | "liters" | "litres" => (1.0, "L"),
        "dl" => (10.0, "L"),
        "cl" => (100.0, "L"),
        "ml" => (1000.0, "L"),
        "kg" | "kilo" => (1.0, "kg"),
        "g" | "gr" => (1000.0, "kg"),
        "stk" | "pcs" | "pc" | "ea" | "each" => (1.0, "each"),
        _ => return PackQuantity::each(),
    };

    let quantity = round6(count * amount / divisor);
    if quantity <= 0.0 {
        return PackQuantity::each();
    }

    PackQuantity {
        quantity,
        unit: base_unit.to_string(),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
