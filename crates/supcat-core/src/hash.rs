//! Content hashing for raw payloads.
//!
//! The hash is the idempotency key of the raw staging store, so it must be
//! identical for payloads that differ only in object key order.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` to compact JSON with object keys sorted at every depth.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// SHA-256 of the canonical JSON form of `value`, as lowercase hex.
#[must_use]
pub fn content_hash(value: &Value) -> String {
    let canonical = canonical_json(value);
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(child, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(child, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"d": [3, {"z": true, "y": null}], "c": "x"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"x","d":[3,{"y":null,"z":true}]},"b":1}"#
        );
    }

    #[test]
    fn content_hash_ignores_key_order() {
        let first: Value = serde_json::from_str(r#"{"sku":"A1","name":"Milk","price":2.5}"#)
            .expect("valid json");
        let second: Value = serde_json::from_str(r#"{"price":2.5,"name":"Milk","sku":"A1"}"#)
            .expect("valid json");
        assert_eq!(content_hash(&first), content_hash(&second));
    }

    #[test]
    fn content_hash_is_stable_across_calls() {
        let value = json!({"sku": "A1", "tags": ["x", "y"]});
        assert_eq!(content_hash(&value), content_hash(&value));
    }

    #[test]
    fn content_hash_is_lowercase_hex_of_at_least_160_bits() {
        let hash = content_hash(&json!({"sku": "A1"}));
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn content_hash_distinguishes_array_order() {
        let first = json!({"tags": ["x", "y"]});
        let second = json!({"tags": ["y", "x"]});
        assert_ne!(content_hash(&first), content_hash(&second));
    }

    #[test]
    fn content_hash_escapes_keys() {
        let value = json!({"a\"b": 1});
        assert_eq!(canonical_json(&value), r#"{"a\"b":1}"#);
    }
}
