//! Request fingerprinting
//!
//! Fingerprints must be identical for semantically identical requests issued
//! by different callers, so JSON objects are rendered with sorted keys before
//! hashing.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a string.
pub fn hash_str(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

/// SHA-256 hex digest of raw bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint a JSON value: canonical rendering, then hash.
pub fn fingerprint(value: &serde_json::Value) -> String {
    hash_str(&canonical_json(value))
}

/// Render a JSON value with object keys sorted, so the result is independent
/// of map iteration order.
pub fn canonical_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;

    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // Scalars already have a single rendering.
            out.push_str(&value.to_string());
        }
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let mut keys: Vec<_> = obj.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = obj.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_sorts_keys() {
        let a = json!({"b": 2, "a": 1});
        assert_eq!(canonical_json(&a), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_fingerprint_order_independent() {
        let a = json!({"endpoint": "athlete", "params": {"x": 1, "y": [1, 2]}});
        let b = json!({"params": {"y": [1, 2], "x": 1}, "endpoint": "athlete"});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let v = json!({"endpoint": "activities/111", "params": {"include_all_efforts": true}});
        assert_eq!(fingerprint(&v), fingerprint(&v));
    }

    #[test]
    fn test_fingerprint_distinguishes_values() {
        let a = json!({"endpoint": "activities/111"});
        let b = json!({"endpoint": "activities/222"});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_array_order_significant() {
        let a = json!({"k": [1, 2]});
        let b = json!({"k": [2, 1]});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
