//! Content-addressed identity for persisted view states.

use serde::Serialize;
use serde_json::Value;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// JSON text with object keys sorted at every depth; array order is kept.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// 32-bit FNV-1a over UTF-16 code units, rendered in base 36.
pub fn fnv1a_base36(input: &str) -> String {
    let hash = input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    });
    to_base36(hash)
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Dedup key for anything serializable. Serialization failures collapse to
/// the hash of `null`, which only happens for non-JSON-compatible types.
pub fn dedup_key<T: Serialize>(state: &T) -> String {
    let value = serde_json::to_value(state).unwrap_or(Value::Null);
    fnv1a_base36(&canonical_json(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_keys_but_not_arrays() {
        let value = json!({ "b": [3, 1, 2], "a": { "z": true, "y": null } });
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"y":null,"z":true},"b":[3,1,2]}"#
        );
    }

    #[test]
    fn hash_matches_reference_vectors() {
        // FNV-1a 32 of "" is the offset basis; of "a" is 0xe40c292c.
        assert_eq!(fnv1a_base36(""), to_base36(2_166_136_261));
        assert_eq!(fnv1a_base36("a"), to_base36(0xe40c_292c));
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn key_is_stable_under_key_order_and_sensitive_to_values() {
        let a = json!({ "x": 1, "y": ["p", "q"] });
        let b = json!({ "y": ["p", "q"], "x": 1 });
        let c = json!({ "y": ["q", "p"], "x": 1 });
        assert_eq!(dedup_key(&a), dedup_key(&b));
        assert_ne!(dedup_key(&a), dedup_key(&c));
    }
}
