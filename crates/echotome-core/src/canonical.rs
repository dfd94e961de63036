// SPDX-FileCopyrightText: © 2026 Echotome Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Canonical JSON serialization.
//!
//! Certificate and stego-payload bytes must be byte-for-byte reproducible
//! so that signatures verify and `roc_hash` is stable. We get this by
//! serializing through [`serde_json::Value`] and recursively sorting
//! object keys before re-emitting with no insignificant whitespace,
//! rather than depending on a third-party canonical-JSON crate or on
//! `serde_json`'s (order-preserving, not order-sorting) `preserve_order`
//! feature.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Serializes `value` to canonical JSON bytes: sorted object keys,
/// declared array order, no whitespace.
///
/// # Errors
///
/// Returns a `serde_json::Error` if `value` cannot be serialized.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let raw = serde_json::to_value(value)?;
    let sorted = sort_keys(raw);
    serde_json::to_vec(&sorted)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        },
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Base64url-without-padding encoding, used for every byte field embedded
/// in canonical JSON documents.
pub mod b64url {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `bytes` as base64url-without-padding.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Deserializes a base64url-without-padding string into owned bytes.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string is not valid base64url.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"z": 1, "y": 2}, "c": [3, 2, 1]});
        let bytes = to_canonical_bytes(&value).expect("serializes");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text, r#"{"a":{"y":2,"z":1},"b":1,"c":[3,2,1]}"#);
    }

    #[test]
    fn canonical_serialization_is_a_fixed_point() {
        let value = json!({"z": [1, 2, 3], "a": "hello"});
        let first = to_canonical_bytes(&value).expect("serializes");
        let reparsed: Value = serde_json::from_slice(&first).expect("parses");
        let second = to_canonical_bytes(&reparsed).expect("serializes");
        assert_eq!(first, second);
    }
}
