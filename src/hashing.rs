//! Hashing System - SHA-256 fingerprints of rendered surfaces
//!
//! Two surfaces with the same observable state hash the same, wherever they
//! sit in the document.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::dom::NodeSnapshot;
use crate::populate::FieldRecord;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Fingerprint of a surface's observable state.
pub fn surface_fingerprint(snapshot: &NodeSnapshot) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(snapshot)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Fingerprint of the record a render started from, for print provenance.
pub fn record_hash(record: &FieldRecord) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(record)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
