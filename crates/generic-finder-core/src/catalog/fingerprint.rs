//! Source identity for catalog memoization.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Fingerprint of a record source.
///
/// Object keys serialize in sorted order, so equal sources hash equally
/// regardless of how their columns were ordered.
pub fn fingerprint_records(records: &Value) -> String {
    // Serializing a `Value` cannot fail
    let bytes = serde_json::to_vec(records).unwrap_or_default();
    hash_data(&bytes)
}
