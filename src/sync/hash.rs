//! Content hashing for sync operations.
//!
//! Every manifest entry carries a SHA256 digest of its payload so that two
//! sides can be compared without transferring content. Template files hash
//! their raw bytes; configuration values hash their canonical encoding.

use sha2::{Digest, Sha256};

use crate::sync::value::SettingValue;

/// Compute the lowercase hex SHA256 digest of raw bytes.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the digest of a configuration value.
///
/// The value is encoded with [`SettingValue::canonical_bytes`] first, so the
/// digest depends only on the type and content of the value.
///
/// # Example
///
/// ```ignore
/// let hash = value_hash(&SettingValue::Int(5));
/// // hash is something like "a1b2c3d4..."
/// ```
#[must_use]
pub fn value_hash(value: &SettingValue) -> String {
    hash_bytes(&value.canonical_bytes())
}

/// Check if an item has changed relative to a recorded hash.
///
/// Returns `true` if there is no recorded hash or it differs.
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != current_hash)
}
