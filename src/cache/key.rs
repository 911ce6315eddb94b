//! Stable cache key derivation.

use sha2::{Digest, Sha256};

/// Hash an arbitrary query descriptor into a stable, fixed-length cache
/// key suffix.
///
/// Remote reads are keyed by free-form descriptors ("products:warehouse=7",
/// a filter expression, etc.); hashing keeps the persisted key bounded and
/// free of characters the storage medium might care about.
pub fn query_hash(description: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(description.trim().to_lowercase().as_bytes());
  let result = hasher.finalize();
  hex::encode(result)
}
