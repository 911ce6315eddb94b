//! Cache entry envelope.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload together with the metadata needed to expire it.
///
/// Entries are serialized whole under their cache key; read access treats
/// an entry older than its TTL as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  pub stored_at: DateTime<Utc>,
  /// Time-to-live in milliseconds from `stored_at`.
  pub ttl_ms: i64,
}

impl<T> CacheEntry<T> {
  pub fn new(data: T, ttl: Duration) -> Self {
    Self {
      data,
      stored_at: Utc::now(),
      ttl_ms: ttl.num_milliseconds(),
    }
  }

  /// Whether this entry has outlived its TTL as of `now`.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now - self.stored_at > Duration::milliseconds(self.ttl_ms)
  }

  pub fn is_expired(&self) -> bool {
    self.is_expired_at(Utc::now())
  }
}
