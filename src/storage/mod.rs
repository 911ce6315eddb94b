//! Persistence port and backends.
//!
//! Every durable piece of the core (cache entries, sync queue, offline
//! orders, cart state) goes through the [`KeyValueStore`] port, so each
//! component depends on an interface rather than a concrete medium and
//! tests can substitute an in-memory store. Values are whole-object
//! serialized strings; writes always overwrite, never patch.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use color_eyre::Result;

/// Fixed, namespaced keys for persisted state. Keeping everything under
/// one prefix keeps unrelated persisted data from colliding.
pub mod keys {
  /// Namespace prefix for all persisted values.
  pub const NAMESPACE: &str = "fieldsync";

  /// The persisted cart state.
  pub const CART: &str = "fieldsync:cart";

  /// The generic pending-mutation queue.
  pub const SYNC_QUEUE: &str = "fieldsync:sync_queue";

  /// Order-creation requests made while offline.
  pub const OFFLINE_ORDERS: &str = "fieldsync:offline_orders";

  /// Prefix for cache entries; the caller-supplied key is appended.
  pub const CACHE_PREFIX: &str = "fieldsync:cache:";
}

/// Storage port for persisted state.
///
/// Implementations must be safe to share across tasks; the core itself is
/// single-writer, so no optimistic-concurrency discipline is required
/// beyond that.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, overwriting any existing value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Delete the value stored under `key`. Deleting a missing key is not
  /// an error.
  fn remove(&self, key: &str) -> Result<()>;

  /// List all keys starting with `prefix`, in unspecified order.
  fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
