//! Durable list of order-creation requests made while offline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::storage::{keys, KeyValueStore};
use crate::types::OrderDraft;

/// Status recorded on a stored offline order. Only "pending" exists today:
/// a synced order is deleted, never updated in place.
pub const STATUS_PENDING: &str = "pending";

/// An order-creation attempt parked for later replay.
///
/// The provisional id is client-generated and locally unique. It is never
/// interpreted as a remote identifier; remote creation produces a new,
/// authoritative id and this record is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineOrder {
  pub provisional_id: String,
  pub order: OrderDraft,
  pub created_at: DateTime<Utc>,
  pub status: String,
  pub offline: bool,
}

/// Generate a provisional identifier: `offline_<epoch-millis>_<suffix>`.
/// Locally unique without coordination.
fn provisional_id(now: DateTime<Utc>) -> String {
  let suffix = Uuid::new_v4().simple().to_string();
  format!("offline_{}_{}", now.timestamp_millis(), &suffix[..8])
}

/// Durable store of offline orders, persisted whole on every mutation.
/// Shares the corruption policy of the sync queue: an unparseable blob is
/// an empty list, not a crash.
pub struct OfflineOrderStore<S: KeyValueStore> {
  storage: Arc<S>,
}

impl<S: KeyValueStore> OfflineOrderStore<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// Park an order draft for later replay. Returns the stored record with
  /// its provisional id.
  pub fn push(&self, order: OrderDraft) -> OfflineOrder {
    let now = Utc::now();
    let stored = OfflineOrder {
      provisional_id: provisional_id(now),
      order,
      created_at: now,
      status: STATUS_PENDING.to_string(),
      offline: true,
    };

    let mut orders = self.load();
    orders.push(stored.clone());
    self.save(&orders);
    stored
  }

  /// All pending offline orders, oldest first.
  pub fn list(&self) -> Vec<OfflineOrder> {
    self.load()
  }

  pub fn len(&self) -> usize {
    self.load().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Delete one order by provisional id and re-persist.
  pub fn remove(&self, provisional_id: &str) {
    let mut orders = self.load();
    orders.retain(|o| o.provisional_id != provisional_id);
    self.save(&orders);
  }

  fn load(&self) -> Vec<OfflineOrder> {
    let raw = match self.storage.get(keys::OFFLINE_ORDERS) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Vec::new(),
      Err(e) => {
        warn!(error = %e, "failed to read offline orders, treating as empty");
        return Vec::new();
      }
    };

    match serde_json::from_str(&raw) {
      Ok(orders) => orders,
      Err(e) => {
        warn!(error = %e, "corrupt offline order store, discarding pending orders");
        Vec::new()
      }
    }
  }

  fn save(&self, orders: &[OfflineOrder]) {
    let serialized = match serde_json::to_string(orders) {
      Ok(s) => s,
      Err(e) => {
        warn!(error = %e, "failed to serialize offline orders, skipping persist");
        return;
      }
    };

    if let Err(e) = self.storage.set(keys::OFFLINE_ORDERS, &serialized) {
      warn!(error = %e, "failed to persist offline orders");
    }
  }
}

impl<S: KeyValueStore> Clone for OfflineOrderStore<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;
  use crate::types::{Customer, OrderDraft};

  fn draft() -> OrderDraft {
    OrderDraft {
      customer: Customer {
        id: "c1".to_string(),
        name: "Bodega Central".to_string(),
      },
      lines: Vec::new(),
      total: 0.0,
      notes: String::new(),
      authored_by: "agent-7".to_string(),
      payment_method: None,
    }
  }

  #[test]
  fn test_push_assigns_prefixed_provisional_id() {
    let store = OfflineOrderStore::new(Arc::new(MemoryStore::new()));

    let stored = store.push(draft());
    assert!(stored.provisional_id.starts_with("offline_"));
    assert_eq!(stored.status, STATUS_PENDING);
    assert!(stored.offline);
  }

  #[test]
  fn test_provisional_ids_are_unique() {
    let store = OfflineOrderStore::new(Arc::new(MemoryStore::new()));

    let a = store.push(draft());
    let b = store.push(draft());
    assert_ne!(a.provisional_id, b.provisional_id);
  }

  #[test]
  fn test_list_preserves_insertion_order() {
    let store = OfflineOrderStore::new(Arc::new(MemoryStore::new()));

    let first = store.push(draft());
    let second = store.push(draft());

    let ids: Vec<String> = store.list().into_iter().map(|o| o.provisional_id).collect();
    assert_eq!(ids, vec![first.provisional_id, second.provisional_id]);
  }

  #[test]
  fn test_remove_deletes_only_the_matching_order() {
    let store = OfflineOrderStore::new(Arc::new(MemoryStore::new()));

    let first = store.push(draft());
    let second = store.push(draft());

    store.remove(&first.provisional_id);

    let remaining = store.list();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].provisional_id, second.provisional_id);
  }

  #[test]
  fn test_corrupt_store_is_empty_not_fatal() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(keys::OFFLINE_ORDERS, "{broken").unwrap();

    let store = OfflineOrderStore::new(storage);
    assert!(store.is_empty());
  }
}
