//! Durable, ordered queue of pending generic mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::storage::{keys, KeyValueStore};

/// One unit of deferred work recorded while offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueItem {
  pub id: String,
  pub payload: serde_json::Value,
  pub timestamp: DateTime<Utc>,
}

impl SyncQueueItem {
  pub fn new(payload: serde_json::Value) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      payload,
      timestamp: Utc::now(),
    }
  }
}

/// FIFO queue persisted whole on every mutation.
///
/// The persisted representation is read-modify-written as a full list; no
/// partial writes. An unparseable persisted queue is treated as empty
/// rather than fatal: pending work is lost but the app stays usable. This
/// is a deliberate availability-over-durability tradeoff.
pub struct SyncQueue<S: KeyValueStore> {
  storage: Arc<S>,
}

impl<S: KeyValueStore> SyncQueue<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// Append an item and re-persist the whole queue.
  pub fn enqueue(&self, item: SyncQueueItem) {
    let mut items = self.load();
    items.push(item);
    self.save(&items);
  }

  /// The full pending set, oldest first.
  pub fn list(&self) -> Vec<SyncQueueItem> {
    self.load()
  }

  pub fn len(&self) -> usize {
    self.load().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Delete one entry by id and re-persist.
  pub fn remove(&self, id: &str) {
    let mut items = self.load();
    items.retain(|i| i.id != id);
    self.save(&items);
  }

  fn load(&self) -> Vec<SyncQueueItem> {
    let raw = match self.storage.get(keys::SYNC_QUEUE) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Vec::new(),
      Err(e) => {
        warn!(error = %e, "failed to read sync queue, treating as empty");
        return Vec::new();
      }
    };

    match serde_json::from_str(&raw) {
      Ok(items) => items,
      Err(e) => {
        warn!(error = %e, "corrupt sync queue, discarding pending work");
        Vec::new()
      }
    }
  }

  fn save(&self, items: &[SyncQueueItem]) {
    let serialized = match serde_json::to_string(items) {
      Ok(s) => s,
      Err(e) => {
        warn!(error = %e, "failed to serialize sync queue, skipping persist");
        return;
      }
    };

    if let Err(e) = self.storage.set(keys::SYNC_QUEUE, &serialized) {
      warn!(error = %e, "failed to persist sync queue");
    }
  }
}

impl<S: KeyValueStore> Clone for SyncQueue<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
