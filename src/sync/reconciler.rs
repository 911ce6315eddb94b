//! Reconciliation: replaying pending work against the remote collaborator.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::remote::OrderApi;
use crate::storage::KeyValueStore;

use super::orders::OfflineOrderStore;
use super::queue::{SyncQueue, SyncQueueItem};
use super::SyncEvent;

/// Handler for replaying generic sync-queue items. The host application
/// supplies one when it records deferred mutations beyond order creation.
#[async_trait]
pub trait QueueProcessor: Send + Sync {
  async fn process(&self, item: &SyncQueueItem) -> Result<(), RemoteError>;
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  /// False when the pass was skipped because one was already running.
  pub ran: bool,
  pub synced: usize,
  pub failed: usize,
}

/// Drains pending offline work when connectivity is confirmed.
///
/// Two states: idle and syncing, guarded by an atomic flag so two triggers
/// (a reconnect event racing a periodic check) can never run concurrent
/// passes. Within a pass items are processed strictly in insertion order,
/// and one item's failure never aborts the remainder.
pub struct Reconciler<S: KeyValueStore> {
  orders: OfflineOrderStore<S>,
  queue: SyncQueue<S>,
  api: Arc<dyn OrderApi>,
  processor: Option<Arc<dyn QueueProcessor>>,
  is_syncing: Arc<AtomicBool>,
  events: mpsc::UnboundedSender<SyncEvent>,
}

impl<S: KeyValueStore> Reconciler<S> {
  pub fn new(
    orders: OfflineOrderStore<S>,
    queue: SyncQueue<S>,
    api: Arc<dyn OrderApi>,
    events: mpsc::UnboundedSender<SyncEvent>,
  ) -> Self {
    Self {
      orders,
      queue,
      api,
      processor: None,
      is_syncing: Arc::new(AtomicBool::new(false)),
      events,
    }
  }

  /// Install a handler for generic sync-queue items.
  pub fn with_processor(mut self, processor: Arc<dyn QueueProcessor>) -> Self {
    self.processor = Some(processor);
    self
  }

  /// Pending entries across the offline order store and the sync queue.
  pub fn pending_count(&self) -> usize {
    self.orders.len() + self.queue.len()
  }

  pub fn is_syncing(&self) -> bool {
    self.is_syncing.load(Ordering::SeqCst)
  }

  /// Run one reconciliation pass.
  ///
  /// If a pass is already running this returns immediately with
  /// `ran: false`; the guard is what prevents duplicate submission of the
  /// same offline order. The pass always ends idle, however many items
  /// failed; failures stay queued for the next trigger.
  pub async fn sync_all(&self) -> SyncReport {
    if self
      .is_syncing
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      debug!("reconciliation already in progress, skipping trigger");
      return SyncReport::default();
    }
    let _guard = SyncingGuard {
      flag: Arc::clone(&self.is_syncing),
    };

    let orders = self.orders.list();
    let queued = if self.processor.is_some() {
      self.queue.list()
    } else {
      Vec::new()
    };

    let mut report = SyncReport {
      ran: true,
      ..SyncReport::default()
    };

    if orders.is_empty() && queued.is_empty() {
      return report;
    }

    self.emit(SyncEvent::SyncStarted {
      pending: orders.len() + queued.len(),
    });

    for offline in orders {
      match self.api.create_order(&offline.order).await {
        Ok(created) => {
          self.orders.remove(&offline.provisional_id);
          info!(
            provisional_id = %offline.provisional_id,
            order_id = %created.id,
            "offline order created remotely"
          );
          self.emit(SyncEvent::OrderSynced {
            provisional_id: offline.provisional_id,
            order_id: created.id,
          });
          report.synced += 1;
        }
        Err(e) => {
          warn!(
            provisional_id = %offline.provisional_id,
            error = %e,
            "offline order replay failed, leaving queued"
          );
          self.emit(SyncEvent::OrderSyncFailed {
            provisional_id: offline.provisional_id,
            error: e.to_string(),
          });
          report.failed += 1;
        }
      }
    }

    if let Some(processor) = &self.processor {
      for item in queued {
        match processor.process(&item).await {
          Ok(()) => {
            self.queue.remove(&item.id);
            self.emit(SyncEvent::ItemSynced { id: item.id });
            report.synced += 1;
          }
          Err(e) => {
            warn!(id = %item.id, error = %e, "queued mutation replay failed, leaving queued");
            self.emit(SyncEvent::ItemSyncFailed {
              id: item.id,
              error: e.to_string(),
            });
            report.failed += 1;
          }
        }
      }
    }

    self.emit(SyncEvent::SyncFinished {
      synced: report.synced,
      failed: report.failed,
    });

    report
  }

  fn emit(&self, event: SyncEvent) {
    // Nobody listening is fine; notifications are best-effort.
    let _ = self.events.send(event);
  }
}

impl<S: KeyValueStore> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      orders: self.orders.clone(),
      queue: self.queue.clone(),
      api: Arc::clone(&self.api),
      processor: self.processor.clone(),
      is_syncing: Arc::clone(&self.is_syncing),
      events: self.events.clone(),
    }
  }
}

/// Clears the syncing flag when the pass ends, however it ends.
struct SyncingGuard {
  flag: Arc<AtomicBool>,
}

impl Drop for SyncingGuard {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::SeqCst);
  }
}
