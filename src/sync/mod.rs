//! Durable pending-work queues, the reconciler, and sync notifications.

mod orders;
mod queue;
mod reconciler;

pub use orders::{OfflineOrder, OfflineOrderStore};
pub use queue::{SyncQueue, SyncQueueItem};
pub use reconciler::{QueueProcessor, Reconciler, SyncReport};

use tokio::sync::mpsc;

/// Notifications emitted while reconciling pending work.
///
/// These are the user-visible side of reconciliation: transient, never
/// fatal. UI collaborators render them as toasts/badges.
#[derive(Debug, Clone)]
pub enum SyncEvent {
  /// A reconciliation pass began with this many pending entries.
  SyncStarted { pending: usize },
  /// An offline order was created remotely; the provisional id is now
  /// retired in favor of the authoritative one.
  OrderSynced {
    provisional_id: String,
    order_id: String,
  },
  /// An offline order failed to replay; it stays queued for the next pass.
  OrderSyncFailed {
    provisional_id: String,
    error: String,
  },
  /// A generic queued mutation was replayed.
  ItemSynced { id: String },
  /// A generic queued mutation failed; it stays queued.
  ItemSyncFailed { id: String, error: String },
  /// The pass finished and the reconciler is idle again.
  SyncFinished { synced: usize, failed: usize },
}

/// Receiving side of the sync notification stream.
pub struct SyncEvents {
  rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncEvents {
  /// Receive the next event.
  pub async fn next(&mut self) -> Option<SyncEvent> {
    self.rx.recv().await
  }

  /// Non-blocking poll for an event, for callers on a render tick.
  pub fn try_next(&mut self) -> Option<SyncEvent> {
    self.rx.try_recv().ok()
  }
}

/// Create the notification channel; the sender goes to the reconciler,
/// the receiver to whoever surfaces notifications.
pub fn event_channel() -> (mpsc::UnboundedSender<SyncEvent>, SyncEvents) {
  let (tx, rx) = mpsc::unbounded_channel();
  (tx, SyncEvents { rx })
}
