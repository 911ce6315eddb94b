//! Connectivity monitor: environment signal intake and sync triggering.
//!
//! The monitor never polls the network itself. It reacts to
//! environment-delivered transition signals (`set_online`/`set_offline`),
//! plus a low-frequency periodic tick that recomputes pending work as a
//! safety net against missed events. It is an explicitly constructed,
//! owned object with a start/stop lifecycle rather than an ambient
//! global, so tests don't share hidden state.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;
use crate::sync::Reconciler;

#[derive(Debug, Clone, Default)]
struct ConnectivityState {
  is_online: bool,
  last_online: Option<DateTime<Utc>>,
  offline_since: Option<DateTime<Utc>>,
}

/// Observes online/offline transitions and timestamps them.
pub struct ConnectivityMonitor {
  state: Arc<Mutex<ConnectivityState>>,
  signal_tx: mpsc::UnboundedSender<bool>,
  signal_rx: Option<mpsc::UnboundedReceiver<bool>>,
  debounce: Duration,
  poll_interval: Duration,
  task: Option<JoinHandle<()>>,
}

impl ConnectivityMonitor {
  /// `debounce` delays the sync trigger after a reconnect signal;
  /// `poll_interval` paces the safety-net pending-work check.
  pub fn new(debounce: Duration, poll_interval: Duration) -> Self {
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    Self {
      // Online until the environment says otherwise.
      state: Arc::new(Mutex::new(ConnectivityState {
        is_online: true,
        last_online: None,
        offline_since: None,
      })),
      signal_tx,
      signal_rx: Some(signal_rx),
      debounce,
      poll_interval,
      task: None,
    }
  }

  /// Environment signal: the network became reachable.
  pub fn set_online(&self) {
    {
      let mut state = self.lock_state();
      state.is_online = true;
      state.last_online = Some(Utc::now());
      state.offline_since = None;
    }
    // The started task picks this up, debounces, and triggers a sync.
    let _ = self.signal_tx.send(true);
  }

  /// Environment signal: the network became unreachable.
  pub fn set_offline(&self) {
    let mut state = self.lock_state();
    state.is_online = false;
    state.offline_since = Some(Utc::now());
  }

  pub fn is_online(&self) -> bool {
    self.lock_state().is_online
  }

  pub fn last_online(&self) -> Option<DateTime<Utc>> {
    self.lock_state().last_online
  }

  pub fn offline_since(&self) -> Option<DateTime<Utc>> {
    self.lock_state().offline_since
  }

  /// Start reacting to signals: on reconnect, wait out the debounce and
  /// run a reconciliation pass if there is pending work; on each periodic
  /// tick, do the same while online.
  pub fn start<S: KeyValueStore + 'static>(&mut self, reconciler: Reconciler<S>) {
    let Some(mut signal_rx) = self.signal_rx.take() else {
      warn!("connectivity monitor already started");
      return;
    };

    let state = Arc::clone(&self.state);
    let debounce = self.debounce;
    let poll_interval = self.poll_interval;

    self.task = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(poll_interval);
      // Skip the immediate tick; the first check happens one interval in.
      ticker.tick().await;

      loop {
        tokio::select! {
          signal = signal_rx.recv() => {
            match signal {
              Some(true) => {
                tokio::time::sleep(debounce).await;
                // Collapse any reconnect signals that piled up during the
                // debounce window into this one pass.
                while signal_rx.try_recv().is_ok() {}
                if reconciler.pending_count() > 0 {
                  debug!("reconnect confirmed, draining pending work");
                  reconciler.sync_all().await;
                }
              }
              Some(false) => {}
              None => break,
            }
          }
          _ = ticker.tick() => {
            let online = {
              let state = state.lock().unwrap_or_else(PoisonError::into_inner);
              state.is_online
            };
            if online && reconciler.pending_count() > 0 {
              debug!("periodic check found pending work, draining");
              reconciler.sync_all().await;
            }
          }
        }
      }
    }));
  }

  /// Stop the background task. Safe to call when never started.
  pub fn stop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }

  fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnectivityState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Drop for ConnectivityMonitor {
  fn drop(&mut self) {
    self.stop();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transitions_update_timestamps() {
    let monitor = ConnectivityMonitor::new(Duration::from_millis(1), Duration::from_secs(60));
    assert!(monitor.is_online());
    assert!(monitor.offline_since().is_none());

    monitor.set_offline();
    assert!(!monitor.is_online());
    assert!(monitor.offline_since().is_some());

    monitor.set_online();
    assert!(monitor.is_online());
    assert!(monitor.offline_since().is_none());
    assert!(monitor.last_online().is_some());
  }

  #[test]
  fn test_reconnect_clears_offline_since() {
    let monitor = ConnectivityMonitor::new(Duration::from_millis(1), Duration::from_secs(60));

    monitor.set_offline();
    let offline_at = monitor.offline_since();
    assert!(offline_at.is_some());

    monitor.set_online();
    assert_eq!(monitor.offline_since(), None);
  }

  mod with_reconciler {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::OrderApi;
    use crate::storage::MemoryStore;
    use crate::sync::{event_channel, OfflineOrderStore, Reconciler, SyncQueue};
    use crate::types::{Customer, Order, OrderDraft};
    use async_trait::async_trait;

    struct AlwaysUpApi;

    #[async_trait]
    impl OrderApi for AlwaysUpApi {
      async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RemoteError> {
        Ok(Order {
          id: "srv-1".to_string(),
          customer_id: draft.customer.id.clone(),
          total: draft.total,
          created_at: "2024-01-01T00:00:00Z".to_string(),
        })
      }

      async fn fetch(&self, _path: &str) -> Result<serde_json::Value, RemoteError> {
        Ok(serde_json::Value::Null)
      }
    }

    fn draft() -> OrderDraft {
      OrderDraft {
        customer: Customer {
          id: "c1".to_string(),
          name: "Customer".to_string(),
        },
        lines: Vec::new(),
        total: 10.0,
        notes: String::new(),
        authored_by: "agent-7".to_string(),
        payment_method: None,
      }
    }

    #[tokio::test]
    async fn test_reconnect_signal_triggers_debounced_drain() {
      let storage = Arc::new(MemoryStore::new());
      let orders = OfflineOrderStore::new(Arc::clone(&storage));
      let (tx, _events) = event_channel();
      let reconciler = Reconciler::new(
        orders.clone(),
        SyncQueue::new(storage),
        Arc::new(AlwaysUpApi),
        tx,
      );

      orders.push(draft());

      let mut monitor =
        ConnectivityMonitor::new(Duration::from_millis(10), Duration::from_secs(3600));
      monitor.start(reconciler);
      monitor.set_offline();
      monitor.set_online();

      tokio::time::sleep(Duration::from_millis(80)).await;
      assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_periodic_tick_drains_pending_work_while_online() {
      let storage = Arc::new(MemoryStore::new());
      let orders = OfflineOrderStore::new(Arc::clone(&storage));
      let (tx, _events) = event_channel();
      let reconciler = Reconciler::new(
        orders.clone(),
        SyncQueue::new(storage),
        Arc::new(AlwaysUpApi),
        tx,
      );

      // Pending work exists but no reconnect signal ever arrives; only the
      // safety-net tick can find it.
      orders.push(draft());

      let mut monitor =
        ConnectivityMonitor::new(Duration::from_millis(1), Duration::from_millis(30));
      monitor.start(reconciler);

      tokio::time::sleep(Duration::from_millis(120)).await;
      assert!(orders.is_empty());
    }
  }
}
