//! Offline service facade: the surface UI collaborators talk to.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cart::{CartAction, CartState, CartStore};
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SubmitError, ValidationError};
use crate::remote::OrderApi;
use crate::storage::KeyValueStore;
use crate::sync::{
  event_channel, OfflineOrderStore, QueueProcessor, Reconciler, SyncEvents, SyncQueue,
  SyncQueueItem, SyncReport,
};
use crate::types::{Order, OrderDraft, OrderLine, PaymentMethod};

/// Outcome of a cart submission.
#[derive(Debug)]
pub enum Submission {
  /// The remote side acknowledged the order.
  Created(Order),
  /// The remote side was unreachable; the order is parked for replay
  /// under a provisional id.
  Queued { provisional_id: String },
}

/// Composes the connectivity monitor, the durable stores, and the
/// reconciler behind one owned object with a start/stop lifecycle.
pub struct OfflineService<S: KeyValueStore> {
  monitor: ConnectivityMonitor,
  orders: OfflineOrderStore<S>,
  queue: SyncQueue<S>,
  reconciler: Reconciler<S>,
  api: Arc<dyn OrderApi>,
}

impl<S: KeyValueStore + 'static> OfflineService<S> {
  /// Build the service. The returned [`SyncEvents`] stream carries
  /// reconciliation notifications for the UI.
  pub fn new(
    storage: Arc<S>,
    api: Arc<dyn OrderApi>,
    config: &SyncConfig,
  ) -> (Self, SyncEvents) {
    Self::with_processor(storage, api, config, None)
  }

  /// Like [`OfflineService::new`], with a handler for generic sync-queue
  /// items.
  pub fn with_processor(
    storage: Arc<S>,
    api: Arc<dyn OrderApi>,
    config: &SyncConfig,
    processor: Option<Arc<dyn QueueProcessor>>,
  ) -> (Self, SyncEvents) {
    let orders = OfflineOrderStore::new(Arc::clone(&storage));
    let queue = SyncQueue::new(storage);
    let (events_tx, events) = event_channel();

    let mut reconciler = Reconciler::new(
      orders.clone(),
      queue.clone(),
      Arc::clone(&api),
      events_tx,
    );
    if let Some(processor) = processor {
      reconciler = reconciler.with_processor(processor);
    }

    let monitor = ConnectivityMonitor::new(
      Duration::from_millis(config.debounce_ms),
      Duration::from_secs(config.poll_interval_secs),
    );

    (
      Self {
        monitor,
        orders,
        queue,
        reconciler,
        api,
      },
      events,
    )
  }

  /// Start reacting to connectivity signals.
  pub fn start(&mut self) {
    self.monitor.start(self.reconciler.clone());
  }

  /// Stop the background task; pending work stays persisted.
  pub fn stop(&mut self) {
    self.monitor.stop();
  }

  // --- Environment signals -------------------------------------------------

  pub fn set_online(&self) {
    self.monitor.set_online();
  }

  pub fn set_offline(&self) {
    self.monitor.set_offline();
  }

  // --- Status surface ------------------------------------------------------

  pub fn is_online(&self) -> bool {
    self.monitor.is_online()
  }

  pub fn has_offline_data(&self) -> bool {
    self.pending_sync_count() > 0
  }

  pub fn pending_sync_count(&self) -> usize {
    self.reconciler.pending_count()
  }

  /// Explicit manual sync trigger.
  pub async fn sync_data(&self) -> SyncReport {
    self.reconciler.sync_all().await
  }

  /// Record a generic deferred mutation for later replay.
  pub fn queue_mutation(&self, payload: serde_json::Value) -> SyncQueueItem {
    let item = SyncQueueItem::new(payload);
    self.queue.enqueue(item.clone());
    item
  }

  // --- Submission ----------------------------------------------------------

  /// Submit the cart as an order.
  ///
  /// Validation runs before any network or queue interaction. Online, the
  /// remote create is attempted first; a transport failure parks the draft
  /// in the offline store instead. Offline, the draft is parked directly.
  /// The cart clears once the order is accepted either way.
  pub async fn submit_order(
    &self,
    cart: &mut CartStore<S>,
    authored_by: &str,
    payment_method: Option<PaymentMethod>,
  ) -> Result<Submission, SubmitError> {
    let draft = build_draft(cart.state(), authored_by, payment_method)?;

    if self.monitor.is_online() {
      match self.api.create_order(&draft).await {
        Ok(order) => {
          info!(order_id = %order.id, "order created remotely");
          cart.dispatch(CartAction::Clear);
          return Ok(Submission::Created(order));
        }
        Err(e) if e.is_transport() => {
          info!(error = %e, "remote unreachable, parking order for replay");
        }
        Err(e) => return Err(SubmitError::Remote(e)),
      }
    }

    let stored = self.orders.push(draft);
    cart.dispatch(CartAction::Clear);
    Ok(Submission::Queued {
      provisional_id: stored.provisional_id,
    })
  }
}

/// Validate the cart and turn it into a remote-ready draft.
fn build_draft(
  state: &CartState,
  authored_by: &str,
  payment_method: Option<PaymentMethod>,
) -> Result<OrderDraft, ValidationError> {
  let customer = state
    .selected_customer
    .clone()
    .ok_or(ValidationError::MissingCustomer)?;

  if state.items.is_empty() {
    return Err(ValidationError::EmptyCart);
  }

  for item in &state.items {
    if let Some(stock) = item.product.stock {
      if item.quantity > stock {
        return Err(ValidationError::InsufficientStock {
          product: item.product.name.clone(),
          requested: item.quantity,
          available: stock,
        });
      }
    }
  }

  let lines = state
    .items
    .iter()
    .map(|item| OrderLine {
      product_id: item.product.id.clone(),
      product_name: item.product.name.clone(),
      quantity: item.quantity,
      unit_price: item.product.price,
      line_total: item.line_total,
    })
    .collect();

  Ok(OrderDraft {
    customer,
    lines,
    total: state.total,
    notes: state.notes.clone(),
    authored_by: authored_by.to_string(),
    payment_method,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cart::CartAction;
  use crate::config::SyncConfig;
  use crate::error::RemoteError;
  use crate::storage::MemoryStore;
  use crate::types::{Customer, Product};
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

  /// Remote fake that can be flipped between reachable and unreachable.
  struct SwitchableApi {
    reachable: AtomicBool,
    creates: AtomicUsize,
  }

  impl SwitchableApi {
    fn new(reachable: bool) -> Self {
      Self {
        reachable: AtomicBool::new(reachable),
        creates: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl OrderApi for SwitchableApi {
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RemoteError> {
      if !self.reachable.load(Ordering::SeqCst) {
        return Err(RemoteError::Transport {
          reason: "network unreachable".to_string(),
        });
      }
      let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
      Ok(Order {
        id: format!("ord-{}", n),
        customer_id: draft.customer.id.clone(),
        total: draft.total,
        created_at: "2024-01-01T00:00:00Z".to_string(),
      })
    }

    async fn fetch(&self, _path: &str) -> Result<serde_json::Value, RemoteError> {
      Ok(serde_json::Value::Null)
    }
  }

  fn product(id: &str, price: f64, stock: Option<i64>) -> Product {
    Product {
      id: id.to_string(),
      name: format!("Product {}", id),
      price,
      stock,
    }
  }

  fn customer() -> Customer {
    Customer {
      id: "c1".to_string(),
      name: "Bodega Central".to_string(),
    }
  }

  fn filled_cart(storage: &Arc<MemoryStore>) -> CartStore<MemoryStore> {
    let mut cart = CartStore::open(Arc::clone(storage));
    cart.dispatch(CartAction::SetCustomer(Some(customer())));
    cart.dispatch(CartAction::AddItem {
      product: product("a", 10.0, Some(100)),
      quantity: 4,
    });
    cart
  }

  fn service(
    storage: &Arc<MemoryStore>,
    api: Arc<SwitchableApi>,
  ) -> OfflineService<MemoryStore> {
    let (service, _events) =
      OfflineService::new(Arc::clone(storage), api, &SyncConfig::default());
    service
  }

  #[tokio::test]
  async fn test_submit_rejects_missing_customer() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, Arc::clone(&api));

    let mut cart = CartStore::open(Arc::clone(&storage));
    cart.dispatch(CartAction::AddItem {
      product: product("a", 10.0, None),
      quantity: 1,
    });

    let result = service.submit_order(&mut cart, "agent-7", None).await;
    assert!(matches!(
      result,
      Err(SubmitError::Validation(ValidationError::MissingCustomer))
    ));
    // Rejected before any network or queue interaction.
    assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    assert_eq!(service.pending_sync_count(), 0);
    assert!(!cart.state().items.is_empty());
  }

  #[tokio::test]
  async fn test_submit_rejects_empty_cart() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, api);

    let mut cart = CartStore::open(Arc::clone(&storage));
    cart.dispatch(CartAction::SetCustomer(Some(customer())));

    let result = service.submit_order(&mut cart, "agent-7", None).await;
    assert!(matches!(
      result,
      Err(SubmitError::Validation(ValidationError::EmptyCart))
    ));
  }

  #[tokio::test]
  async fn test_submit_rejects_insufficient_stock() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, api);

    let mut cart = CartStore::open(Arc::clone(&storage));
    cart.dispatch(CartAction::SetCustomer(Some(customer())));
    cart.dispatch(CartAction::AddItem {
      product: product("a", 10.0, Some(3)),
      quantity: 5,
    });

    match service.submit_order(&mut cart, "agent-7", None).await {
      Err(SubmitError::Validation(ValidationError::InsufficientStock {
        requested,
        available,
        ..
      })) => {
        assert_eq!(requested, 5);
        assert_eq!(available, 3);
      }
      other => panic!("expected InsufficientStock, got {:?}", other.map(|_| ())),
    }
  }

  #[tokio::test]
  async fn test_online_submit_creates_remotely_and_clears_cart() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, Arc::clone(&api));
    let mut cart = filled_cart(&storage);

    match service.submit_order(&mut cart, "agent-7", Some(PaymentMethod::Cash)).await {
      Ok(Submission::Created(order)) => {
        assert_eq!(order.customer_id, "c1");
        assert_eq!(order.total, 40.0);
      }
      other => panic!("expected Created, got {:?}", other.map(|_| ())),
    }

    assert!(cart.state().items.is_empty());
    assert_eq!(service.pending_sync_count(), 0);
  }

  #[tokio::test]
  async fn test_transport_failure_parks_order() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(false));
    let service = service(&storage, Arc::clone(&api));
    let mut cart = filled_cart(&storage);

    // Still believes it is online; the attempt itself fails.
    match service.submit_order(&mut cart, "agent-7", None).await {
      Ok(Submission::Queued { provisional_id }) => {
        assert!(provisional_id.starts_with("offline_"));
      }
      other => panic!("expected Queued, got {:?}", other.map(|_| ())),
    }

    assert!(cart.state().items.is_empty());
    assert!(service.has_offline_data());
    assert_eq!(service.pending_sync_count(), 1);
  }

  #[tokio::test]
  async fn test_offline_submit_skips_network_entirely() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, Arc::clone(&api));
    let mut cart = filled_cart(&storage);

    service.set_offline();
    let result = service.submit_order(&mut cart, "agent-7", None).await;

    assert!(matches!(result, Ok(Submission::Queued { .. })));
    assert_eq!(api.creates.load(Ordering::SeqCst), 0);
    assert_eq!(service.pending_sync_count(), 1);
  }

  #[tokio::test]
  async fn test_manual_sync_drains_parked_orders() {
    let storage = Arc::new(MemoryStore::new());
    let api = Arc::new(SwitchableApi::new(false));
    let service = service(&storage, Arc::clone(&api));
    let mut cart = filled_cart(&storage);

    service.submit_order(&mut cart, "agent-7", None).await.unwrap();
    assert_eq!(service.pending_sync_count(), 1);

    api.reachable.store(true, Ordering::SeqCst);
    let report = service.sync_data().await;

    assert!(report.ran);
    assert_eq!(report.synced, 1);
    assert_eq!(service.pending_sync_count(), 0);
    assert!(!service.has_offline_data());
  }

  #[tokio::test]
  async fn test_corrupt_queue_reports_zero_pending() {
    let storage = Arc::new(MemoryStore::new());
    storage
      .set(crate::storage::keys::OFFLINE_ORDERS, "corrupt{")
      .unwrap();
    storage
      .set(crate::storage::keys::SYNC_QUEUE, "also corrupt")
      .unwrap();

    let api = Arc::new(SwitchableApi::new(true));
    let service = service(&storage, api);

    assert_eq!(service.pending_sync_count(), 0);
    assert!(!service.has_offline_data());
  }
}
