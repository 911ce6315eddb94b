//! Persisting container around the cart reducer.

use std::sync::Arc;
use tracing::warn;

use crate::storage::{keys, KeyValueStore};

use super::state::{reduce, CartAction, CartState};

/// Owns the live [`CartState`] and persists it after every dispatch.
///
/// The reducer stays pure; this wrapper is the only place cart persistence
/// happens. Persistence is best-effort: a write failure loses at most the
/// latest transition and never corrupts earlier persisted state, because
/// writes are whole-state overwrites.
pub struct CartStore<S: KeyValueStore> {
  state: CartState,
  storage: Arc<S>,
}

impl<S: KeyValueStore> CartStore<S> {
  /// Open the cart, rehydrating persisted state if present. A corrupt or
  /// unreadable persisted cart falls back to the empty initial state.
  pub fn open(storage: Arc<S>) -> Self {
    let persisted = Self::load_persisted(&storage);

    let mut store = Self {
      state: CartState::default(),
      storage,
    };
    if let Some(state) = persisted {
      // Rehydration goes through the reducer like every other transition.
      store.state = reduce(&store.state, CartAction::Load(state));
    }
    store
  }

  fn load_persisted(storage: &Arc<S>) -> Option<CartState> {
    let raw = match storage.get(keys::CART) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(error = %e, "failed to read persisted cart, starting empty");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(state) => Some(state),
      Err(e) => {
        warn!(error = %e, "corrupt persisted cart, starting empty");
        None
      }
    }
  }

  /// Apply one transition and persist the resulting state.
  pub fn dispatch(&mut self, action: CartAction) {
    self.state = reduce(&self.state, action);
    self.persist();
  }

  fn persist(&self) {
    let serialized = match serde_json::to_string(&self.state) {
      Ok(s) => s,
      Err(e) => {
        warn!(error = %e, "failed to serialize cart state, skipping persist");
        return;
      }
    };

    if let Err(e) = self.storage.set(keys::CART, &serialized) {
      warn!(error = %e, "failed to persist cart state");
    }
  }

  pub fn state(&self) -> &CartState {
    &self.state
  }

  /// Quantity of a product currently in the cart, 0 if absent.
  pub fn item_quantity(&self, product_id: &str) -> i64 {
    self
      .state
      .items
      .iter()
      .find(|i| i.product.id == product_id)
      .map(|i| i.quantity)
      .unwrap_or(0)
  }

  pub fn has_item(&self, product_id: &str) -> bool {
    self.item_quantity(product_id) > 0
  }
}
