//! Cart state and its pure reducer.
//!
//! The reducer performs no I/O; persistence happens in [`super::CartStore`]
//! after every dispatch. Totals are always recomputed from the items, never
//! set independently.

use serde::{Deserialize, Serialize};

use crate::types::{Customer, Product};

/// One line in the cart, unique per product id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
  pub product: Product,
  pub quantity: i64,
  /// Always `quantity * product.price`; recomputed on every transition.
  pub line_total: f64,
}

/// The order being built. Created empty at session start, mutated only
/// through [`reduce`], cleared on successful submission or cancellation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartState {
  pub items: Vec<CartItem>,
  pub selected_customer: Option<Customer>,
  pub notes: String,
  pub total: f64,
  pub item_count: i64,
}

/// Cart transitions.
#[derive(Debug, Clone)]
pub enum CartAction {
  /// Add `quantity` of a product, merging with an existing line for the
  /// same product id.
  AddItem { product: Product, quantity: i64 },
  RemoveItem { product_id: String },
  /// Set a line's quantity; `quantity <= 0` removes the line.
  UpdateQuantity { product_id: String, quantity: i64 },
  SetCustomer(Option<Customer>),
  SetNotes(String),
  /// Reset to the empty initial state.
  Clear,
  /// Replace the entire state wholesale; used once at startup to
  /// rehydrate from persisted storage.
  Load(CartState),
}

/// Pure reducer: current state + action -> next state.
pub fn reduce(state: &CartState, action: CartAction) -> CartState {
  match action {
    CartAction::AddItem { product, quantity } => {
      let mut items = state.items.clone();
      match items.iter_mut().find(|i| i.product.id == product.id) {
        Some(item) => {
          item.quantity += quantity;
          item.line_total = item.quantity as f64 * item.product.price;
        }
        None => {
          items.push(CartItem {
            line_total: quantity as f64 * product.price,
            quantity,
            product,
          });
        }
      }
      // An item driven to zero or below must not remain.
      items.retain(|i| i.quantity > 0);
      with_recomputed_totals(state, items)
    }

    CartAction::RemoveItem { product_id } => {
      let mut items = state.items.clone();
      items.retain(|i| i.product.id != product_id);
      with_recomputed_totals(state, items)
    }

    CartAction::UpdateQuantity { product_id, quantity } => {
      let mut items = state.items.clone();
      if quantity <= 0 {
        items.retain(|i| i.product.id != product_id);
      } else if let Some(item) = items.iter_mut().find(|i| i.product.id == product_id) {
        item.quantity = quantity;
        item.line_total = quantity as f64 * item.product.price;
      }
      with_recomputed_totals(state, items)
    }

    CartAction::SetCustomer(customer) => CartState {
      selected_customer: customer,
      ..state.clone()
    },

    CartAction::SetNotes(notes) => CartState {
      notes,
      ..state.clone()
    },

    CartAction::Clear => CartState::default(),

    CartAction::Load(loaded) => loaded,
  }
}

fn with_recomputed_totals(state: &CartState, items: Vec<CartItem>) -> CartState {
  let total = items.iter().map(|i| i.line_total).sum();
  let item_count = items.iter().map(|i| i.quantity).sum();
  CartState {
    items,
    total,
    item_count,
    ..state.clone()
  }
}
