//! Domain types shared across the offline core.

use serde::{Deserialize, Serialize};

/// A sellable product as presented to the sales agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub price: f64,
  /// Units on hand, if the catalog tracks stock for this product.
  pub stock: Option<i64>,
}

/// A customer an order is authored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: String,
  pub name: String,
}

/// One line of an order draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
  pub product_id: String,
  pub product_name: String,
  pub quantity: i64,
  pub unit_price: f64,
  pub line_total: f64,
}

/// Payment method recorded on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cash,
  Credit,
  Transfer,
}

/// The payload handed to the remote collaborator to create an order.
///
/// This is the serialized form of a cart at submission time; it carries
/// everything the remote side needs and nothing tied to local state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
  pub customer: Customer,
  pub lines: Vec<OrderLine>,
  pub total: f64,
  pub notes: String,
  pub authored_by: String,
  pub payment_method: Option<PaymentMethod>,
}

/// An order as acknowledged by the remote collaborator.
///
/// The `id` here is authoritative; provisional client-side identifiers are
/// never carried over into this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
  pub id: String,
  pub customer_id: String,
  pub total: f64,
  pub created_at: String,
}
