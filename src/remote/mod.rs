//! Contract the core requires from the remote data service.
//!
//! The shape of the remote API is not this crate's concern; the core only
//! needs order creation and a generic read. Anything implementing
//! [`OrderApi`] can stand in: the HTTP adapter below, or a scripted fake
//! in tests.

mod http;

pub use http::HttpOrderApi;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{Order, OrderDraft};

/// The external order-creation collaborator.
#[async_trait]
pub trait OrderApi: Send + Sync {
  /// Create an order remotely. Used for the online-first attempt and for
  /// each reconciliation replay. The caller removes the corresponding
  /// queue entry only after this succeeds.
  async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RemoteError>;

  /// Generic remote read; callers cache the result via the local cache.
  async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError>;
}
