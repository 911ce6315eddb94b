//! Error taxonomy for the offline core.
//!
//! Infrastructure failures (storage reads/writes, corrupt persisted blobs)
//! are not represented here: they are swallowed at the component that hit
//! them and degrade to a miss or an empty collection. The types below are
//! the business-level errors that reach a caller.

use thiserror::Error;

/// Cart submission rejected before any network or queue interaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("no customer selected")]
  MissingCustomer,

  #[error("cart is empty")]
  EmptyCart,

  #[error("insufficient stock for {product}: requested {requested}, available {available}")]
  InsufficientStock {
    product: String,
    requested: i64,
    available: i64,
  },
}

/// Failure from the remote order collaborator.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// Could not reach the remote side at all. Work that hits this is
  /// queueable for later replay.
  #[error("transport failure: {reason}")]
  Transport { reason: String },

  /// The remote side answered and rejected the request. Not queueable:
  /// replaying the same payload would fail again.
  #[error("remote rejected request ({status}): {message}")]
  Api { status: u16, message: String },
}

impl RemoteError {
  /// Whether this failure should park the work for a later sync pass.
  pub fn is_transport(&self) -> bool {
    matches!(self, RemoteError::Transport { .. })
  }
}

/// Failure of the online submit flow.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Remote(#[from] RemoteError),
}
