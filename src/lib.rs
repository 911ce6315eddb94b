//! fieldsync: the offline-resilience core of a field-sales ordering app.
//!
//! The host application's CRUD screens are thin views over a remote data
//! store and live elsewhere; this crate is the part that reasons about
//! partial failure, staleness, idempotency, and ordering:
//!
//! - [`connectivity::ConnectivityMonitor`]: observes online/offline
//!   transitions and timestamps them.
//! - [`cache::LocalCache`]: generic TTL store for read-through caching of
//!   remote reads.
//! - [`sync::SyncQueue`] / [`sync::OfflineOrderStore`]: durable, ordered
//!   pending work recorded while disconnected.
//! - [`sync::Reconciler`]: replays pending work once connectivity
//!   returns; one item's failure never aborts the pass.
//! - [`cart`]: a pure-reducer cart state machine, persisted after every
//!   transition.
//! - [`service::OfflineService`]: the facade UI collaborators talk to.
//!
//! Everything durable goes through the [`storage::KeyValueStore`] port, so
//! tests run against an in-memory store and production against SQLite.

pub mod cache;
pub mod cart;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod remote;
pub mod service;
pub mod storage;
pub mod sync;
pub mod types;

pub use cache::LocalCache;
pub use cart::{CartAction, CartState, CartStore};
pub use config::Config;
pub use connectivity::ConnectivityMonitor;
pub use error::{RemoteError, SubmitError, ValidationError};
pub use remote::{HttpOrderApi, OrderApi};
pub use service::{OfflineService, Submission};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use sync::{Reconciler, SyncEvent, SyncEvents};
pub use types::{Customer, Order, OrderDraft, PaymentMethod, Product};
