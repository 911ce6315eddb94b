//! Persisted reactive cart: a pure reducer plus a persisting container.

mod state;
mod store;

pub use state::{reduce, CartAction, CartItem, CartState};
pub use store::CartStore;
