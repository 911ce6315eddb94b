//! TTL-keyed read-through cache over the persistence port.
//!
//! Caching here is best-effort by contract: any failure against the
//! underlying store (corrupt serialized value, write failure) degrades to
//! a cache miss and must never fail the caller.

mod entry;
mod key;
mod layer;

pub use entry::CacheEntry;
pub use key::query_hash;
pub use layer::{LocalCache, SweepHandle};
