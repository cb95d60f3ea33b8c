//! Provider answer cache
//!
//! Keys, versioned entries, read-time migration and the on-disk store.

pub mod entry;
pub mod migration;
pub mod store;

pub use entry::{CacheEntry, CacheKey, CURRENT_SCHEMA_VERSION};
pub use store::{CacheStore, RatingSummary, WriteMode};
