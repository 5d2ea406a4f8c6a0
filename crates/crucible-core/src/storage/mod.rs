//! # Storage Backends
//!
//! Implementations of the [`crate::Store`] contract:
//!
//! - `IndexedStore`: redb keyed object store with secondary indexes
//! - `RelationalStore`: SQLite tables joined on read
//! - `FlatCache`: element-only JSON document used as a staging cache

pub mod flat_cache;
pub mod redb_store;
pub mod sqlite_store;

pub use flat_cache::{CacheDocument, FlatCache};
pub use redb_store::IndexedStore;
pub use sqlite_store::{CombinationRow, RelationalStore};
