//! # crucible-core
//!
//! Persistence for an element-combination explorer.
//!
//! This crate owns the data model and everything that touches storage:
//! - `types`: `Element`, `Combination`, `PairKey`, `StoreError`
//! - `store`: the `Store` contract every backend implements
//! - `storage`: the redb, SQLite and flat-cache backends
//! - `sync`: idempotent two-way merges between any two stores
//! - `maintenance`: the optional result re-link repair pass
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies. The oracle client and the
//!   scheduler live in the application crate.
//! - Every store operation is one unit of work in the backend's own
//!   transaction model.
//! - No process-wide mutable state: callers hold explicit store handles.

// =============================================================================
// MODULES
// =============================================================================

pub mod maintenance;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Combination, Element, PairKey, StoreError, is_nothing, is_valid_element_text};

// =============================================================================
// RE-EXPORTS: Store Contract and Backends
// =============================================================================

pub use storage::{CacheDocument, CombinationRow, FlatCache, IndexedStore, RelationalStore};
pub use store::{Store, StoreStats, ignore_duplicate, now_millis};

// =============================================================================
// RE-EXPORTS: Sync and Maintenance
// =============================================================================

pub use maintenance::{RepairReport, relink_stale_results};
pub use sync::{
    ImportCounts, SyncReport, import_combinations, import_elements, sync_combinations,
    sync_elements,
};
