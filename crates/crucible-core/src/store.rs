//! # Store Contract
//!
//! The single persistence contract every backend implements.
//!
//! ## Semantics
//!
//! - Each operation is one unit of work in the backend's native
//!   transaction model. No transaction spans two operations.
//! - Lookups return `Ok(None)` on a miss. A miss is never an error.
//! - Saves are insert-only. A key conflict returns
//!   `StoreError::DuplicateKey` and leaves the stored record untouched.
//! - Saves stamp the record with the current time; the caller's stamp is
//!   ignored.
//! - Pair inputs are sorted before every lookup and insert.
//!
//! Implementations must be `Send + Sync`: the explorer shares one handle
//! between overlapping in-flight dispatches.

use crate::{Combination, Element, PairKey, StoreError};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistent mapping of elements and combinations.
pub trait Store: Send + Sync {
    /// Short backend identifier used in logs and status output.
    fn backend_name(&self) -> &'static str;

    /// Full snapshot of all elements. No ordering is guaranteed.
    fn get_all_elements(&self) -> Result<Vec<Element>, StoreError>;

    /// Point lookup by element text.
    fn get_element(&self, text: &str) -> Result<Option<Element>, StoreError>;

    /// Insert a new element with a fresh creation stamp.
    fn save_element(&self, element: &Element) -> Result<Element, StoreError>;

    /// Full snapshot of all combinations. No ordering is guaranteed.
    fn get_all_combinations(&self) -> Result<Vec<Combination>, StoreError>;

    /// Lookup by unordered pair.
    fn get_combination(&self, first: &str, second: &str)
    -> Result<Option<Combination>, StoreError>;

    /// Insert a new combination with a sorted pair and a fresh creation stamp.
    fn save_combination(&self, combination: &Combination) -> Result<Combination, StoreError>;

    /// Point an existing combination at `result`.
    ///
    /// Maintenance only. Returns `Ok(false)` when the combination is absent
    /// or already points at an identical record.
    fn relink_result(&self, key: &PairKey, result: &Element) -> Result<bool, StoreError>;

    /// All combinations whose result text is `text`.
    fn combinations_yielding(&self, text: &str) -> Result<Vec<Combination>, StoreError> {
        Ok(self
            .get_all_combinations()?
            .into_iter()
            .filter(|c| c.result.text == text)
            .collect())
    }

    /// Element, combination and discovery counts.
    fn stats(&self) -> Result<StoreStats, StoreError> {
        let elements = self.get_all_elements()?;
        let combination_count = self.get_all_combinations()?.len();
        Ok(StoreStats {
            element_count: elements.len(),
            combination_count,
            discovery_count: elements.iter().filter(|e| e.discovered).count(),
        })
    }
}

/// Aggregate counts over a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub element_count: usize,
    pub combination_count: usize,
    pub discovery_count: usize,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Absorb a `DuplicateKey` conflict as `Ok(None)`.
///
/// Every other error is passed through.
pub fn ignore_duplicate<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_duplicate() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Creation notification for a newly stored element.
pub(crate) fn announce_element(backend: &str, element: &Element) {
    if element.discovered {
        tracing::info!(
            target: "crucible_core::discovery",
            backend,
            discovered = true,
            "NEW DISCOVERY! {} {}",
            element.emoji,
            element.text
        );
    } else {
        tracing::info!(
            target: "crucible_core::discovery",
            backend,
            discovered = false,
            "New element! {} {}",
            element.emoji,
            element.text
        );
    }
}

/// Creation notification for a newly stored combination.
pub(crate) fn announce_combination(backend: &str, combination: &Combination) {
    tracing::debug!(
        target: "crucible_core::discovery",
        backend,
        "New combination: [{}, {}] => {} {}",
        combination.first,
        combination.second,
        combination.result.emoji,
        combination.result.text
    );
}

// =============================================================================
// TESTS
// =============================================================================
