//! # Maintenance
//!
//! Optional repair pass over a store. Not part of steady-state flow.
//!
//! A backend that embeds the result element inside each combination can
//! drift from the element table: the combination was written with a result
//! snapshot that differs from the element already on record, or the element
//! row was lost. This pass re-links every drifted snapshot to the canonical
//! element and restores missing result elements from their snapshot.

use crate::store::ignore_duplicate;
use crate::{Store, StoreError};
use serde::{Deserialize, Serialize};

/// Counts produced by [`relink_stale_results`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Combinations examined.
    pub scanned: usize,
    /// Combinations re-linked to the canonical element.
    pub relinked: usize,
    /// Result elements re-created from a combination's snapshot.
    pub restored: usize,
}

/// Re-link every combination whose result snapshot differs from the stored
/// element with the same text.
pub fn relink_stale_results(store: &dyn Store) -> Result<RepairReport, StoreError> {
    let mut report = RepairReport::default();

    for combination in store.get_all_combinations()? {
        report.scanned += 1;
        if combination.result.is_nothing() {
            continue;
        }

        match store.get_element(&combination.result.text)? {
            Some(canonical) if canonical.same_content(&combination.result) => {}
            Some(canonical) => {
                if store.relink_result(&combination.key(), &canonical)? {
                    tracing::debug!(
                        pair = %combination.key(),
                        result = %canonical.text,
                        "Re-linked stale result"
                    );
                    report.relinked += 1;
                }
            }
            None => {
                if ignore_duplicate(store.save_element(&combination.result))?.is_some() {
                    report.restored += 1;
                }
            }
        }
    }

    tracing::info!(
        backend = store.backend_name(),
        scanned = report.scanned,
        relinked = report.relinked,
        restored = report.restored,
        "Repair pass complete"
    );
    Ok(report)
}
