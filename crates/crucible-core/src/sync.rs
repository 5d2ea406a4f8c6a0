//! # Store Synchronization
//!
//! Idempotent, non-overwriting merges between two [`Store`]s.
//!
//! An import copies every record the target lacks. The copy gets a fresh
//! creation stamp: provenance is "imported now", not the source's stamp.
//! Records already present at the target are skipped, never merged
//! (first writer wins). A sync is an import in each direction; running it
//! twice in a row writes nothing the second time.

use crate::store::ignore_duplicate;
use crate::{Store, StoreError};
use serde::{Deserialize, Serialize};

/// Outcome of a one-way import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    /// Records written to the target.
    pub copied: usize,
    /// Records the target already held.
    pub skipped: usize,
}

impl ImportCounts {
    fn record(&mut self, written: bool) {
        if written {
            self.copied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Outcome of a two-way sync between stores `a` and `b`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records copied from `b` into `a`.
    pub into_a: ImportCounts,
    /// Records copied from `a` into `b`.
    pub into_b: ImportCounts,
}

impl SyncReport {
    /// Total records written on either side.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.into_a.copied + self.into_b.copied
    }
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// Copy every element of `source` that `target` lacks.
pub fn import_elements(target: &dyn Store, source: &dyn Store) -> Result<ImportCounts, StoreError> {
    let mut counts = ImportCounts::default();

    for element in source.get_all_elements()? {
        if target.get_element(&element.text)?.is_some() {
            counts.skipped += 1;
            continue;
        }
        // A concurrent writer may have won the race since the lookup.
        let written = ignore_duplicate(target.save_element(&element))?.is_some();
        counts.record(written);
    }

    tracing::debug!(
        from = source.backend_name(),
        to = target.backend_name(),
        copied = counts.copied,
        skipped = counts.skipped,
        "Imported elements"
    );
    Ok(counts)
}

/// Two-way element merge: `a <- b`, then `b <- a`.
pub fn sync_elements(a: &dyn Store, b: &dyn Store) -> Result<SyncReport, StoreError> {
    let into_a = import_elements(a, b)?;
    let into_b = import_elements(b, a)?;
    let report = SyncReport { into_a, into_b };

    tracing::info!(
        a = a.backend_name(),
        b = b.backend_name(),
        into_a = report.into_a.copied,
        into_b = report.into_b.copied,
        "Elements synced"
    );
    Ok(report)
}

// =============================================================================
// COMBINATIONS
// =============================================================================

/// Copy every combination of `source` whose pair `target` lacks.
///
/// The result element travels with the combination: backends create it
/// alongside the combination when it is missing.
pub fn import_combinations(
    target: &dyn Store,
    source: &dyn Store,
) -> Result<ImportCounts, StoreError> {
    let mut counts = ImportCounts::default();

    for combination in source.get_all_combinations()? {
        let combination = combination.sorted();
        if target
            .get_combination(&combination.first, &combination.second)?
            .is_some()
        {
            counts.skipped += 1;
            continue;
        }
        let written = ignore_duplicate(target.save_combination(&combination))?.is_some();
        counts.record(written);
    }

    tracing::debug!(
        from = source.backend_name(),
        to = target.backend_name(),
        copied = counts.copied,
        skipped = counts.skipped,
        "Imported combinations"
    );
    Ok(counts)
}

/// Two-way combination merge: `a <- b`, then `b <- a`.
pub fn sync_combinations(a: &dyn Store, b: &dyn Store) -> Result<SyncReport, StoreError> {
    let into_a = import_combinations(a, b)?;
    let into_b = import_combinations(b, a)?;
    let report = SyncReport { into_a, into_b };

    tracing::info!(
        a = a.backend_name(),
        b = b.backend_name(),
        into_a = report.into_a.copied,
        into_b = report.into_b.copied,
        "Combinations synced"
    );
    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlatCache, RelationalStore};
    use crate::{Combination, Element};
    use tempfile::tempdir;

    #[test]
    fn import_skips_existing_and_restamps() {
        let a = RelationalStore::open_in_memory().expect("a");
        let b = RelationalStore::open_in_memory().expect("b");
        b.save_element(&Element::new("Steam", "💨", true).stamped(1))
            .expect("save");

        let counts = import_elements(&a, &b).expect("import");
        // The four seeds exist on both sides.
        assert_eq!(counts, ImportCounts { copied: 1, skipped: 4 });

        let steam = a.get_element("Steam").expect("get").expect("present");
        assert!(steam.discovered);
        assert_ne!(steam.created_stamp, Some(1));
    }

    #[test]
    fn import_never_overwrites() {
        let a = RelationalStore::open_in_memory().expect("a");
        let b = RelationalStore::open_in_memory().expect("b");
        a.save_element(&Element::new("Mud", "🟫", false)).expect("a");
        b.save_element(&Element::new("Mud", "💩", true)).expect("b");

        import_elements(&a, &b).expect("import");
        let mud = a.get_element("Mud").expect("get").expect("present");
        assert_eq!(mud.emoji, "🟫");
        assert!(!mud.discovered);
    }

    #[test]
    fn sync_twice_writes_nothing_more() {
        let a = RelationalStore::open_in_memory().expect("a");
        let b = RelationalStore::open_in_memory().expect("b");
        a.save_element(&Element::new("Steam", "💨", true)).expect("a");
        b.save_element(&Element::new("Lava", "🌋", false)).expect("b");

        let first = sync_elements(&a, &b).expect("first");
        assert_eq!(first.writes(), 2);
        let second = sync_elements(&a, &b).expect("second");
        assert_eq!(second.writes(), 0);

        for text in ["Steam", "Lava", "Water"] {
            assert!(a.get_element(text).expect("a").is_some());
            assert!(b.get_element(text).expect("b").is_some());
        }
    }

    #[test]
    fn combinations_sync_both_ways() {
        let a = RelationalStore::open_in_memory().expect("a");
        let b = RelationalStore::open_in_memory().expect("b");
        a.save_combination(&Combination::new(
            "Water",
            "Fire",
            Element::new("Steam", "💨", true),
        ))
        .expect("a");
        b.save_combination(&Combination::new("Earth", "Water", Element::nothing()))
            .expect("b");

        let report = sync_combinations(&a, &b).expect("sync");
        assert_eq!(report.writes(), 2);

        let steam = b.get_combination("Fire", "Water").expect("get").expect("present");
        assert_eq!(steam.result.text, "Steam");
        assert!(b.get_element("Steam").expect("get").is_some());

        let nothing = a.get_combination("Water", "Earth").expect("get").expect("present");
        assert!(nothing.result.is_nothing());
        assert!(a.get_element("Nothing").expect("get").is_none());

        assert_eq!(sync_combinations(&a, &b).expect("again").writes(), 0);
    }

    #[test]
    fn missing_cache_is_a_no_op_source() {
        let temp = tempdir().expect("temp dir");
        let cache = FlatCache::in_dir(temp.path());
        let primary = RelationalStore::open_in_memory().expect("primary");

        let counts = import_elements(&primary, &cache).expect("import");
        assert_eq!(counts, ImportCounts::default());
    }

    #[test]
    fn cache_round_trip_through_sync() {
        let temp = tempdir().expect("temp dir");
        let cache = FlatCache::in_dir(temp.path());
        let primary = RelationalStore::open_in_memory().expect("primary");
        primary
            .save_element(&Element::new("Steam", "💨", true))
            .expect("save");

        assert!(cache.overwrite_from(&primary).expect("overwrite"));

        let fresh = RelationalStore::open_in_memory().expect("fresh");
        let counts = import_elements(&fresh, &cache).expect("import");
        assert_eq!(counts.copied, 1);
        assert!(fresh.get_element("Steam").expect("get").is_some());
    }
}
