//! # Store Contract Tiers (T0-T3)
//!
//! Every persistent backend must pass every tier with identical results.
//!
//! ## Tiers
//! - T0: Seeding and Absence
//! - T1: Insert-Only Writes
//! - T2: Pair Ordering
//! - T3: Sync Completeness

use crucible_core::{
    Combination, Element, FlatCache, IndexedStore, RelationalStore, Store, StoreError,
    import_elements, sync_combinations, sync_elements,
};
use tempfile::TempDir;

/// One handle per persistent backend. The temp dir must outlive the stores.
fn backends() -> (TempDir, Vec<Box<dyn Store>>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let indexed = IndexedStore::open(dir.path().join("tiers.redb")).expect("indexed");
    let relational = RelationalStore::open(dir.path().join("tiers.sqlite")).expect("relational");
    (dir, vec![Box::new(indexed), Box::new(relational)])
}

fn steam() -> Element {
    Element::new("Steam", "💨", true)
}

// =============================================================================
// TIER T0: SEEDING AND ABSENCE
// =============================================================================

mod t0_seeding {
    use super::*;

    /// T0.1: A fresh store holds exactly the four default elements.
    #[test]
    fn fresh_store_is_seeded() {
        let (_dir, stores) = backends();
        for store in &stores {
            let mut texts: Vec<String> = store
                .get_all_elements()
                .expect("all")
                .into_iter()
                .map(|e| e.text)
                .collect();
            texts.sort();
            assert_eq!(texts, ["Earth", "Fire", "Water", "Wind"], "{}", store.backend_name());

            let water = store.get_element("Water").expect("get").expect("seeded");
            assert!(!water.discovered);
        }
    }

    /// T0.2: Unknown keys are absent, not errors.
    #[test]
    fn misses_are_absent() {
        let (_dir, stores) = backends();
        for store in &stores {
            assert!(store.get_element("Plasma").expect("get").is_none());
            assert!(store.get_combination("Fire", "Plasma").expect("get").is_none());
        }
    }

    /// T0.3: Saves assign a creation stamp.
    #[test]
    fn saves_are_stamped() {
        let (_dir, stores) = backends();
        for store in &stores {
            let saved = store.save_element(&steam()).expect("save");
            assert!(saved.created_stamp.is_some());

            let combo = store
                .save_combination(&Combination::new("Fire", "Water", steam()))
                .expect("save");
            assert!(combo.created_stamp.is_some());
        }
    }
}

// =============================================================================
// TIER T1: INSERT-ONLY WRITES
// =============================================================================

mod t1_insert_only {
    use super::*;

    /// T1.1: A second element save with the same text is a duplicate.
    #[test]
    fn element_save_is_idempotent() {
        let (_dir, stores) = backends();
        for store in &stores {
            store.save_element(&steam()).expect("first");
            let second = store.save_element(&Element::new("Steam", "☁️", false));
            assert!(matches!(second, Err(StoreError::DuplicateKey(_))));

            let stored = store.get_element("Steam").expect("get").expect("present");
            assert_eq!(stored.emoji, "💨");
            assert_eq!(store.stats().expect("stats").element_count, 5);
        }
    }

    /// T1.2: A second combination save for the same pair is a duplicate.
    #[test]
    fn combination_save_is_idempotent() {
        let (_dir, stores) = backends();
        for store in &stores {
            store
                .save_combination(&Combination::new("Fire", "Water", steam()))
                .expect("first");
            let second = store.save_combination(&Combination::new(
                "Water",
                "Fire",
                Element::new("Fog", "🌫️", false),
            ));
            assert!(matches!(second, Err(StoreError::DuplicateKey(_))));

            let combo = store
                .get_combination("Fire", "Water")
                .expect("get")
                .expect("present");
            assert_eq!(combo.result.text, "Steam");
            assert_eq!(store.stats().expect("stats").combination_count, 1);
        }
    }

    /// T1.3: Saving a combination creates its result element.
    #[test]
    fn result_element_created_with_combination() {
        let (_dir, stores) = backends();
        for store in &stores {
            store
                .save_combination(&Combination::new("Fire", "Water", steam()))
                .expect("save");
            let element = store.get_element("Steam").expect("get").expect("created");
            assert!(element.discovered);
            assert_eq!(store.stats().expect("stats").discovery_count, 1);
        }
    }

    /// T1.4: The "Nothing" result never becomes an element.
    #[test]
    fn nothing_result_is_not_an_element() {
        let (_dir, stores) = backends();
        for store in &stores {
            store
                .save_combination(&Combination::new("Earth", "Fire", Element::nothing()))
                .expect("save");
            let combo = store
                .get_combination("Fire", "Earth")
                .expect("get")
                .expect("present");
            assert!(combo.result.is_nothing());
            assert!(store.get_element("Nothing").expect("get").is_none());
        }
    }
}

// =============================================================================
// TIER T2: PAIR ORDERING
// =============================================================================

mod t2_pair_ordering {
    use super::*;

    /// T2.1: Stored pairs are sorted whatever order the caller used.
    #[test]
    fn stored_pair_is_sorted() {
        let (_dir, stores) = backends();
        for store in &stores {
            let combo = Combination {
                first: "Water".to_string(),
                second: "Fire".to_string(),
                result: steam(),
                created_stamp: None,
            };
            let saved = store.save_combination(&combo).expect("save");
            assert_eq!((saved.first.as_str(), saved.second.as_str()), ("Fire", "Water"));

            let all = store.get_all_combinations().expect("all");
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].first, "Fire");
        }
    }

    /// T2.2: Lookup resolves both orders to the same record.
    #[test]
    fn lookup_is_order_independent() {
        let (_dir, stores) = backends();
        for store in &stores {
            store
                .save_combination(&Combination::new("Wind", "Earth", Element::new("Dust", "🌫️", false)))
                .expect("save");
            let ab = store.get_combination("Earth", "Wind").expect("ab");
            let ba = store.get_combination("Wind", "Earth").expect("ba");
            assert!(ab.is_some());
            assert_eq!(ab, ba);
        }
    }

    /// T2.3: Self-pairs are valid keys.
    #[test]
    fn self_pair_is_valid() {
        let (_dir, stores) = backends();
        for store in &stores {
            store
                .save_combination(&Combination::new("Fire", "Fire", Element::new("Inferno", "🔥", false)))
                .expect("save");
            assert!(store.get_combination("Fire", "Fire").expect("get").is_some());
        }
    }
}

// =============================================================================
// TIER T3: SYNC COMPLETENESS
// =============================================================================

mod t3_sync {
    use super::*;

    /// T3.1: After a sync every element is resolvable on both sides.
    #[test]
    fn sync_across_backends_is_complete() {
        let (_dir, stores) = backends();
        let (a, b) = (stores[0].as_ref(), stores[1].as_ref());
        a.save_element(&steam()).expect("a");
        b.save_element(&Element::new("Lava", "🌋", false)).expect("b");

        let report = sync_elements(a, b).expect("sync");
        assert_eq!(report.writes(), 2);
        for text in ["Steam", "Lava", "Water", "Fire", "Wind", "Earth"] {
            assert!(a.get_element(text).expect("a").is_some(), "{text} in a");
            assert!(b.get_element(text).expect("b").is_some(), "{text} in b");
        }

        assert_eq!(sync_elements(a, b).expect("again").writes(), 0);
    }

    /// T3.2: Combinations and their results travel across backends.
    #[test]
    fn combination_sync_across_backends() {
        let (_dir, stores) = backends();
        let (a, b) = (stores[0].as_ref(), stores[1].as_ref());
        a.save_combination(&Combination::new("Fire", "Water", steam()))
            .expect("a");
        b.save_combination(&Combination::new("Earth", "Water", Element::new("Mud", "🟫", false)))
            .expect("b");

        assert_eq!(sync_combinations(a, b).expect("sync").writes(), 2);
        assert!(b.get_element("Steam").expect("b").is_some());
        assert!(a.get_element("Mud").expect("a").is_some());
        assert_eq!(sync_combinations(a, b).expect("again").writes(), 0);
    }

    /// T3.3: The cache stages elements between sessions.
    #[test]
    fn cache_stages_elements() {
        let (dir, stores) = backends();
        let cache = FlatCache::in_dir(dir.path());
        stores[0].save_element(&steam()).expect("save");

        assert!(cache.overwrite_from(stores[0].as_ref()).expect("overwrite"));
        let counts = import_elements(stores[1].as_ref(), &cache).expect("import");
        assert_eq!(counts.copied, 1);
        assert!(stores[1].get_element("Steam").expect("get").is_some());
    }
}
