//! # redb-backed Indexed Store
//!
//! A keyed object store on the redb embedded database.
//!
//! - `elements`: text -> postcard-encoded `Element`
//! - `combinations`: (first, second) -> postcard-encoded `Combination`,
//!   with the result element embedded as a snapshot
//! - secondary index tables (multimap) on first, second, result, emoji and
//!   createdStamp
//!
//! ## Schema Versions
//!
//! The recorded version lives in the `metadata` table. Opening a handle
//! applies every step whose number is above the recorded version, in order,
//! inside one write transaction:
//!
//! 1. create both tables and seed the default elements
//! 2. build the first/second/result/emoji indexes
//! 3. build the createdStamp indexes
//!
//! Every step is additive and re-entrant, so opening a current store is a
//! no-op and a store recorded at an older version is brought forward.

use crate::primitives::{DEFAULT_ELEMENTS, INDEXED_SCHEMA_VERSION};
use crate::store::{announce_combination, announce_element, now_millis};
use crate::{Combination, Element, PairKey, Store, StoreError, StoreStats};
use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use std::path::Path;

/// Table for elements: text -> serialized Element bytes
const ELEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("elements");

/// Table for combinations: (first, second) -> serialized Combination bytes
const COMBINATIONS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("combinations");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const COMBOS_BY_FIRST: MultimapTableDefinition<&str, (&str, &str)> =
    MultimapTableDefinition::new("combinations_by_first");
const COMBOS_BY_SECOND: MultimapTableDefinition<&str, (&str, &str)> =
    MultimapTableDefinition::new("combinations_by_second");
const COMBOS_BY_RESULT: MultimapTableDefinition<&str, (&str, &str)> =
    MultimapTableDefinition::new("combinations_by_result");
const COMBOS_BY_STAMP: MultimapTableDefinition<i64, (&str, &str)> =
    MultimapTableDefinition::new("combinations_by_created");
const ELEMENTS_BY_EMOJI: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("elements_by_emoji");
const ELEMENTS_BY_STAMP: MultimapTableDefinition<i64, &str> =
    MultimapTableDefinition::new("elements_by_created");

const SCHEMA_VERSION_KEY: &str = "schema_version";

const BACKEND_NAME: &str = "indexed";

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// A disk-backed indexed store using redb.
pub struct IndexedStore {
    db: Database,
}

impl std::fmt::Debug for IndexedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedStore").finish_non_exhaustive()
    }
}

impl IndexedStore {
    /// Open or create an indexed store at the given path.
    ///
    /// Runs any pending schema steps before returning the handle.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(unavailable)?;
        let store = Self { db };
        store.migrate()?;
        Ok(store)
    }

    /// Recorded schema version of the open handle.
    pub fn schema_version(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(METADATA).map_err(unavailable)?;
        Ok(table
            .get(SCHEMA_VERSION_KEY)
            .map_err(unavailable)?
            .map(|v| v.value())
            .unwrap_or(0))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let from = {
            let table = write_txn.open_table(METADATA).map_err(unavailable)?;
            table
                .get(SCHEMA_VERSION_KEY)
                .map_err(unavailable)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        if from > INDEXED_SCHEMA_VERSION {
            write_txn.abort().map_err(unavailable)?;
            return Err(StoreError::SchemaError(format!(
                "store is at version {} but this build supports up to {}",
                from, INDEXED_SCHEMA_VERSION
            )));
        }
        if from == INDEXED_SCHEMA_VERSION {
            write_txn.abort().map_err(unavailable)?;
            return Ok(());
        }

        tracing::info!(
            from,
            to = INDEXED_SCHEMA_VERSION,
            "Upgrading indexed store schema"
        );

        if from < 1 {
            let _ = write_txn.open_table(COMBINATIONS).map_err(unavailable)?;
            let mut elements = write_txn.open_table(ELEMENTS).map_err(unavailable)?;
            let stamp = now_millis();
            for (text, emoji) in DEFAULT_ELEMENTS {
                let element = Element::new(text, emoji, false).stamped(stamp);
                elements
                    .insert(text, encode(&element)?.as_slice())
                    .map_err(unavailable)?;
            }
        }

        if from < 2 {
            for index in [COMBOS_BY_FIRST, COMBOS_BY_SECOND, COMBOS_BY_RESULT] {
                let _ = write_txn.open_multimap_table(index).map_err(unavailable)?;
            }
            let _ = write_txn
                .open_multimap_table(ELEMENTS_BY_EMOJI)
                .map_err(unavailable)?;
            let (elements, combinations) = snapshot(&write_txn)?;
            for element in &elements {
                let mut by_emoji = write_txn
                    .open_multimap_table(ELEMENTS_BY_EMOJI)
                    .map_err(unavailable)?;
                by_emoji
                    .insert(element.emoji.as_str(), element.text.as_str())
                    .map_err(unavailable)?;
            }
            for combination in &combinations {
                index_pair(&write_txn, combination)?;
            }
        }

        if from < 3 {
            let _ = write_txn
                .open_multimap_table(ELEMENTS_BY_STAMP)
                .map_err(unavailable)?;
            let _ = write_txn
                .open_multimap_table(COMBOS_BY_STAMP)
                .map_err(unavailable)?;
            let (elements, combinations) = snapshot(&write_txn)?;
            for element in &elements {
                index_element_stamp(&write_txn, element)?;
            }
            for combination in &combinations {
                index_combination_stamp(&write_txn, combination)?;
            }
        }

        {
            let mut table = write_txn.open_table(METADATA).map_err(unavailable)?;
            table
                .insert(SCHEMA_VERSION_KEY, INDEXED_SCHEMA_VERSION)
                .map_err(unavailable)?;
        }
        write_txn.commit().map_err(unavailable)?;
        Ok(())
    }

    /// Elements created at or after `stamp`, oldest first.
    pub fn elements_since(&self, stamp: i64) -> Result<Vec<Element>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let by_stamp = read_txn
            .open_multimap_table(ELEMENTS_BY_STAMP)
            .map_err(unavailable)?;
        let elements = read_txn.open_table(ELEMENTS).map_err(unavailable)?;

        let mut result = Vec::new();
        for entry in by_stamp.range(stamp..).map_err(unavailable)? {
            let (_, texts) = entry.map_err(unavailable)?;
            for text in texts {
                let text = text.map_err(unavailable)?;
                if let Some(bytes) = elements.get(text.value()).map_err(unavailable)? {
                    result.push(decode(bytes.value())?);
                }
            }
        }
        Ok(result)
    }
}

// =============================================================================
// TRANSACTION HELPERS
// =============================================================================

/// Read both primary tables inside a write transaction.
fn snapshot(txn: &WriteTransaction) -> Result<(Vec<Element>, Vec<Combination>), StoreError> {
    let elements = {
        let table = txn.open_table(ELEMENTS).map_err(unavailable)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            out.push(decode(value.value())?);
        }
        out
    };
    let combinations = {
        let table = txn.open_table(COMBINATIONS).map_err(unavailable)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            out.push(decode(value.value())?);
        }
        out
    };
    Ok((elements, combinations))
}

fn index_pair(txn: &WriteTransaction, combination: &Combination) -> Result<(), StoreError> {
    let key = (combination.first.as_str(), combination.second.as_str());
    txn.open_multimap_table(COMBOS_BY_FIRST)
        .map_err(unavailable)?
        .insert(combination.first.as_str(), key)
        .map_err(unavailable)?;
    txn.open_multimap_table(COMBOS_BY_SECOND)
        .map_err(unavailable)?
        .insert(combination.second.as_str(), key)
        .map_err(unavailable)?;
    txn.open_multimap_table(COMBOS_BY_RESULT)
        .map_err(unavailable)?
        .insert(combination.result.text.as_str(), key)
        .map_err(unavailable)?;
    Ok(())
}

fn index_element_stamp(txn: &WriteTransaction, element: &Element) -> Result<(), StoreError> {
    if let Some(stamp) = element.created_stamp {
        txn.open_multimap_table(ELEMENTS_BY_STAMP)
            .map_err(unavailable)?
            .insert(stamp, element.text.as_str())
            .map_err(unavailable)?;
    }
    Ok(())
}

fn index_combination_stamp(
    txn: &WriteTransaction,
    combination: &Combination,
) -> Result<(), StoreError> {
    if let Some(stamp) = combination.created_stamp {
        txn.open_multimap_table(COMBOS_BY_STAMP)
            .map_err(unavailable)?
            .insert(
                stamp,
                (combination.first.as_str(), combination.second.as_str()),
            )
            .map_err(unavailable)?;
    }
    Ok(())
}

/// Insert an element row and its index entries. Returns `false` if present.
fn insert_element(txn: &WriteTransaction, element: &Element) -> Result<bool, StoreError> {
    let bytes = encode(element)?;
    {
        let mut elements = txn.open_table(ELEMENTS).map_err(unavailable)?;
        if elements
            .get(element.text.as_str())
            .map_err(unavailable)?
            .is_some()
        {
            return Ok(false);
        }
        elements
            .insert(element.text.as_str(), bytes.as_slice())
            .map_err(unavailable)?;
    }
    txn.open_multimap_table(ELEMENTS_BY_EMOJI)
        .map_err(unavailable)?
        .insert(element.emoji.as_str(), element.text.as_str())
        .map_err(unavailable)?;
    index_element_stamp(txn, element)?;
    Ok(true)
}

// =============================================================================
// STORE TRAIT IMPLEMENTATION
// =============================================================================

impl Store for IndexedStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn get_all_elements(&self) -> Result<Vec<Element>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(ELEMENTS).map_err(unavailable)?;

        let mut elements = Vec::new();
        for entry in table.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            elements.push(decode(value.value())?);
        }
        Ok(elements)
    }

    fn get_element(&self, text: &str) -> Result<Option<Element>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(ELEMENTS).map_err(unavailable)?;
        match table.get(text).map_err(unavailable)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn save_element(&self, element: &Element) -> Result<Element, StoreError> {
        let stored = element.stamped(now_millis());

        let write_txn = self.db.begin_write().map_err(unavailable)?;
        if !insert_element(&write_txn, &stored)? {
            write_txn.abort().map_err(unavailable)?;
            return Err(StoreError::DuplicateKey(stored.text));
        }
        write_txn.commit().map_err(unavailable)?;

        announce_element(BACKEND_NAME, &stored);
        Ok(stored)
    }

    fn get_all_combinations(&self) -> Result<Vec<Combination>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(COMBINATIONS).map_err(unavailable)?;

        let mut combinations = Vec::new();
        for entry in table.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            combinations.push(decode(value.value())?);
        }
        Ok(combinations)
    }

    fn get_combination(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Option<Combination>, StoreError> {
        let key = PairKey::sorted(first, second);
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let table = read_txn.open_table(COMBINATIONS).map_err(unavailable)?;
        match table.get(key).map_err(unavailable)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn save_combination(&self, combination: &Combination) -> Result<Combination, StoreError> {
        let mut stored = combination.clone().sorted();
        stored.created_stamp = Some(now_millis());

        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let exists = {
            let table = write_txn.open_table(COMBINATIONS).map_err(unavailable)?;
            table
                .get((stored.first.as_str(), stored.second.as_str()))
                .map_err(unavailable)?
                .is_some()
        };
        if exists {
            write_txn.abort().map_err(unavailable)?;
            return Err(StoreError::DuplicateKey(stored.key().to_string()));
        }

        // The result element is created alongside its first combination.
        let mut created_result = None;
        if !stored.result.is_nothing() {
            let result = stored.result.stamped(stored.created_stamp.unwrap_or_default());
            if insert_element(&write_txn, &result)? {
                created_result = Some(result);
            }
        }

        {
            let mut table = write_txn.open_table(COMBINATIONS).map_err(unavailable)?;
            table
                .insert(
                    (stored.first.as_str(), stored.second.as_str()),
                    encode(&stored)?.as_slice(),
                )
                .map_err(unavailable)?;
        }
        index_pair(&write_txn, &stored)?;
        index_combination_stamp(&write_txn, &stored)?;
        write_txn.commit().map_err(unavailable)?;

        if let Some(result) = &created_result {
            announce_element(BACKEND_NAME, result);
        }
        announce_combination(BACKEND_NAME, &stored);
        Ok(stored)
    }

    fn relink_result(&self, key: &PairKey, result: &Element) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write().map_err(unavailable)?;
        let existing: Option<Combination> = {
            let table = write_txn.open_table(COMBINATIONS).map_err(unavailable)?;
            match table
                .get((key.first.as_str(), key.second.as_str()))
                .map_err(unavailable)?
            {
                Some(bytes) => Some(decode(bytes.value())?),
                None => None,
            }
        };

        let Some(mut combination) = existing else {
            write_txn.abort().map_err(unavailable)?;
            return Ok(false);
        };
        if combination.result == *result {
            write_txn.abort().map_err(unavailable)?;
            return Ok(false);
        }

        let old_text = std::mem::replace(&mut combination.result, result.clone()).text;
        {
            let mut table = write_txn.open_table(COMBINATIONS).map_err(unavailable)?;
            table
                .insert(
                    (key.first.as_str(), key.second.as_str()),
                    encode(&combination)?.as_slice(),
                )
                .map_err(unavailable)?;
        }
        if old_text != result.text {
            let mut by_result = write_txn
                .open_multimap_table(COMBOS_BY_RESULT)
                .map_err(unavailable)?;
            by_result
                .remove(
                    old_text.as_str(),
                    (key.first.as_str(), key.second.as_str()),
                )
                .map_err(unavailable)?;
            by_result
                .insert(
                    result.text.as_str(),
                    (key.first.as_str(), key.second.as_str()),
                )
                .map_err(unavailable)?;
        }
        write_txn.commit().map_err(unavailable)?;
        Ok(true)
    }

    fn combinations_yielding(&self, text: &str) -> Result<Vec<Combination>, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let by_result = read_txn
            .open_multimap_table(COMBOS_BY_RESULT)
            .map_err(unavailable)?;
        let table = read_txn.open_table(COMBINATIONS).map_err(unavailable)?;

        let mut combinations = Vec::new();
        for key in by_result.get(text).map_err(unavailable)? {
            let key = key.map_err(unavailable)?;
            if let Some(bytes) = table.get(key.value()).map_err(unavailable)? {
                combinations.push(decode(bytes.value())?);
            }
        }
        Ok(combinations)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let elements = read_txn.open_table(ELEMENTS).map_err(unavailable)?;
        let combinations = read_txn.open_table(COMBINATIONS).map_err(unavailable)?;

        let mut discovery_count = 0;
        for entry in elements.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            let element: Element = decode(value.value())?;
            if element.discovered {
                discovery_count += 1;
            }
        }

        Ok(StoreStats {
            element_count: elements.len().map_err(unavailable)? as usize,
            combination_count: combinations.len().map_err(unavailable)? as usize,
            discovery_count,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn steam() -> Element {
        Element::new("Steam", "💨", true)
    }

    #[test]
    fn fresh_store_is_seeded_and_current() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        assert_eq!(store.schema_version().expect("version"), INDEXED_SCHEMA_VERSION);
        let mut texts: Vec<_> = store
            .get_all_elements()
            .expect("all")
            .into_iter()
            .map(|e| e.text)
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["Earth", "Fire", "Water", "Wind"]);
    }

    #[test]
    fn reopen_does_not_reseed() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.redb");

        let before = {
            let store = IndexedStore::open(&path).expect("open");
            store.get_element("Water").expect("get").expect("seeded")
        };
        let store = IndexedStore::open(&path).expect("reopen");
        let after = store.get_element("Water").expect("get").expect("still there");

        assert_eq!(before, after);
        assert_eq!(store.get_all_elements().expect("all").len(), 4);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.redb");
        {
            let store = IndexedStore::open(&path).expect("open");
            let txn = store.db.begin_write().expect("write");
            {
                let mut meta = txn.open_table(METADATA).expect("meta");
                meta.insert(SCHEMA_VERSION_KEY, 99).expect("insert");
            }
            txn.commit().expect("commit");
        }

        let result = IndexedStore::open(&path);
        assert!(matches!(result, Err(StoreError::SchemaError(_))));
    }

    #[test]
    fn older_schema_is_upgraded_with_backfilled_indexes() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.redb");
        {
            let store = IndexedStore::open(&path).expect("open");
            store
                .save_combination(&Combination::new("Water", "Fire", steam()))
                .expect("save");

            // Roll the recorded version back and drop the result index entries.
            let txn = store.db.begin_write().expect("write");
            {
                let mut meta = txn.open_table(METADATA).expect("meta");
                meta.insert(SCHEMA_VERSION_KEY, 1).expect("insert");
                let mut by_result = txn.open_multimap_table(COMBOS_BY_RESULT).expect("index");
                by_result.remove_all("Steam").expect("clear");
            }
            txn.commit().expect("commit");
        }

        let store = IndexedStore::open(&path).expect("reopen");
        assert_eq!(store.schema_version().expect("version"), INDEXED_SCHEMA_VERSION);
        let recipes = store.combinations_yielding("Steam").expect("recipes");
        assert_eq!(recipes.len(), 1);
        assert_eq!(store.get_all_elements().expect("all").len(), 5);
    }

    #[test]
    fn duplicate_element_is_rejected_without_overwrite() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        let first = store.save_element(&steam()).expect("first save");
        let second = store.save_element(&Element::new("Steam", "♨️", false));

        assert!(matches!(second, Err(StoreError::DuplicateKey(_))));
        assert_eq!(store.get_element("Steam").expect("get"), Some(first));
    }

    #[test]
    fn combination_creates_missing_result_element() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        let saved = store
            .save_combination(&Combination::new("Water", "Fire", steam()))
            .expect("save");
        assert_eq!(saved.first, "Fire");

        let element = store.get_element("Steam").expect("get").expect("created");
        assert!(element.discovered);
    }

    #[test]
    fn nothing_result_creates_no_element() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        store
            .save_combination(&Combination::new("Earth", "Earth", Element::nothing()))
            .expect("save");

        assert!(store.get_element("Nothing").expect("get").is_none());
        let combo = store
            .get_combination("Earth", "Earth")
            .expect("get")
            .expect("stored");
        assert!(combo.result.is_nothing());
    }

    #[test]
    fn relink_replaces_stale_snapshot() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");
        store
            .save_combination(&Combination::new("Water", "Fire", steam()))
            .expect("save");

        let canonical = Element::new("Steam", "♨️", false).stamped(1);
        let key = PairKey::new("Water", "Fire");
        assert!(store.relink_result(&key, &canonical).expect("relink"));
        assert!(!store.relink_result(&key, &canonical).expect("second relink"));

        let combo = store
            .get_combination("Fire", "Water")
            .expect("get")
            .expect("stored");
        assert_eq!(combo.result, canonical);
    }

    #[test]
    fn relink_moves_result_index_entry() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");
        store
            .save_combination(&Combination::new("Water", "Fire", steam()))
            .expect("save");

        let key = PairKey::new("Water", "Fire");
        store
            .relink_result(&key, &Element::new("Vapor", "☁️", false))
            .expect("relink");

        assert!(store.combinations_yielding("Steam").expect("old").is_empty());
        assert_eq!(store.combinations_yielding("Vapor").expect("new").len(), 1);
    }

    #[test]
    fn fresh_store_has_every_index_table() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        assert!(store.combinations_yielding("Steam").expect("by result").is_empty());
        assert_eq!(store.elements_since(0).expect("by stamp").len(), 4);
        assert_eq!(store.stats().expect("stats").combination_count, 0);
    }

    #[test]
    fn elements_since_uses_stamp_index() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");

        let saved = store.save_element(&steam()).expect("save");
        let stamp = saved.created_stamp.expect("stamped");

        let recent = store.elements_since(stamp).expect("since");
        assert!(recent.iter().any(|e| e.text == "Steam"));
        assert!(store.elements_since(stamp + 1_000_000).expect("future").is_empty());
    }

    #[test]
    fn stats_count_discoveries() {
        let temp = tempdir().expect("temp dir");
        let store = IndexedStore::open(temp.path().join("craft.redb")).expect("open");
        store
            .save_combination(&Combination::new("Water", "Fire", steam()))
            .expect("save");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.element_count, 5);
        assert_eq!(stats.combination_count, 1);
        assert_eq!(stats.discovery_count, 1);
    }
}
