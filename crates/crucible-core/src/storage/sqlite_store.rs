//! # SQLite-backed Relational Store
//!
//! Two normalized tables:
//!
//! ```text
//! elements(text PK, emoji, discovered, createdStamp)
//! combinations(first, second, result -> elements.text, createdStamp,
//!              PK(first, second))
//! ```
//!
//! Reads join `combinations` to `elements` on `result` to rebuild the
//! embedded result element. The "Nothing" marker is stored as a `NULL`
//! result so the foreign key can stay enforced without an element row for
//! it. A non-null result with no matching element (written by a tool that
//! did not enforce the key) reads as an absent combination; use
//! [`RelationalStore::get_combination_row`] to see the raw row.
//!
//! Schema initialisation is guarded by `PRAGMA user_version`.

use crate::primitives::{DEFAULT_ELEMENTS, RELATIONAL_SCHEMA_VERSION};
use crate::store::{announce_combination, announce_element, now_millis};
use crate::types::is_nothing;
use crate::{Combination, Element, PairKey, Store, StoreError, StoreStats};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const BACKEND_NAME: &str = "relational";

const BUSY_TIMEOUT_MS: u64 = 5_000;

const SELECT_COMBINATION: &str = "
    SELECT c.first, c.second, c.result, c.createdStamp,
           e.text, e.emoji, e.discovered, e.createdStamp
    FROM combinations c
    LEFT OUTER JOIN elements e ON e.text = c.result";

fn unavailable(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable(e.to_string())
}

/// A combination row as stored, before the result join is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationRow {
    pub first: String,
    pub second: String,
    /// `None` encodes the "Nothing" marker.
    pub result: Option<String>,
    pub created_stamp: Option<i64>,
    /// The joined element, if the result text matched a row.
    pub element: Option<Element>,
}

impl CombinationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let element = match row.get::<_, Option<String>>(4)? {
            Some(text) => Some(Element {
                text,
                emoji: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                discovered: row.get(6)?,
                created_stamp: row.get(7)?,
            }),
            None => None,
        };
        Ok(Self {
            first: row.get(0)?,
            second: row.get(1)?,
            result: row.get(2)?,
            created_stamp: row.get(3)?,
            element,
        })
    }

    /// Resolve into a combination, or `None` if the result join dangles.
    #[must_use]
    pub fn resolve(self) -> Option<Combination> {
        let result = match (self.result, self.element) {
            (None, _) => Element::nothing(),
            (Some(_), Some(element)) => element,
            (Some(_), None) => return None,
        };
        Some(Combination {
            first: self.first,
            second: self.second,
            result,
            created_stamp: self.created_stamp,
        })
    }
}

fn element_from_row(row: &Row<'_>) -> rusqlite::Result<Element> {
    Ok(Element {
        text: row.get(0)?,
        emoji: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        discovered: row.get(2)?,
        created_stamp: row.get(3)?,
    })
}

/// Result column value for a result element.
fn result_column(result: &Element) -> Option<&str> {
    if result.is_nothing() {
        None
    } else {
        Some(result.text.as_str())
    }
}

/// A relational store on a single SQLite connection.
///
/// The connection is guarded by a mutex; each trait call holds it for one
/// statement or one transaction.
pub struct RelationalStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for RelationalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalStore").finish_non_exhaustive()
    }
}

impl RelationalStore {
    /// Open or create a relational store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(unavailable)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(unavailable)?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
            .map_err(unavailable)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("connection lock poisoned".to_string()))
    }

    /// Raw combination row, without resolving the result join.
    pub fn get_combination_row(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Option<CombinationRow>, StoreError> {
        let (first, second) = PairKey::sorted(first, second);
        let conn = self.lock()?;
        conn.query_row(
            &format!("{SELECT_COMBINATION} WHERE c.first = ?1 AND c.second = ?2"),
            params![first, second],
            CombinationRow::from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    /// Recorded `user_version`.
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        read_user_version(&conn)
    }
}

fn read_user_version(conn: &Connection) -> Result<i64, StoreError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(unavailable)
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    let version = read_user_version(conn)?;
    if version > RELATIONAL_SCHEMA_VERSION {
        return Err(StoreError::SchemaError(format!(
            "database user_version {} is newer than supported {}",
            version, RELATIONAL_SCHEMA_VERSION
        )));
    }
    if version == RELATIONAL_SCHEMA_VERSION {
        return Ok(());
    }

    tracing::info!(
        from = version,
        to = RELATIONAL_SCHEMA_VERSION,
        "Initializing relational store schema"
    );

    conn.execute_batch("BEGIN IMMEDIATE").map_err(unavailable)?;
    let applied = create_and_seed(conn);
    match applied {
        Ok(()) => conn.execute_batch("COMMIT").map_err(unavailable),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn create_and_seed(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS elements (
           text TEXT NOT NULL PRIMARY KEY,
           emoji TEXT NULL,
           discovered BOOLEAN NOT NULL DEFAULT 0 CHECK (discovered IN (0, 1)),
           createdStamp INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS ix_elements_createdStamp
           ON elements (createdStamp);
         CREATE TABLE IF NOT EXISTS combinations (
           first TEXT NOT NULL,
           second TEXT NOT NULL,
           result TEXT NULL REFERENCES elements (text),
           createdStamp INTEGER NOT NULL,
           PRIMARY KEY (first, second)
         );
         CREATE INDEX IF NOT EXISTS ix_combinations_first ON combinations (first);
         CREATE INDEX IF NOT EXISTS ix_combinations_second ON combinations (second);
         CREATE INDEX IF NOT EXISTS ix_combinations_result ON combinations (result);
         CREATE INDEX IF NOT EXISTS ix_combinations_createdStamp
           ON combinations (createdStamp);",
    )
    .map_err(unavailable)?;

    let stamp = now_millis();
    for (text, emoji) in DEFAULT_ELEMENTS {
        conn.execute(
            "INSERT OR IGNORE INTO elements (text, emoji, discovered, createdStamp)
             VALUES (?1, ?2, 0, ?3)",
            params![text, emoji, stamp],
        )
        .map_err(unavailable)?;
    }
    conn.pragma_update(None, "user_version", RELATIONAL_SCHEMA_VERSION)
        .map_err(unavailable)?;
    Ok(())
}

// =============================================================================
// STORE TRAIT IMPLEMENTATION
// =============================================================================

impl Store for RelationalStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn get_all_elements(&self) -> Result<Vec<Element>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT text, emoji, discovered, createdStamp FROM elements")
            .map_err(unavailable)?;
        let rows = stmt.query_map([], element_from_row).map_err(unavailable)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)
    }

    fn get_element(&self, text: &str) -> Result<Option<Element>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT text, emoji, discovered, createdStamp FROM elements WHERE text = ?1",
            params![text],
            element_from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    fn save_element(&self, element: &Element) -> Result<Element, StoreError> {
        let stored = element.stamped(now_millis());
        let inserted = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT OR IGNORE INTO elements (text, emoji, discovered, createdStamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    stored.text,
                    stored.emoji,
                    stored.discovered,
                    stored.created_stamp
                ],
            )
            .map_err(unavailable)?
        };
        if inserted == 0 {
            return Err(StoreError::DuplicateKey(stored.text));
        }
        announce_element(BACKEND_NAME, &stored);
        Ok(stored)
    }

    fn get_all_combinations(&self) -> Result<Vec<Combination>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(SELECT_COMBINATION).map_err(unavailable)?;
        let rows = stmt
            .query_map([], CombinationRow::from_row)
            .map_err(unavailable)?;

        let mut combinations = Vec::new();
        for row in rows {
            if let Some(combination) = row.map_err(unavailable)?.resolve() {
                combinations.push(combination);
            }
        }
        Ok(combinations)
    }

    fn get_combination(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Option<Combination>, StoreError> {
        Ok(self
            .get_combination_row(first, second)?
            .and_then(CombinationRow::resolve))
    }

    fn save_combination(&self, combination: &Combination) -> Result<Combination, StoreError> {
        let mut stored = combination.clone().sorted();
        let stamp = now_millis();
        stored.created_stamp = Some(stamp);

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        // The result element is created alongside its first combination.
        let created_result = match result_column(&stored.result) {
            Some(text) => {
                let result = stored.result.stamped(stamp);
                let inserted = tx
                    .execute(
                        "INSERT OR IGNORE INTO elements (text, emoji, discovered, createdStamp)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![text, result.emoji, result.discovered, stamp],
                    )
                    .map_err(unavailable)?;
                (inserted > 0).then_some(result)
            }
            None => None,
        };

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO combinations (first, second, result, createdStamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    stored.first,
                    stored.second,
                    result_column(&stored.result),
                    stamp
                ],
            )
            .map_err(unavailable)?;
        if inserted == 0 {
            // Dropping the transaction rolls back the result element insert.
            drop(tx);
            return Err(StoreError::DuplicateKey(stored.key().to_string()));
        }
        tx.commit().map_err(unavailable)?;
        drop(conn);

        if let Some(result) = &created_result {
            announce_element(BACKEND_NAME, result);
        }
        announce_combination(BACKEND_NAME, &stored);
        Ok(stored)
    }

    fn relink_result(&self, key: &PairKey, result: &Element) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM combinations WHERE first = ?1 AND second = ?2",
                params![key.first, key.second],
                |_| Ok(()),
            )
            .optional()
            .map_err(unavailable)?
            .is_some();
        if !exists {
            return Ok(false);
        }

        if let Some(text) = result_column(result) {
            tx.execute(
                "INSERT OR IGNORE INTO elements (text, emoji, discovered, createdStamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    text,
                    result.emoji,
                    result.discovered,
                    result.created_stamp.unwrap_or_else(now_millis)
                ],
            )
            .map_err(unavailable)?;
        }
        let changed = tx
            .execute(
                "UPDATE combinations SET result = ?3
                 WHERE first = ?1 AND second = ?2 AND result IS NOT ?3",
                params![key.first, key.second, result_column(result)],
            )
            .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;
        Ok(changed > 0)
    }

    fn combinations_yielding(&self, text: &str) -> Result<Vec<Combination>, StoreError> {
        let conn = self.lock()?;
        let rows: Vec<CombinationRow> = if is_nothing(text) {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COMBINATION} WHERE c.result IS NULL"))
                .map_err(unavailable)?;
            let rows = stmt
                .query_map([], CombinationRow::from_row)
                .map_err(unavailable)?;
            rows.collect::<Result<_, _>>().map_err(unavailable)?
        } else {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COMBINATION} WHERE c.result = ?1"))
                .map_err(unavailable)?;
            let rows = stmt
                .query_map(params![text], CombinationRow::from_row)
                .map_err(unavailable)?;
            rows.collect::<Result<_, _>>().map_err(unavailable)?
        };
        Ok(rows
            .into_iter()
            .filter_map(CombinationRow::resolve)
            .collect())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;
        let count = |sql: &str| -> Result<usize, StoreError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(unavailable)
        };
        Ok(StoreStats {
            element_count: count("SELECT COUNT(*) FROM elements")?,
            combination_count: count("SELECT COUNT(*) FROM combinations")?,
            discovery_count: count("SELECT COUNT(*) FROM elements WHERE discovered = 1")?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::NOTHING_TEXT;
    use tempfile::tempdir;

    fn steam() -> Element {
        Element::new("Steam", "💨", true)
    }

    #[test]
    fn fresh_store_is_seeded() {
        let store = RelationalStore::open_in_memory().expect("open");
        assert_eq!(
            store.schema_version().expect("version"),
            RELATIONAL_SCHEMA_VERSION
        );
        assert_eq!(store.get_all_elements().expect("all").len(), 4);
    }

    #[test]
    fn reopen_is_idempotent() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.db");
        {
            let store = RelationalStore::open(&path).expect("open");
            store.save_element(&steam()).expect("save");
        }
        let store = RelationalStore::open(&path).expect("reopen");
        assert_eq!(store.get_all_elements().expect("all").len(), 5);
    }

    #[test]
    fn newer_user_version_is_rejected() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.db");
        {
            let conn = Connection::open(&path).expect("raw open");
            conn.pragma_update(None, "user_version", 7).expect("pragma");
        }
        let result = RelationalStore::open(&path);
        assert!(matches!(result, Err(StoreError::SchemaError(_))));
    }

    #[test]
    fn duplicate_element_reports_conflict() {
        let store = RelationalStore::open_in_memory().expect("open");
        let result = store.save_element(&Element::new("Water", "🌊", true));
        assert!(matches!(result, Err(StoreError::DuplicateKey(_))));

        let water = store.get_element("Water").expect("get").expect("seeded");
        assert_eq!(water.emoji, "💧");
        assert!(!water.discovered);
    }

    #[test]
    fn nothing_is_stored_as_null_result() {
        let store = RelationalStore::open_in_memory().expect("open");
        store
            .save_combination(&Combination::new("Wind", "Earth", Element::nothing()))
            .expect("save");

        let row = store
            .get_combination_row("Earth", "Wind")
            .expect("row")
            .expect("present");
        assert_eq!(row.result, None);

        let combo = store
            .get_combination("Wind", "Earth")
            .expect("get")
            .expect("resolved");
        assert_eq!(combo.result.text, NOTHING_TEXT);
        assert!(store.get_element(NOTHING_TEXT).expect("get").is_none());
    }

    #[test]
    fn dangling_result_reads_as_absent() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.db");
        RelationalStore::open(&path).expect("init");
        {
            // Another writer without foreign key enforcement.
            let conn = Connection::open(&path).expect("raw open");
            conn.pragma_update(None, "foreign_keys", "OFF")
                .expect("pragma");
            conn.execute(
                "INSERT INTO combinations (first, second, result, createdStamp)
                 VALUES ('Fire', 'Water', 'Ghost', 1)",
                [],
            )
            .expect("raw insert");
        }

        let store = RelationalStore::open(&path).expect("open");
        assert!(store.get_combination("Water", "Fire").expect("get").is_none());
        assert!(store.get_all_combinations().expect("all").is_empty());

        let row = store
            .get_combination_row("Water", "Fire")
            .expect("row")
            .expect("raw row present");
        assert_eq!(row.result.as_deref(), Some("Ghost"));
        assert!(row.element.is_none());
    }

    #[test]
    fn relink_repairs_dangling_result() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("craft.db");
        RelationalStore::open(&path).expect("init");
        {
            let conn = Connection::open(&path).expect("raw open");
            conn.pragma_update(None, "foreign_keys", "OFF")
                .expect("pragma");
            conn.execute(
                "INSERT INTO combinations (first, second, result, createdStamp)
                 VALUES ('Fire', 'Water', 'Ghost', 1)",
                [],
            )
            .expect("raw insert");
        }
        let store = RelationalStore::open(&path).expect("open");

        let key = PairKey::new("Fire", "Water");
        assert!(store.relink_result(&key, &steam()).expect("relink"));
        let combo = store
            .get_combination("Fire", "Water")
            .expect("get")
            .expect("now resolvable");
        assert_eq!(combo.result.text, "Steam");
    }

    #[test]
    fn relink_of_absent_pair_writes_nothing() {
        let store = RelationalStore::open_in_memory().expect("open");

        let key = PairKey::new("Fire", "Water");
        assert!(!store.relink_result(&key, &steam()).expect("relink"));
        assert!(store.get_element("Steam").expect("get").is_none());
        assert!(store.get_combination("Fire", "Water").expect("get").is_none());
    }

    #[test]
    fn duplicate_combination_rolls_back_result_element() {
        let store = RelationalStore::open_in_memory().expect("open");
        store
            .save_combination(&Combination::new("Fire", "Water", steam()))
            .expect("first");

        let again = store.save_combination(&Combination::new(
            "Water",
            "Fire",
            Element::new("Mist", "🌫️", false),
        ));
        assert!(matches!(again, Err(StoreError::DuplicateKey(_))));
        assert!(store.get_element("Mist").expect("get").is_none());
    }

    #[test]
    fn combinations_yielding_filters_by_result() {
        let store = RelationalStore::open_in_memory().expect("open");
        store
            .save_combination(&Combination::new("Fire", "Water", steam()))
            .expect("save");
        store
            .save_combination(&Combination::new("Earth", "Earth", Element::nothing()))
            .expect("save");

        assert_eq!(store.combinations_yielding("Steam").expect("steam").len(), 1);
        assert_eq!(
            store.combinations_yielding(NOTHING_TEXT).expect("nothing").len(),
            1
        );
        assert!(store.combinations_yielding("Lava").expect("lava").is_empty());
    }
}
