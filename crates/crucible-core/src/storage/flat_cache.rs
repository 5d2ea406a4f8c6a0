//! # Flat Cache
//!
//! A single JSON document holding only elements:
//!
//! ```json
//! { "elements": [ { "text": "Water", "emoji": "💧", "discovered": false } ] }
//! ```
//!
//! The cache is a cross-session staging area, not a source of truth. On
//! startup its elements are imported into the primary store; on shutdown it
//! is overwritten with the primary store's full element snapshot.
//!
//! Reads are best-effort: a missing, unreadable, oversized or malformed
//! document reads as empty. The cache holds no combinations.

use crate::primitives::{CACHE_DOCUMENT_KEY, MAX_CACHE_DOCUMENT_SIZE};
use crate::store::{announce_element, now_millis};
use crate::{Combination, Element, PairKey, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const BACKEND_NAME: &str = "cache";

/// On-disk shape of the cache document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDocument {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Element-only staging store backed by one JSON file.
#[derive(Debug)]
pub struct FlatCache {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the document.
    guard: Mutex<()>,
}

impl FlatCache {
    /// Cache document at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Cache document under its fixed key inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{CACHE_DOCUMENT_KEY}.json")))
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, treating any failure as an empty cache.
    #[must_use]
    pub fn load(&self) -> CacheDocument {
        match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => CacheDocument::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable cache: {}", e);
                CacheDocument::default()
            }
        }
    }

    fn read_document(&self) -> Result<Option<CacheDocument>, StoreError> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::StorageUnavailable(e.to_string())),
        };
        if metadata.len() > MAX_CACHE_DOCUMENT_SIZE {
            return Err(StoreError::Serialization(format!(
                "cache document is {} bytes, limit is {}",
                metadata.len(),
                MAX_CACHE_DOCUMENT_SIZE
            )));
        }
        let data = std::fs::read(&self.path)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write_document(&self, document: &CacheDocument) -> Result<(), StoreError> {
        let data = serde_json::to_vec(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &data).map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))
    }

    /// Replace the whole document with `primary`'s element snapshot.
    ///
    /// Failure to write the cache is logged and reported as `Ok(false)`.
    /// Failure to read `primary` is an error.
    pub fn overwrite_from(&self, primary: &dyn Store) -> Result<bool, StoreError> {
        let document = CacheDocument {
            elements: primary.get_all_elements()?,
        };
        let _lock = self.guard.lock();
        match self.write_document(&document) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.path.display(),
                    elements = document.elements.len(),
                    "Cache overwritten"
                );
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Cache not written: {}", e);
                Ok(false)
            }
        }
    }
}

// =============================================================================
// STORE TRAIT IMPLEMENTATION (elements only)
// =============================================================================

impl Store for FlatCache {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn get_all_elements(&self) -> Result<Vec<Element>, StoreError> {
        let _lock = self.guard.lock();
        Ok(self.load().elements)
    }

    fn get_element(&self, text: &str) -> Result<Option<Element>, StoreError> {
        let _lock = self.guard.lock();
        Ok(self.load().elements.into_iter().find(|e| e.text == text))
    }

    fn save_element(&self, element: &Element) -> Result<Element, StoreError> {
        let stored = element.stamped(now_millis());
        {
            let _lock = self.guard.lock();
            let mut document = self.load();
            if document.elements.iter().any(|e| e.text == stored.text) {
                return Err(StoreError::DuplicateKey(stored.text));
            }
            document.elements.push(stored.clone());
            self.write_document(&document)?;
        }
        announce_element(BACKEND_NAME, &stored);
        Ok(stored)
    }

    fn get_all_combinations(&self) -> Result<Vec<Combination>, StoreError> {
        Ok(Vec::new())
    }

    fn get_combination(
        &self,
        _first: &str,
        _second: &str,
    ) -> Result<Option<Combination>, StoreError> {
        Ok(None)
    }

    fn save_combination(&self, combination: &Combination) -> Result<Combination, StoreError> {
        Err(StoreError::Unsupported(format!(
            "the element cache cannot hold combination {}",
            combination.key()
        )))
    }

    fn relink_result(&self, _key: &PairKey, _result: &Element) -> Result<bool, StoreError> {
        Ok(false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
