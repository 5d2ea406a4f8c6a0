//! # Core Type Definitions
//!
//! This module contains the persistent model of a crafting search:
//! - `Element`: a named, emoji-tagged unit of the crafting space
//! - `Combination`: an unordered pair of element texts mapped to a result
//! - `PairKey`: the sorted key every combination is stored under
//! - `StoreError`: the error taxonomy shared by all store backends
//!
//! ## Ordering Guarantee
//!
//! A pair key is always stored with `first <= second` (byte-wise, the same
//! order `str::cmp` uses). `(A, B)` and `(B, A)` therefore resolve to the
//! same record in every backend.

use crate::primitives::{NOTHING_EMOJI, NOTHING_TEXT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ELEMENT
// =============================================================================

/// An element of the crafting space.
///
/// Elements are immutable once stored. `discovered` records that the oracle
/// flagged the element as globally new at creation time; it is never updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique, case-sensitive key.
    pub text: String,
    /// Display glyph. May be empty.
    #[serde(default)]
    pub emoji: String,
    /// Whether the oracle reported this element as a first discovery.
    #[serde(default)]
    pub discovered: bool,
    /// Epoch milliseconds of insertion. `None` until a store assigns it.
    #[serde(default)]
    pub created_stamp: Option<i64>,
}

impl Element {
    /// Create an element that has not been stored yet.
    #[must_use]
    pub fn new(text: impl Into<String>, emoji: impl Into<String>, discovered: bool) -> Self {
        Self {
            text: text.into(),
            emoji: emoji.into(),
            discovered,
            created_stamp: None,
        }
    }

    /// The "yields nothing" marker element.
    #[must_use]
    pub fn nothing() -> Self {
        Self::new(NOTHING_TEXT, NOTHING_EMOJI, false)
    }

    /// Whether this element is the "yields nothing" marker.
    #[must_use]
    pub fn is_nothing(&self) -> bool {
        is_nothing(&self.text)
    }

    /// Copy of this element with the creation stamp set.
    #[must_use]
    pub fn stamped(&self, stamp: i64) -> Self {
        Self {
            created_stamp: Some(stamp),
            ..self.clone()
        }
    }

    /// Same text, emoji and discovery flag, ignoring the creation stamp.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.text == other.text && self.emoji == other.emoji && self.discovered == other.discovered
    }
}

/// Whether a result text is the "yields nothing" marker.
#[must_use]
pub fn is_nothing(text: &str) -> bool {
    text == NOTHING_TEXT
}

/// Whether a text may be fed back into the candidate pool.
#[must_use]
pub fn is_valid_element_text(text: &str) -> bool {
    !text.is_empty() && !is_nothing(text)
}

// =============================================================================
// PAIR KEY
// =============================================================================

/// The sorted `(first, second)` key of a combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub first: String,
    pub second: String,
}

impl PairKey {
    /// Build a key from two texts in any order.
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Borrowed sorted view of two texts.
    #[must_use]
    pub fn sorted<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b { (a, b) } else { (b, a) }
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.first, self.second)
    }
}

// =============================================================================
// COMBINATION
// =============================================================================

/// A stored mapping from an unordered pair of element texts to a result.
///
/// `result` is a snapshot of the result element. Backends that join on read
/// always return the canonical record; backends that embed the snapshot may
/// drift and are repaired by [`crate::maintenance::relink_stale_results`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    pub first: String,
    pub second: String,
    pub result: Element,
    #[serde(default)]
    pub created_stamp: Option<i64>,
}

impl Combination {
    /// Create a combination with its pair already sorted.
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>, result: Element) -> Self {
        let key = PairKey::new(a, b);
        Self {
            first: key.first,
            second: key.second,
            result,
            created_stamp: None,
        }
    }

    /// The sorted key of this combination.
    #[must_use]
    pub fn key(&self) -> PairKey {
        PairKey::new(self.first.clone(), self.second.clone())
    }

    /// Copy with the pair sorted. Callers may have built the struct literally.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        if self.first > self.second {
            std::mem::swap(&mut self.first, &mut self.second);
        }
        self
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by a [`crate::Store`] backend.
///
/// - `DuplicateKey` is normal control flow (insert-or-ignore)
/// - `StorageUnavailable` aborts the current operation only
/// - `SchemaError` means migration could not bring the handle up to date
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same key already exists; nothing was written.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The backend could not be reached or an I/O operation failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The stored schema is incompatible with this build.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend does not hold this kind of record.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// Whether this error only reports an existing record.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
