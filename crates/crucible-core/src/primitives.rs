//! # Fixed Primitives
//!
//! Compiled-in constants shared by every store backend and by the explorer.
//! None of these are configurable at runtime.

/// Result text the oracle returns when a pair yields nothing.
///
/// - Never a candidate for further combination.
/// - Never required to exist as an element row.
/// - A combination may still point at it.
pub const NOTHING_TEXT: &str = "Nothing";

/// Emoji paired with [`NOTHING_TEXT`].
pub const NOTHING_EMOJI: &str = "";

/// Seed elements inserted on first-time schema initialisation, as
/// `(text, emoji)`. All are seeded with `discovered = false`.
pub const DEFAULT_ELEMENTS: [(&str, &str); 4] = [
    ("Water", "💧"),
    ("Fire", "🔥"),
    ("Wind", "🌬️"),
    ("Earth", "🌍"),
];

/// Target schema version for the indexed (redb) backend.
///
/// - 1: elements + combinations tables, default seed
/// - 2: secondary indexes on first/second/result and element emoji
/// - 3: createdStamp indexes on both tables
pub const INDEXED_SCHEMA_VERSION: u64 = 3;

/// Target schema version for the relational (SQLite) backend,
/// stored in `PRAGMA user_version`.
pub const RELATIONAL_SCHEMA_VERSION: i64 = 1;

/// Logical key of the flat cache staging document.
pub const CACHE_DOCUMENT_KEY: &str = "infinite-craft-data";

/// Maximum accepted size of the cache document before it is ignored.
///
/// The cache is best-effort: an oversized document is treated as absent.
pub const MAX_CACHE_DOCUMENT_SIZE: u64 = 64 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_default_elements() {
        let texts: Vec<_> = DEFAULT_ELEMENTS.iter().map(|(t, _)| *t).collect();
        assert_eq!(texts, vec!["Water", "Fire", "Wind", "Earth"]);
    }

    #[test]
    fn sentinel_is_not_a_default() {
        assert!(DEFAULT_ELEMENTS.iter().all(|(t, _)| *t != NOTHING_TEXT));
    }
}
