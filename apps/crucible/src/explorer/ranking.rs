//! # Candidate Ranking
//!
//! Every candidate element gets an integer priority: a random base plus
//! penalties. Lower scores are dispatched first.
//!
//! | Condition                       | Penalty                 |
//! |---------------------------------|-------------------------|
//! | each character of text          | `LENGTH_PENALTY`        |
//! | emoji is the uncertain glyph    | `UNCERTAIN_PENALTY`     |
//! | already `discovered`            | `DISCOVERED_PENALTY`    |
//! | text contains a digit           | `DIGIT_PENALTY`         |
//! | text is digits only             | `NUMERIC_PENALTY`       |
//!
//! The numeric penalty dwarfs the random range, so numeric tokens only come
//! up once nothing else is left.

use crucible_core::{Element, is_valid_element_text};
use rand::Rng;

/// Exclusive upper bound of the random base score.
pub const RANDOM_RANGE: i64 = 1_000;

/// Per-character penalty. Short texts are more "elemental".
pub const LENGTH_PENALTY: i64 = 15;

/// Placeholder glyph the oracle uses when it has no emoji for a result.
pub const UNCERTAIN_EMOJI: &str = "❓";

pub const UNCERTAIN_PENALTY: i64 = 500;
pub const DISCOVERED_PENALTY: i64 = 250;
pub const DIGIT_PENALTY: i64 = 1_000;
pub const NUMERIC_PENALTY: i64 = 1_000_000;

/// Deterministic part of the score.
#[must_use]
pub fn penalty(element: &Element) -> i64 {
    let text = element.text.as_str();
    let mut score = (text.chars().count() as i64).saturating_mul(LENGTH_PENALTY);

    if element.emoji == UNCERTAIN_EMOJI {
        score += UNCERTAIN_PENALTY;
    }
    if element.discovered {
        score += DISCOVERED_PENALTY;
    }
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    if has_digit {
        score += DIGIT_PENALTY;
    }
    let numeric = has_digit
        && text
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'));
    if numeric {
        score = score.saturating_add(NUMERIC_PENALTY);
    }
    score
}

/// Full priority score with a random base.
pub fn score<R: Rng + ?Sized>(element: &Element, rng: &mut R) -> i64 {
    rng.random_range(0..RANDOM_RANGE) + penalty(element)
}

/// Candidate texts ordered by ascending score.
///
/// Invalid candidates (the "Nothing" marker, empty text) are dropped.
pub fn rank<R: Rng + ?Sized>(elements: &[Element], rng: &mut R) -> Vec<String> {
    let mut scored: Vec<(i64, &str)> = elements
        .iter()
        .filter(|e| is_valid_element_text(&e.text))
        .map(|e| (score(e, rng), e.text.as_str()))
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().map(|(_, text)| text.to_string()).collect()
}

/// Pairs per round: a quarter of the element count, at least `min`.
#[must_use]
pub fn batch_size(total: usize, min: usize) -> usize {
    (total / 4).max(min)
}

/// One round of whole-space pairs.
///
/// Two independently ranked orderings, each truncated to the batch size,
/// paired index-wise.
pub fn round_pairs<R: Rng + ?Sized>(
    elements: &[Element],
    min_batch: usize,
    rng: &mut R,
) -> Vec<(String, String)> {
    let batch = batch_size(elements.len(), min_batch);
    let firsts = rank(elements, rng).into_iter().take(batch);
    let seconds = rank(elements, rng).into_iter().take(batch);
    firsts.zip(seconds).collect()
}

/// One round of pairs with the first operand fixed to `seed`.
pub fn seeded_pairs<R: Rng + ?Sized>(
    seed: &str,
    elements: &[Element],
    rng: &mut R,
) -> Vec<(String, String)> {
    rank(elements, rng)
        .into_iter()
        .map(|second| (seed.to_string(), second))
        .collect()
}
