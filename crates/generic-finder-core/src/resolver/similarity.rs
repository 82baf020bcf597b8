//! String similarity measures for approximate name matching.
//!
//! The default is gestalt pattern matching (Ratcliff/Obershelp): twice the
//! number of characters in matching blocks over the combined length. One
//! inserted or deleted character in a 7-9 letter name scores about 0.92-0.95.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein, sorensen_dice};

/// Similarity measure used by the approximate stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Ratcliff/Obershelp matching-blocks ratio
    #[default]
    Gestalt,
    JaroWinkler,
    NormalizedLevenshtein,
    SorensenDice,
}

impl SimilarityMetric {
    /// Similarity in `[0, 1]`; 1.0 for identical strings.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::Gestalt => gestalt_ratio(a, b),
            SimilarityMetric::JaroWinkler => jaro_winkler(a, b),
            SimilarityMetric::NormalizedLevenshtein => normalized_levenshtein(a, b),
            SimilarityMetric::SorensenDice => sorensen_dice(a, b),
        }
    }

    /// Cheap upper bound on `score`, used to skip hopeless candidates.
    pub(crate) fn upper_bound(&self, a_len: usize, b_len: usize) -> f64 {
        match self {
            SimilarityMetric::Gestalt => length_bound(a_len, b_len),
            _ => 1.0,
        }
    }
}

/// Gestalt pattern matching ratio over characters.
pub fn gestalt_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Best possible gestalt ratio for two lengths.
fn length_bound(a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    2.0 * a_len.min(b_len) as f64 / total as f64
}

/// Total size of the matching blocks: take the longest common block, then
/// recurse into the pieces on either side of it.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut pending = vec![(0, a.len(), 0, b.len())];
    let mut matched = 0;

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    // run[k + 1] = length of the common run ending at a[i - 1], b[blo + k]
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for (k, &bc) in b[blo..bhi].iter().enumerate() {
            current[k + 1] = if a[i] == bc { previous[k] + 1 } else { 0 };
            let run = current[k + 1];
            if run > best.2 {
                best = (i + 1 - run, blo + k + 1 - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}
