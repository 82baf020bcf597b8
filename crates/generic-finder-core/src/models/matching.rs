//! Free-text resolution results.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

use super::CatalogEntry;

/// How a token reached its canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Token equals the name key after cleaning
    Exact,
    /// Token resolved through similarity scoring
    Approximate { score: f64 },
}

impl MatchKind {
    pub fn is_exact(&self) -> bool {
        matches!(self, MatchKind::Exact)
    }

    /// Similarity score, `None` for exact matches.
    pub fn score(&self) -> Option<f64> {
        match self {
            MatchKind::Exact => None,
            MatchKind::Approximate { score } => Some(*score),
        }
    }
}

/// One resolved canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedName {
    /// Canonical name key in the catalog
    pub name_key: String,
    /// Exact or approximate
    pub kind: MatchKind,
    /// Cleaned token that produced the match
    pub token: String,
}

/// Deduplicated set of names recognized in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    matches: Vec<MatchedName>,
}

impl MatchResult {
    /// Record a match, merging with any earlier match of the same name.
    ///
    /// An exact match replaces an approximate one; between approximate
    /// matches the higher score is kept.
    pub fn record(&mut self, matched: MatchedName) {
        let Some(existing) = self
            .matches
            .iter_mut()
            .find(|m| m.name_key == matched.name_key)
        else {
            self.matches.push(matched);
            return;
        };

        let upgrade = match (existing.kind, matched.kind) {
            (MatchKind::Exact, _) => false,
            (MatchKind::Approximate { .. }, MatchKind::Exact) => true,
            (MatchKind::Approximate { score: old }, MatchKind::Approximate { score: new }) => {
                new > old
            }
        };
        if upgrade {
            *existing = matched;
        }
    }

    /// Matches in first-resolution order.
    pub fn matches(&self) -> &[MatchedName] {
        &self.matches
    }

    pub fn get(&self, name_key: &str) -> Option<&MatchedName> {
        self.matches.iter().find(|m| m.name_key == name_key)
    }

    pub fn contains(&self, name_key: &str) -> bool {
        self.get(name_key).is_some()
    }

    pub fn name_keys(&self) -> impl Iterator<Item = &str> {
        self.matches.iter().map(|m| m.name_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Every catalog entry carrying a resolved name, in catalog order.
    pub fn entries<'c>(&self, catalog: &'c Catalog) -> Vec<&'c CatalogEntry> {
        catalog
            .entries()
            .iter()
            .filter(|e| self.contains(e.name_key()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(name: &str, kind: MatchKind) -> MatchedName {
        MatchedName {
            name_key: name.into(),
            kind,
            token: name.into(),
        }
    }

    #[test]
    fn test_record_deduplicates() {
        let mut result = MatchResult::default();
        result.record(matched("calpol", MatchKind::Exact));
        result.record(matched("calpol", MatchKind::Exact));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_exact_replaces_approximate() {
        let mut result = MatchResult::default();
        result.record(matched("calpol", MatchKind::Approximate { score: 0.9 }));
        result.record(matched("calpol", MatchKind::Exact));

        assert!(result.get("calpol").unwrap().kind.is_exact());
    }

    #[test]
    fn test_approximate_never_replaces_exact() {
        let mut result = MatchResult::default();
        result.record(matched("calpol", MatchKind::Exact));
        result.record(matched("calpol", MatchKind::Approximate { score: 0.99 }));

        assert_eq!(result.get("calpol").unwrap().kind, MatchKind::Exact);
    }

    #[test]
    fn test_best_approximate_score_kept() {
        let mut result = MatchResult::default();
        result.record(matched("calpol", MatchKind::Approximate { score: 0.86 }));
        result.record(matched("calpol", MatchKind::Approximate { score: 0.92 }));
        result.record(matched("calpol", MatchKind::Approximate { score: 0.88 }));

        assert_eq!(result.get("calpol").unwrap().kind.score(), Some(0.92));
    }

    #[test]
    fn test_order_is_first_resolution() {
        let mut result = MatchResult::default();
        result.record(matched("dolo", MatchKind::Exact));
        result.record(matched("calpol", MatchKind::Exact));
        result.record(matched("dolo", MatchKind::Exact));

        let keys: Vec<_> = result.name_keys().collect();
        assert_eq!(keys, vec!["dolo", "calpol"]);
    }
}
