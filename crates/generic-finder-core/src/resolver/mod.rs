//! Free-text resolution of medicine names.
//!
//! Pipeline: Recognized text → Words → Literal names → Exact lookup → Approximate match → MatchResult

mod similarity;
mod tokenizer;

pub use similarity::*;
pub use tokenizer::*;

use crate::catalog::Catalog;
use crate::config::MatchConfig;
use crate::models::{MatchKind, MatchResult, MatchedName};

/// Resolve text against a catalog with the default threshold and metric.
pub fn resolve(catalog: &Catalog, raw_text: &str) -> MatchResult {
    TextResolver::new(catalog).resolve(raw_text)
}

/// Resolves tokens of recognized text to canonical catalog names.
pub struct TextResolver<'a> {
    catalog: &'a Catalog,
    config: MatchConfig,
}

impl<'a> TextResolver<'a> {
    /// Create a resolver with default matching settings.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_config(catalog, MatchConfig::default())
    }

    pub fn with_config(catalog: &'a Catalog, config: MatchConfig) -> Self {
        Self { catalog, config }
    }

    /// Resolve every line of `raw_text`.
    ///
    /// At each word, the longest run of words spelling a multi-word or
    /// non-alphabetic catalog name is taken as an exact match; other words
    /// are cleaned and resolved one at a time. Unmatched words are skipped;
    /// empty text gives an empty result.
    pub fn resolve(&self, raw_text: &str) -> MatchResult {
        let mut result = MatchResult::default();
        for line in raw_text.lines() {
            let line_words = words(line);
            let mut position = 0;
            while position < line_words.len() {
                if let Some((matched, used)) = self.literal_match(&line_words[position..]) {
                    result.record(matched);
                    position += used;
                    continue;
                }
                if let Some(matched) = clean_word(&line_words[position])
                    .and_then(|token| self.resolve_token(&token))
                {
                    result.record(matched);
                }
                position += 1;
            }
        }
        result
    }

    /// Longest leading run of `words` that spells a literal catalog name.
    fn literal_match(&self, words: &[String]) -> Option<(MatchedName, usize)> {
        let longest = self.catalog.literal_words().min(words.len());
        (1..=longest).rev().find_map(|used| {
            let phrase = words[..used].join(" ");
            let name_key = self.catalog.literal_name(&phrase)?;
            tracing::trace!(phrase = phrase.as_str(), name = name_key, "Literal name match");
            Some((
                MatchedName {
                    name_key: name_key.to_string(),
                    kind: MatchKind::Exact,
                    token: phrase,
                },
                used,
            ))
        })
    }

    /// Resolve one cleaned token: exact lookup first, then similarity.
    pub fn resolve_token(&self, token: &str) -> Option<MatchedName> {
        if self.catalog.contains_name(token) {
            return Some(MatchedName {
                name_key: token.to_string(),
                kind: MatchKind::Exact,
                token: token.to_string(),
            });
        }

        let Some((name_key, score)) = self.best_match(token) else {
            tracing::trace!(token, "No name above match threshold");
            return None;
        };

        tracing::debug!(token, name = name_key, score, "Approximate name match");
        Some(MatchedName {
            name_key: name_key.to_string(),
            kind: MatchKind::Approximate { score },
            token: token.to_string(),
        })
    }

    /// Highest-scoring name at or above the threshold.
    ///
    /// Each candidate name is compared against the token (in that order, the
    /// gestalt ratio is not symmetric). Equal scores go to the name that sorts
    /// last.
    pub fn best_match(&self, token: &str) -> Option<(&'a str, f64)> {
        let metric = self.config.metric;
        let threshold = self.config.threshold;
        let token_len = token.chars().count();
        let mut best: Option<(&'a str, f64)> = None;

        for name in self.catalog.name_universe() {
            let floor = best.map_or(threshold, |(_, s)| s);
            if metric.upper_bound(name.chars().count(), token_len) < floor {
                continue;
            }
            let score = metric.score(name, token);
            let improves = match best {
                None => score >= threshold,
                Some((best_name, s)) => score > s || (score == s && name.as_str() > best_name),
            };
            if improves {
                best = Some((name.as_str(), score));
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::load_catalog;
    use serde_json::json;

    fn setup_catalog() -> Catalog {
        load_catalog(&json!([
            {"Name": "Paracet", "Formulation": "Paracetamol 500mg"},
            {"Name": "Calpol", "Formulation": "Paracetamol 500mg"},
            {"Name": "Azee", "Formulation": "Azithromycin 500mg"},
            {"Name": "Pan D", "Formulation": "Pantoprazole + Domperidone"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_approximate_scenario() {
        let catalog = setup_catalog();
        let result = resolve(&catalog, "Take Paracetol twice daily");

        assert_eq!(result.len(), 1);
        let matched = result.get("paracet").unwrap();
        assert_eq!(matched.token, "paracetol");
        let score = matched.kind.score().unwrap();
        assert!((score - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_exact_stage_wins() {
        let catalog = setup_catalog();
        let result = resolve(&catalog, "Calpol 500mg TDS");

        assert_eq!(result.get("calpol").unwrap().kind, MatchKind::Exact);
    }

    #[test]
    fn test_deduplicates_repeated_mentions() {
        let catalog = setup_catalog();
        let result = resolve(&catalog, "Azee\nazee 250\nAZEE once");

        assert_eq!(result.len(), 1);
        assert!(result.contains("azee"));
    }

    #[test]
    fn test_empty_text() {
        let catalog = setup_catalog();
        assert!(resolve(&catalog, "").is_empty());
        assert!(resolve(&catalog, "  \n\t ").is_empty());
    }

    #[test]
    fn test_nothing_recognized() {
        let catalog = setup_catalog();
        assert!(resolve(&catalog, "Drink plenty of water").is_empty());
    }

    #[test]
    fn test_below_threshold_rejected() {
        let catalog = setup_catalog();
        // "calp" vs "calpol": 2 * 4 / 10 = 0.8
        assert!(resolve(&catalog, "calp").is_empty());
    }

    #[test]
    fn test_stricter_threshold() {
        let catalog = setup_catalog();
        let config = MatchConfig {
            threshold: 0.9,
            ..Default::default()
        };
        let resolver = TextResolver::with_config(&catalog, config);

        assert!(resolver.resolve("paracetol").is_empty());
        assert!(resolver.resolve("paracet").contains("paracet"));
    }

    #[test]
    fn test_alternate_metric() {
        let catalog = setup_catalog();
        let config = MatchConfig {
            threshold: 0.85,
            metric: SimilarityMetric::JaroWinkler,
        };
        let resolver = TextResolver::with_config(&catalog, config);

        let matched = resolver.resolve_token("paracetol").unwrap();
        assert_eq!(matched.name_key, "paracet");
    }

    #[test]
    fn test_best_match_tie_prefers_last_sorted_name() {
        let catalog = load_catalog(&json!([
            {"Name": "Abcd"},
            {"Name": "Abce"}
        ]))
        .unwrap();

        // "abcx" scores 0.75 against both names
        assert!(TextResolver::new(&catalog).best_match("abcx").is_none());

        let config = MatchConfig {
            threshold: 0.5,
            ..Default::default()
        };
        let loose = TextResolver::with_config(&catalog, config);
        let (name, score) = loose.best_match("abcx").unwrap();
        assert_eq!(name, "abce");
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_candidate_scored_against_token() {
        let catalog = load_catalog(&json!([{"Name": "Bebcede"}])).unwrap();

        // ratio("bebcede", "bebedce") = 10/14; the reverse order would give 12/14
        assert!(resolve(&catalog, "bebedce").is_empty());

        let config = MatchConfig {
            threshold: 0.7,
            ..Default::default()
        };
        let (_, score) = TextResolver::with_config(&catalog, config)
            .best_match("bebedce")
            .unwrap();
        assert!((score - 10.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_literal_multi_word_names() {
        let catalog = load_catalog(&json!([
            {"Name": "Pan D", "Formulation": "Pantoprazole + Domperidone"},
            {"Name": "Dolo 650", "Formulation": "Paracetamol 650mg"},
            {"Name": "Dolo", "Formulation": "Paracetamol 500mg"}
        ]))
        .unwrap();

        let result = resolve(&catalog, "Tab Pan D once\nDolo 650, SOS\nDolo 500");
        let names: Vec<&str> = result.name_keys().collect();
        assert_eq!(names, vec!["pan d", "dolo 650", "dolo"]);
        assert!(result.matches().iter().all(|m| m.kind.is_exact()));
        assert_eq!(result.get("pan d").unwrap().token, "pan d");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let catalog = setup_catalog();
        let text = "Paracetol 1-0-1\nCalpol SOS\nAzeee x 3 days";
        assert_eq!(resolve(&catalog, text), resolve(&catalog, text));
    }
}
