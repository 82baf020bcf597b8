//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CanonicalField;
use crate::resolver::SimilarityMetric;

/// Minimum similarity for an approximate match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.85;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Threshold must be within [0, 1], got {0}")]
    Threshold(f64),

    #[error("Alias {alias:?} targets unknown field {target:?}")]
    UnknownField { alias: String, target: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchConfig,
    pub normalizer: NormalizerConfig,
}

/// Approximate matching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum similarity (inclusive) to accept a candidate
    pub threshold: f64,
    /// String similarity measure
    pub metric: SimilarityMetric,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            metric: SimilarityMetric::default(),
        }
    }
}

/// Catalog normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Extra column aliases: source column name → canonical field name
    pub field_aliases: BTreeMap<String, String>,
    /// Drop rows whose name is the literal header text "name"
    pub drop_header_rows: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            field_aliases: BTreeMap::new(),
            drop_header_rows: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let threshold = self.matching.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }

        for (alias, target) in &self.normalizer.field_aliases {
            if CanonicalField::parse(target).is_none() {
                return Err(ConfigError::UnknownField {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        Ok(())
    }
}
