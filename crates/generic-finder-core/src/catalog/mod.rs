//! Immutable, indexed medicine catalog.
//!
//! Pipeline: raw records → RecordNormalizer → Catalog (snapshot) → queries

mod fingerprint;
mod normalizer;
mod store;

pub use fingerprint::*;
pub use normalizer::*;
pub use store::*;

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::{match_key, CatalogEntry, EntryId};
use crate::resolver::{clean_word, phrase_key};
use crate::search::Filter;

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog load error: {0}")]
    Load(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Load a catalog from an array of row objects.
pub fn load_catalog(records: &Value) -> CatalogResult<Catalog> {
    Catalog::load_with(records, &RecordNormalizer::new())
}

/// Parse JSON text and load it as a catalog.
pub fn load_catalog_json(json: &str) -> CatalogResult<Catalog> {
    let records: Value = serde_json::from_str(json)?;
    load_catalog(&records)
}

/// Indexed collection of catalog entries. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    /// name key → entry positions
    by_name: HashMap<String, Vec<usize>>,
    /// formulation key → entry positions
    by_formulation: HashMap<String, Vec<usize>>,
    /// Distinct name keys in first-appearance order
    name_universe: Vec<String>,
    /// phrase key → name key, for names that are not one alphabetic word
    literal_names: HashMap<String, String>,
    /// Word count of the longest literal name
    literal_words: usize,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_parts(Vec::new(), hash_data(b"[]"))
    }
}

impl Catalog {
    /// Load rows with a specific normalizer.
    pub fn load_with(records: &Value, normalizer: &RecordNormalizer) -> CatalogResult<Self> {
        Self::load_fingerprinted(records, normalizer, fingerprint_records(records))
    }

    /// Load rows whose source fingerprint the caller already computed.
    pub(crate) fn load_fingerprinted(
        records: &Value,
        normalizer: &RecordNormalizer,
        fingerprint: String,
    ) -> CatalogResult<Self> {
        let rows = records.as_array().ok_or_else(|| {
            CatalogError::Load(format!("expected an array of rows, got {}", kind_of(records)))
        })?;

        let mut entries = Vec::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            let fields = row.as_object().ok_or_else(|| {
                CatalogError::Load(format!("row {} is {}, not an object", position, kind_of(row)))
            })?;
            if let Some(entry) = normalizer.normalize_row(EntryId(entries.len()), fields) {
                entries.push(entry);
            }
        }

        let dropped = rows.len() - entries.len();
        let catalog = Self::from_parts(entries, fingerprint);
        tracing::info!(
            entries = catalog.len(),
            dropped,
            names = catalog.name_universe.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-typed entries.
    ///
    /// Entry ids are reassigned to catalog positions, entries with an empty
    /// name are dropped, and matching keys are recomputed.
    ///
    /// The fingerprint hashes the serialized entries, not source rows, so a
    /// [`CatalogStore`] seeded with this catalog always rebuilds on its first
    /// `reload`.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let entries: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|e| !e.name.trim().is_empty())
            .enumerate()
            .map(|(position, mut entry)| {
                entry.id = EntryId(position);
                entry.derive_savings();
                entry.refresh_keys();
                entry
            })
            .collect();

        let fingerprint = serde_json::to_vec(&entries)
            .map(|bytes| hash_data(&bytes))
            .unwrap_or_default();
        Self::from_parts(entries, fingerprint)
    }

    fn from_parts(entries: Vec<CatalogEntry>, fingerprint: String) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_formulation: HashMap<String, Vec<usize>> = HashMap::new();
        let mut name_universe = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            let slot = by_name.entry(entry.name_key().to_string()).or_default();
            if slot.is_empty() {
                name_universe.push(entry.name_key().to_string());
            }
            slot.push(position);

            if let Some(key) = entry.formulation_key() {
                by_formulation.entry(key.to_string()).or_default().push(position);
            }
        }

        let mut literal_names: HashMap<String, String> = HashMap::new();
        let mut literal_words = 0;
        for name in &name_universe {
            if clean_word(name).as_deref() == Some(name.as_str()) {
                continue;
            }
            let phrase = phrase_key(name);
            if phrase.is_empty() {
                continue;
            }
            literal_words = literal_words.max(phrase.split(' ').count());
            if phrase == *name {
                literal_names.insert(phrase, name.clone());
            } else if !by_name.contains_key(&phrase) {
                // a name spelled exactly like the phrase takes precedence
                literal_names.entry(phrase).or_insert_with(|| name.clone());
            }
        }

        Self {
            entries,
            by_name,
            by_formulation,
            name_universe,
            literal_names,
            literal_words,
            fingerprint,
            loaded_at: Utc::now(),
        }
    }

    /// All entries in source order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        self.entries.get(id.0)
    }

    /// Entries whose name matches, in catalog order. Names need not be unique.
    pub fn entries_named(&self, name: &str) -> Vec<&CatalogEntry> {
        self.lookup(&self.by_name, name)
    }

    /// Entries sharing a formulation, in catalog order.
    pub fn entries_with_formulation(&self, formulation: &str) -> Vec<&CatalogEntry> {
        self.lookup(&self.by_formulation, formulation)
    }

    fn lookup(&self, index: &HashMap<String, Vec<usize>>, value: &str) -> Vec<&CatalogEntry> {
        index
            .get(&match_key(value))
            .map(|positions| positions.iter().map(|&p| &self.entries[p]).collect())
            .unwrap_or_default()
    }

    pub fn contains_name(&self, name_key: &str) -> bool {
        self.by_name.contains_key(name_key)
    }

    /// Distinct name keys, the universe for approximate matching.
    pub fn name_universe(&self) -> &[String] {
        &self.name_universe
    }

    /// Name key spelled by a phrase of text words, for names containing
    /// spaces, digits or punctuation.
    pub fn literal_name(&self, phrase: &str) -> Option<&str> {
        self.literal_names.get(phrase).map(String::as_str)
    }

    /// Word count of the longest name reachable through [`Self::literal_name`].
    pub fn literal_words(&self) -> usize {
        self.literal_words
    }

    /// SHA-256 of the source this catalog was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    // =========================================================================
    // Facets
    // =========================================================================

    /// Distinct therapeutic types as recorded, sorted.
    pub fn types(&self) -> Vec<String> {
        distinct(self.entries.iter().filter_map(|e| e.kind.as_deref()))
    }

    /// Distinct dosage keys, sorted.
    pub fn dosages(&self) -> Vec<String> {
        distinct(self.entries.iter().map(|e| e.dosage_key()))
    }

    /// Distinct names within a type filter, sorted.
    pub fn names(&self, type_filter: &Filter) -> Vec<String> {
        let type_filter = type_filter.normalized();
        distinct(
            self.entries
                .iter()
                .filter(|e| type_filter.matches(e.type_key()))
                .map(|e| e.name.as_str()),
        )
    }

    /// Distinct non-empty formulations as recorded, sorted.
    pub fn formulations(&self) -> Vec<String> {
        distinct(
            self.entries
                .iter()
                .filter(|e| e.formulation_key().is_some())
                .map(|e| e.formulation.as_str()),
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
