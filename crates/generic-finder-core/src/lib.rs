//! Generic-Finder Core Library
//!
//! Medicine identification and generic substitution engine.
//!
//! # Architecture
//!
//! ```text
//! Catalog rows ──► RecordNormalizer ──► Catalog (immutable snapshot)
//!                                            │
//!                      ┌─────────────────────┼─────────────────────┐
//!                      │                     │                     │
//!                      ▼                     ▼                     ▼
//!              Filter/Sort/Group       TextResolver          EntryDetails
//!              (search, alternatives)  (OCR text → names)    (bulletize)
//! ```
//!
//! A reload builds a brand-new [`Catalog`] and swaps it into the
//! [`CatalogStore`]; queries already holding the old snapshot finish on it.
//!
//! # Modules
//!
//! - [`catalog`]: Normalization, indices, snapshot store
//! - [`models`]: Domain types (CatalogEntry, MatchResult, etc.)
//! - [`search`]: Structured filter/sort/group queries
//! - [`resolver`]: Free-text resolution (exact + approximate)
//! - [`details`]: Clinical field formatting
//! - [`config`]: Engine configuration

pub mod catalog;
pub mod config;
pub mod details;
pub mod models;
pub mod resolver;
pub mod search;

// Re-export commonly used types
pub use catalog::{load_catalog, load_catalog_json, Catalog, CatalogError, CatalogStore};
pub use config::EngineConfig;
pub use details::{bulletize, EntryDetails};
pub use models::{CatalogEntry, EntryId, MatchKind, MatchResult, MatchedName, SortKey};
pub use resolver::{resolve, SimilarityMetric, TextResolver};
pub use search::{
    alternatives, search, search_grouped, Filter, SearchCriteria, SearchError, SearchOutcome,
    Selection, SortOrder,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use catalog::RecordNormalizer;
use config::ConfigError;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum GenericFinderError {
    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<CatalogError> for GenericFinderError {
    fn from(e: CatalogError) -> Self {
        GenericFinderError::CatalogLoad(e.to_string())
    }
}

impl From<SearchError> for GenericFinderError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidCriteria(msg) => GenericFinderError::InvalidCriteria(msg),
        }
    }
}

impl From<ConfigError> for GenericFinderError {
    fn from(e: ConfigError) -> Self {
        GenericFinderError::InvalidInput(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Create an engine with default settings and an empty catalog.
#[uniffi::export]
pub fn new_engine() -> Arc<GenericFinderCore> {
    Arc::new(GenericFinderCore {
        store: CatalogStore::default(),
        config: EngineConfig::default(),
        normalizer: RecordNormalizer::new(),
    })
}

/// Create an engine from a JSON configuration.
#[uniffi::export]
pub fn new_engine_with_config(config_json: String) -> Result<Arc<GenericFinderCore>, GenericFinderError> {
    let config = EngineConfig::from_json(&config_json)?;
    let normalizer = RecordNormalizer::from_config(&config.normalizer)?;
    Ok(Arc::new(GenericFinderCore {
        store: CatalogStore::default(),
        config,
        normalizer,
    }))
}

/// Split a delimited clinical field into display items.
#[uniffi::export]
pub fn format_bullets(text: Option<String>) -> Vec<String> {
    bulletize(text.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine wrapper for FFI.
#[derive(uniffi::Object)]
pub struct GenericFinderCore {
    store: CatalogStore,
    config: EngineConfig,
    normalizer: RecordNormalizer,
}

#[uniffi::export]
impl GenericFinderCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Load catalog rows (a JSON array of objects).
    ///
    /// Returns `false` when the rows match the current catalog and nothing
    /// was rebuilt.
    pub fn load_catalog_json(&self, json: String) -> Result<bool, GenericFinderError> {
        let records: serde_json::Value =
            serde_json::from_str(&json).map_err(CatalogError::from)?;
        Ok(self.store.reload(&records, &self.normalizer)?)
    }

    /// Summary of the current catalog snapshot.
    pub fn catalog_info(&self) -> FfiCatalogInfo {
        let catalog = self.store.snapshot();
        FfiCatalogInfo {
            entry_count: catalog.len() as u64,
            fingerprint: catalog.fingerprint().to_string(),
            loaded_at: catalog.loaded_at().to_rfc3339(),
        }
    }

    pub fn list_types(&self) -> Vec<String> {
        self.store.snapshot().types()
    }

    pub fn list_dosages(&self) -> Vec<String> {
        self.store.snapshot().dosages()
    }

    /// Names within a therapeutic type ("All" for every type).
    pub fn list_names(&self, type_filter: String) -> Vec<String> {
        self.store.snapshot().names(&Filter::parse(&type_filter))
    }

    pub fn list_formulations(&self) -> Vec<String> {
        self.store.snapshot().formulations()
    }

    // =========================================================================
    // Search Operations
    // =========================================================================

    /// Structured search with formulation grouping for name selections.
    pub fn search(&self, criteria: FfiSearchCriteria) -> Result<FfiSearchOutcome, GenericFinderError> {
        let criteria = SearchCriteria::try_from(criteria)?;
        let catalog = self.store.snapshot();
        let outcome = search_grouped(&catalog, &criteria)?;
        Ok(FfiSearchOutcome::new(outcome, &catalog))
    }

    /// Same-formulation substitutes for one entry.
    ///
    /// `catalog_fingerprint` is the one carried by the entry; ids from a
    /// catalog that has since been replaced are `NotFound`.
    pub fn alternatives(
        &self,
        entry_id: u64,
        catalog_fingerprint: String,
        dosage: String,
        sort_key: String,
        ascending: bool,
    ) -> Result<Vec<FfiCatalogEntry>, GenericFinderError> {
        let order = SortOrder::new(sort_key.parse()?, ascending);
        let catalog = self.store.snapshot();
        let entry = lookup_entry(&catalog, entry_id, &catalog_fingerprint)?;
        Ok(alternatives(&catalog, entry, &Filter::parse(&dosage), order)
            .into_iter()
            .map(|e| FfiCatalogEntry::new(e, &catalog))
            .collect())
    }

    // =========================================================================
    // Resolver Operations
    // =========================================================================

    /// Recognize catalog medicines in prescription text.
    pub fn resolve_text(&self, text: String) -> FfiResolution {
        let catalog = self.store.snapshot();
        let resolver = TextResolver::with_config(&catalog, self.config.matching.clone());
        let result = resolver.resolve(&text);

        FfiResolution {
            matches: result.matches().iter().map(FfiMatchedName::from).collect(),
            entries: result
                .entries(&catalog)
                .into_iter()
                .map(|e| FfiCatalogEntry::new(e, &catalog))
                .collect(),
        }
    }

    // =========================================================================
    // Detail Operations
    // =========================================================================

    pub fn entry_details(
        &self,
        entry_id: u64,
        catalog_fingerprint: String,
    ) -> Result<FfiEntryDetails, GenericFinderError> {
        let catalog = self.store.snapshot();
        let entry = lookup_entry(&catalog, entry_id, &catalog_fingerprint)?;
        Ok(EntryDetails::of(entry).into())
    }
}

fn lookup_entry<'c>(
    catalog: &'c Catalog,
    entry_id: u64,
    catalog_fingerprint: &str,
) -> Result<&'c CatalogEntry, GenericFinderError> {
    if catalog.fingerprint() != catalog_fingerprint {
        return Err(GenericFinderError::NotFound(format!(
            "entry {} belongs to a catalog that is no longer loaded",
            entry_id
        )));
    }
    usize::try_from(entry_id)
        .ok()
        .and_then(|id| catalog.get(EntryId(id)))
        .ok_or_else(|| GenericFinderError::NotFound(format!("entry {}", entry_id)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe catalog entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogEntry {
    /// Position in the catalog identified by `catalog_fingerprint`
    pub id: u64,
    pub catalog_fingerprint: String,
    pub name: String,
    pub formulation: String,
    pub dosage: String,
    pub kind: Option<String>,
    pub generic_price: Option<f64>,
    pub brand_price: Option<f64>,
    pub savings_percent: Option<f64>,
    pub uses: Option<String>,
    pub side_effects: Option<String>,
}

impl FfiCatalogEntry {
    fn new(entry: &CatalogEntry, catalog: &Catalog) -> Self {
        Self {
            id: entry.id.0 as u64,
            catalog_fingerprint: catalog.fingerprint().to_string(),
            name: entry.name.clone(),
            formulation: entry.formulation.clone(),
            dosage: entry.dosage.clone(),
            kind: entry.kind.clone(),
            generic_price: entry.generic_price,
            brand_price: entry.brand_price,
            savings_percent: entry.savings_rounded(),
            uses: entry.uses.clone(),
            side_effects: entry.side_effects.clone(),
        }
    }
}

/// FFI-safe search criteria.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchCriteria {
    /// Therapeutic type or "All"
    pub type_filter: String,
    /// Dosage or "All"
    pub dosage: String,
    /// Restrict to one medicine name
    pub name: Option<String>,
    /// Restrict to one formulation
    pub formulation: Option<String>,
    /// generic_price, brand_price or savings_percent
    pub sort_key: String,
    pub ascending: bool,
}

impl TryFrom<FfiSearchCriteria> for SearchCriteria {
    type Error = GenericFinderError;

    fn try_from(criteria: FfiSearchCriteria) -> Result<Self, Self::Error> {
        let selection = match (criteria.name, criteria.formulation) {
            (None, None) => Selection::All,
            (Some(name), None) => Selection::ByName(name),
            (None, Some(formulation)) => Selection::ByFormulation(formulation),
            (Some(_), Some(_)) => {
                return Err(GenericFinderError::InvalidCriteria(
                    "select either a name or a formulation, not both".into(),
                ))
            }
        };

        Ok(SearchCriteria {
            type_filter: Filter::parse(&criteria.type_filter),
            dosage: Filter::parse(&criteria.dosage),
            selection,
            order: SortOrder::new(criteria.sort_key.parse()?, criteria.ascending),
        })
    }
}

/// FFI-safe search outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchOutcome {
    pub hits: Vec<FfiCatalogEntry>,
    pub same_formulation: Vec<FfiCatalogEntry>,
}

impl FfiSearchOutcome {
    fn new(outcome: SearchOutcome<'_>, catalog: &Catalog) -> Self {
        let convert = |entries: Vec<&CatalogEntry>| -> Vec<FfiCatalogEntry> {
            entries
                .into_iter()
                .map(|e| FfiCatalogEntry::new(e, catalog))
                .collect()
        };
        Self {
            hits: convert(outcome.hits),
            same_formulation: convert(outcome.same_formulation),
        }
    }
}

/// FFI-safe resolved name.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMatchedName {
    pub name_key: String,
    pub token: String,
    pub exact: bool,
    pub score: Option<f64>,
}

impl From<&MatchedName> for FfiMatchedName {
    fn from(matched: &MatchedName) -> Self {
        Self {
            name_key: matched.name_key.clone(),
            token: matched.token.clone(),
            exact: matched.kind.is_exact(),
            score: matched.kind.score(),
        }
    }
}

/// FFI-safe text resolution.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResolution {
    pub matches: Vec<FfiMatchedName>,
    /// Every entry carrying a matched name, in catalog order
    pub entries: Vec<FfiCatalogEntry>,
}

/// FFI-safe entry details.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEntryDetails {
    pub uses: Vec<String>,
    pub side_effects: Vec<String>,
}

impl From<EntryDetails> for FfiEntryDetails {
    fn from(details: EntryDetails) -> Self {
        Self {
            uses: details.uses,
            side_effects: details.side_effects,
        }
    }
}

/// FFI-safe catalog summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCatalogInfo {
    pub entry_count: u64,
    pub fingerprint: String,
    pub loaded_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        {"Name": "Paracet", "Formulation": "Paracetamol 500mg", "Dosage": "500mg",
         "Type": "Analgesic", "Cost of generic": "10", "Cost of branded": "40",
         "Uses": "fever; pain"},
        {"Name": "Calpol", "Formulation": "Paracetamol 500mg", "Dosage": "500mg",
         "Type": "Analgesic", "Cost of generic": "12", "Cost of branded": "50"}
    ]"#;

    fn criteria(sort_key: &str) -> FfiSearchCriteria {
        FfiSearchCriteria {
            type_filter: "All".into(),
            dosage: "All".into(),
            name: None,
            formulation: None,
            sort_key: sort_key.into(),
            ascending: false,
        }
    }

    #[test]
    fn test_load_and_search() {
        let engine = new_engine();
        assert!(engine.load_catalog_json(ROWS.into()).unwrap());
        assert!(!engine.load_catalog_json(ROWS.into()).unwrap());
        assert_eq!(engine.catalog_info().entry_count, 2);

        let outcome = engine.search(criteria("savings_percent")).unwrap();
        let names: Vec<_> = outcome.hits.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Calpol", "Paracet"]);
        assert!(outcome.same_formulation.is_empty());
    }

    #[test]
    fn test_unknown_sort_key() {
        let engine = new_engine();
        engine.load_catalog_json(ROWS.into()).unwrap();
        assert!(matches!(
            engine.search(criteria("rating")),
            Err(GenericFinderError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_name_and_formulation_together_rejected() {
        let engine = new_engine();
        let mut both = criteria("generic_price");
        both.name = Some("Calpol".into());
        both.formulation = Some("Paracetamol 500mg".into());
        assert!(matches!(
            engine.search(both),
            Err(GenericFinderError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_malformed_catalog() {
        let engine = new_engine();
        assert!(matches!(
            engine.load_catalog_json(r#"{"Name": "x"}"#.into()),
            Err(GenericFinderError::CatalogLoad(_))
        ));
        assert!(matches!(
            engine.load_catalog_json("not json".into()),
            Err(GenericFinderError::CatalogLoad(_))
        ));
    }

    #[test]
    fn test_resolve_and_alternatives() {
        let engine = new_engine();
        engine.load_catalog_json(ROWS.into()).unwrap();

        let resolution = engine.resolve_text("Tab Paracetol 1-0-1".into());
        assert_eq!(resolution.matches.len(), 1);
        assert!(!resolution.matches[0].exact);
        assert_eq!(resolution.entries[0].name, "Paracet");

        let paracet = &resolution.entries[0];
        let alts = engine
            .alternatives(
                paracet.id,
                paracet.catalog_fingerprint.clone(),
                "All".into(),
                "generic_price".into(),
                true,
            )
            .unwrap();
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].name, "Calpol");
    }

    #[test]
    fn test_entry_details_and_missing_entry() {
        let engine = new_engine();
        engine.load_catalog_json(ROWS.into()).unwrap();

        let fingerprint = engine.catalog_info().fingerprint;
        let details = engine.entry_details(0, fingerprint.clone()).unwrap();
        assert_eq!(details.uses, vec!["Fever", "Pain"]);
        assert!(matches!(
            engine.entry_details(99, fingerprint),
            Err(GenericFinderError::NotFound(_))
        ));
    }

    #[test]
    fn test_entry_ids_expire_on_reload() {
        let engine = new_engine();
        engine.load_catalog_json(ROWS.into()).unwrap();
        let paracet = engine.resolve_text("Paracet".into()).entries.remove(0);

        engine
            .load_catalog_json(
                r#"[{"Name": "Azee", "Formulation": "Azithromycin 500mg"},
                    {"Name": "Azithral", "Formulation": "Azithromycin 500mg"}]"#
                    .into(),
            )
            .unwrap();

        assert!(matches!(
            engine.alternatives(
                paracet.id,
                paracet.catalog_fingerprint.clone(),
                "All".into(),
                "generic_price".into(),
                true,
            ),
            Err(GenericFinderError::NotFound(_))
        ));
        assert!(matches!(
            engine.entry_details(paracet.id, paracet.catalog_fingerprint),
            Err(GenericFinderError::NotFound(_))
        ));
    }

    #[test]
    fn test_engine_config() {
        let engine = new_engine_with_config(r#"{"matching": {"threshold": 0.95}}"#.into()).unwrap();
        engine.load_catalog_json(ROWS.into()).unwrap();
        assert!(engine.resolve_text("Paracetol".into()).matches.is_empty());

        assert!(new_engine_with_config(r#"{"matching": {"threshold": -1}}"#.into()).is_err());
    }

    #[test]
    fn test_facets_and_bullets() {
        let engine = new_engine();
        engine.load_catalog_json(ROWS.into()).unwrap();

        assert_eq!(engine.list_types(), vec!["Analgesic"]);
        assert_eq!(engine.list_dosages(), vec!["500mg"]);
        assert_eq!(engine.list_names("analgesic".into()), vec!["Calpol", "Paracet"]);
        assert_eq!(engine.list_formulations(), vec!["Paracetamol 500mg"]);
        assert_eq!(format_bullets(Some("A; b,c".into())), vec!["A", "B", "C"]);
        assert!(format_bullets(None).is_empty());
    }
}
