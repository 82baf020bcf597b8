//! Source record normalizer.
//!
//! Handles:
//! - Column name canonicalization (case, whitespace, synonyms)
//! - Permissive numeric parsing (garbage becomes absent)
//! - Savings derivation from the two prices

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::config::{ConfigError, ConfigResult, NormalizerConfig};
use crate::models::{CatalogEntry, EntryId};

/// Fields the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Name,
    Formulation,
    Dosage,
    Type,
    GenericPrice,
    BrandPrice,
    Savings,
    Uses,
    SideEffects,
}

impl CanonicalField {
    /// Resolve a column name through the built-in synonym table.
    pub fn parse(column: &str) -> Option<Self> {
        let field = match column.trim().to_lowercase().as_str() {
            "name" => CanonicalField::Name,
            "formulation" | "composition" => CanonicalField::Formulation,
            "dosage" | "strength" => CanonicalField::Dosage,
            "type" | "therapeutic type" => CanonicalField::Type,
            "cost of generic" | "generic price" => CanonicalField::GenericPrice,
            "cost of branded" | "branded price" | "brand price" => CanonicalField::BrandPrice,
            "savings" | "savings %" | "savings percent" => CanonicalField::Savings,
            "uses" | "indications" => CanonicalField::Uses,
            "side effects" | "adverse effects" => CanonicalField::SideEffects,
            _ => return None,
        };
        Some(field)
    }

    /// Column heading used by the reference catalog export.
    pub fn heading(&self) -> &'static str {
        match self {
            CanonicalField::Name => "Name",
            CanonicalField::Formulation => "Formulation",
            CanonicalField::Dosage => "Dosage",
            CanonicalField::Type => "Type",
            CanonicalField::GenericPrice => "Cost of generic",
            CanonicalField::BrandPrice => "Cost of branded",
            CanonicalField::Savings => "Savings",
            CanonicalField::Uses => "Uses",
            CanonicalField::SideEffects => "Side effects",
        }
    }
}

/// Turns heterogeneous rows into catalog entries.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    /// Caller-supplied aliases, checked before the built-in table
    aliases: HashMap<String, CanonicalField>,
    drop_header_rows: bool,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            drop_header_rows: true,
        }
    }

    /// Build a normalizer from configuration.
    pub fn from_config(config: &NormalizerConfig) -> ConfigResult<Self> {
        let mut normalizer = Self::new();
        normalizer.drop_header_rows = config.drop_header_rows;
        for (alias, target) in &config.field_aliases {
            let field = CanonicalField::parse(target).ok_or_else(|| ConfigError::UnknownField {
                alias: alias.clone(),
                target: target.clone(),
            })?;
            normalizer.add_alias(alias, field);
        }
        Ok(normalizer)
    }

    /// Add a custom column alias.
    pub fn add_alias(&mut self, column: &str, field: CanonicalField) {
        self.aliases.insert(column.trim().to_lowercase(), field);
    }

    /// Canonical field for a source column, if any.
    pub fn field_for(&self, column: &str) -> Option<CanonicalField> {
        let folded = column.trim().to_lowercase();
        self.aliases
            .get(&folded)
            .copied()
            .or_else(|| CanonicalField::parse(&folded))
    }

    /// Normalize one source row. `None` means the row is dropped.
    ///
    /// When several columns map to the same field, the first non-empty value
    /// in column-name order wins.
    pub fn normalize_row(&self, id: EntryId, row: &Map<String, Value>) -> Option<CatalogEntry> {
        let mut cells: HashMap<CanonicalField, String> = HashMap::new();
        let mut extra = BTreeMap::new();

        for (column, value) in row {
            match self.field_for(column) {
                Some(field) => {
                    if let Some(text) = cell_text(value) {
                        cells.entry(field).or_insert(text);
                    }
                }
                None => {
                    extra.insert(column.trim().to_string(), value.clone());
                }
            }
        }

        let Some(name) = cells.remove(&CanonicalField::Name) else {
            tracing::debug!(row = id.0, "Dropping row without a name");
            return None;
        };
        if self.drop_header_rows && name.eq_ignore_ascii_case("name") {
            tracing::debug!(row = id.0, "Dropping repeated header row");
            return None;
        }

        let formulation = cells.remove(&CanonicalField::Formulation).unwrap_or_default();
        let mut entry = CatalogEntry::new(id, name, formulation);

        if let Some(dosage) = cells.remove(&CanonicalField::Dosage) {
            entry.dosage = dosage;
        }
        entry.kind = cells.remove(&CanonicalField::Type);
        entry.generic_price = cells
            .get(&CanonicalField::GenericPrice)
            .and_then(|t| parse_number(t));
        entry.brand_price = cells
            .get(&CanonicalField::BrandPrice)
            .and_then(|t| parse_number(t));
        entry.savings_percent = cells
            .get(&CanonicalField::Savings)
            .and_then(|t| parse_number(t));
        entry.uses = cells.remove(&CanonicalField::Uses);
        entry.side_effects = cells.remove(&CanonicalField::SideEffects);
        entry.extra = extra;

        entry.derive_savings();
        entry.refresh_keys();
        Some(entry)
    }
}

/// Text content of a cell; empty and non-scalar cells are absent.
fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Parse a numeric cell, treating anything unparseable or non-finite as absent.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
