//! Catalog entry models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dosage recorded when the source row has none.
pub const UNKNOWN_DOSAGE: &str = "unknown";

/// Position of an entry in its catalog. Identity for "exclude itself" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub usize);

/// A single medicine in the catalog.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    /// Position in the catalog
    pub id: EntryId,
    /// Branded/medicine name as recorded
    pub name: String,
    /// Active chemical composition (empty when the source had none)
    pub formulation: String,
    /// Strength descriptor (e.g., "500mg")
    pub dosage: String,
    /// Therapeutic category
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Cost of the generic equivalent
    pub generic_price: Option<f64>,
    /// Cost of the branded product
    pub brand_price: Option<f64>,
    /// Percentage saved by switching to the generic
    pub savings_percent: Option<f64>,
    /// Raw delimited list of uses/indications
    pub uses: Option<String>,
    /// Raw delimited list of side effects
    pub side_effects: Option<String>,
    /// Source fields the engine does not recognize
    pub extra: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    keys: MatchKeys,
}

/// Case-folded, trimmed keys used for every comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MatchKeys {
    pub name: String,
    pub formulation: Option<String>,
    pub dosage: String,
    pub kind: Option<String>,
}

/// Fold a value into its matching-key form.
pub fn match_key(value: &str) -> String {
    value.trim().to_lowercase()
}

impl CatalogEntry {
    /// Create an entry with required fields; everything else starts absent.
    pub fn new(id: EntryId, name: impl Into<String>, formulation: impl Into<String>) -> Self {
        let mut entry = Self {
            id,
            name: name.into(),
            formulation: formulation.into(),
            dosage: UNKNOWN_DOSAGE.to_string(),
            kind: None,
            generic_price: None,
            brand_price: None,
            savings_percent: None,
            uses: None,
            side_effects: None,
            extra: BTreeMap::new(),
            keys: MatchKeys::default(),
        };
        entry.refresh_keys();
        entry
    }

    /// Recompute matching keys after the display fields change.
    ///
    /// Only called while an entry is being built; catalogs never mutate entries.
    pub(crate) fn refresh_keys(&mut self) {
        let formulation = match_key(&self.formulation);
        self.keys = MatchKeys {
            name: match_key(&self.name),
            formulation: (!formulation.is_empty()).then_some(formulation),
            dosage: match_key(&self.dosage),
            kind: self
                .kind
                .as_deref()
                .map(match_key)
                .filter(|k| !k.is_empty()),
        };
    }

    pub fn name_key(&self) -> &str {
        &self.keys.name
    }

    pub fn formulation_key(&self) -> Option<&str> {
        self.keys.formulation.as_deref()
    }

    pub fn dosage_key(&self) -> &str {
        &self.keys.dosage
    }

    pub fn type_key(&self) -> Option<&str> {
        self.keys.kind.as_deref()
    }

    /// True when both entries carry the same, present, formulation key.
    pub fn same_formulation(&self, other: &CatalogEntry) -> bool {
        matches!(
            (self.formulation_key(), other.formulation_key()),
            (Some(a), Some(b)) if a == b
        )
    }

    /// Value of a numeric sort field.
    pub fn sort_value(&self, key: SortKey) -> Option<f64> {
        match key {
            SortKey::GenericPrice => self.generic_price,
            SortKey::BrandPrice => self.brand_price,
            SortKey::SavingsPercent => self.savings_percent,
        }
    }

    /// Savings rounded to one decimal place for display.
    pub fn savings_rounded(&self) -> Option<f64> {
        self.savings_percent.map(|s| (s * 10.0).round() / 10.0)
    }

    /// Derive savings from the two prices when the source did not supply it.
    ///
    /// Source values always win; a zero or absent brand price yields nothing.
    pub(crate) fn derive_savings(&mut self) {
        if self.savings_percent.is_some() {
            return;
        }
        self.savings_percent = savings_from_prices(self.generic_price, self.brand_price);
    }
}

/// `100 * (brand - generic) / brand`, or `None` when it is undefined.
pub fn savings_from_prices(generic: Option<f64>, brand: Option<f64>) -> Option<f64> {
    let (generic, brand) = (generic?, brand?);
    if brand == 0.0 {
        return None;
    }
    let savings = 100.0 * (brand - generic) / brand;
    savings.is_finite().then_some(savings)
}

/// Numeric field a result list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    GenericPrice,
    BrandPrice,
    SavingsPercent,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::GenericPrice => "generic_price",
            SortKey::BrandPrice => "brand_price",
            SortKey::SavingsPercent => "savings_percent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_folded_and_trimmed() {
        let mut entry = CatalogEntry::new(EntryId(0), "  Calpol ", "Paracetamol 500MG");
        entry.dosage = " 500 MG".into();
        entry.kind = Some("Analgesic ".into());
        entry.refresh_keys();

        assert_eq!(entry.name_key(), "calpol");
        assert_eq!(entry.formulation_key(), Some("paracetamol 500mg"));
        assert_eq!(entry.dosage_key(), "500 mg");
        assert_eq!(entry.type_key(), Some("analgesic"));
    }

    #[test]
    fn test_empty_formulation_has_no_key() {
        let a = CatalogEntry::new(EntryId(0), "A", "  ");
        let b = CatalogEntry::new(EntryId(1), "B", "");
        assert_eq!(a.formulation_key(), None);
        assert!(!a.same_formulation(&b));
    }

    #[test]
    fn test_default_dosage_sentinel() {
        let entry = CatalogEntry::new(EntryId(0), "A", "x");
        assert_eq!(entry.dosage, UNKNOWN_DOSAGE);
        assert_eq!(entry.dosage_key(), "unknown");
    }

    #[test]
    fn test_savings_from_prices() {
        assert_eq!(savings_from_prices(Some(10.0), Some(40.0)), Some(75.0));
        assert_eq!(savings_from_prices(Some(12.0), Some(50.0)), Some(76.0));
        assert_eq!(savings_from_prices(Some(10.0), Some(0.0)), None);
        assert_eq!(savings_from_prices(None, Some(40.0)), None);
        assert_eq!(savings_from_prices(Some(10.0), None), None);
    }

    #[test]
    fn test_source_savings_not_overwritten() {
        let mut entry = CatalogEntry::new(EntryId(0), "A", "x");
        entry.generic_price = Some(10.0);
        entry.brand_price = Some(40.0);
        entry.savings_percent = Some(12.5);
        entry.derive_savings();
        assert_eq!(entry.savings_percent, Some(12.5));
    }

    #[test]
    fn test_savings_rounded() {
        let mut entry = CatalogEntry::new(EntryId(0), "A", "x");
        entry.savings_percent = Some(66.666_666);
        assert_eq!(entry.savings_rounded(), Some(66.7));
    }
}
