//! Query criteria.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{match_key, CatalogEntry, SortKey};

use super::SearchError;

/// Either "all" or one exact matching key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Exact(String),
}

impl Filter {
    /// Parse a user-facing filter value; empty or "all" (any case) means no filter.
    pub fn parse(value: &str) -> Self {
        let key = match_key(value);
        if key.is_empty() || key == "all" {
            Filter::All
        } else {
            Filter::Exact(key)
        }
    }

    pub fn matches(&self, key: Option<&str>) -> bool {
        match self {
            Filter::All => true,
            Filter::Exact(wanted) => key == Some(wanted.as_str()),
        }
    }

    pub(crate) fn normalized(&self) -> Self {
        match self {
            Filter::All => Filter::All,
            Filter::Exact(value) => Filter::parse(value),
        }
    }
}

/// Which entries the query is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Everything surviving the filters
    #[default]
    All,
    /// One medicine name (every variant sharing it)
    ByName(String),
    /// One formulation
    ByFormulation(String),
}

impl Selection {
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Selection::All => true,
            Selection::ByName(name) => entry.name_key() == name,
            Selection::ByFormulation(formulation) => {
                entry.formulation_key() == Some(formulation.as_str())
            }
        }
    }

    fn normalized(&self) -> Self {
        match self {
            Selection::All => Selection::All,
            Selection::ByName(name) => Selection::ByName(match_key(name)),
            Selection::ByFormulation(f) => Selection::ByFormulation(match_key(f)),
        }
    }
}

/// Sort field and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortOrder {
    /// Order results by `key` in the given direction.
    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            key: SortKey::GenericPrice,
            ascending: true,
        }
    }
}

/// Structured query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Therapeutic type filter
    pub type_filter: Filter,
    /// Dosage filter
    pub dosage: Filter,
    pub selection: Selection,
    pub order: SortOrder,
}

impl SearchCriteria {
    /// Copy with every filter and selection folded to matching-key form.
    ///
    /// Rejects a name or formulation selection that is blank.
    pub fn normalized(&self) -> Result<Self, SearchError> {
        let selection = self.selection.normalized();
        match &selection {
            Selection::ByName(name) if name.is_empty() => {
                return Err(SearchError::InvalidCriteria("blank name selection".into()));
            }
            Selection::ByFormulation(f) if f.is_empty() => {
                return Err(SearchError::InvalidCriteria(
                    "blank formulation selection".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            type_filter: self.type_filter.normalized(),
            dosage: self.dosage.normalized(),
            selection,
            order: self.order,
        })
    }
}

impl FromStr for SortKey {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match match_key(s).replace(['_', '-'], " ").as_str() {
            "generic price" | "genericprice" | "cost of generic" => Ok(SortKey::GenericPrice),
            "brand price" | "brandprice" | "branded price" | "cost of branded" => {
                Ok(SortKey::BrandPrice)
            }
            "savings percent" | "savingspercent" | "savings %" | "savings" => {
                Ok(SortKey::SavingsPercent)
            }
            _ => Err(SearchError::InvalidCriteria(format!(
                "unknown sort key {:?}",
                s
            ))),
        }
    }
}
