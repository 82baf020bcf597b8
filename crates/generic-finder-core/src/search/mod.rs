//! Structured filter/sort/group queries over a catalog.

mod criteria;

pub use criteria::*;

use std::cmp::Ordering;
use std::collections::HashSet;

use thiserror::Error;

use crate::catalog::Catalog;
use crate::models::CatalogEntry;

/// Search errors.
#[derive(Error, Debug, PartialEq)]
pub enum SearchError {
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Primary hits plus the formulation group they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome<'c> {
    /// Entries matching the criteria
    pub hits: Vec<&'c CatalogEntry>,
    /// For a name selection, every entry sharing a hit's formulation
    pub same_formulation: Vec<&'c CatalogEntry>,
}

/// Run a structured query.
///
/// Filters by type, then dosage, then the name/formulation selection, and
/// returns the survivors stably sorted with absent sort values last.
pub fn search<'c>(
    catalog: &'c Catalog,
    criteria: &SearchCriteria,
) -> SearchResult<Vec<&'c CatalogEntry>> {
    let criteria = criteria.normalized()?;
    let mut hits: Vec<&CatalogEntry> = catalog
        .entries()
        .iter()
        .filter(|e| criteria.type_filter.matches(e.type_key()))
        .filter(|e| criteria.dosage.matches(Some(e.dosage_key())))
        .filter(|e| criteria.selection.matches(e))
        .collect();

    sort_entries(&mut hits, criteria.order);
    Ok(hits)
}

/// Run a query and, for name selections, collect the formulation group.
///
/// The group stays within the type filter, honours the dosage filter and
/// includes the hits themselves.
pub fn search_grouped<'c>(
    catalog: &'c Catalog,
    criteria: &SearchCriteria,
) -> SearchResult<SearchOutcome<'c>> {
    let hits = search(catalog, criteria)?;
    let criteria = criteria.normalized()?;
    if !matches!(criteria.selection, Selection::ByName(_)) {
        return Ok(SearchOutcome {
            hits,
            same_formulation: Vec::new(),
        });
    }

    let formulations: HashSet<&str> = hits.iter().filter_map(|e| e.formulation_key()).collect();
    let mut same_formulation: Vec<&CatalogEntry> = catalog
        .entries()
        .iter()
        .filter(|e| criteria.type_filter.matches(e.type_key()))
        .filter(|e| criteria.dosage.matches(Some(e.dosage_key())))
        .filter(|e| e.formulation_key().is_some_and(|k| formulations.contains(k)))
        .collect();
    sort_entries(&mut same_formulation, criteria.order);

    Ok(SearchOutcome {
        hits,
        same_formulation,
    })
}

/// Substitutes for an entry: every other entry with the same formulation.
///
/// The entry itself is excluded by identity, so a second entry with the same
/// name and formulation is still returned.
pub fn alternatives<'c>(
    catalog: &'c Catalog,
    entry: &CatalogEntry,
    dosage: &Filter,
    order: SortOrder,
) -> Vec<&'c CatalogEntry> {
    let Some(formulation) = entry.formulation_key() else {
        return Vec::new();
    };
    let dosage = dosage.normalized();

    let mut found: Vec<&CatalogEntry> = catalog
        .entries_with_formulation(formulation)
        .into_iter()
        .filter(|e| e.id != entry.id)
        .filter(|e| dosage.matches(Some(e.dosage_key())))
        .collect();
    sort_entries(&mut found, order);
    found
}

/// Stable sort; entries missing the sort value go last in either direction.
pub fn sort_entries(entries: &mut [&CatalogEntry], order: SortOrder) {
    entries.sort_by(|a, b| {
        compare_values(a.sort_value(order.key), b.sort_value(order.key), order.ascending)
    });
}

fn compare_values(a: Option<f64>, b: Option<f64>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if ascending => a.total_cmp(&b),
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
