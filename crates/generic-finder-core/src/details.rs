//! Clinical detail formatting.

use serde::{Deserialize, Serialize};

use crate::models::CatalogEntry;

const DELIMITERS: &[char] = &[';', ',', '/', '\n'];

/// Split a delimited clinical field into trimmed, capitalized items.
///
/// Absent or blank input yields no items.
pub fn bulletize(text: Option<&str>) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };

    text.split(DELIMITERS)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect()
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Expanded clinical details of one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDetails {
    pub uses: Vec<String>,
    pub side_effects: Vec<String>,
}

impl EntryDetails {
    pub fn of(entry: &CatalogEntry) -> Self {
        Self {
            uses: bulletize(entry.uses.as_deref()),
            side_effects: bulletize(entry.side_effects.as_deref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.side_effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryId;

    #[test]
    fn test_mixed_delimiters() {
        assert_eq!(bulletize(Some("A; b,c")), vec!["A", "B", "C"]);
        assert_eq!(
            bulletize(Some("fever/ headache\nbody ache")),
            vec!["Fever", "Headache", "Body ache"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(bulletize(None).is_empty());
        assert!(bulletize(Some("")).is_empty());
        assert!(bulletize(Some(" ;, / \n")).is_empty());
    }

    #[test]
    fn test_rest_is_lowercased() {
        assert_eq!(bulletize(Some("SEVERE Nausea")), vec!["Severe nausea"]);
    }

    #[test]
    fn test_runs_of_delimiters_collapse() {
        assert_eq!(bulletize(Some("rash;;, itching")), vec!["Rash", "Itching"]);
    }

    #[test]
    fn test_entry_details() {
        let mut entry = CatalogEntry::new(EntryId(0), "Calpol", "Paracetamol");
        entry.uses = Some("fever, pain".into());

        let details = EntryDetails::of(&entry);
        assert_eq!(details.uses, vec!["Fever", "Pain"]);
        assert!(details.side_effects.is_empty());
        assert!(!details.is_empty());
    }
}
