//! In-memory value-set catalog.

use std::collections::BTreeMap;

use hedis_model::{CatalogEntry, CodeValidity};
use serde::Serialize;

/// Lookup key for value-set names: trimmed and lower-cased.
pub(crate) fn value_set_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An immutable set of catalog entries indexed by value-set name.
///
/// Built once at load time and shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CodeCatalog {
    label: String,
    entries: Vec<CatalogEntry>,
    by_value_set: BTreeMap<String, Vec<usize>>,
    display_names: BTreeMap<String, String>,
}

/// Code counts for one value set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueSetStats {
    pub name: String,
    pub total: usize,
    pub valid: usize,
}

impl CodeCatalog {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn from_entries(
        label: impl Into<String>,
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Self {
        let mut catalog = Self::new(label);
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        let position = self.entries.len();
        for name in &entry.value_sets {
            let key = value_set_key(name);
            if key.is_empty() {
                continue;
            }
            self.display_names
                .entry(key.clone())
                .or_insert_with(|| name.trim().to_string());
            let slots = self.by_value_set.entry(key).or_default();
            if !slots.contains(&position) {
                slots.push(position);
            }
        }
        self.entries.push(entry);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn contains_value_set(&self, name: &str) -> bool {
        self.by_value_set.contains_key(&value_set_key(name))
    }

    /// Display names of every value set, sorted by lookup key.
    pub fn value_set_names(&self) -> impl Iterator<Item = &str> {
        self.display_names.values().map(String::as_str)
    }

    /// The catalog's spelling of a value-set name.
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.display_names
            .get(&value_set_key(name))
            .map(String::as_str)
    }

    /// All entries listed under a value set, regardless of dates.
    pub fn entries_for<'a>(
        &'a self,
        value_set: &str,
    ) -> impl Iterator<Item = &'a CatalogEntry> + use<'a> {
        self.by_value_set
            .get(&value_set_key(value_set))
            .into_iter()
            .flatten()
            .filter_map(|&position| self.entries.get(position))
    }

    /// Entries of a value set valid in `year`.
    pub fn valid_entries(&self, value_set: &str, year: i32) -> Vec<&CatalogEntry> {
        self.entries_for(value_set)
            .filter(|entry| entry.is_valid_for(year))
            .collect()
    }

    /// Entries with this code listed under the value set.
    pub fn find<'a>(
        &'a self,
        code: &'a str,
        value_set: &str,
    ) -> impl Iterator<Item = &'a CatalogEntry> + use<'a> {
        let code = code.trim();
        self.entries_for(value_set)
            .filter(move |entry| entry.code.trim().eq_ignore_ascii_case(code))
    }

    /// Whether `code` is listed under `value_set` and valid in `year`.
    ///
    /// When a code appears in several entries (e.g. re-issued with new dates)
    /// any valid one wins; otherwise the first reason is reported.
    pub fn is_code_valid(&self, code: &str, value_set: &str, year: i32) -> CodeValidity {
        let mut verdict = CodeValidity::NotFound;
        for entry in self.find(code, value_set) {
            let validity = entry.validity_for(year);
            if validity.is_valid() {
                return validity;
            }
            if verdict == CodeValidity::NotFound {
                verdict = validity;
            }
        }
        verdict
    }

    pub fn stats(&self, year: i32) -> Vec<ValueSetStats> {
        self.display_names
            .iter()
            .map(|(key, name)| {
                let entries: Vec<&CatalogEntry> = self.entries_for(key).collect();
                ValueSetStats {
                    name: name.clone(),
                    total: entries.len(),
                    valid: entries
                        .iter()
                        .filter(|entry| entry.is_valid_for(year))
                        .count(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use hedis_model::CodeSystem;
    use hedis_model::dates::ymd;

    use super::*;

    fn catalog() -> CodeCatalog {
        CodeCatalog::from_entries(
            "test",
            [
                CatalogEntry::new("84153", CodeSystem::Cpt, "PSA Lab Test"),
                CatalogEntry::new("84152", CodeSystem::Cpt, "PSA Lab Test")
                    .with_expiration_date(ymd(2020, 12, 31)),
                CatalogEntry::new("84152", CodeSystem::Cpt, "PSA Lab Test")
                    .with_effective_date(ymd(2026, 1, 1)),
                CatalogEntry::new("G0103", CodeSystem::Hcpcs, "psa lab test")
                    .with_value_set("Screening"),
            ],
        )
    }

    #[test]
    fn lookup_ignores_case() {
        let catalog = catalog();
        assert!(catalog.contains_value_set("PSA LAB TEST"));
        assert_eq!(catalog.entries_for("psa lab test").count(), 4);
        assert_eq!(catalog.display_name("psa LAB test"), Some("PSA Lab Test"));
        assert_eq!(catalog.value_set_names().count(), 2);
    }

    #[test]
    fn any_valid_entry_makes_code_valid() {
        let catalog = catalog();
        assert_eq!(
            catalog.is_code_valid("84152", "PSA Lab Test", 2026),
            CodeValidity::Valid
        );
        assert_eq!(
            catalog.is_code_valid("84152", "PSA Lab Test", 2022),
            CodeValidity::Expired(ymd(2020, 12, 31))
        );
        assert_eq!(
            catalog.is_code_valid("99999", "PSA Lab Test", 2026),
            CodeValidity::NotFound
        );
        assert_eq!(
            catalog.is_code_valid("84153", "Screening", 2026),
            CodeValidity::NotFound
        );
    }

    #[test]
    fn stats_count_valid_codes() {
        let stats = catalog().stats(2022);
        let psa = stats
            .iter()
            .find(|stats| stats.name == "PSA Lab Test")
            .expect("psa stats");
        assert_eq!(psa.total, 4);
        assert_eq!(psa.valid, 2);
    }
}
