//! Resolution tiers.
//!
//! Each tier either produces a code valid in the measurement year or passes.
//! [`CodeResolver`](crate::CodeResolver) tries them in order: explicit code,
//! curated table, exact value-set match, pattern match.

use std::fmt::Debug;
use std::sync::Arc;

use hedis_model::{CatalogEntry, CodeRequirement, CodeSource, CodeSystem};
use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::catalog::CodeCatalog;
use crate::matching::best_matches;

/// A code chosen for a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCode {
    pub code: String,
    pub code_system: CodeSystem,
    /// The value set the code was taken from. For pattern matches this is the
    /// catalog's name, not the requested one.
    pub value_set: String,
    pub source: CodeSource,
}

impl ResolvedCode {
    fn from_entry(entry: &CatalogEntry, value_set: &str, source: CodeSource) -> Self {
        Self {
            code: entry.code.trim().to_string(),
            code_system: entry.code_system.clone(),
            value_set: value_set.to_string(),
            source,
        }
    }
}

pub trait ResolutionStrategy: Debug + Send + Sync {
    fn source(&self) -> CodeSource;

    fn try_resolve(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Option<ResolvedCode>;
}

/// Keeps entries whose system matches the requirement's, when it names one.
fn system_filter<'a>(
    requirement: &CodeRequirement,
    entries: impl IntoIterator<Item = &'a CatalogEntry>,
) -> Vec<&'a CatalogEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            requirement
                .code_system
                .as_ref()
                .is_none_or(|system| *system == entry.code_system)
        })
        .collect()
}

/// Uniform choice among the valid entries of one value set.
fn pick_from(
    catalog: &CodeCatalog,
    requirement: &CodeRequirement,
    year: i32,
    source: CodeSource,
    rng: &mut dyn RngCore,
) -> Option<ResolvedCode> {
    let valid = catalog.valid_entries(&requirement.value_set, year);
    let candidates = system_filter(requirement, valid);
    let entry = candidates.choose(rng)?;
    let value_set = catalog
        .display_name(&requirement.value_set)
        .unwrap_or(&requirement.value_set);
    debug!(
        value_set,
        candidates = candidates.len(),
        code = %entry.code,
        tier = %source,
        "resolved code"
    );
    Some(ResolvedCode::from_entry(entry, value_set, source))
}

/// Uses the requirement's explicit code verbatim. Dates are not checked.
#[derive(Debug, Default)]
pub struct ExplicitCode;

impl ResolutionStrategy for ExplicitCode {
    fn source(&self) -> CodeSource {
        CodeSource::Explicit
    }

    fn try_resolve(
        &self,
        requirement: &CodeRequirement,
        _year: i32,
        _rng: &mut dyn RngCore,
    ) -> Option<ResolvedCode> {
        let code = requirement.explicit_code()?;
        Some(ResolvedCode {
            code: code.to_string(),
            code_system: requirement
                .code_system
                .clone()
                .unwrap_or_else(|| CodeSystem::infer(code)),
            value_set: requirement.value_set.clone(),
            source: CodeSource::Explicit,
        })
    }
}

/// Looks the value set up in the curated medication table.
#[derive(Debug)]
pub struct CuratedLookup {
    curated: Option<Arc<CodeCatalog>>,
}

impl CuratedLookup {
    pub fn new(curated: Option<Arc<CodeCatalog>>) -> Self {
        Self { curated }
    }
}

impl ResolutionStrategy for CuratedLookup {
    fn source(&self) -> CodeSource {
        CodeSource::Curated
    }

    fn try_resolve(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Option<ResolvedCode> {
        let curated = self.curated.as_deref()?;
        pick_from(curated, requirement, year, CodeSource::Curated, rng)
    }
}

/// Exact (case-insensitive) value-set name in the catalog.
#[derive(Debug)]
pub struct CatalogExactMatch {
    catalog: Arc<CodeCatalog>,
}

impl CatalogExactMatch {
    pub fn new(catalog: Arc<CodeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ResolutionStrategy for CatalogExactMatch {
    fn source(&self) -> CodeSource {
        CodeSource::CatalogExact
    }

    fn try_resolve(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Option<ResolvedCode> {
        pick_from(&self.catalog, requirement, year, CodeSource::CatalogExact, rng)
    }
}

/// Pools valid codes from the catalog value sets whose names best match,
/// ranking only names that still have a valid code in the year.
#[derive(Debug)]
pub struct CatalogPatternMatch {
    catalog: Arc<CodeCatalog>,
}

impl CatalogPatternMatch {
    pub fn new(catalog: Arc<CodeCatalog>) -> Self {
        Self { catalog }
    }
}

impl ResolutionStrategy for CatalogPatternMatch {
    fn source(&self) -> CodeSource {
        CodeSource::CatalogPattern
    }

    fn try_resolve(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Option<ResolvedCode> {
        // Names without a usable code this year never compete for the best rank.
        let mut usable: Vec<(&str, Vec<&CatalogEntry>)> = self
            .catalog
            .value_set_names()
            .map(|name| {
                let entries = system_filter(requirement, self.catalog.valid_entries(name, year));
                (name, entries)
            })
            .filter(|(_, entries)| !entries.is_empty())
            .collect();
        let matched = best_matches(
            &requirement.value_set,
            usable.iter().map(|(name, _)| *name),
        );
        let mut pool: Vec<(&CatalogEntry, &str)> = Vec::new();
        for name in &matched {
            let Some(index) = usable.iter().position(|(candidate, _)| candidate == name) else {
                continue;
            };
            let (_, entries) = usable.swap_remove(index);
            for entry in entries {
                if !pool.iter().any(|(seen, _)| std::ptr::eq(*seen, entry)) {
                    pool.push((entry, *name));
                }
            }
        }
        let (entry, name) = pool.choose(rng)?;
        debug!(
            requested = %requirement.value_set,
            matched = ?matched,
            candidates = pool.len(),
            code = %entry.code,
            "resolved code by value-set pattern"
        );
        Some(ResolvedCode::from_entry(
            entry,
            name,
            CodeSource::CatalogPattern,
        ))
    }
}
