use std::sync::Arc;

use hedis_model::{CatalogEntry, CodeRequirement, CodeSource};
use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::error::NoValidCodeError;
use crate::sources::CodeSources;
use crate::strategy::{
    CatalogExactMatch, CatalogPatternMatch, CuratedLookup, ExplicitCode, ResolutionStrategy,
    ResolvedCode,
};

/// Picks a code for a requirement by trying each tier in order.
#[derive(Debug, Clone)]
pub struct CodeResolver {
    sources: CodeSources,
    strategies: Vec<Arc<dyn ResolutionStrategy>>,
}

impl CodeResolver {
    /// The standard order: explicit, curated, exact, pattern.
    pub fn new(sources: CodeSources) -> Self {
        let catalog = sources.shared_catalog();
        let curated = sources.shared_curated();
        let strategies: Vec<Arc<dyn ResolutionStrategy>> = vec![
            Arc::new(ExplicitCode),
            Arc::new(CuratedLookup::new(curated)),
            Arc::new(CatalogExactMatch::new(Arc::clone(&catalog))),
            Arc::new(CatalogPatternMatch::new(catalog)),
        ];
        Self::with_strategies(sources, strategies)
    }

    pub fn with_strategies(
        sources: CodeSources,
        strategies: Vec<Arc<dyn ResolutionStrategy>>,
    ) -> Self {
        Self {
            sources,
            strategies,
        }
    }

    pub fn sources(&self) -> &CodeSources {
        &self.sources
    }

    pub fn tiers(&self) -> Vec<CodeSource> {
        self.strategies
            .iter()
            .map(|strategy| strategy.source())
            .collect()
    }

    /// A code valid in `year`, from the first tier that has one.
    pub fn resolve(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Result<ResolvedCode, NoValidCodeError> {
        for strategy in &self.strategies {
            if let Some(resolved) = strategy.try_resolve(requirement, year, rng) {
                return Ok(resolved);
            }
            debug!(
                value_set = %requirement.value_set,
                tier = %strategy.source(),
                "tier produced no code"
            );
        }
        Err(NoValidCodeError {
            requirement: requirement.clone(),
            year,
        })
    }

    /// Retries the exact value set with dates ignored.
    ///
    /// Only for callers that have explicitly opted in; the result is tagged
    /// [`CodeSource::ExpiredFallback`] so it is never mistaken for a valid code.
    pub fn resolve_ignoring_dates(
        &self,
        requirement: &CodeRequirement,
        year: i32,
        rng: &mut dyn RngCore,
    ) -> Result<ResolvedCode, NoValidCodeError> {
        let candidates: Vec<(&CatalogEntry, &str)> = self
            .sources
            .tables()
            .flat_map(move |table| {
                let name = table
                    .display_name(&requirement.value_set)
                    .unwrap_or(&requirement.value_set);
                table
                    .entries_for(&requirement.value_set)
                    .filter(move |entry| {
                        requirement
                            .code_system
                            .as_ref()
                            .is_none_or(|system| *system == entry.code_system)
                    })
                    .map(move |entry| (entry, name))
            })
            .collect();
        let Some((entry, name)) = candidates.choose(rng) else {
            return Err(NoValidCodeError {
                requirement: requirement.clone(),
                year,
            });
        };
        warn!(
            value_set = %requirement.value_set,
            code = %entry.code,
            year,
            "no code valid in measurement year; using one outside its validity window"
        );
        Ok(ResolvedCode {
            code: entry.code.trim().to_string(),
            code_system: entry.code_system.clone(),
            value_set: (*name).to_string(),
            source: CodeSource::ExpiredFallback,
        })
    }
}
