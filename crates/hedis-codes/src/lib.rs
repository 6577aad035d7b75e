//! Clinical code resolution.
//!
//! A [`CodeResolver`] turns a [`CodeRequirement`](hedis_model::CodeRequirement)
//! into a concrete code valid in the measurement year. Codes come from an
//! explicit override, a curated medication table, or the value-set catalog
//! (exact name first, then fuzzy name matching). When several codes qualify,
//! one is chosen uniformly with the caller's RNG.

pub mod catalog;
pub mod error;
pub mod loader;
pub mod matching;
pub mod resolver;
pub mod sources;
pub mod strategy;

pub use catalog::{CodeCatalog, ValueSetStats};
pub use error::{CatalogError, NoValidCodeError};
pub use loader::{
    curated_from_json_str, load_catalog_csv, load_catalog_from_reader, load_curated_json,
};
pub use resolver::CodeResolver;
pub use sources::CodeSources;
pub use strategy::{
    CatalogExactMatch, CatalogPatternMatch, CuratedLookup, ExplicitCode, ResolutionStrategy,
    ResolvedCode,
};
