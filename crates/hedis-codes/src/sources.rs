use std::sync::Arc;

use hedis_model::CodeValidity;

use crate::catalog::CodeCatalog;

/// The code tables a resolver or validator consults.
///
/// Cloning is cheap: both catalogs sit behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CodeSources {
    catalog: Arc<CodeCatalog>,
    curated: Option<Arc<CodeCatalog>>,
}

impl CodeSources {
    pub fn new(catalog: CodeCatalog) -> Self {
        Self::from_shared(Arc::new(catalog))
    }

    pub fn from_shared(catalog: Arc<CodeCatalog>) -> Self {
        Self {
            catalog,
            curated: None,
        }
    }

    #[must_use]
    pub fn with_curated(self, curated: CodeCatalog) -> Self {
        self.with_shared_curated(Arc::new(curated))
    }

    #[must_use]
    pub fn with_shared_curated(mut self, curated: Arc<CodeCatalog>) -> Self {
        self.curated = Some(curated);
        self
    }

    pub fn catalog(&self) -> &CodeCatalog {
        &self.catalog
    }

    pub fn shared_catalog(&self) -> Arc<CodeCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn shared_curated(&self) -> Option<Arc<CodeCatalog>> {
        self.curated.clone()
    }

    pub fn curated(&self) -> Option<&CodeCatalog> {
        self.curated.as_deref()
    }

    /// Curated table first, then the catalog.
    pub fn tables(&self) -> impl Iterator<Item = &CodeCatalog> {
        self.curated().into_iter().chain(std::iter::once(self.catalog()))
    }

    /// Validity across both tables: valid if either lists the code as valid.
    pub fn is_code_valid(&self, code: &str, value_set: &str, year: i32) -> CodeValidity {
        let mut verdict = CodeValidity::NotFound;
        for table in self.tables() {
            let validity = table.is_code_valid(code, value_set, year);
            if validity.is_valid() {
                return validity;
            }
            if verdict == CodeValidity::NotFound {
                verdict = validity;
            }
        }
        verdict
    }
}
