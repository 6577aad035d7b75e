use std::path::PathBuf;

use hedis_model::CodeRequirement;

/// No strategy produced a code valid in the measurement year.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no valid code for value set '{}' in measurement year {year}", requirement.value_set)]
pub struct NoValidCodeError {
    pub requirement: CodeRequirement,
    pub year: i32,
}

impl NoValidCodeError {
    pub fn value_set(&self) -> &str {
        &self.requirement.value_set
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path} row {row}: invalid date '{value}'")]
    InvalidDate {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: &csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            message: source.to_string(),
        }
    }
}
