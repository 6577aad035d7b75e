use hedis_model::{ConfigurationError, DateArithmeticError};
use serde::Serialize;

/// Why a scenario could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    DateArithmetic(#[from] DateArithmeticError),
}

/// Error category, for batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    DateArithmetic,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::DateArithmetic => "date arithmetic",
        }
    }
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::DateArithmetic(_) => FailureKind::DateArithmetic,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
