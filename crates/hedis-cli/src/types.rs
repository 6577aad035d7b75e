use std::path::PathBuf;

use hedis_generate::BatchOutcome;
use hedis_validate::QualityReport;

/// Everything a `generate` run produced.
#[derive(Debug)]
pub struct GenerateResult {
    pub measure: String,
    pub output_dir: PathBuf,
    pub outcome: BatchOutcome,
    pub quality: QualityReport,
    /// CSV files written, in table order.
    pub tables: Vec<PathBuf>,
    pub validation_report: Option<PathBuf>,
    pub quality_report: PathBuf,
    pub manifest: PathBuf,
    pub validated: bool,
}

impl GenerateResult {
    pub fn has_failures(&self) -> bool {
        self.outcome.failed() > 0 || (self.validated && !self.outcome.all_passed())
    }
}

/// Result of a `validate` run.
#[derive(Debug)]
pub struct ValidateResult {
    pub measure: String,
    pub outcome: BatchOutcome,
    pub report_path: Option<PathBuf>,
}

impl ValidateResult {
    pub fn has_failures(&self) -> bool {
        self.outcome.failed() > 0 || !self.outcome.all_passed()
    }
}
