//! Compliance validation for generated HEDIS mock data.
//!
//! [`ComplianceValidator`] recomputes age, continuous enrollment, numerator
//! and exclusion status from the generated rows alone and compares the
//! result with the scenario's expected outcome. [`check_quality`] runs
//! table-level data-quality checks before export, and [`compare_rule_sets`]
//! diffs two rule sets for the same measure.

pub mod checks;
pub mod compare;
pub mod quality;
pub mod validator;

pub use checks::enrollment::{covers, total_gap_days};
pub use compare::{RuleComparison, compare_rule_sets};
pub use quality::{QualityIssue, QualityReport, Severity, check_quality};
pub use validator::ComplianceValidator;
