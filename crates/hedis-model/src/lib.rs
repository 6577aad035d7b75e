//! Shared data model for HEDIS mock-data generation.
//!
//! Rule sets describe a measure, scenarios describe one synthetic member, and
//! an [`OutputRowSet`] holds the rows generated for them. Validation results
//! are reported as [`ValidationReport`]s.

pub mod catalog;
pub mod dates;
pub mod error;
pub mod report;
pub mod rows;
pub mod rules;
pub mod scenario;

pub use catalog::{CatalogEntry, CodeClass, CodeSystem, CodeValidity};
pub use error::{ConfigurationError, DateArithmeticError};
pub use report::{CheckKind, CheckResult, ValidationReport};
pub use rows::{CellValue, CodeSource, OutputRowSet, Row, columns};
pub use rules::{
    AgeAnchor, AgeRange, CodeRequirement, ComponentRef, ComponentRole, ComponentSpec,
    ContinuousEnrollment, RuleSet, RuleSetDocument,
};
pub use scenario::{
    EnrollmentSpan, EventDescriptor, ExclusionFlag, ExpectedOutcome, Gender, ProductLine,
    Scenario,
};
