//! Rule-driven generation of synthetic member, enrollment and clinical rows.
//!
//! The [`GenerationEngine`] turns one [`Scenario`](hedis_model::Scenario) into
//! rows for the member, enrollment, visit, lab and pharmacy tables. Codes are
//! resolved through [`hedis_codes::CodeResolver`] and routed to a column by
//! code system. [`run_batch`] runs many scenarios in parallel with per-scenario
//! failure isolation.

pub mod batch;
pub mod engine;
pub mod error;
pub mod member;
pub mod routing;
pub mod schedule;
pub mod settings;

pub use batch::{BatchOutcome, ScenarioFailure, ScenarioOutput, run_batch, run_batch_with};
pub use engine::{Diagnostic, DiagnosticLevel, GenerationEngine, Generated};
pub use error::{FailureKind, GenerationError, Result};
pub use member::{enrollment_rows, member_row};
pub use routing::{CodeRoute, Placement, RoutingTable};
pub use schedule::occurrence_dates;
pub use settings::{DEFAULT_SEED, GenerationSettings};
