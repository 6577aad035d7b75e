//! Batch generation over many scenarios.

use std::collections::BTreeSet;

use hedis_model::{ConfigurationError, OutputRowSet, RuleSet, Scenario, ValidationReport};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::engine::{Diagnostic, GenerationEngine};
use crate::error::{FailureKind, GenerationError};

/// Successful output for one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutput {
    pub member_id: String,
    pub rows: OutputRowSet,
    pub diagnostics: Vec<Diagnostic>,
    pub report: Option<ValidationReport>,
}

/// A scenario that produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFailure {
    pub member_id: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ScenarioFailure {
    fn from_error(member_id: &str, error: &GenerationError) -> Self {
        Self {
            member_id: member_id.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outputs and failures, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub outputs: Vec<ScenarioOutput>,
    pub failures: Vec<ScenarioFailure>,
}

impl BatchOutcome {
    /// Every successful scenario's rows in one set.
    pub fn merged_rows(&self) -> OutputRowSet {
        let mut merged = OutputRowSet::new();
        for output in &self.outputs {
            merged.merge(output.rows.clone());
        }
        merged
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn reports(&self) -> impl Iterator<Item = &ValidationReport> {
        self.outputs.iter().filter_map(|output| output.report.as_ref())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.outputs.iter().flat_map(|output| &output.diagnostics)
    }

    /// True when every generated scenario has a passing report.
    pub fn all_passed(&self) -> bool {
        self.outputs
            .iter()
            .all(|output| output.report.as_ref().is_some_and(|report| report.passed))
    }
}

/// Generates every scenario without validation.
pub fn run_batch(engine: &GenerationEngine, rules: &RuleSet, scenarios: &[Scenario]) -> BatchOutcome {
    run_scenarios(engine, rules, scenarios, None::<fn(&Scenario, &OutputRowSet) -> ValidationReport>)
}

/// Generates every scenario and validates each one with `validate`.
///
/// Scenarios run in parallel; results keep input order and do not depend on
/// thread count. A failing scenario never affects the others.
pub fn run_batch_with<F>(
    engine: &GenerationEngine,
    rules: &RuleSet,
    scenarios: &[Scenario],
    validate: F,
) -> BatchOutcome
where
    F: Fn(&Scenario, &OutputRowSet) -> ValidationReport + Sync,
{
    run_scenarios(engine, rules, scenarios, Some(validate))
}

enum Slot {
    Done(ScenarioOutput),
    Failed(ScenarioFailure),
}

fn run_scenarios<F>(
    engine: &GenerationEngine,
    rules: &RuleSet,
    scenarios: &[Scenario],
    validate: Option<F>,
) -> BatchOutcome
where
    F: Fn(&Scenario, &OutputRowSet) -> ValidationReport + Sync,
{
    let span = info_span!("batch", measure = %rules.measure(), scenarios = scenarios.len());
    let _guard = span.enter();

    // Later occurrences of a member id are rejected up front.
    let mut seen = BTreeSet::new();
    let duplicate: Vec<bool> = scenarios
        .iter()
        .map(|scenario| !seen.insert(scenario.member_id.as_str()))
        .collect();

    let slots: Vec<Slot> = scenarios
        .par_iter()
        .zip(duplicate.par_iter())
        .map(|(scenario, &is_duplicate)| {
            // Workers do not inherit the caller's entered span.
            span.in_scope(|| {
                let result = if is_duplicate {
                    Err(GenerationError::from(ConfigurationError::DuplicateMember(
                        scenario.member_id.clone(),
                    )))
                } else {
                    engine.generate(scenario, rules)
                };
                match result {
                    Ok(generated) => {
                        let report = validate
                            .as_ref()
                            .map(|validate| validate(scenario, &generated.rows));
                        Slot::Done(ScenarioOutput {
                            member_id: scenario.member_id.clone(),
                            rows: generated.rows,
                            diagnostics: generated.diagnostics,
                            report,
                        })
                    }
                    Err(error) => {
                        warn!(member_id = %scenario.member_id, %error, "scenario failed");
                        Slot::Failed(ScenarioFailure::from_error(&scenario.member_id, &error))
                    }
                }
            })
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for slot in slots {
        match slot {
            Slot::Done(output) => outcome.outputs.push(output),
            Slot::Failed(failure) => outcome.failures.push(failure),
        }
    }
    info!(
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        "batch complete"
    );
    outcome
}
