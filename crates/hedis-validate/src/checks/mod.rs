//! Per-member compliance checks.
//!
//! Every check reads the generated rows only; the scenario contributes
//! expectations, never facts.

pub mod age;
pub mod codes;
pub mod enrollment;
pub mod exclusion;
pub mod fidelity;

use hedis_model::columns::{TRACE_COMPONENT, TRACE_ROLE};
use hedis_model::{CheckResult, ComponentRole, OutputRowSet, Row, RuleSet, Scenario};

/// One member's slice of the output plus the inputs the checks need.
pub(crate) struct MemberView<'a> {
    pub scenario: &'a Scenario,
    pub rules: &'a RuleSet,
    pub rows: Vec<(&'a str, &'a Row)>,
}

impl<'a> MemberView<'a> {
    pub fn new(scenario: &'a Scenario, rules: &'a RuleSet, output: &'a OutputRowSet) -> Self {
        Self {
            scenario,
            rules,
            rows: output.member_rows(&scenario.member_id).collect(),
        }
    }

    pub fn member_id(&self) -> &'a str {
        &self.scenario.member_id
    }

    pub fn table(&self, table: &str) -> impl Iterator<Item = &'a Row> {
        self.rows
            .iter()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, row)| *row)
    }

    /// Clinical rows tagged with `role`.
    pub fn with_role(&self, role: ComponentRole) -> impl Iterator<Item = (&'a str, &'a Row)> {
        self.rows
            .iter()
            .copied()
            .filter(move |(_, row)| {
                row.text(TRACE_ROLE).and_then(ComponentRole::parse) == Some(role)
            })
    }

    /// Rows generated for the named component.
    pub fn tagged(&self, component: &str) -> impl Iterator<Item = (&'a str, &'a Row)> {
        self.rows
            .iter()
            .copied()
            .filter(move |(_, row)| row.text(TRACE_COMPONENT) == Some(component))
    }
}

/// A check result with any explanatory notes.
pub(crate) struct CheckOutcome {
    pub result: CheckResult,
    pub notes: Vec<String>,
}

impl CheckOutcome {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}
