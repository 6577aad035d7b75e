use hedis_codes::CodeSources;
use hedis_model::{OutputRowSet, RuleSet, Scenario, ValidationReport};
use tracing::{debug, info_span};

use crate::checks::{self, MemberView};

/// Re-derives compliance from generated rows and compares it with what the
/// scenario expects.
#[derive(Debug, Clone, Default)]
pub struct ComplianceValidator {
    sources: CodeSources,
}

impl ComplianceValidator {
    pub fn new(sources: CodeSources) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &CodeSources {
        &self.sources
    }

    /// Runs every check for one member. Never fails: missing rows show up as
    /// failed checks.
    pub fn validate(
        &self,
        scenario: &Scenario,
        rules: &RuleSet,
        output: &OutputRowSet,
    ) -> ValidationReport {
        let span = info_span!("validate", member_id = %scenario.member_id);
        let _guard = span.enter();

        let view = MemberView::new(scenario, rules, output);
        let mut report = ValidationReport::new(view.member_id());
        let outcomes = [
            checks::age::check(&view),
            checks::enrollment::check(&view),
            checks::fidelity::check(&view),
            checks::exclusion::check(&view),
            checks::codes::check(&view, &self.sources),
        ];
        for outcome in outcomes {
            for note in outcome.notes {
                report.note(note);
            }
            report.record(outcome.result);
        }

        debug!(passed = report.passed, checks = report.checks.len(), "validated member");
        report
    }
}
