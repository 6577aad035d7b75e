//! Per-member validation results.

use serde::{Deserialize, Serialize};

/// The checks run against each generated member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Age,
    ContinuousEnrollment,
    ScenarioFidelity,
    Exclusion,
    CodeValidity,
}

impl CheckKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::ContinuousEnrollment => "continuous enrollment",
            Self::ScenarioFidelity => "scenario fidelity",
            Self::Exclusion => "exclusion",
            Self::CodeValidity => "code validity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: CheckKind,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(
        name: CheckKind,
        expected: impl Into<String>,
        actual: impl Into<String>,
        passed: bool,
    ) -> Self {
        Self {
            name,
            expected: expected.into(),
            actual: actual.into(),
            passed,
        }
    }
}

/// Outcome of validating one member. `passed` is the AND of all checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub member_id: String,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ValidationReport {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            passed: true,
            checks: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn record(&mut self, check: CheckResult) {
        self.passed &= check.passed;
        self.checks.push(check);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn check(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == kind)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.passed)
    }

    pub fn summary_line(&self) -> String {
        let passed = self.checks.iter().filter(|check| check.passed).count();
        let total = self.checks.len();
        if self.passed {
            format!("{}: PASS ({passed}/{total} checks)", self.member_id)
        } else {
            let failed: Vec<&str> = self
                .failed_checks()
                .map(|check| check.name.label())
                .collect();
            format!(
                "{}: FAIL ({passed}/{total} checks; failed: {})",
                self.member_id,
                failed.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_is_conjunction_of_checks() {
        let mut report = ValidationReport::new("M001");
        assert!(report.passed);
        report.record(CheckResult::new(CheckKind::Age, "66-80", "70", true));
        assert!(report.passed);
        report.record(CheckResult::new(
            CheckKind::ScenarioFidelity,
            "rows for PSA Test",
            "missing LAB",
            false,
        ));
        report.record(CheckResult::new(CheckKind::Exclusion, "none", "none", true));
        assert!(!report.passed);
        insta::assert_snapshot!(
            report.summary_line(),
            @"M001: FAIL (2/3 checks; failed: scenario fidelity)"
        );
    }
}
