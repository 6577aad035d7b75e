//! Structural comparison of two rule sets for the same measure.

use serde::Serialize;

use hedis_model::RuleSet;

/// Differences between a reference rule set and a candidate.
///
/// Errors change who is eligible; warnings change what is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleComparison {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RuleComparison {
    pub fn is_match(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub fn compare_rule_sets(reference: &RuleSet, candidate: &RuleSet) -> RuleComparison {
    let mut comparison = RuleComparison::default();

    if reference.measure() != candidate.measure() {
        comparison.warnings.push(format!(
            "measure differs: {} vs {}",
            reference.measure(),
            candidate.measure()
        ));
    }
    let (expected, actual) = (reference.age_range(), candidate.age_range());
    if expected != actual {
        comparison.errors.push(format!(
            "age range differs: {}-{} vs {}-{}",
            expected.min, expected.max, actual.min, actual.max
        ));
    }
    if reference.age_as_of() != candidate.age_as_of() {
        comparison.errors.push(format!(
            "age anchor differs: {} vs {}",
            reference.anchor_date(),
            candidate.anchor_date()
        ));
    }

    let (expected, actual) = (
        reference.continuous_enrollment(),
        candidate.continuous_enrollment(),
    );
    if expected.period_months != actual.period_months {
        comparison.errors.push(format!(
            "enrollment period differs: {} vs {} months",
            expected.period_months, actual.period_months
        ));
    }
    if expected.allowable_gap_days != actual.allowable_gap_days {
        comparison.errors.push(format!(
            "allowable gap differs: {} vs {} days",
            expected.allowable_gap_days, actual.allowable_gap_days
        ));
    }
    if expected.no_gap_on_anchor_day != actual.no_gap_on_anchor_day {
        comparison
            .errors
            .push("anchor-day coverage requirement differs".to_string());
    }

    let (expected, actual) = (
        reference.numerator_components().len(),
        candidate.numerator_components().len(),
    );
    if expected != actual {
        comparison.warnings.push(format!(
            "numerator component count differs: {expected} vs {actual}"
        ));
    }
    for name in reference.component_names() {
        if candidate.component(name).is_none() {
            comparison
                .warnings
                .push(format!("component '{name}' missing from candidate"));
        }
    }
    for name in candidate.component_names() {
        if reference.component(name).is_none() {
            comparison
                .warnings
                .push(format!("component '{name}' not in reference"));
        }
    }
    comparison
}
