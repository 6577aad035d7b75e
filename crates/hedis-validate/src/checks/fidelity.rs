//! Whether the rows match the scenario's expected outcome.

use hedis_model::dates::in_year;
use hedis_model::{CheckKind, CheckResult, ComponentRole, ComponentSpec, ExpectedOutcome};

use super::{CheckOutcome, MemberView, age, enrollment};

pub(crate) fn check(view: &MemberView<'_>) -> CheckOutcome {
    match view.scenario.expected_outcome {
        ExpectedOutcome::Compliant => compliant(view),
        ExpectedOutcome::NonCompliant => non_compliant(view),
        ExpectedOutcome::Excluded => excluded(view),
    }
}

/// Numerator components the scenario asks for; all of them when it names none.
fn required_components<'a>(view: &MemberView<'a>) -> Vec<&'a ComponentSpec> {
    let numerator = view.rules.numerator_components();
    let named = view.scenario.present_event_names();
    let chosen: Vec<&ComponentSpec> = numerator
        .iter()
        .filter(|spec| named.contains(&spec.name()))
        .collect();
    if chosen.is_empty() {
        numerator.iter().collect()
    } else {
        chosen
    }
}

fn compliant(view: &MemberView<'_>) -> CheckOutcome {
    let required = required_components(view);
    let mut missing = Vec::new();
    for spec in &required {
        if view.tagged(spec.name()).next().is_some() {
            continue;
        }
        let absent: Vec<&str> = spec
            .target_tables()
            .into_iter()
            .filter(|table| view.table(table).next().is_none())
            .collect();
        if !absent.is_empty() {
            missing.push(format!("{}: no rows in {}", spec.name(), absent.join(", ")));
        }
    }

    let names: Vec<&str> = required.iter().map(|spec| spec.name()).collect();
    let expected = format!("rows for {}", names.join(", "));
    let passed = missing.is_empty();
    let actual = if passed {
        "all numerator rows present".to_string()
    } else {
        missing.join("; ")
    };
    let outcome = CheckOutcome::new(CheckResult::new(
        CheckKind::ScenarioFidelity,
        expected,
        actual,
        passed,
    ));
    missing
        .into_iter()
        .fold(outcome, |outcome, message| outcome.with_note(message))
}

fn non_compliant(view: &MemberView<'_>) -> CheckOutcome {
    let year = view.rules.measurement_year();
    let numerator_rows = view
        .with_role(ComponentRole::Numerator)
        .filter(|(_, row)| row.event_date().is_some_and(|date| in_year(date, year)))
        .count();
    let excluded = view.with_role(ComponentRole::Exclusion).next().is_some();
    let eligible = age::in_range(view) && enrollment::evaluate(view).satisfied;

    let mut reasons = Vec::new();
    if numerator_rows == 0 {
        reasons.push("no numerator rows in the measurement year");
    }
    if !eligible {
        reasons.push("member not eligible");
    }
    if excluded {
        reasons.push("exclusion row present");
    }

    let passed = !reasons.is_empty();
    let actual = if passed {
        reasons.join(", ")
    } else {
        format!("{numerator_rows} numerator rows in {year} for an eligible member")
    };
    CheckOutcome::new(CheckResult::new(
        CheckKind::ScenarioFidelity,
        "no numerator rows, ineligible, or excluded",
        actual,
        passed,
    ))
}

fn excluded(view: &MemberView<'_>) -> CheckOutcome {
    let rows = view.with_role(ComponentRole::Exclusion).count();
    CheckOutcome::new(CheckResult::new(
        CheckKind::ScenarioFidelity,
        "exclusion row present",
        format!("{rows} exclusion rows"),
        rows > 0,
    ))
}
