//! Exclusion flags against exclusion rows, in both directions.

use std::collections::BTreeSet;

use hedis_model::columns::TRACE_COMPONENT;
use hedis_model::{CheckKind, CheckResult, ComponentRole};

use super::{CheckOutcome, MemberView};

pub(crate) fn check(view: &MemberView<'_>) -> CheckOutcome {
    let flagged: BTreeSet<&str> = view
        .scenario
        .present_exclusions()
        .map(|flag| flag.name.as_str())
        .collect();
    let generated: BTreeSet<&str> = view
        .with_role(ComponentRole::Exclusion)
        .filter_map(|(_, row)| row.text(TRACE_COMPONENT))
        .collect();

    let mut outcome = CheckOutcome::new(CheckResult::new(
        CheckKind::Exclusion,
        describe(&flagged),
        describe(&generated),
        flagged == generated,
    ));
    for name in flagged.difference(&generated) {
        outcome = outcome.with_note(format!("exclusion '{name}' flagged but no row generated"));
    }
    for name in generated.difference(&flagged) {
        outcome = outcome.with_note(format!("exclusion row '{name}' has no matching flag"));
    }
    outcome
}

fn describe(names: &BTreeSet<&str>) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.iter().copied().collect::<Vec<_>>().join(", ")
    }
}
