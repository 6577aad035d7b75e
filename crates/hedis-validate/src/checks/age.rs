//! Age at the rule set's anchor date.

use hedis_model::columns::{DOB, MEMBER_TABLE};
use hedis_model::dates::age_on;
use hedis_model::{CheckKind, CheckResult, ExpectedOutcome};

use super::{CheckOutcome, MemberView};

/// The member's age at the anchor, from the generated DOB.
pub(crate) fn computed_age(view: &MemberView<'_>) -> Option<u32> {
    let dob = view.table(MEMBER_TABLE).find_map(|row| row.date(DOB))?;
    age_on(dob, view.rules.anchor_date())
}

pub(crate) fn in_range(view: &MemberView<'_>) -> bool {
    computed_age(view).is_some_and(|age| view.rules.age_range().contains(age))
}

pub(crate) fn check(view: &MemberView<'_>) -> CheckOutcome {
    let range = view.rules.age_range();
    let expected = format!(
        "{}-{} on {}",
        range.min,
        range.max,
        view.rules.anchor_date()
    );
    let Some(age) = computed_age(view) else {
        return CheckOutcome::new(CheckResult::new(
            CheckKind::Age,
            expected,
            "no member row with a date of birth",
            false,
        ));
    };

    let eligible = range.contains(age);
    let tolerated = !eligible && view.scenario.expected_outcome == ExpectedOutcome::NonCompliant;
    let outcome = CheckOutcome::new(CheckResult::new(
        CheckKind::Age,
        expected,
        age.to_string(),
        eligible || tolerated,
    ));
    if tolerated {
        outcome.with_note(format!(
            "age {age} is outside {}-{}, consistent with a non-compliant expectation",
            range.min, range.max
        ))
    } else {
        outcome
    }
}
