//! Every generated code must be valid for the measurement year.

use hedis_codes::CodeSources;
use hedis_model::columns::{TRACE_CODE, TRACE_CODE_SOURCE, TRACE_VALUE_SET};
use hedis_model::{CheckKind, CheckResult, CodeSource};

use super::{CheckOutcome, MemberView};

pub(crate) fn check(view: &MemberView<'_>, sources: &CodeSources) -> CheckOutcome {
    let year = view.rules.measurement_year();
    let mut checked = 0usize;
    let mut failures = Vec::new();

    for (table, row) in &view.rows {
        let Some(source) = row.text(TRACE_CODE_SOURCE) else {
            continue;
        };
        if CodeSource::parse(source) == Some(CodeSource::Explicit) {
            continue;
        }
        checked += 1;
        let code = row.text(TRACE_CODE).map(str::trim).unwrap_or_default();
        let value_set = row.text(TRACE_VALUE_SET).unwrap_or_default();
        if code.is_empty() {
            failures.push(format!("{table}: empty code for value set '{value_set}'"));
            continue;
        }
        let validity = sources.is_code_valid(code, value_set, year);
        if !validity.is_valid() {
            failures.push(format!(
                "{table}: {code} ({value_set}) {}",
                validity.describe()
            ));
        }
    }

    let passed = failures.is_empty();
    let actual = if passed {
        format!("{checked} codes valid")
    } else {
        format!("{} of {checked} codes invalid", failures.len())
    };
    let outcome = CheckOutcome::new(CheckResult::new(
        CheckKind::CodeValidity,
        format!("codes valid in {year}"),
        actual,
        passed,
    ));
    failures
        .into_iter()
        .fold(outcome, |outcome, message| outcome.with_note(message))
}
