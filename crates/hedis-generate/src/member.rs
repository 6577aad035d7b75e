//! Member demographics and enrollment rows.

use chrono::{Datelike, NaiveDate};
use hedis_model::columns::{
    AGE, DOB, ENROLLMENT_END, ENROLLMENT_START, GENDER, MEMBER_ID, MONTHLY_FLAG_COUNT,
    PRODUCT_ID, PRODUCT_LINE, monthly_flag,
};
use hedis_model::dates::{birth_date_for_age, ymd};
use hedis_model::{DateArithmeticError, EnrollmentSpan, Row, RuleSet, Scenario};

/// The member table row. DOB is chosen so age at the rule set's anchor date
/// equals the scenario age.
pub fn member_row(scenario: &Scenario, rules: &RuleSet) -> Result<Row, DateArithmeticError> {
    let dob = birth_date_for_age(scenario.age, rules.anchor_date())?;
    Ok(Row::new()
        .with(MEMBER_ID, scenario.member_id.as_str())
        .with(GENDER, scenario.gender.code())
        .with(AGE, i64::from(scenario.age))
        .with(DOB, dob)
        .with(PRODUCT_LINE, scenario.product_line.label())
        .with(PRODUCT_ID, scenario.product_line.product_id()))
}

/// One row per enrollment span, defaulting to the whole enrollment window.
pub fn enrollment_rows(
    scenario: &Scenario,
    rules: &RuleSet,
) -> Result<Vec<Row>, DateArithmeticError> {
    let default_span;
    let spans: &[EnrollmentSpan] = if scenario.enrollment_spans.is_empty() {
        let (start, end) = rules.enrollment_window();
        default_span = [EnrollmentSpan::new(start, end)];
        &default_span
    } else {
        &scenario.enrollment_spans
    };

    spans
        .iter()
        .map(|span| {
            if span.start > span.end {
                return Err(DateArithmeticError::InvertedSpan {
                    start: span.start,
                    end: span.end,
                });
            }
            let product_id = span
                .product_id
                .unwrap_or_else(|| scenario.product_line.product_id());
            let mut row = Row::new()
                .with(MEMBER_ID, scenario.member_id.as_str())
                .with(ENROLLMENT_START, span.start)
                .with(ENROLLMENT_END, span.end)
                .with(PRODUCT_ID, product_id);
            for (column, flag) in monthly_flags(span, rules.measurement_year()) {
                row.set(column, flag);
            }
            Ok(row)
        })
        .collect()
}

/// `FLD00`..`FLD23`: January of the prior year through December of the
/// measurement year, 1 when the span touches the month.
fn monthly_flags(span: &EnrollmentSpan, measurement_year: i32) -> Vec<(String, i64)> {
    (0..MONTHLY_FLAG_COUNT)
        .map(|index| {
            let year = measurement_year - 1 + i32::from(index >= 12);
            let month = index % 12 + 1;
            let first = ymd(year, month, 1);
            let last = last_day_of_month(first);
            let covered = span.start <= last && span.end >= first;
            (monthly_flag(index), i64::from(covered))
        })
        .collect()
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    ymd(year, month, 1).pred_opt().unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_cover_overlapping_months() {
        let span = EnrollmentSpan::new(ymd(2025, 11, 15), ymd(2026, 2, 1));
        let flags = monthly_flags(&span, 2026);
        let on: Vec<&str> = flags
            .iter()
            .filter(|(_, flag)| *flag == 1)
            .map(|(column, _)| column.as_str())
            .collect();
        assert_eq!(on, ["FLD10", "FLD11", "FLD12", "FLD13"]);
        assert_eq!(flags.len(), 24);
    }

    #[test]
    fn last_day_handles_december_and_leap_years() {
        assert_eq!(last_day_of_month(ymd(2026, 12, 1)), ymd(2026, 12, 31));
        assert_eq!(last_day_of_month(ymd(2024, 2, 1)), ymd(2024, 2, 29));
    }
}
