//! Occurrence dates for repeated components.

use chrono::NaiveDate;
use hedis_model::DateArithmeticError;
use hedis_model::dates::{add_days, sub_days, year_end, year_start};

/// Dates for `count` occurrences, strictly increasing and at least
/// `min_separation_days` apart (one day when zero).
///
/// Explicit dates are sorted and checked, and only the earliest `count` are
/// kept. Missing occurrences follow
/// the last explicit date. Without explicit dates the schedule starts at
/// `base`, moved earlier when needed so the last occurrence stays inside the
/// measurement year, but never before January 1.
pub fn occurrence_dates(
    component: &str,
    count: u32,
    min_separation_days: i64,
    base: NaiveDate,
    explicit: &[NaiveDate],
    measurement_year: i32,
) -> Result<Vec<NaiveDate>, DateArithmeticError> {
    let step = u64::try_from(min_separation_days.max(1)).unwrap_or(1);
    let required = i64::try_from(step).unwrap_or(i64::MAX);

    let mut dates = explicit.to_vec();
    dates.sort_unstable();
    for pair in dates.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        let actual = (next - previous).num_days();
        if actual < required {
            return Err(DateArithmeticError::SeparationViolated {
                component: component.to_string(),
                previous,
                next,
                actual,
                required,
            });
        }
    }

    let wanted = usize::try_from(count).unwrap_or(usize::MAX);
    if dates.len() >= wanted {
        dates.truncate(wanted);
        return Ok(dates);
    }

    let mut cursor = match dates.last() {
        Some(last) => add_days(*last, step)?,
        None => {
            let span = step.saturating_mul(u64::from(count.saturating_sub(1)));
            let latest_start = sub_days(year_end(measurement_year), span)?;
            base.min(latest_start).max(year_start(measurement_year))
        }
    };
    while dates.len() < wanted {
        dates.push(cursor);
        if dates.len() < wanted {
            cursor = add_days(cursor, step)?;
        }
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use hedis_model::dates::ymd;

    use super::*;

    #[test]
    fn synthesizes_from_base_date() {
        let dates = occurrence_dates("Visit", 3, 30, ymd(2026, 6, 1), &[], 2026).unwrap();
        assert_eq!(dates, [ymd(2026, 6, 1), ymd(2026, 7, 1), ymd(2026, 7, 31)]);
    }

    #[test]
    fn shifts_earlier_to_stay_in_year() {
        let dates = occurrence_dates("Visit", 3, 120, ymd(2026, 9, 1), &[], 2026).unwrap();
        assert_eq!(dates.last(), Some(&ymd(2026, 12, 31)));
        assert_eq!(dates[0], ymd(2026, 5, 5));
    }

    #[test]
    fn extends_after_explicit_dates() {
        let explicit = [ymd(2026, 3, 1)];
        let dates = occurrence_dates("Visit", 2, 14, ymd(2026, 6, 1), &explicit, 2026).unwrap();
        assert_eq!(dates, [ymd(2026, 3, 1), ymd(2026, 3, 15)]);
    }

    #[test]
    fn surplus_explicit_dates_are_dropped() {
        let explicit = [
            ymd(2026, 7, 1),
            ymd(2026, 1, 1),
            ymd(2026, 5, 1),
            ymd(2026, 3, 1),
        ];
        let dates = occurrence_dates("Visit", 2, 30, ymd(2026, 6, 1), &explicit, 2026).unwrap();
        assert_eq!(dates, [ymd(2026, 1, 1), ymd(2026, 3, 1)]);
    }

    #[test]
    fn explicit_dates_too_close_fail() {
        let explicit = [ymd(2026, 3, 10), ymd(2026, 3, 1)];
        let error = occurrence_dates("Visit", 2, 14, ymd(2026, 6, 1), &explicit, 2026)
            .unwrap_err();
        assert!(matches!(
            error,
            DateArithmeticError::SeparationViolated { actual: 9, required: 14, .. }
        ));
    }
}
