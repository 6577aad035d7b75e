//! Calendar helpers shared by generation and validation.
//!
//! Test-case sheets write dates relative to the measurement year (`1/1/MY`,
//! `12/31/MY-1`); [`parse_measurement_date`] turns those into concrete dates.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::error::DateArithmeticError;

const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%Y/%m/%d"];

/// January 1 of `year`.
pub fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// December 31 of `year`.
pub fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Builds a date inside `year`, clamping impossible values to the year bounds.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| year_start(year))
}

pub fn in_year(date: NaiveDate, year: i32) -> bool {
    date.year() == year
}

/// Completed years between `dob` and `on`. `None` when `dob` is after `on`.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> Option<u32> {
    if dob > on {
        return None;
    }
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// A birth date that makes the member exactly `age` on `anchor`, placed
/// roughly half a year before the birthday boundary.
pub fn birth_date_for_age(age: u32, anchor: NaiveDate) -> Result<NaiveDate, DateArithmeticError> {
    age.checked_mul(12)
        .and_then(|months| anchor.checked_sub_months(Months::new(months)))
        .and_then(|date| date.checked_sub_days(Days::new(182)))
        .ok_or_else(|| DateArithmeticError::OutOfRange(format!("birth date for age {age}")))
}

pub fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, DateArithmeticError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| DateArithmeticError::OutOfRange(format!("{date} + {days} days")))
}

pub fn sub_days(date: NaiveDate, days: u64) -> Result<NaiveDate, DateArithmeticError> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| DateArithmeticError::OutOfRange(format!("{date} - {days} days")))
}

/// Parses a date written either literally or with the `MY` token.
///
/// `MY` stands for the measurement year and may carry an offset: `MY-1`,
/// `MY+1`. Accepted layouts are `M/D/YYYY`, `YYYY-MM-DD`, `M-D-YYYY` and
/// `YYYY/MM/DD`.
pub fn parse_measurement_date(
    text: &str,
    measurement_year: i32,
) -> Result<NaiveDate, DateArithmeticError> {
    let lowered = text.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return Err(DateArithmeticError::Unparseable(text.to_string()));
    }
    let resolved = match lowered.find("my") {
        Some(pos) => {
            let (offset, rest) = split_year_offset(&lowered[pos + 2..])
                .ok_or_else(|| DateArithmeticError::Unparseable(text.to_string()))?;
            format!("{}{}{}", &lowered[..pos], measurement_year + offset, rest)
        }
        None => lowered,
    };
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&resolved, format).ok())
        .ok_or_else(|| DateArithmeticError::Unparseable(text.to_string()))
}

fn split_year_offset(tail: &str) -> Option<(i32, &str)> {
    let sign = match tail.chars().next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Some((0, tail)),
    };
    let digits = tail[1..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(tail.len(), |end| end + 1);
    if digits == 1 {
        return None;
    }
    let value: i32 = tail[1..digits].parse().ok()?;
    Some((sign * value, &tail[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_measurement_year_tokens() {
        assert_eq!(
            parse_measurement_date("1/1/MY", 2026).unwrap(),
            ymd(2026, 1, 1)
        );
        assert_eq!(
            parse_measurement_date("12/31/MY-1", 2026).unwrap(),
            ymd(2025, 12, 31)
        );
        assert_eq!(
            parse_measurement_date("6/15/my+1", 2026).unwrap(),
            ymd(2027, 6, 15)
        );
    }

    #[test]
    fn parses_literal_dates() {
        assert_eq!(
            parse_measurement_date("2026-03-04", 2020).unwrap(),
            ymd(2026, 3, 4)
        );
        assert_eq!(
            parse_measurement_date("10/1/2026", 2020).unwrap(),
            ymd(2026, 10, 1)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_measurement_date("soon", 2026),
            Err(DateArithmeticError::Unparseable(_))
        ));
        assert!(parse_measurement_date("1/1/MY-", 2026).is_err());
        assert!(parse_measurement_date("", 2026).is_err());
    }

    #[test]
    fn age_counts_completed_years() {
        let dob = ymd(1960, 7, 2);
        assert_eq!(age_on(dob, ymd(2026, 7, 1)), Some(65));
        assert_eq!(age_on(dob, ymd(2026, 7, 2)), Some(66));
        assert_eq!(age_on(dob, ymd(1959, 1, 1)), None);
    }

    #[test]
    fn birth_date_reproduces_age_at_anchor() {
        for anchor in [ymd(2026, 12, 31), ymd(2026, 1, 1), ymd(2025, 12, 31)] {
            for age in [0, 1, 17, 45, 66, 80] {
                let dob = birth_date_for_age(age, anchor).unwrap();
                assert_eq!(age_on(dob, anchor), Some(age), "age {age} at {anchor}");
            }
        }
    }
}
