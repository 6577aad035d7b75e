//! Synthetic member scenarios.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unknown,
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "F" | "FEMALE" => Self::Female,
            "M" | "MALE" => Self::Male,
            _ => Self::Unknown,
        }
    }

    /// Single-letter code written to the member table.
    pub fn code(self) -> &'static str {
        match self {
            Self::Female => "F",
            Self::Male => "M",
            Self::Unknown => "U",
        }
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        value.code().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProductLine {
    #[default]
    Medicare,
    Commercial,
    Medicaid,
    Exchange,
}

impl ProductLine {
    pub fn label(self) -> &'static str {
        match self {
            Self::Medicare => "Medicare",
            Self::Commercial => "Commercial",
            Self::Medicaid => "Medicaid",
            Self::Exchange => "Exchange",
        }
    }

    /// Numeric product id used by the enrollment feeds.
    pub fn product_id(self) -> i64 {
        match self {
            Self::Medicare => 1,
            Self::Commercial => 2,
            Self::Medicaid => 3,
            Self::Exchange => 4,
        }
    }
}

impl FromStr for ProductLine {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "medicare" | "1" => Ok(Self::Medicare),
            "commercial" | "2" => Ok(Self::Commercial),
            "medicaid" | "3" => Ok(Self::Medicaid),
            "exchange" | "marketplace" | "4" => Ok(Self::Exchange),
            other => Err(format!("unknown product line '{other}'")),
        }
    }
}

impl TryFrom<String> for ProductLine {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductLine> for String {
    fn from(value: ProductLine) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpectedOutcome {
    Compliant,
    NonCompliant,
    Excluded,
}

impl ExpectedOutcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::NonCompliant => "Non-Compliant",
            Self::Excluded => "Excluded",
        }
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpectedOutcome {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .trim()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "compliant" => Ok(Self::Compliant),
            "noncompliant" => Ok(Self::NonCompliant),
            "excluded" | "exclusion" => Ok(Self::Excluded),
            _ => Err(format!("unknown expected outcome '{raw}'")),
        }
    }
}

impl TryFrom<String> for ExpectedOutcome {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpectedOutcome> for String {
    fn from(value: ExpectedOutcome) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
}

impl EnrollmentSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            product_id: None,
        }
    }
}

const PRESENT_TOKENS: [&str; 6] = ["1", "Y", "YES", "TRUE", "X", "PRESENT"];
const ABSENT_TOKENS: [&str; 5] = ["0", "N", "NO", "FALSE", "ABSENT"];

fn default_present() -> String {
    "1".to_string()
}

/// A clinical event the scenario asks for.
///
/// `value` is either a presence token (`1`/`Y`/`TRUE`, `0`/`N`/`FALSE`) or a
/// result value such as `4.2`, which is written to the row's result column and
/// counts as present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    #[serde(default = "default_present")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_code: Option<String>,
}

impl EventDescriptor {
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: default_present(),
            date: None,
            explicit_code: None,
        }
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            value: "0".to_string(),
            ..Self::present(name)
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn with_explicit_code(mut self, code: impl Into<String>) -> Self {
        self.explicit_code = Some(code.into());
        self
    }

    pub fn is_present(&self) -> bool {
        let value = self.value.trim();
        !value.is_empty()
            && !ABSENT_TOKENS
                .iter()
                .any(|token| token.eq_ignore_ascii_case(value))
    }

    /// The value when it is a result rather than a presence token.
    pub fn result_value(&self) -> Option<&str> {
        let value = self.value.trim();
        let is_token = PRESENT_TOKENS
            .iter()
            .chain(ABSENT_TOKENS.iter())
            .any(|token| token.eq_ignore_ascii_case(value));
        (!value.is_empty() && !is_token).then_some(value)
    }

    pub fn explicit_code(&self) -> Option<&str> {
        self.explicit_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionFlag {
    pub name: String,
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl ExclusionFlag {
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            present: true,
            date: None,
        }
    }

    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// One synthetic member and the outcome it is meant to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub member_id: String,
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub product_line: ProductLine,
    #[serde(default)]
    pub enrollment_spans: Vec<EnrollmentSpan>,
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
    #[serde(default)]
    pub exclusion_flags: Vec<ExclusionFlag>,
    pub expected_outcome: ExpectedOutcome,
}

impl Scenario {
    pub fn new(member_id: impl Into<String>, age: u32, expected_outcome: ExpectedOutcome) -> Self {
        Self {
            member_id: member_id.into(),
            age,
            gender: Gender::default(),
            product_line: ProductLine::default(),
            enrollment_spans: Vec::new(),
            events: Vec::new(),
            exclusion_flags: Vec::new(),
            expected_outcome,
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    #[must_use]
    pub fn with_product_line(mut self, product_line: ProductLine) -> Self {
        self.product_line = product_line;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: EnrollmentSpan) -> Self {
        self.enrollment_spans.push(span);
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: EventDescriptor) -> Self {
        self.events.push(event);
        self
    }

    #[must_use]
    pub fn with_exclusion(mut self, flag: ExclusionFlag) -> Self {
        self.exclusion_flags.push(flag);
        self
    }

    /// Distinct names of present events, in first-appearance order.
    pub fn present_event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for event in self.events.iter().filter(|event| event.is_present()) {
            if !names.contains(&event.name.as_str()) {
                names.push(&event.name);
            }
        }
        names
    }

    pub fn present_exclusions(&self) -> impl Iterator<Item = &ExclusionFlag> {
        self.exclusion_flags.iter().filter(|flag| flag.present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_tokens() {
        assert!(EventDescriptor::present("A").is_present());
        assert!(!EventDescriptor::absent("A").is_present());
        assert!(!EventDescriptor::present("A").with_value("").is_present());
        assert!(!EventDescriptor::present("A").with_value("no").is_present());
        assert!(EventDescriptor::present("A").with_value("yes").is_present());
    }

    #[test]
    fn result_values_count_as_present() {
        let event = EventDescriptor::present("A1c").with_value("7.9");
        assert!(event.is_present());
        assert_eq!(event.result_value(), Some("7.9"));
        assert_eq!(EventDescriptor::present("A1c").result_value(), None);
    }

    #[test]
    fn outcome_spellings() {
        assert_eq!(
            "Non-Compliant".parse::<ExpectedOutcome>(),
            Ok(ExpectedOutcome::NonCompliant)
        );
        assert_eq!(
            "non compliant".parse::<ExpectedOutcome>(),
            Ok(ExpectedOutcome::NonCompliant)
        );
        assert_eq!(
            "EXCLUDED".parse::<ExpectedOutcome>(),
            Ok(ExpectedOutcome::Excluded)
        );
        assert!("maybe".parse::<ExpectedOutcome>().is_err());
    }

    #[test]
    fn product_ids_follow_feed_mapping() {
        assert_eq!(ProductLine::Medicare.product_id(), 1);
        assert_eq!(ProductLine::Commercial.product_id(), 2);
        assert_eq!(ProductLine::Medicaid.product_id(), 3);
        assert_eq!(ProductLine::Exchange.product_id(), 4);
    }
}
