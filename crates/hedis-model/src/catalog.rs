//! Code systems and value-set catalog entries.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{year_end, year_start};

/// The coding system a clinical code belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodeSystem {
    Cpt,
    Hcpcs,
    Icd10Cm,
    Icd10Pcs,
    Loinc,
    Snomed,
    Ndc,
    RxNorm,
    Cvx,
    Ubrev,
    Pos,
    Other(String),
}

/// Broad clinical category of a code system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeClass {
    Procedure,
    Diagnosis,
    Medication,
    Lab,
    Other,
}

impl CodeSystem {
    /// Parses common spellings case-insensitively. Unknown names are kept
    /// verbatim in [`CodeSystem::Other`].
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
            .collect::<String>()
            .to_ascii_uppercase();
        match key.as_str() {
            "CPT" | "CPT4" | "CPTCATII" | "CPTII" => Self::Cpt,
            "HCPCS" | "HCPCSLEVELII" => Self::Hcpcs,
            "ICD10CM" | "ICD10" | "ICD10DIAG" => Self::Icd10Cm,
            "ICD10PCS" | "ICD10PROC" => Self::Icd10Pcs,
            "LOINC" => Self::Loinc,
            "SNOMED" | "SNOMEDCT" | "SNOMEDCTUSEDITION" => Self::Snomed,
            "NDC" => Self::Ndc,
            "RXNORM" => Self::RxNorm,
            "CVX" => Self::Cvx,
            "UBREV" | "UBREVENUE" | "REV" | "REVENUE" => Self::Ubrev,
            "POS" => Self::Pos,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Canonical display label, e.g. `ICD-10-CM`.
    pub fn label(&self) -> &str {
        match self {
            Self::Cpt => "CPT",
            Self::Hcpcs => "HCPCS",
            Self::Icd10Cm => "ICD-10-CM",
            Self::Icd10Pcs => "ICD-10-PCS",
            Self::Loinc => "LOINC",
            Self::Snomed => "SNOMED",
            Self::Ndc => "NDC",
            Self::RxNorm => "RxNorm",
            Self::Cvx => "CVX",
            Self::Ubrev => "UBREV",
            Self::Pos => "POS",
            Self::Other(name) => name,
        }
    }

    pub fn class(&self) -> CodeClass {
        match self {
            Self::Cpt | Self::Hcpcs | Self::Icd10Pcs | Self::Ubrev | Self::Pos | Self::Cvx => {
                CodeClass::Procedure
            }
            Self::Icd10Cm | Self::Snomed => CodeClass::Diagnosis,
            Self::Ndc | Self::RxNorm => CodeClass::Medication,
            Self::Loinc => CodeClass::Lab,
            Self::Other(_) => CodeClass::Other,
        }
    }

    /// Guesses the system of a bare code from its shape.
    ///
    /// Used for explicit codes that arrive without a stated system. The
    /// heuristics cover the shapes that appear in HEDIS value sets; anything
    /// else is `Other("UNKNOWN")`.
    pub fn infer(code: &str) -> Self {
        let code = code.trim();
        let digits_only = !code.is_empty() && code.chars().all(|c| c.is_ascii_digit());
        let mut chars = code.chars();
        let first = chars.next();
        let second = chars.next();

        if is_ndc(code) {
            return Self::Ndc;
        }
        if is_loinc(code) {
            return Self::Loinc;
        }
        if digits_only {
            return match code.len() {
                1 | 2 => Self::Pos,
                3 => Self::Cvx,
                4 if code.starts_with('0') => Self::Ubrev,
                5 => Self::Cpt,
                6..=18 => Self::Snomed,
                _ => Self::Other("UNKNOWN".to_string()),
            };
        }
        // CPT category II: four digits and a trailing F or T.
        if code.is_ascii()
            && code.len() == 5
            && code[..4].chars().all(|c| c.is_ascii_digit())
            && matches!(code.as_bytes()[4], b'F' | b'T' | b'f' | b't')
        {
            return Self::Cpt;
        }
        match (first, second) {
            (Some(letter), Some(_))
                if letter.is_ascii_alphabetic()
                    && code.len() == 5
                    && code[1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                Self::Hcpcs
            }
            (Some(letter), Some(digit))
                if letter.is_ascii_alphabetic()
                    && digit.is_ascii_digit()
                    && (3..=8).contains(&code.len())
                    && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') =>
            {
                Self::Icd10Cm
            }
            _ if code.len() == 7 && code.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Self::Icd10Pcs
            }
            _ => Self::Other("UNKNOWN".to_string()),
        }
    }
}

fn is_ndc(code: &str) -> bool {
    let groups: Vec<&str> = code.split('-').collect();
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match groups.as_slice() {
        [single] => all_digits(single) && single.len() == 11,
        [a, b, c] => all_digits(a) && all_digits(b) && all_digits(c) && a.len() + b.len() + c.len() >= 10,
        _ => false,
    }
}

fn is_loinc(code: &str) -> bool {
    match code.split_once('-') {
        Some((body, check)) => {
            !body.is_empty()
                && body.len() <= 7
                && body.chars().all(|c| c.is_ascii_digit())
                && check.len() == 1
                && check.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for CodeSystem {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for CodeSystem {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<CodeSystem> for String {
    fn from(value: CodeSystem) -> Self {
        value.label().to_string()
    }
}

/// Validity of a code for a value set in a measurement year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "date", rename_all = "snake_case")]
pub enum CodeValidity {
    Valid,
    NotFound,
    NotYetEffective(NaiveDate),
    Expired(NaiveDate),
}

impl CodeValidity {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn describe(self) -> String {
        match self {
            Self::Valid => "valid".to_string(),
            Self::NotFound => "not listed in value set".to_string(),
            Self::NotYetEffective(date) => format!("not effective until {date}"),
            Self::Expired(date) => format!("expired {date}"),
        }
    }
}

/// One code as listed in the value-set directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub code_system: CodeSystem,
    pub value_sets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
}

impl CatalogEntry {
    pub fn new(
        code: impl Into<String>,
        code_system: CodeSystem,
        value_set: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            code_system,
            value_sets: vec![value_set.into()],
            effective_date: None,
            expiration_date: None,
        }
    }

    #[must_use]
    pub fn with_value_set(mut self, value_set: impl Into<String>) -> Self {
        self.value_sets.push(value_set.into());
        self
    }

    #[must_use]
    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_expiration_date(mut self, date: NaiveDate) -> Self {
        self.expiration_date = Some(date);
        self
    }

    /// Case-insensitive membership test on the value-set names.
    pub fn in_value_set(&self, name: &str) -> bool {
        let name = name.trim();
        self.value_sets
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(name))
    }

    /// Effective on or before Dec 31 and not expired before Jan 1 of `year`.
    /// A missing effective date counts as always effective.
    pub fn validity_for(&self, year: i32) -> CodeValidity {
        if let Some(effective) = self.effective_date
            && effective > year_end(year)
        {
            return CodeValidity::NotYetEffective(effective);
        }
        if let Some(expiration) = self.expiration_date
            && expiration < year_start(year)
        {
            return CodeValidity::Expired(expiration);
        }
        CodeValidity::Valid
    }

    pub fn is_valid_for(&self, year: i32) -> bool {
        self.validity_for(year).is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::ymd;

    #[test]
    fn validity_window_is_inclusive() {
        let entry = CatalogEntry::new("84153", CodeSystem::Cpt, "PSA Lab Test")
            .with_effective_date(ymd(2026, 12, 31))
            .with_expiration_date(ymd(2027, 1, 1));
        assert!(entry.is_valid_for(2026));
        assert!(entry.is_valid_for(2027));
        assert_eq!(
            entry.validity_for(2025),
            CodeValidity::NotYetEffective(ymd(2026, 12, 31))
        );
        assert_eq!(
            entry.validity_for(2028),
            CodeValidity::Expired(ymd(2027, 1, 1))
        );
    }

    #[test]
    fn missing_dates_are_always_valid() {
        let entry = CatalogEntry::new("84153", CodeSystem::Cpt, "PSA Lab Test");
        assert!(entry.is_valid_for(1990));
        assert!(entry.is_valid_for(2090));
    }

    #[test]
    fn parses_system_spellings() {
        assert_eq!(CodeSystem::parse("icd-10-cm"), CodeSystem::Icd10Cm);
        assert_eq!(CodeSystem::parse("SNOMED CT US Edition"), CodeSystem::Snomed);
        assert_eq!(CodeSystem::parse("RxNorm"), CodeSystem::RxNorm);
        assert_eq!(
            CodeSystem::parse("Custom"),
            CodeSystem::Other("Custom".to_string())
        );
        assert_eq!(CodeSystem::Icd10Cm.to_string(), "ICD-10-CM");
    }

    #[test]
    fn infers_systems_from_code_shape() {
        assert_eq!(CodeSystem::infer("84153"), CodeSystem::Cpt);
        assert_eq!(CodeSystem::infer("3074F"), CodeSystem::Cpt);
        assert_eq!(CodeSystem::infer("G0103"), CodeSystem::Hcpcs);
        assert_eq!(CodeSystem::infer("Z12.5"), CodeSystem::Icd10Cm);
        assert_eq!(CodeSystem::infer("2857-1"), CodeSystem::Loinc);
        assert_eq!(CodeSystem::infer("00093-7146-56"), CodeSystem::Ndc);
        assert_eq!(CodeSystem::infer("00093714656"), CodeSystem::Ndc);
        assert_eq!(CodeSystem::infer("0450"), CodeSystem::Ubrev);
        assert_eq!(CodeSystem::infer("11"), CodeSystem::Pos);
        assert_eq!(CodeSystem::infer("0VTT4ZZ"), CodeSystem::Icd10Pcs);
        assert_eq!(CodeSystem::infer("399208008"), CodeSystem::Snomed);
    }

    #[test]
    fn classes_group_systems() {
        assert_eq!(CodeSystem::Ndc.class(), CodeClass::Medication);
        assert_eq!(CodeSystem::Loinc.class(), CodeClass::Lab);
        assert_eq!(CodeSystem::Icd10Cm.class(), CodeClass::Diagnosis);
        assert_eq!(CodeSystem::Hcpcs.class(), CodeClass::Procedure);
    }
}
