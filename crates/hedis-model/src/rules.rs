//! Measure rule sets.
//!
//! A [`RuleSet`] is only ever built from a [`RuleSetDocument`] through
//! `TryFrom`, so every rule set held in memory has already passed
//! [`RuleSet::try_from`] validation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::CodeSystem;
use crate::dates::{year_end, year_start};
use crate::error::ConfigurationError;

/// Inclusive age bounds, written as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }
}

impl From<[u32; 2]> for AgeRange {
    fn from([min, max]: [u32; 2]) -> Self {
        Self { min, max }
    }
}

impl From<AgeRange> for [u32; 2] {
    fn from(range: AgeRange) -> Self {
        [range.min, range.max]
    }
}

/// The date on which member age is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeAnchor {
    StartOfMeasurementYear,
    #[default]
    EndOfMeasurementYear,
    EndOfPriorYear,
}

impl AgeAnchor {
    pub fn date(self, measurement_year: i32) -> NaiveDate {
        match self {
            Self::StartOfMeasurementYear => year_start(measurement_year),
            Self::EndOfMeasurementYear => year_end(measurement_year),
            Self::EndOfPriorYear => year_end(measurement_year - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousEnrollment {
    pub period_months: u32,
    pub allowable_gap_days: i64,
    #[serde(default)]
    pub no_gap_on_anchor_day: bool,
}

impl ContinuousEnrollment {
    /// The `period_months` window that ends on Dec 31 of the measurement year.
    pub fn window(&self, measurement_year: i32) -> (NaiveDate, NaiveDate) {
        let end = year_end(measurement_year);
        let start = year_start(measurement_year + 1)
            .checked_sub_months(Months::new(self.period_months))
            .unwrap_or(NaiveDate::MIN);
        (start, end)
    }
}

/// How a component's code is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRequirement {
    #[serde(alias = "value_set_name")]
    pub value_set: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_system: Option<CodeSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_date: Option<NaiveDate>,
}

impl CodeRequirement {
    pub fn value_set(name: impl Into<String>) -> Self {
        Self {
            value_set: name.into(),
            code_system: None,
            explicit_code: None,
            explicit_date: None,
        }
    }

    #[must_use]
    pub fn with_code_system(mut self, system: CodeSystem) -> Self {
        self.code_system = Some(system);
        self
    }

    #[must_use]
    pub fn with_explicit_code(mut self, code: impl Into<String>) -> Self {
        self.explicit_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_explicit_date(mut self, date: NaiveDate) -> Self {
        self.explicit_date = Some(date);
        self
    }

    /// The explicit code, ignoring blank strings.
    pub fn explicit_code(&self) -> Option<&str> {
        self.explicit_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// One measure component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentSpec {
    /// One row per present event.
    Simple {
        name: String,
        target_table: String,
        code: CodeRequirement,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_value: Option<String>,
    },
    /// `count` rows spaced at least `min_separation_days` apart.
    Repeated {
        name: String,
        target_table: String,
        code: CodeRequirement,
        count: u32,
        #[serde(default)]
        min_separation_days: i64,
    },
    /// Several rows tied together by a shared link key column.
    Composite {
        name: String,
        sub_events: Vec<ComponentSpec>,
        link_key: String,
    },
}

impl ComponentSpec {
    pub fn simple(
        name: impl Into<String>,
        target_table: impl Into<String>,
        code: CodeRequirement,
    ) -> Self {
        Self::Simple {
            name: name.into(),
            target_table: target_table.into(),
            code,
            result_value: None,
        }
    }

    pub fn repeated(
        name: impl Into<String>,
        target_table: impl Into<String>,
        code: CodeRequirement,
        count: u32,
        min_separation_days: i64,
    ) -> Self {
        Self::Repeated {
            name: name.into(),
            target_table: target_table.into(),
            code,
            count,
            min_separation_days,
        }
    }

    pub fn composite(
        name: impl Into<String>,
        link_key: impl Into<String>,
        sub_events: Vec<ComponentSpec>,
    ) -> Self {
        Self::Composite {
            name: name.into(),
            sub_events,
            link_key: link_key.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Simple { name, .. } | Self::Repeated { name, .. } | Self::Composite { name, .. } => {
                name
            }
        }
    }

    /// Tables this component writes to; composites list every sub-event table.
    pub fn target_tables(&self) -> Vec<&str> {
        match self {
            Self::Simple { target_table, .. } | Self::Repeated { target_table, .. } => {
                vec![target_table.as_str()]
            }
            Self::Composite { sub_events, .. } => {
                let mut tables: Vec<&str> = Vec::new();
                for table in sub_events.iter().flat_map(ComponentSpec::target_tables) {
                    if !tables.contains(&table) {
                        tables.push(table);
                    }
                }
                tables
            }
        }
    }

    /// Code requirements of this component and its sub-events.
    pub fn requirements(&self) -> Vec<&CodeRequirement> {
        match self {
            Self::Simple { code, .. } | Self::Repeated { code, .. } => vec![code],
            Self::Composite { sub_events, .. } => sub_events
                .iter()
                .flat_map(ComponentSpec::requirements)
                .collect(),
        }
    }

    fn validate(&self, nested: bool) -> Result<(), ConfigurationError> {
        let name = self.name();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyComponentName);
        }
        match self {
            Self::Simple {
                target_table, code, ..
            } => check_leaf(name, target_table, code),
            Self::Repeated {
                target_table,
                code,
                count,
                min_separation_days,
                ..
            } => {
                check_leaf(name, target_table, code)?;
                if *count == 0 {
                    return Err(ConfigurationError::ZeroCount(name.to_string()));
                }
                if *min_separation_days < 0 {
                    return Err(ConfigurationError::NegativeSeparation {
                        component: name.to_string(),
                        days: *min_separation_days,
                    });
                }
                Ok(())
            }
            Self::Composite {
                sub_events,
                link_key,
                ..
            } => {
                if nested {
                    return Err(ConfigurationError::NestedComposite(name.to_string()));
                }
                if sub_events.is_empty() {
                    return Err(ConfigurationError::EmptyComposite(name.to_string()));
                }
                if link_key.trim().is_empty() {
                    return Err(ConfigurationError::EmptyLinkKey(name.to_string()));
                }
                for sub in sub_events {
                    if matches!(sub, Self::Composite { .. }) {
                        return Err(ConfigurationError::NestedComposite(name.to_string()));
                    }
                    sub.validate(true)?;
                }
                Ok(())
            }
        }
    }
}

fn check_leaf(
    name: &str,
    target_table: &str,
    code: &CodeRequirement,
) -> Result<(), ConfigurationError> {
    if target_table.trim().is_empty() {
        return Err(ConfigurationError::MissingTargetTable(name.to_string()));
    }
    if code.value_set.trim().is_empty() && code.explicit_code().is_none() {
        return Err(ConfigurationError::MissingValueSet(name.to_string()));
    }
    Ok(())
}

/// Which list of the rule set a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    Denominator,
    Numerator,
    Exclusion,
}

impl ComponentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Denominator => "denominator",
            Self::Numerator => "numerator",
            Self::Exclusion => "exclusion",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "denominator" => Some(Self::Denominator),
            "numerator" => Some(Self::Numerator),
            "exclusion" => Some(Self::Exclusion),
            _ => None,
        }
    }
}

/// A component located in a rule set.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRef<'a> {
    pub role: ComponentRole,
    /// Position within its role's list.
    pub index: usize,
    pub spec: &'a ComponentSpec,
}

/// Serialized form of a rule set, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    pub measure: String,
    pub measurement_year: i32,
    pub age_range: AgeRange,
    #[serde(default)]
    pub age_as_of: AgeAnchor,
    pub continuous_enrollment: ContinuousEnrollment,
    #[serde(default)]
    pub denominator_components: Vec<ComponentSpec>,
    #[serde(default)]
    pub numerator_components: Vec<ComponentSpec>,
    #[serde(default)]
    pub exclusions: Vec<ComponentSpec>,
    /// Event name to output column, overriding code-system routing.
    #[serde(default)]
    pub column_overrides: BTreeMap<String, String>,
}

/// A validated, read-only measure definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleSetDocument", into = "RuleSetDocument")]
pub struct RuleSet {
    document: RuleSetDocument,
    index: BTreeMap<String, (ComponentRole, usize)>,
}

impl TryFrom<RuleSetDocument> for RuleSet {
    type Error = ConfigurationError;

    fn try_from(document: RuleSetDocument) -> Result<Self, Self::Error> {
        if document.measure.trim().is_empty() {
            return Err(ConfigurationError::EmptyMeasure);
        }
        let AgeRange { min, max } = document.age_range;
        if min > max {
            return Err(ConfigurationError::InvertedAgeRange { min, max });
        }
        let enrollment = document.continuous_enrollment;
        if enrollment.allowable_gap_days < 0 {
            return Err(ConfigurationError::NegativeGapDays(
                enrollment.allowable_gap_days,
            ));
        }
        if enrollment.period_months == 0 {
            return Err(ConfigurationError::EmptyEnrollmentPeriod);
        }

        let mut index = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let lists = [
            (ComponentRole::Denominator, &document.denominator_components),
            (ComponentRole::Numerator, &document.numerator_components),
            (ComponentRole::Exclusion, &document.exclusions),
        ];
        for (role, components) in lists {
            for (position, component) in components.iter().enumerate() {
                component.validate(false)?;
                let name = component.name().to_string();
                if !seen.insert(name.clone()) {
                    return Err(ConfigurationError::DuplicateComponent(name));
                }
                index.insert(name, (role, position));
            }
        }

        Ok(Self { document, index })
    }
}

impl From<RuleSet> for RuleSetDocument {
    fn from(rules: RuleSet) -> Self {
        rules.document
    }
}

impl RuleSet {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let document: RuleSetDocument = serde_yaml::from_str(content)
            .map_err(|error| ConfigurationError::Parse(error.to_string()))?;
        Self::try_from(document)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let document: RuleSetDocument = serde_json::from_str(content)
            .map_err(|error| ConfigurationError::Parse(error.to_string()))?;
        Self::try_from(document)
    }

    pub fn document(&self) -> &RuleSetDocument {
        &self.document
    }

    pub fn measure(&self) -> &str {
        &self.document.measure
    }

    pub fn measurement_year(&self) -> i32 {
        self.document.measurement_year
    }

    pub fn age_range(&self) -> AgeRange {
        self.document.age_range
    }

    pub fn age_as_of(&self) -> AgeAnchor {
        self.document.age_as_of
    }

    /// The concrete date on which age is evaluated.
    pub fn anchor_date(&self) -> NaiveDate {
        self.document.age_as_of.date(self.document.measurement_year)
    }

    pub fn continuous_enrollment(&self) -> ContinuousEnrollment {
        self.document.continuous_enrollment
    }

    pub fn enrollment_window(&self) -> (NaiveDate, NaiveDate) {
        self.document
            .continuous_enrollment
            .window(self.document.measurement_year)
    }

    pub fn denominator_components(&self) -> &[ComponentSpec] {
        &self.document.denominator_components
    }

    pub fn numerator_components(&self) -> &[ComponentSpec] {
        &self.document.numerator_components
    }

    pub fn exclusions(&self) -> &[ComponentSpec] {
        &self.document.exclusions
    }

    pub fn components(&self, role: ComponentRole) -> &[ComponentSpec] {
        match role {
            ComponentRole::Denominator => self.denominator_components(),
            ComponentRole::Numerator => self.numerator_components(),
            ComponentRole::Exclusion => self.exclusions(),
        }
    }

    pub fn column_overrides(&self) -> &BTreeMap<String, String> {
        &self.document.column_overrides
    }

    pub fn column_override(&self, event_name: &str) -> Option<&str> {
        self.document
            .column_overrides
            .get(event_name)
            .map(String::as_str)
    }

    /// Exact lookup by canonical component name.
    pub fn component(&self, name: &str) -> Option<ComponentRef<'_>> {
        let (role, index) = *self.index.get(name)?;
        let spec = self.components(role).get(index)?;
        Some(ComponentRef { role, index, spec })
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}
