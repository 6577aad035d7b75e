//! Input loading: rule sets, code sources, scenarios and table schemas.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hedis_codes::{CodeSources, load_catalog_csv, load_curated_json};
use hedis_generate::{FailureKind, ScenarioFailure};
use hedis_model::dates::parse_measurement_date;
use hedis_model::{
    DateArithmeticError, EnrollmentSpan, EventDescriptor, ExclusionFlag, ExpectedOutcome, Gender,
    ProductLine, RuleSet, Scenario,
};
use serde::Deserialize;
use tracing::{info, warn};

/// Column layout per table, keyed by upper-case table name.
pub type TableSchema = BTreeMap<String, Vec<String>>;

/// Loads a rule set, choosing the parser from the file extension.
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read rule set {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let rules = if is_json {
        RuleSet::from_json_str(&content)
    } else {
        RuleSet::from_yaml_str(&content)
    }
    .with_context(|| format!("parse rule set {}", path.display()))?;
    info!(
        measure = %rules.measure(),
        year = rules.measurement_year(),
        "loaded rule set"
    );
    Ok(rules)
}

/// Loads the value-set catalog and, when given, the curated medication lists.
pub fn load_sources(catalog: &Path, curated: Option<&Path>) -> Result<CodeSources> {
    let catalog =
        load_catalog_csv(catalog).with_context(|| format!("load catalog {}", catalog.display()))?;
    let mut sources = CodeSources::new(catalog);
    if let Some(path) = curated {
        let curated = load_curated_json(path)
            .with_context(|| format!("load curated lists {}", path.display()))?;
        sources = sources.with_curated(curated);
    }
    Ok(sources)
}

/// Scenarios ready for generation plus those rejected while loading.
#[derive(Debug, Default)]
pub struct ScenarioLoad {
    pub scenarios: Vec<Scenario>,
    pub failures: Vec<ScenarioFailure>,
}

/// Event values may be written as text, numbers or booleans.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl RawValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
            Self::Flag(true) => "1".to_string(),
            Self::Flag(false) => "0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpanDocument {
    start: String,
    end: String,
    #[serde(default)]
    product_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EventDocument {
    name: String,
    #[serde(default)]
    value: Option<RawValue>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    explicit_code: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FlagDocument {
    name: String,
    #[serde(default = "default_true")]
    present: bool,
    #[serde(default)]
    date: Option<String>,
}

/// A scenario as written on disk; dates may use the `MY` token.
#[derive(Debug, Deserialize)]
struct ScenarioDocument {
    member_id: String,
    age: u32,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    product_line: Option<String>,
    #[serde(default)]
    enrollment_spans: Vec<SpanDocument>,
    #[serde(default)]
    events: Vec<EventDocument>,
    #[serde(default)]
    exclusion_flags: Vec<FlagDocument>,
    expected_outcome: String,
}

enum Rejection {
    Date(DateArithmeticError),
    Field(String),
}

impl Rejection {
    fn into_failure(self, member_id: &str) -> ScenarioFailure {
        let (kind, message) = match self {
            Self::Date(error) => (FailureKind::DateArithmetic, error.to_string()),
            Self::Field(message) => (FailureKind::Configuration, message),
        };
        ScenarioFailure {
            member_id: member_id.to_string(),
            kind,
            message,
        }
    }
}

fn date(text: &str, year: i32) -> Result<NaiveDate, Rejection> {
    parse_measurement_date(text, year).map_err(Rejection::Date)
}

fn optional_date(text: Option<&str>, year: i32) -> Result<Option<NaiveDate>, Rejection> {
    match text.map(str::trim) {
        Some(text) if !text.is_empty() => date(text, year).map(Some),
        _ => Ok(None),
    }
}

impl ScenarioDocument {
    fn resolve(self, year: i32) -> Result<Scenario, Rejection> {
        let expected_outcome: ExpectedOutcome =
            self.expected_outcome.parse().map_err(Rejection::Field)?;
        let mut scenario = Scenario::new(self.member_id, self.age, expected_outcome);
        if let Some(gender) = &self.gender {
            scenario = scenario.with_gender(Gender::parse(gender));
        }
        if let Some(product_line) = &self.product_line {
            let product_line: ProductLine = product_line.parse().map_err(Rejection::Field)?;
            scenario = scenario.with_product_line(product_line);
        }
        for span in self.enrollment_spans {
            let mut resolved = EnrollmentSpan::new(date(&span.start, year)?, date(&span.end, year)?);
            resolved.product_id = span.product_id;
            scenario = scenario.with_span(resolved);
        }
        for event in self.events {
            let mut descriptor = EventDescriptor::present(event.name);
            if let Some(value) = event.value {
                descriptor = descriptor.with_value(value.into_text());
            }
            if let Some(on) = optional_date(event.date.as_deref(), year)? {
                descriptor = descriptor.with_date(on);
            }
            if let Some(code) = event.explicit_code {
                descriptor = descriptor.with_explicit_code(code);
            }
            scenario = scenario.with_event(descriptor);
        }
        for flag in self.exclusion_flags {
            let mut resolved = ExclusionFlag::present(flag.name);
            resolved.present = flag.present;
            resolved.date = optional_date(flag.date.as_deref(), year)?;
            scenario = scenario.with_exclusion(resolved);
        }
        Ok(scenario)
    }
}

/// Loads a JSON array of scenarios.
///
/// Malformed JSON fails the whole load. A scenario whose dates or enum
/// fields cannot be resolved becomes a failure record and the rest load.
pub fn load_scenarios(path: &Path, measurement_year: i32) -> Result<ScenarioLoad> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read scenarios {}", path.display()))?;
    parse_scenarios(&content, measurement_year)
        .with_context(|| format!("parse scenarios {}", path.display()))
}

pub fn parse_scenarios(content: &str, measurement_year: i32) -> Result<ScenarioLoad> {
    let documents: Vec<ScenarioDocument> = serde_json::from_str(content)?;
    let mut load = ScenarioLoad::default();
    for document in documents {
        let member_id = document.member_id.clone();
        match document.resolve(measurement_year) {
            Ok(scenario) => load.scenarios.push(scenario),
            Err(rejection) => {
                let failure = rejection.into_failure(&member_id);
                warn!(member_id = %member_id, error = %failure.message, "scenario rejected");
                load.failures.push(failure);
            }
        }
    }
    info!(
        loaded = load.scenarios.len(),
        rejected = load.failures.len(),
        "loaded scenarios"
    );
    Ok(load)
}

/// Loads a JSON object of table name to ordered column names.
pub fn load_schema(path: &Path) -> Result<TableSchema> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read schema {}", path.display()))?;
    let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(&content)
        .with_context(|| format!("parse schema {}", path.display()))?;
    Ok(raw
        .into_iter()
        .map(|(table, columns)| (table.trim().to_ascii_uppercase(), columns))
        .collect())
}
