#![allow(missing_docs)]

use hedis_model::dates::ymd;
use hedis_model::{
    AgeAnchor, CodeSystem, ComponentRole, ComponentSpec, ConfigurationError, RuleSet, Scenario,
};

const PSA_RULES: &str = r#"
measure: PSA
measurement_year: 2026
age_range: [66, 80]
age_as_of: end_of_measurement_year
continuous_enrollment:
  period_months: 12
  allowable_gap_days: 45
  no_gap_on_anchor_day: true
denominator_components:
  - kind: simple
    name: Outpatient Visit
    target_table: VISIT
    code:
      value_set: Outpatient
numerator_components:
  - kind: simple
    name: PSA Test
    target_table: LAB
    code:
      value_set: PSA Lab Test
      code_system: CPT
  - kind: repeated
    name: Follow Up
    target_table: VISIT
    code:
      value_set: Outpatient
    count: 2
    min_separation_days: 30
  - kind: composite
    name: Inpatient Stay
    link_key: CLAIM_ID
    sub_events:
      - kind: simple
        name: Inpatient Revenue
        target_table: VISIT
        code:
          value_set: Inpatient Stay
      - kind: simple
        name: Prostate Diagnosis
        target_table: DIAG
        code:
          value_set: Prostate Cancer
exclusions:
  - kind: simple
    name: Hospice
    target_table: VISIT
    code:
      value_set: Hospice Encounter
column_overrides:
  PSA Test: CPT_1
"#;

fn replace(source: &str, from: &str, to: &str) -> String {
    assert!(source.contains(from), "fixture missing {from}");
    source.replacen(from, to, 1)
}

#[test]
fn parses_full_rule_set() {
    let rules = RuleSet::from_yaml_str(PSA_RULES).expect("rules");
    assert_eq!(rules.measure(), "PSA");
    assert_eq!(rules.age_as_of(), AgeAnchor::EndOfMeasurementYear);
    assert_eq!(rules.anchor_date(), ymd(2026, 12, 31));
    assert_eq!(rules.enrollment_window(), (ymd(2026, 1, 1), ymd(2026, 12, 31)));
    assert_eq!(rules.numerator_components().len(), 3);
    assert_eq!(rules.column_override("PSA Test"), Some("CPT_1"));

    let psa = rules.component("PSA Test").expect("PSA Test");
    assert_eq!(psa.role, ComponentRole::Numerator);
    match psa.spec {
        ComponentSpec::Simple { code, .. } => {
            assert_eq!(code.value_set, "PSA Lab Test");
            assert_eq!(code.code_system, Some(CodeSystem::Cpt));
        }
        other => panic!("unexpected component {other:?}"),
    }

    let stay = rules.component("Inpatient Stay").expect("Inpatient Stay");
    assert_eq!(stay.spec.target_tables(), ["VISIT", "DIAG"]);
    assert_eq!(
        rules.component("Hospice").map(|found| found.role),
        Some(ComponentRole::Exclusion)
    );
}

#[test]
fn age_anchor_defaults_to_end_of_year() {
    let yaml = replace(PSA_RULES, "age_as_of: end_of_measurement_year\n", "");
    let rules = RuleSet::from_yaml_str(&yaml).expect("rules");
    assert_eq!(rules.age_as_of(), AgeAnchor::EndOfMeasurementYear);
}

#[test]
fn inverted_age_range_is_rejected() {
    let yaml = replace(PSA_RULES, "[66, 80]", "[80, 66]");
    assert_eq!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::InvertedAgeRange { min: 80, max: 66 })
    );
}

#[test]
fn negative_gap_is_rejected() {
    let yaml = replace(PSA_RULES, "allowable_gap_days: 45", "allowable_gap_days: -1");
    assert_eq!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::NegativeGapDays(-1))
    );
}

#[test]
fn zero_period_is_rejected() {
    let yaml = replace(PSA_RULES, "period_months: 12", "period_months: 0");
    assert_eq!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::EmptyEnrollmentPeriod)
    );
}

#[test]
fn duplicate_names_across_lists_are_rejected() {
    let yaml = replace(PSA_RULES, "name: Hospice", "name: PSA Test");
    assert_eq!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::DuplicateComponent("PSA Test".to_string()))
    );
}

#[test]
fn zero_count_is_rejected() {
    let yaml = replace(PSA_RULES, "count: 2", "count: 0");
    assert_eq!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::ZeroCount("Follow Up".to_string()))
    );
}

#[test]
fn unknown_kind_is_a_parse_error() {
    let yaml = replace(PSA_RULES, "kind: repeated", "kind: sometimes");
    assert!(matches!(
        RuleSet::from_yaml_str(&yaml),
        Err(ConfigurationError::Parse(_))
    ));
}

#[test]
fn rule_set_round_trips_through_json() {
    let rules = RuleSet::from_yaml_str(PSA_RULES).expect("rules");
    let json = serde_json::to_string(&rules).expect("serialize");
    let back = RuleSet::from_json_str(&json).expect("deserialize");
    assert_eq!(back, rules);
}

#[test]
fn scenario_accepts_loose_spellings() {
    let scenario: Scenario = serde_json::from_str(
        r#"{
            "member_id": "M001",
            "age": 70,
            "gender": "male",
            "product_line": "commercial",
            "enrollment_spans": [{"start": "2026-01-01", "end": "2026-12-31"}],
            "events": [{"name": "PSA Test"}, {"name": "Follow Up", "value": "0"}],
            "expected_outcome": "Non-Compliant"
        }"#,
    )
    .expect("scenario");
    assert_eq!(scenario.gender.code(), "M");
    assert_eq!(scenario.product_line.product_id(), 2);
    assert_eq!(scenario.present_event_names(), ["PSA Test"]);
}
