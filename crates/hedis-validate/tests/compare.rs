#![allow(missing_docs)]

use hedis_model::RuleSet;
use hedis_validate::compare_rule_sets;

const REFERENCE: &str = r#"
measure: COL
measurement_year: 2026
age_range: [45, 75]
continuous_enrollment:
  period_months: 12
  allowable_gap_days: 45
numerator_components:
  - kind: simple
    name: Colonoscopy
    target_table: VISIT
    code:
      value_set: Colonoscopy
  - kind: simple
    name: FIT Test
    target_table: LAB
    code:
      value_set: FOBT Lab Test
"#;

fn parse(yaml: &str) -> RuleSet {
    RuleSet::from_yaml_str(yaml).expect("rules")
}

#[test]
fn identical_rule_sets_match() {
    let comparison = compare_rule_sets(&parse(REFERENCE), &parse(REFERENCE));
    assert!(comparison.is_match());
}

#[test]
fn eligibility_differences_are_errors() {
    let candidate = REFERENCE
        .replace("[45, 75]", "[50, 75]")
        .replace("period_months: 12", "period_months: 24");
    let comparison = compare_rule_sets(&parse(REFERENCE), &parse(&candidate));
    assert_eq!(
        comparison.errors,
        [
            "age range differs: 45-75 vs 50-75",
            "enrollment period differs: 12 vs 24 months",
        ]
    );
    assert!(comparison.warnings.is_empty());
}

#[test]
fn component_differences_are_warnings() {
    let candidate = REFERENCE.replace("name: FIT Test", "name: FOBT");
    let comparison = compare_rule_sets(&parse(REFERENCE), &parse(&candidate));
    assert!(comparison.errors.is_empty());
    assert_eq!(
        comparison.warnings,
        [
            "component 'FIT Test' missing from candidate",
            "component 'FOBT' not in reference",
        ]
    );
}
