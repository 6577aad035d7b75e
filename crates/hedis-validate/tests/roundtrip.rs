#![allow(missing_docs)]

use hedis_codes::{CodeCatalog, CodeResolver, CodeSources};
use hedis_generate::{GenerationEngine, run_batch_with};
use hedis_model::dates::ymd;
use hedis_model::{
    CatalogEntry, CodeSystem, EnrollmentSpan, EventDescriptor, ExclusionFlag, ExpectedOutcome,
    RuleSet, Scenario,
};
use hedis_validate::{ComplianceValidator, check_quality};

const RULES: &str = r#"
measure: CBP
measurement_year: 2026
age_range: [18, 85]
continuous_enrollment:
  period_months: 12
  allowable_gap_days: 45
  no_gap_on_anchor_day: true
denominator_components:
  - kind: simple
    name: Hypertension Diagnosis
    target_table: DIAG
    code:
      value_set: Essential Hypertension
numerator_components:
  - kind: simple
    name: Outpatient Visit
    target_table: VISIT
    code:
      value_set: Outpatient
  - kind: composite
    name: BP Reading
    link_key: CLAIM_ID
    sub_events:
      - kind: simple
        name: Systolic
        target_table: VISIT
        code:
          value_set: Systolic Less Than 140
      - kind: simple
        name: Diastolic
        target_table: VISIT
        code:
          value_set: Diastolic Less Than 90
exclusions:
  - kind: simple
    name: Hospice
    target_table: VISIT
    code:
      value_set: Hospice Encounter
"#;

fn sources() -> CodeSources {
    CodeSources::new(CodeCatalog::from_entries(
        "vsd",
        [
            CatalogEntry::new("I10", CodeSystem::Icd10Cm, "Essential Hypertension"),
            CatalogEntry::new("99214", CodeSystem::Cpt, "Outpatient"),
            CatalogEntry::new("99215", CodeSystem::Cpt, "Outpatient"),
            CatalogEntry::new("3074F", CodeSystem::Cpt, "Systolic Less Than 140"),
            CatalogEntry::new("3078F", CodeSystem::Cpt, "Diastolic Less Than 90"),
            CatalogEntry::new("G9473", CodeSystem::Hcpcs, "Hospice Encounter"),
        ],
    ))
}

#[test]
fn generated_batch_validates_against_expectations() {
    let rules = RuleSet::from_yaml_str(RULES).expect("rules");
    let engine = GenerationEngine::new(CodeResolver::new(sources()));
    let validator = ComplianceValidator::new(sources());

    let scenarios = [
        Scenario::new("C001", 55, ExpectedOutcome::Compliant)
            .with_event(EventDescriptor::present("Hypertension Diagnosis"))
            .with_event(EventDescriptor::present("Outpatient Visit"))
            .with_event(EventDescriptor::present("BP Reading")),
        Scenario::new("C002", 55, ExpectedOutcome::NonCompliant)
            .with_event(EventDescriptor::present("Hypertension Diagnosis"))
            .with_span(EnrollmentSpan::new(ymd(2026, 1, 1), ymd(2026, 6, 30))),
        Scenario::new("C003", 70, ExpectedOutcome::Excluded)
            .with_exclusion(ExclusionFlag::present("Hospice")),
        Scenario::new("C004", 90, ExpectedOutcome::NonCompliant),
    ];

    let outcome = run_batch_with(&engine, &rules, &scenarios, |scenario, rows| {
        validator.validate(scenario, &rules, rows)
    });
    assert_eq!(outcome.failed(), 0);
    for report in outcome.reports() {
        assert!(report.passed, "{}: {report:?}", report.summary_line());
    }
    assert!(outcome.all_passed());
    assert!(!check_quality(&outcome.merged_rows()).has_errors());
}

#[test]
fn explicit_code_reaches_output_even_when_catalog_lacks_it() {
    let rules = RuleSet::from_yaml_str(RULES).expect("rules");
    let engine = GenerationEngine::new(CodeResolver::new(sources()));
    let scenario = Scenario::new("C010", 55, ExpectedOutcome::Compliant)
        .with_event(EventDescriptor::present("Outpatient Visit").with_explicit_code("99213"));

    let generated = engine.generate(&scenario, &rules).expect("generate");
    let visit = &generated.rows.rows("VISIT")[0];
    assert_eq!(visit.text("CPT_1"), Some("99213"));

    let report = ComplianceValidator::new(sources()).validate(&scenario, &rules, &generated.rows);
    assert!(report.passed, "{report:?}");
}
