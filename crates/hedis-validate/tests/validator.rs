#![allow(missing_docs)]

use chrono::NaiveDate;
use hedis_codes::{CodeCatalog, CodeSources};
use hedis_model::columns::{
    DOB, ENROLLMENT_END, ENROLLMENT_START, ENROLLMENT_TABLE, MEMBER_ID, MEMBER_TABLE,
    TRACE_CODE, TRACE_CODE_SOURCE, TRACE_COMPONENT, TRACE_ROLE, TRACE_VALUE_SET,
};
use hedis_model::dates::{birth_date_for_age, ymd};
use hedis_model::{
    CatalogEntry, CheckKind, CodeSystem, EventDescriptor, ExclusionFlag, ExpectedOutcome,
    OutputRowSet, Row, RuleSet, Scenario,
};
use hedis_validate::{ComplianceValidator, total_gap_days};

const RULES: &str = r#"
measure: PSA
measurement_year: 2026
age_range: [66, 100]
continuous_enrollment:
  period_months: 12
  allowable_gap_days: 45
  no_gap_on_anchor_day: true
numerator_components:
  - kind: simple
    name: PSA Test
    target_table: LAB
    code:
      value_set: PSA Lab Test
exclusions:
  - kind: simple
    name: Hospice
    target_table: VISIT
    code:
      value_set: Hospice Encounter
"#;

fn rules() -> RuleSet {
    RuleSet::from_yaml_str(RULES).expect("rules")
}

fn rules_with_gap(days: i64) -> RuleSet {
    let yaml = RULES.replace(
        "allowable_gap_days: 45",
        &format!("allowable_gap_days: {days}"),
    );
    RuleSet::from_yaml_str(&yaml).expect("rules")
}

fn validator() -> ComplianceValidator {
    ComplianceValidator::new(CodeSources::new(CodeCatalog::from_entries(
        "vsd",
        [
            CatalogEntry::new("84153", CodeSystem::Cpt, "PSA Lab Test"),
            CatalogEntry::new("84152", CodeSystem::Cpt, "PSA Lab Test")
                .with_expiration_date(ymd(2020, 12, 31)),
            CatalogEntry::new("G9473", CodeSystem::Hcpcs, "Hospice Encounter"),
        ],
    )))
}

struct Fixture {
    output: OutputRowSet,
}

impl Fixture {
    fn member(age: u32) -> Self {
        let dob = birth_date_for_age(age, ymd(2026, 12, 31)).expect("dob");
        let mut output = OutputRowSet::new();
        output.push(MEMBER_TABLE, Row::new().with(MEMBER_ID, "M001").with(DOB, dob));
        Self { output }
    }

    fn span(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.output.push(
            ENROLLMENT_TABLE,
            Row::new()
                .with(MEMBER_ID, "M001")
                .with(ENROLLMENT_START, start)
                .with(ENROLLMENT_END, end),
        );
        self
    }

    fn full_year(self) -> Self {
        self.span(ymd(2026, 1, 1), ymd(2026, 12, 31))
    }

    fn clinical(
        mut self,
        table: &str,
        component: &str,
        role: &str,
        value_set: &str,
        code: &str,
        source: &str,
    ) -> Self {
        self.output.push(
            table,
            Row::new()
                .with(MEMBER_ID, "M001")
                .with("SERV_DT", ymd(2026, 6, 1))
                .with("CPT_1", code)
                .with(TRACE_COMPONENT, component)
                .with(TRACE_ROLE, role)
                .with(TRACE_VALUE_SET, value_set)
                .with(TRACE_CODE, code)
                .with(TRACE_CODE_SOURCE, source),
        );
        self
    }

    fn psa(self, code: &str) -> Self {
        self.clinical("LAB", "PSA Test", "numerator", "PSA Lab Test", code, "catalog_exact")
    }
}

fn compliant() -> Scenario {
    Scenario::new("M001", 70, ExpectedOutcome::Compliant)
        .with_event(EventDescriptor::present("PSA Test"))
}

#[test]
fn complete_compliant_member_passes() {
    let fixture = Fixture::member(70).full_year().psa("84153");
    let report = validator().validate(&compliant(), &rules(), &fixture.output);
    assert!(report.passed, "{report:?}");
    assert_eq!(report.checks.len(), 5);
}

#[test]
fn enrollment_gap_of_forty_four_days_passes_at_forty_five() {
    let spans = [
        (ymd(2025, 1, 1), ymd(2026, 10, 1)),
        (ymd(2026, 11, 14), ymd(2026, 12, 31)),
    ];
    assert_eq!(total_gap_days(&spans, (ymd(2026, 1, 1), ymd(2026, 12, 31))), 44);

    let fixture = Fixture::member(70)
        .span(spans[0].0, spans[0].1)
        .span(spans[1].0, spans[1].1)
        .psa("84153");
    let report = validator().validate(&compliant(), &rules(), &fixture.output);
    let check = report.check(CheckKind::ContinuousEnrollment).expect("check");
    assert!(check.passed);
    assert_eq!(check.actual, "gap 44 days");
}

#[test]
fn enrollment_gap_of_forty_four_days_fails_at_forty_three() {
    let fixture = Fixture::member(70)
        .span(ymd(2025, 1, 1), ymd(2026, 10, 1))
        .span(ymd(2026, 11, 14), ymd(2026, 12, 31))
        .psa("84153");
    let report = validator().validate(&compliant(), &rules_with_gap(43), &fixture.output);
    assert!(!report.check(CheckKind::ContinuousEnrollment).expect("check").passed);
    assert!(!report.passed);
}

#[test]
fn uncovered_anchor_day_fails() {
    let fixture = Fixture::member(70)
        .span(ymd(2026, 1, 1), ymd(2026, 12, 20))
        .psa("84153");
    let report = validator().validate(&compliant(), &rules(), &fixture.output);
    let check = report.check(CheckKind::ContinuousEnrollment).expect("check");
    assert!(!check.passed);
    assert!(check.actual.contains("anchor date not covered"));
}

#[test]
fn age_boundary() {
    let young = Fixture::member(65).full_year().psa("84153");
    let report = validator().validate(&compliant(), &rules(), &young.output);
    assert!(!report.check(CheckKind::Age).expect("age").passed);

    let eligible = Fixture::member(66).full_year().psa("84153");
    let report = validator().validate(&compliant(), &rules(), &eligible.output);
    assert!(report.check(CheckKind::Age).expect("age").passed);
}

#[test]
fn missing_numerator_table_fails_fidelity_naming_table() {
    let fixture = Fixture::member(70).full_year();
    let report = validator().validate(&compliant(), &rules(), &fixture.output);
    let check = report.check(CheckKind::ScenarioFidelity).expect("fidelity");
    assert!(!check.passed);
    assert!(check.actual.contains("LAB"), "{}", check.actual);
    assert!(report.notes.iter().any(|note| note.contains("LAB")));
}

#[test]
fn non_compliant_member_with_numerator_rows_fails() {
    let scenario = Scenario::new("M001", 70, ExpectedOutcome::NonCompliant);
    let fixture = Fixture::member(70).full_year().psa("84153");
    let report = validator().validate(&scenario, &rules(), &fixture.output);
    assert!(!report.check(CheckKind::ScenarioFidelity).expect("fidelity").passed);

    let empty = Fixture::member(70).full_year();
    let report = validator().validate(&scenario, &rules(), &empty.output);
    assert!(report.passed, "{report:?}");
}

#[test]
fn non_compliant_ineligible_age_is_tolerated_with_note() {
    let scenario = Scenario::new("M001", 60, ExpectedOutcome::NonCompliant);
    let fixture = Fixture::member(60).full_year();
    let report = validator().validate(&scenario, &rules(), &fixture.output);
    assert!(report.check(CheckKind::Age).expect("age").passed);
    assert!(!report.notes.is_empty());
}

#[test]
fn exclusion_rows_match_flags_in_both_directions() {
    let scenario = Scenario::new("M001", 70, ExpectedOutcome::Excluded)
        .with_exclusion(ExclusionFlag::present("Hospice"));

    let with_row = Fixture::member(70).full_year().clinical(
        "VISIT",
        "Hospice",
        "exclusion",
        "Hospice Encounter",
        "G9473",
        "catalog_exact",
    );
    let report = validator().validate(&scenario, &rules(), &with_row.output);
    assert!(report.passed, "{report:?}");

    let without_row = Fixture::member(70).full_year();
    let report = validator().validate(&scenario, &rules(), &without_row.output);
    assert!(!report.check(CheckKind::Exclusion).expect("exclusion").passed);
    assert!(!report.check(CheckKind::ScenarioFidelity).expect("fidelity").passed);

    let unflagged = Scenario::new("M001", 70, ExpectedOutcome::NonCompliant);
    let report = validator().validate(&unflagged, &rules(), &with_row.output);
    assert!(!report.check(CheckKind::Exclusion).expect("exclusion").passed);
}

#[test]
fn expired_and_empty_codes_fail_code_validity() {
    let expired = Fixture::member(70).full_year().psa("84152");
    let report = validator().validate(&compliant(), &rules(), &expired.output);
    let check = report.check(CheckKind::CodeValidity).expect("codes");
    assert!(!check.passed);
    assert!(report.notes.iter().any(|note| note.contains("expired 2020-12-31")));

    let empty = Fixture::member(70)
        .full_year()
        .clinical("LAB", "PSA Test", "numerator", "PSA Lab Test", "", "unresolved");
    let report = validator().validate(&compliant(), &rules(), &empty.output);
    assert!(!report.check(CheckKind::CodeValidity).expect("codes").passed);
}

#[test]
fn explicit_codes_skip_catalog_lookup() {
    let fixture = Fixture::member(70).full_year().clinical(
        "LAB",
        "PSA Test",
        "numerator",
        "PSA Lab Test",
        "99213",
        "explicit",
    );
    let report = validator().validate(&compliant(), &rules(), &fixture.output);
    assert!(report.check(CheckKind::CodeValidity).expect("codes").passed);
}

#[test]
fn member_without_rows_reports_failures_instead_of_panicking() {
    let report = validator().validate(&compliant(), &rules(), &OutputRowSet::new());
    assert!(!report.passed);
    assert_eq!(report.checks.len(), 5);
    insta::assert_snapshot!(
        report.summary_line(),
        @"M001: FAIL (2/5 checks; failed: age, continuous enrollment, scenario fidelity)"
    );
}
