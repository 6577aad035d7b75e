#![allow(missing_docs)]

use std::collections::BTreeSet;

use hedis_codes::{CodeCatalog, CodeResolver, CodeSources};
use hedis_model::dates::ymd;
use hedis_model::{CatalogEntry, CodeRequirement, CodeSource, CodeSystem};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn catalog() -> CodeCatalog {
    CodeCatalog::from_entries(
        "vsd",
        [
            CatalogEntry::new("84152", CodeSystem::Cpt, "PSA Lab Test")
                .with_expiration_date(ymd(2020, 12, 31)),
            CatalogEntry::new("84153", CodeSystem::Cpt, "PSA Lab Test")
                .with_effective_date(ymd(2015, 1, 1)),
            CatalogEntry::new("84154", CodeSystem::Cpt, "PSA Lab Test"),
            CatalogEntry::new("G0103", CodeSystem::Hcpcs, "PSA Lab Test"),
            CatalogEntry::new("99213", CodeSystem::Cpt, "Outpatient Visit Codes"),
            CatalogEntry::new("99214", CodeSystem::Cpt, "Outpatient Visit Codes"),
            CatalogEntry::new("Z51.5", CodeSystem::Icd10Cm, "Palliative Care Encounter"),
            CatalogEntry::new("0VTT4ZZ", CodeSystem::Icd10Pcs, "Prostatectomy")
                .with_expiration_date(ymd(2019, 12, 31)),
            CatalogEntry::new("00093714656", CodeSystem::Ndc, "Statin Medications"),
        ],
    )
}

fn curated() -> CodeCatalog {
    CodeCatalog::from_entries(
        "meds",
        [CatalogEntry::new(
            "00378395177",
            CodeSystem::Ndc,
            "Statin Medications",
        )],
    )
}

fn resolver() -> CodeResolver {
    CodeResolver::new(CodeSources::new(catalog()).with_curated(curated()))
}

#[test]
fn resolved_codes_are_valid_for_the_year() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("PSA Lab Test");
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let resolved = resolver
            .resolve(&requirement, 2026, &mut rng)
            .expect("code");
        assert_ne!(resolved.code, "84152", "expired code selected");
        assert_eq!(resolved.source, CodeSource::CatalogExact);
        assert!(
            resolver
                .sources()
                .is_code_valid(&resolved.code, &resolved.value_set, 2026)
                .is_valid()
        );
    }
}

#[test]
fn selection_is_not_always_the_first_candidate() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("PSA Lab Test");
    let chosen: BTreeSet<String> = (0..50)
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            resolver
                .resolve(&requirement, 2026, &mut rng)
                .expect("code")
                .code
        })
        .collect();
    assert!(chosen.len() >= 2, "only {chosen:?} chosen across 50 seeds");
}

#[test]
fn same_seed_gives_same_code() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("PSA Lab Test");
    let first: Vec<String> = {
        let mut rng = StdRng::seed_from_u64(99);
        (0..20)
            .map(|_| resolver.resolve(&requirement, 2026, &mut rng).expect("code").code)
            .collect()
    };
    let second: Vec<String> = {
        let mut rng = StdRng::seed_from_u64(99);
        (0..20)
            .map(|_| resolver.resolve(&requirement, 2026, &mut rng).expect("code").code)
            .collect()
    };
    assert_eq!(first, second);
}

#[test]
fn explicit_code_bypasses_catalog_dates() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("PSA Lab Test").with_explicit_code("84152");
    let mut rng = StdRng::seed_from_u64(1);
    let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
    assert_eq!(resolved.code, "84152");
    assert_eq!(resolved.source, CodeSource::Explicit);
    assert_eq!(resolved.code_system, CodeSystem::Cpt);
}

#[test]
fn curated_table_beats_catalog() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Statin Medications");
    let mut rng = StdRng::seed_from_u64(3);
    let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
    assert_eq!(resolved.code, "00378395177");
    assert_eq!(resolved.source, CodeSource::Curated);
}

#[test]
fn code_system_narrows_candidates() {
    let resolver = resolver();
    let requirement =
        CodeRequirement::value_set("PSA Lab Test").with_code_system(CodeSystem::Hcpcs);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..20 {
        let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
        assert_eq!(resolved.code, "G0103");
    }
}

#[test]
fn pattern_match_records_catalog_value_set() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Outpatient Visit");
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
        assert_eq!(resolved.source, CodeSource::CatalogPattern);
        assert_eq!(resolved.value_set, "Outpatient Visit Codes");
        assert!(["99213", "99214"].contains(&resolved.code.as_str()));
    }
}

#[test]
fn pattern_match_never_crosses_into_unrelated_sets() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Palliative Care");
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..50 {
        let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
        assert_eq!(resolved.code, "Z51.5");
        assert_eq!(resolved.value_set, "Palliative Care Encounter");
    }
}

#[test]
fn no_valid_code_is_an_error_not_a_stale_code() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Prostatectomy");
    let mut rng = StdRng::seed_from_u64(2);
    let error = resolver
        .resolve(&requirement, 2026, &mut rng)
        .expect_err("all codes expired");
    assert_eq!(error.value_set(), "Prostatectomy");
    assert_eq!(error.year, 2026);
    assert!(error.to_string().contains("Prostatectomy"));
}

#[test]
fn expired_fallback_is_opt_in_and_tagged() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Prostatectomy");
    let mut rng = StdRng::seed_from_u64(2);
    let resolved = resolver
        .resolve_ignoring_dates(&requirement, 2026, &mut rng)
        .expect("fallback code");
    assert_eq!(resolved.code, "0VTT4ZZ");
    assert_eq!(resolved.source, CodeSource::ExpiredFallback);
}

#[test]
fn unknown_value_set_fails() {
    let resolver = resolver();
    let requirement = CodeRequirement::value_set("Completely Unrelated Thing");
    let mut rng = StdRng::seed_from_u64(2);
    assert!(resolver.resolve(&requirement, 2026, &mut rng).is_err());
    assert!(
        resolver
            .resolve_ignoring_dates(&requirement, 2026, &mut rng)
            .is_err()
    );
}

#[test]
fn pattern_match_skips_names_without_valid_codes() {
    let catalog = CodeCatalog::from_entries(
        "vsd",
        [
            CatalogEntry::new("99201", CodeSystem::Cpt, "Outpatient Visit Legacy")
                .with_expiration_date(ymd(2019, 12, 31)),
            CatalogEntry::new("99215", CodeSystem::Cpt, "Visit Outpatient"),
        ],
    );
    let resolver = CodeResolver::new(CodeSources::new(catalog));
    let requirement = CodeRequirement::value_set("Outpatient Visit");
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let resolved = resolver.resolve(&requirement, 2026, &mut rng).expect("code");
        assert_eq!(resolved.code, "99215");
        assert_eq!(resolved.value_set, "Visit Outpatient");
        assert_eq!(resolved.source, CodeSource::CatalogPattern);
    }
}
