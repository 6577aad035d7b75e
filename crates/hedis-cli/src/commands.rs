use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use hedis_cli::export::{reconcile, write_json, write_tables};
use hedis_cli::load::{ScenarioLoad, load_rules, load_scenarios, load_schema, load_sources};
use hedis_cli::manifest::RunManifest;
use hedis_codes::{CodeResolver, ValueSetStats, load_catalog_csv};
use hedis_generate::{
    BatchOutcome, Diagnostic, GenerationEngine, GenerationSettings, ScenarioFailure, run_batch,
    run_batch_with,
};
use hedis_model::{RuleSet, ValidationReport};
use hedis_validate::{ComplianceValidator, RuleComparison, check_quality, compare_rule_sets};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, info_span};

use crate::cli::{CompareArgs, GenerateArgs, InputArgs, ValidateArgs, ValueSetArgs};
use crate::types::{GenerateResult, ValidateResult};

const VALIDATION_REPORT: &str = "validation_report.json";
const QUALITY_REPORT: &str = "quality_report.json";
const MANIFEST: &str = "manifest.json";

/// Inputs loaded once and shared by every scenario.
struct Prepared {
    rules: RuleSet,
    engine: GenerationEngine,
    validator: ComplianceValidator,
    load: ScenarioLoad,
}

impl Prepared {
    fn load(args: &InputArgs) -> Result<Self> {
        let rules = load_rules(&args.rules)?;
        let sources = load_sources(&args.catalog, args.curated.as_deref())?;
        let load = load_scenarios(&args.scenarios, rules.measurement_year())?;
        let settings = GenerationSettings::default()
            .with_seed(args.seed)
            .with_expired_fallback(args.allow_expired_fallback);
        let engine = GenerationEngine::new(CodeResolver::new(sources.clone())).with_settings(settings);
        Ok(Self {
            rules,
            engine,
            validator: ComplianceValidator::new(sources),
            load,
        })
    }

    /// Runs the batch behind a spinner. Scenarios rejected while loading are
    /// reported ahead of generation failures.
    fn run(&self, validate: bool) -> BatchOutcome {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!(
            "Generating {} scenarios for {}",
            self.load.scenarios.len(),
            self.rules.measure()
        ));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut outcome = if validate {
            run_batch_with(&self.engine, &self.rules, &self.load.scenarios, |scenario, rows| {
                self.validator.validate(scenario, &self.rules, rows)
            })
        } else {
            run_batch(&self.engine, &self.rules, &self.load.scenarios)
        };
        spinner.finish_and_clear();

        outcome
            .failures
            .splice(0..0, self.load.failures.iter().cloned());
        outcome
    }
}

#[derive(Serialize)]
struct ValidationFile<'a> {
    measure: &'a str,
    measurement_year: i32,
    all_passed: bool,
    reports: Vec<&'a ValidationReport>,
    failures: &'a [ScenarioFailure],
    diagnostics: Vec<&'a Diagnostic>,
}

impl<'a> ValidationFile<'a> {
    fn new(rules: &'a RuleSet, outcome: &'a BatchOutcome) -> Self {
        Self {
            measure: rules.measure(),
            measurement_year: rules.measurement_year(),
            all_passed: outcome.failed() == 0 && outcome.all_passed(),
            reports: outcome.reports().collect(),
            failures: &outcome.failures,
            diagnostics: outcome.diagnostics().collect(),
        }
    }
}

pub fn run_generate(args: &GenerateArgs) -> Result<GenerateResult> {
    let prepared = Prepared::load(&args.inputs)?;
    let span = info_span!("generate", measure = %prepared.rules.measure());
    let _guard = span.enter();

    let schema = args.schema.as_deref().map(load_schema).transpose()?;
    let validated = !args.no_validate;
    let outcome = prepared.run(validated);
    let merged = outcome.merged_rows();
    let quality = check_quality(&merged);

    let output_dir = args.output_dir.clone();
    let tables = write_tables(&output_dir, &reconcile(&merged, schema.as_ref()))?;

    let validation_report = if validated {
        let path = output_dir.join(VALIDATION_REPORT);
        write_json(&path, &ValidationFile::new(&prepared.rules, &outcome))?;
        Some(path)
    } else {
        None
    };
    let quality_report = output_dir.join(QUALITY_REPORT);
    write_json(&quality_report, &quality)?;

    let mut manifest = RunManifest::new(&prepared.rules, args.inputs.seed, &outcome)
        .with_expired_fallback(args.inputs.allow_expired_fallback);
    let inputs = [
        ("rules", Some(args.inputs.rules.as_path())),
        ("catalog", Some(args.inputs.catalog.as_path())),
        ("curated", args.inputs.curated.as_deref()),
        ("scenarios", Some(args.inputs.scenarios.as_path())),
        ("schema", args.schema.as_deref()),
    ];
    for (role, path) in inputs {
        if let Some(path) = path {
            manifest
                .hash_input(role, path)
                .with_context(|| format!("hash {}", path.display()))?;
        }
    }
    let manifest_path = output_dir.join(MANIFEST);
    write_json(&manifest_path, &manifest)?;

    info!(
        tables = tables.len(),
        rows = merged.total_rows(),
        output = %output_dir.display(),
        "generation complete"
    );
    Ok(GenerateResult {
        measure: prepared.rules.measure().to_string(),
        output_dir,
        outcome,
        quality,
        tables,
        validation_report,
        quality_report,
        manifest: manifest_path,
        validated,
    })
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidateResult> {
    let prepared = Prepared::load(&args.inputs)?;
    let span = info_span!("validate_run", measure = %prepared.rules.measure());
    let _guard = span.enter();

    let outcome = prepared.run(true);
    let report_path = match &args.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
            let path = dir.join(VALIDATION_REPORT);
            write_json(&path, &ValidationFile::new(&prepared.rules, &outcome))?;
            Some(path)
        }
        None => None,
    };
    Ok(ValidateResult {
        measure: prepared.rules.measure().to_string(),
        outcome,
        report_path,
    })
}

pub fn run_compare(args: &CompareArgs) -> Result<RuleComparison> {
    let reference = load_rules(&args.reference)?;
    let candidate = load_rules(&args.candidate)?;
    Ok(compare_rule_sets(&reference, &candidate))
}

pub fn run_value_sets(args: &ValueSetArgs) -> Result<(i32, Vec<ValueSetStats>)> {
    let catalog = load_catalog_csv(&args.catalog)
        .with_context(|| format!("load catalog {}", args.catalog.display()))?;
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let filter = args.filter.as_deref().map(str::to_lowercase);
    let stats = catalog
        .stats(year)
        .into_iter()
        .filter(|stats| {
            filter
                .as_deref()
                .is_none_or(|filter| stats.name.to_lowercase().contains(filter))
        })
        .collect();
    Ok((year, stats))
}

/// Display path relative to the output directory when possible.
pub fn relative_display(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
