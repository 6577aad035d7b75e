#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use hedis_codes::{CodeCatalog, CodeResolver, CodeSources};
use hedis_generate::{GenerationEngine, run_batch};
use hedis_model::{CatalogEntry, CodeSystem, EventDescriptor, ExpectedOutcome, RuleSet, Scenario};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const RULES: &str = r#"
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
"#;

/// Span names enclosing each event, outermost first.
#[derive(Clone, Default)]
struct ScopeRecorder {
    scopes: Arc<Mutex<Vec<Vec<String>>>>,
}

impl<S> Layer<S> for ScopeRecorder
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let names: Vec<String> = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.name().to_string())
                    .collect()
            })
            .unwrap_or_default();
        self.scopes.lock().expect("scopes").push(names);
    }
}

#[test]
fn worker_events_stay_inside_the_batch_span() {
    let recorder = ScopeRecorder::default();
    tracing_subscriber::registry()
        .with(recorder.clone())
        .try_init()
        .expect("install subscriber");

    let catalog = CodeCatalog::from_entries(
        "vsd",
        [CatalogEntry::new("45378", CodeSystem::Cpt, "Colonoscopy")],
    );
    let engine = GenerationEngine::new(CodeResolver::new(CodeSources::new(catalog)));
    let rules = RuleSet::from_yaml_str(RULES).expect("rules");
    let scenarios: Vec<Scenario> = (0..64)
        .map(|index| {
            Scenario::new(format!("M{index:03}"), 50, ExpectedOutcome::Compliant)
                .with_event(EventDescriptor::present("Colonoscopy"))
        })
        .collect();

    let outcome = run_batch(&engine, &rules, &scenarios);
    assert_eq!(outcome.succeeded(), 64);

    let scopes = recorder.scopes.lock().expect("scopes");
    let per_scenario: Vec<&Vec<String>> = scopes
        .iter()
        .filter(|names| names.iter().any(|name| name == "scenario"))
        .collect();
    assert!(per_scenario.len() >= 64);
    for names in per_scenario {
        assert_eq!(names.first().map(String::as_str), Some("batch"), "{names:?}");
    }
}
