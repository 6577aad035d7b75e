//! Scenario-to-rows generation.

use chrono::NaiveDate;
use hedis_codes::{CodeResolver, NoValidCodeError, ResolvedCode};
use hedis_model::columns::{
    ENROLLMENT_TABLE, MEMBER_ID, MEMBER_TABLE, RESULT_VALUE, TRACE_CODE, TRACE_CODE_SOURCE,
    TRACE_CODE_SYSTEM, TRACE_COMPONENT, TRACE_LINK_KEY, TRACE_ROLE, TRACE_SUB_EVENT,
    TRACE_VALUE_SET,
};
use hedis_model::dates::{add_days, ymd};
use hedis_model::{
    CodeRequirement, CodeSource, CodeSystem, ComponentRole, ComponentSpec, ConfigurationError,
    EventDescriptor, OutputRowSet, Row, RuleSet, Scenario,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::error::Result;
use crate::member::{enrollment_rows, member_row};
use crate::schedule::occurrence_dates;
use crate::settings::GenerationSettings;

/// Days between the default dates of consecutive components.
const COMPONENT_SPACING_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

/// Something noteworthy that did not stop generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub member_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub message: String,
}

/// Rows and diagnostics for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub rows: OutputRowSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns scenarios into table rows.
///
/// The engine is stateless between scenarios and can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    resolver: CodeResolver,
    settings: GenerationSettings,
}

impl GenerationEngine {
    pub fn new(resolver: CodeResolver) -> Self {
        Self {
            resolver,
            settings: GenerationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn resolver(&self) -> &CodeResolver {
        &self.resolver
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generates every row for one scenario.
    ///
    /// Fails on unknown component names and impossible dates. Unresolvable
    /// codes do not fail: the row is written with an empty code and a
    /// diagnostic is recorded.
    pub fn generate(&self, scenario: &Scenario, rules: &RuleSet) -> Result<Generated> {
        let span = info_span!("scenario", member_id = %scenario.member_id);
        let _guard = span.enter();

        let mut run = ScenarioRun {
            engine: self,
            scenario,
            rules,
            rng: StdRng::seed_from_u64(self.settings.member_seed(&scenario.member_id)),
            output: Generated::default(),
        };
        run.emit_member()?;
        run.emit_events()?;
        run.emit_exclusions()?;

        debug!(
            rows = run.output.rows.total_rows(),
            diagnostics = run.output.diagnostics.len(),
            "generated scenario"
        );
        Ok(run.output)
    }
}

/// One clinical row about to be written.
struct RowRequest<'a> {
    component: &'a str,
    sub_event: Option<&'a str>,
    role: ComponentRole,
    target_table: &'a str,
    requirement: &'a CodeRequirement,
    date: NaiveDate,
    explicit_code: Option<&'a str>,
    result_value: Option<&'a str>,
    link: Option<(&'a str, &'a str)>,
}

/// Date sources for the sub-events of one composite occurrence.
#[derive(Debug, Clone, Copy)]
struct SubEventDates {
    event: Option<NaiveDate>,
    base: NaiveDate,
}

impl SubEventDates {
    /// The event's date, then the sub-event's own date, then the default.
    fn pick(self, code: &CodeRequirement) -> NaiveDate {
        self.event.or(code.explicit_date).unwrap_or(self.base)
    }
}

struct ScenarioRun<'a> {
    engine: &'a GenerationEngine,
    scenario: &'a Scenario,
    rules: &'a RuleSet,
    rng: StdRng,
    output: Generated,
}

impl<'a> ScenarioRun<'a> {
    fn member_id(&self) -> &'a str {
        &self.scenario.member_id
    }

    fn year(&self) -> i32 {
        self.rules.measurement_year()
    }

    fn diagnose(&mut self, level: DiagnosticLevel, component: Option<&str>, message: String) {
        self.output.diagnostics.push(Diagnostic {
            level,
            member_id: self.scenario.member_id.clone(),
            component: component.map(str::to_string),
            message,
        });
    }

    fn emit_member(&mut self) -> Result<()> {
        let member = member_row(self.scenario, self.rules)?;
        self.output.rows.push(MEMBER_TABLE, member);
        for row in enrollment_rows(self.scenario, self.rules)? {
            self.output.rows.push(ENROLLMENT_TABLE, row);
        }
        Ok(())
    }

    /// Default date for the `index`-th component of its list.
    fn base_date(&self, index: usize) -> Result<NaiveDate> {
        let offset = COMPONENT_SPACING_DAYS.saturating_mul(u64::try_from(index).unwrap_or(0));
        Ok(add_days(ymd(self.year(), 6, 1), offset)?)
    }

    fn emit_events(&mut self) -> Result<()> {
        let (scenario, rules) = (self.scenario, self.rules);
        let mut groups: Vec<(&'a str, Vec<&'a EventDescriptor>)> = Vec::new();
        for event in &scenario.events {
            if rules.component(&event.name).is_none() {
                return Err(ConfigurationError::UnknownComponent {
                    member_id: scenario.member_id.clone(),
                    name: event.name.clone(),
                }
                .into());
            }
            match groups.iter_mut().find(|(name, _)| *name == event.name) {
                Some((_, events)) => events.push(event),
                None => groups.push((event.name.as_str(), vec![event])),
            }
        }

        for (name, events) in groups {
            let present: Vec<&EventDescriptor> =
                events.into_iter().filter(|event| event.is_present()).collect();
            if present.is_empty() {
                debug!(component = name, "event marked absent; no rows");
                continue;
            }
            let Some(found) = rules.component(name) else {
                continue;
            };
            let base = self.base_date(found.index)?;
            self.emit_component(found.spec, found.role, base, &present)?;
        }
        Ok(())
    }

    fn emit_exclusions(&mut self) -> Result<()> {
        let (scenario, rules) = (self.scenario, self.rules);
        for flag in scenario.present_exclusions() {
            let found = rules
                .component(&flag.name)
                .filter(|found| found.role == ComponentRole::Exclusion)
                .ok_or_else(|| ConfigurationError::UnknownExclusion {
                    member_id: scenario.member_id.clone(),
                    name: flag.name.clone(),
                })?;
            let mut descriptor = EventDescriptor::present(flag.name.as_str());
            descriptor.date = flag.date;
            let default_date = ymd(self.year(), 3, 15);
            self.emit_component(found.spec, found.role, default_date, &[&descriptor])?;
        }
        Ok(())
    }

    fn emit_component(
        &mut self,
        spec: &'a ComponentSpec,
        role: ComponentRole,
        base: NaiveDate,
        present: &[&EventDescriptor],
    ) -> Result<()> {
        match spec {
            ComponentSpec::Simple {
                name,
                target_table,
                code,
                result_value,
            } => {
                for event in present {
                    self.emit_row(&RowRequest {
                        component: name,
                        sub_event: None,
                        role,
                        target_table,
                        requirement: code,
                        date: event.date.or(code.explicit_date).unwrap_or(base),
                        explicit_code: event.explicit_code(),
                        result_value: event.result_value().or(result_value.as_deref()),
                        link: None,
                    });
                }
            }
            ComponentSpec::Repeated {
                name,
                target_table,
                code,
                count,
                min_separation_days,
            } => {
                let mut explicit: Vec<NaiveDate> =
                    present.iter().filter_map(|event| event.date).collect();
                if explicit.is_empty()
                    && let Some(date) = code.explicit_date
                {
                    explicit.push(date);
                }
                let dates = occurrence_dates(
                    name,
                    *count,
                    *min_separation_days,
                    base,
                    &explicit,
                    self.year(),
                )?;
                if explicit.len() > dates.len() {
                    self.diagnose(
                        DiagnosticLevel::Warning,
                        Some(name.as_str()),
                        format!(
                            "{} dated occurrences given for '{name}' which repeats {count} times; \
                             kept the earliest {count}",
                            explicit.len()
                        ),
                    );
                }
                let explicit_code = present.iter().find_map(|event| event.explicit_code());
                let result_value = present.iter().find_map(|event| event.result_value());
                for date in dates {
                    self.emit_row(&RowRequest {
                        component: name,
                        sub_event: None,
                        role,
                        target_table,
                        requirement: code,
                        date,
                        explicit_code,
                        result_value,
                        link: None,
                    });
                }
            }
            ComponentSpec::Composite {
                name,
                sub_events,
                link_key,
            } => {
                for (occurrence, event) in present.iter().enumerate() {
                    let key = format!("{}-{}-{}", self.member_id(), name, occurrence + 1);
                    let dates = SubEventDates {
                        event: event.date,
                        base,
                    };
                    for (position, sub) in sub_events.iter().enumerate() {
                        let explicit_code = if position == 0 {
                            event.explicit_code()
                        } else {
                            None
                        };
                        self.emit_sub_event(
                            name,
                            sub,
                            role,
                            dates,
                            explicit_code,
                            event.result_value(),
                            (link_key.as_str(), key.as_str()),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_sub_event(
        &mut self,
        composite: &str,
        sub: &ComponentSpec,
        role: ComponentRole,
        dates: SubEventDates,
        explicit_code: Option<&str>,
        result_value: Option<&str>,
        link: (&str, &str),
    ) -> Result<()> {
        match sub {
            ComponentSpec::Simple {
                name,
                target_table,
                code,
                result_value: default_result,
            } => {
                self.emit_row(&RowRequest {
                    component: composite,
                    sub_event: Some(name),
                    role,
                    target_table,
                    requirement: code,
                    date: dates.pick(code),
                    explicit_code,
                    result_value: result_value.or(default_result.as_deref()),
                    link: Some(link),
                });
            }
            ComponentSpec::Repeated {
                name,
                target_table,
                code,
                count,
                min_separation_days,
            } => {
                let first = dates.pick(code);
                let occurrences = occurrence_dates(
                    name,
                    *count,
                    *min_separation_days,
                    first,
                    &[first],
                    self.year(),
                )?;
                for (index, occurrence) in occurrences.into_iter().enumerate() {
                    self.emit_row(&RowRequest {
                        component: composite,
                        sub_event: Some(name),
                        role,
                        target_table,
                        requirement: code,
                        date: occurrence,
                        explicit_code: if index == 0 { explicit_code } else { None },
                        result_value,
                        link: Some(link),
                    });
                }
            }
            // Rule-set validation rejects nested composites.
            ComponentSpec::Composite { .. } => {}
        }
        Ok(())
    }

    fn resolve(&mut self, request: &RowRequest<'_>) -> Option<ResolvedCode> {
        let explicit;
        let requirement = match request.explicit_code {
            // A scenario's code is routed by its own shape, not the component's system.
            Some(code) => {
                let mut requirement = request.requirement.clone().with_explicit_code(code);
                requirement.code_system = None;
                explicit = requirement;
                &explicit
            }
            None => request.requirement,
        };
        let year = self.year();
        let engine = self.engine;
        let resolver = engine.resolver();
        match resolver.resolve(requirement, year, &mut self.rng) {
            Ok(resolved) => Some(resolved),
            Err(error) if engine.settings.allow_expired_fallback => {
                match resolver.resolve_ignoring_dates(requirement, year, &mut self.rng) {
                    Ok(resolved) => {
                        self.diagnose(
                            DiagnosticLevel::Warning,
                            Some(request.component),
                            format!(
                                "{error}; used code {} outside its validity window",
                                resolved.code
                            ),
                        );
                        Some(resolved)
                    }
                    Err(error) => {
                        self.unresolved(request, &error);
                        None
                    }
                }
            }
            Err(error) => {
                self.unresolved(request, &error);
                None
            }
        }
    }

    fn unresolved(&mut self, request: &RowRequest<'_>, error: &NoValidCodeError) {
        warn!(
            component = request.component,
            value_set = %error.value_set(),
            year = error.year,
            "no valid code; writing row with empty code"
        );
        self.diagnose(
            DiagnosticLevel::Warning,
            Some(request.component),
            error.to_string(),
        );
    }

    fn emit_row(&mut self, request: &RowRequest<'_>) {
        let resolved = self.resolve(request);
        let (code, system, value_set, source) = match &resolved {
            Some(resolved) => (
                resolved.code.clone(),
                resolved.code_system.clone(),
                resolved.value_set.clone(),
                resolved.source,
            ),
            None => (
                String::new(),
                request
                    .requirement
                    .code_system
                    .clone()
                    .unwrap_or_else(|| CodeSystem::Other("UNKNOWN".to_string())),
                request.requirement.value_set.clone(),
                CodeSource::Unresolved,
            ),
        };

        let rules = self.rules;
        let override_column = request
            .sub_event
            .and_then(|sub| rules.column_override(sub))
            .or_else(|| rules.column_override(request.component));
        let placement = self
            .engine
            .settings
            .routing
            .place(&system, request.target_table, override_column);

        let mut row = Row::new()
            .with(MEMBER_ID, self.member_id())
            .with(placement.date_column.as_str(), request.date)
            .with(placement.code_column.as_str(), code.as_str())
            .with(TRACE_COMPONENT, request.component)
            .with(TRACE_ROLE, request.role.as_str())
            .with(TRACE_VALUE_SET, value_set)
            .with(TRACE_CODE, code.as_str())
            .with(TRACE_CODE_SYSTEM, system.label())
            .with(TRACE_CODE_SOURCE, source.as_str());
        if let Some(sub) = request.sub_event {
            row.set(TRACE_SUB_EVENT, sub);
        }
        if let Some(value) = request.result_value {
            row.set(RESULT_VALUE, value);
        }
        if let Some((column, key)) = request.link {
            row.set(column, key);
            row.set(TRACE_LINK_KEY, key);
        }
        self.output.rows.push(&placement.table, row);
    }
}
