use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hedis_codes::ValueSetStats;
use hedis_generate::{BatchOutcome, ScenarioFailure};
use hedis_model::ValidationReport;
use hedis_validate::{QualityReport, RuleComparison, Severity};

use crate::commands::relative_display;
use crate::types::{GenerateResult, ValidateResult};

pub fn print_generate_summary(result: &GenerateResult) {
    println!("Measure: {}", result.measure);
    println!("Output: {}", result.output_dir.display());

    let mut table = Table::new();
    table.set_header(vec![header_cell("Table"), header_cell("Rows"), header_cell("File")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let counts = result.outcome.merged_rows().row_counts();
    let mut total = 0usize;
    for path in &result.tables {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let rows = counts.get(name).copied().unwrap_or(0);
        total += rows;
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue).add_attribute(Attribute::Bold),
            count_cell(rows, Color::White),
            dim_cell(relative_display(&result.output_dir, path)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(total).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    if result.validated {
        print_validation(&result.outcome);
    }
    print_failures(&result.outcome.failures);
    print_quality(&result.quality);

    if let Some(path) = &result.validation_report {
        println!("Validation report: {}", path.display());
    }
    println!("Quality report: {}", result.quality_report.display());
    println!("Manifest: {}", result.manifest.display());
}

pub fn print_validate_summary(result: &ValidateResult) {
    println!("Measure: {}", result.measure);
    print_validation(&result.outcome);
    print_failures(&result.outcome.failures);
    if let Some(path) = &result.report_path {
        println!("Validation report: {}", path.display());
    }
}

fn print_validation(outcome: &BatchOutcome) {
    let reports: Vec<&ValidationReport> = outcome.reports().collect();
    if reports.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Member"),
        header_cell("Result"),
        header_cell("Checks"),
        header_cell("Failed"),
        header_cell("Notes"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for report in &reports {
        let passed = report.checks.iter().filter(|check| check.passed).count();
        let failed: Vec<String> = report
            .failed_checks()
            .map(|check| format!("{}: {}", check.name.label(), check.actual))
            .collect();
        table.add_row(vec![
            Cell::new(&report.member_id),
            result_cell(report.passed),
            Cell::new(format!("{passed}/{}", report.checks.len())),
            if failed.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(failed.join("\n")).fg(Color::Red)
            },
            if report.notes.is_empty() {
                dim_cell("-")
            } else {
                dim_cell(report.notes.join("\n"))
            },
        ]);
    }
    let passed = reports.iter().filter(|report| report.passed).count();
    println!();
    println!("Validation:");
    println!("{table}");
    println!("{passed}/{} members passed", reports.len());
}

fn print_failures(failures: &[ScenarioFailure]) {
    if failures.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Member"),
        header_cell("Kind"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for failure in failures {
        table.add_row(vec![
            Cell::new(&failure.member_id),
            Cell::new(failure.kind.label()).fg(Color::Red),
            Cell::new(&failure.message),
        ]);
    }
    eprintln!();
    eprintln!("Failed scenarios:");
    eprintln!("{table}");
}

fn print_quality(report: &QualityReport) {
    if report.is_clean() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Table"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    let ordered = report.errors().chain(report.warnings());
    for issue in ordered {
        table.add_row(vec![
            severity_cell(issue.severity()),
            Cell::new(issue.table()),
            Cell::new(issue.message()),
        ]);
    }
    println!();
    println!("Data quality:");
    println!("{table}");
}

pub fn print_comparison(comparison: &RuleComparison) {
    if comparison.is_match() {
        println!("Rule sets match.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Severity"), header_cell("Difference")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for error in &comparison.errors {
        table.add_row(vec![severity_cell(Severity::Error), Cell::new(error)]);
    }
    for warning in &comparison.warnings {
        table.add_row(vec![severity_cell(Severity::Warning), Cell::new(warning)]);
    }
    println!("{table}");
}

pub fn print_value_sets(year: i32, stats: &[ValueSetStats]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Value Set"),
        header_cell("Codes"),
        header_cell(&format!("Valid {year}")),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for entry in stats {
        let valid = if entry.valid == 0 {
            Cell::new(entry.valid).fg(Color::Red).add_attribute(Attribute::Bold)
        } else {
            Cell::new(entry.valid)
        };
        table.add_row(vec![Cell::new(&entry.name), Cell::new(entry.total), valid]);
    }
    println!("{table}");
    println!("{} value sets", stats.len());
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn result_cell(passed: bool) -> Cell {
    if passed {
        Cell::new("PASS").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new("FAIL").fg(Color::Red).add_attribute(Attribute::Bold)
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Error => Cell::new("ERROR").fg(Color::Red),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
