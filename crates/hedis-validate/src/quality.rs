//! Data-quality checks over a whole output set, run before export.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use hedis_model::columns::{
    DOB, ENROLLMENT_END, ENROLLMENT_START, ENROLLMENT_TABLE, GENDER, MEMBER_ID, MEMBER_TABLE,
    TRACE_CODE_SOURCE, TRACE_COMPONENT,
};
use hedis_model::{CellValue, CodeSource, OutputRowSet};
use serde::Serialize;

/// Issue severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }
}

/// One quality problem; each variant carries only its needed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum QualityIssue {
    /// A member id appears on more than one member row.
    DuplicateMember { member_id: String, rows: usize },
    /// Enrollment span ends before it starts.
    InvertedEnrollment {
        member_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Rows whose member id has no member row.
    OrphanedRows {
        table: String,
        member_id: String,
        rows: usize,
    },
    /// A required column is absent from every row of a table.
    MissingColumn { table: String, column: String },
    /// A required column is present but empty on some rows.
    NullValues {
        table: String,
        column: String,
        count: usize,
    },
    /// Rows written with an empty code.
    UnresolvedCode {
        table: String,
        member_id: String,
        component: String,
    },
    /// No member rows at all, so orphans cannot be checked.
    NoMembers,
}

impl QualityIssue {
    pub fn severity(&self) -> Severity {
        match self {
            Self::NullValues { .. } | Self::UnresolvedCode { .. } | Self::NoMembers => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::DuplicateMember { .. } => MEMBER_TABLE,
            Self::InvertedEnrollment { .. } => ENROLLMENT_TABLE,
            Self::OrphanedRows { table, .. }
            | Self::MissingColumn { table, .. }
            | Self::NullValues { table, .. }
            | Self::UnresolvedCode { table, .. } => table,
            Self::NoMembers => "ALL",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::DuplicateMember { member_id, rows } => {
                format!("member {member_id} has {rows} member rows")
            }
            Self::InvertedEnrollment {
                member_id,
                start,
                end,
            } => format!("member {member_id} enrollment starts {start} after it ends {end}"),
            Self::OrphanedRows {
                table,
                member_id,
                rows,
            } => format!("{rows} {table} rows for {member_id} without a member row"),
            Self::MissingColumn { table, column } => {
                format!("{table} is missing required column {column}")
            }
            Self::NullValues {
                table,
                column,
                count,
            } => format!("{count} null values in required field {table}.{column}"),
            Self::UnresolvedCode {
                table,
                member_id,
                component,
            } => format!("{table} row for {member_id} ({component}) has no code"),
            Self::NoMembers => "no member rows; orphan check skipped".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn errors(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Required columns for the tables this engine always writes. Clinical
/// tables only need the member id.
fn required_columns(table: &str) -> &'static [&'static str] {
    match table {
        MEMBER_TABLE => &[MEMBER_ID, DOB, GENDER],
        ENROLLMENT_TABLE => &[MEMBER_ID, ENROLLMENT_START, ENROLLMENT_END],
        _ => &[MEMBER_ID],
    }
}

/// Run all quality checks on an output set.
pub fn check_quality(output: &OutputRowSet) -> QualityReport {
    let mut report = QualityReport::default();

    // 1. Duplicate member rows
    let mut member_rows: BTreeMap<&str, usize> = BTreeMap::new();
    for row in output.rows(MEMBER_TABLE) {
        if let Some(member_id) = row.member_id() {
            *member_rows.entry(member_id).or_default() += 1;
        }
    }
    for (member_id, rows) in &member_rows {
        if *rows > 1 {
            report.issues.push(QualityIssue::DuplicateMember {
                member_id: (*member_id).to_string(),
                rows: *rows,
            });
        }
    }

    // 2. Enrollment date logic
    for row in output.rows(ENROLLMENT_TABLE) {
        if let (Some(start), Some(end)) = (row.date(ENROLLMENT_START), row.date(ENROLLMENT_END))
            && start > end
        {
            report.issues.push(QualityIssue::InvertedEnrollment {
                member_id: row.member_id().unwrap_or_default().to_string(),
                start,
                end,
            });
        }
    }

    // 3. Required columns and nulls
    for (table, rows) in output.iter() {
        if rows.is_empty() {
            continue;
        }
        for column in required_columns(table) {
            let missing = rows.iter().filter(|row| !row.contains(column)).count();
            if missing == rows.len() {
                report.issues.push(QualityIssue::MissingColumn {
                    table: table.to_string(),
                    column: (*column).to_string(),
                });
                continue;
            }
            let nulls = rows
                .iter()
                .filter(|row| row.get(column).is_none_or(CellValue::is_null))
                .count();
            if nulls > 0 {
                report.issues.push(QualityIssue::NullValues {
                    table: table.to_string(),
                    column: (*column).to_string(),
                    count: nulls,
                });
            }
        }
    }

    // 4. Orphaned records
    let members: BTreeSet<&str> = member_rows.keys().copied().collect();
    if members.is_empty() {
        if !output.is_empty() {
            report.issues.push(QualityIssue::NoMembers);
        }
    } else {
        for (table, rows) in output.iter().filter(|(table, _)| *table != MEMBER_TABLE) {
            let mut orphans: BTreeMap<&str, usize> = BTreeMap::new();
            for member_id in rows.iter().filter_map(|row| row.member_id()) {
                if !members.contains(member_id) {
                    *orphans.entry(member_id).or_default() += 1;
                }
            }
            for (member_id, rows) in orphans {
                report.issues.push(QualityIssue::OrphanedRows {
                    table: table.to_string(),
                    member_id: member_id.to_string(),
                    rows,
                });
            }
        }
    }

    // 5. Unresolved codes
    for (table, rows) in output.iter() {
        for row in rows {
            if row.text(TRACE_CODE_SOURCE).and_then(CodeSource::parse)
                == Some(CodeSource::Unresolved)
            {
                report.issues.push(QualityIssue::UnresolvedCode {
                    table: table.to_string(),
                    member_id: row.member_id().unwrap_or_default().to_string(),
                    component: row.text(TRACE_COMPONENT).unwrap_or_default().to_string(),
                });
            }
        }
    }

    report
}
