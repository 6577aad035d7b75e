//! Table export: schema reconciliation and CSV/JSON writers.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hedis_model::columns::{MEMBER_ID, is_trace};
use hedis_model::{OutputRowSet, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::load::TableSchema;

/// One table laid out for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    fn from_rows(name: &str, columns: Vec<String>, rows: &[Row]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).map(ToString::to_string).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

/// Non-trace columns seen on any row, member id first then alphabetical.
fn inferred_columns(rows: &[Row]) -> Vec<String> {
    let seen: BTreeSet<&str> = rows
        .iter()
        .flat_map(Row::columns)
        .filter(|column| !is_trace(column) && *column != MEMBER_ID)
        .collect();
    let mut columns = Vec::with_capacity(seen.len() + 1);
    if rows.iter().any(|row| row.contains(MEMBER_ID)) {
        columns.push(MEMBER_ID.to_string());
    }
    columns.extend(seen.into_iter().map(str::to_string));
    columns
}

/// Lays out every table for writing.
///
/// With a schema, schema tables use its column order: missing columns are
/// padded with empty cells and extra columns dropped. Schema tables with no
/// rows are still written with a header. Tables the schema does not know
/// fall back to the inferred layout. Trace columns never reach the output.
pub fn reconcile(output: &OutputRowSet, schema: Option<&TableSchema>) -> Vec<ExportTable> {
    let mut tables = Vec::new();
    if let Some(schema) = schema {
        for (name, columns) in schema {
            let rows = output.rows(name);
            let columns: Vec<String> = columns
                .iter()
                .filter(|column| !is_trace(column))
                .cloned()
                .collect();
            let dropped: BTreeSet<&str> = rows
                .iter()
                .flat_map(Row::columns)
                .filter(|column| {
                    !is_trace(column) && !columns.iter().any(|known| known.as_str() == *column)
                })
                .collect();
            if !dropped.is_empty() {
                debug!(table = %name, ?dropped, "columns not in schema dropped");
            }
            tables.push(ExportTable::from_rows(name, columns, rows));
        }
    }
    for (name, rows) in output.iter() {
        if schema.is_some_and(|schema| schema.contains_key(name)) {
            continue;
        }
        if schema.is_some() {
            warn!(table = %name, "table not in schema, writing inferred columns");
        }
        tables.push(ExportTable::from_rows(name, inferred_columns(rows), rows));
    }
    tables
}

/// Writes each table as `<TABLE>.csv` under `dir`.
pub fn write_tables(dir: &Path, tables: &[ExportTable]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(table.file_name());
        let mut writer =
            csv::Writer::from_path(&path).with_context(|| format!("create {}", path.display()))?;
        writer
            .write_record(&table.columns)
            .with_context(|| format!("write header {}", path.display()))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .with_context(|| format!("write row {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flush {}", path.display()))?;
        debug!(path = %path.display(), rows = table.rows.len(), "wrote table");
        written.push(path);
    }
    Ok(written)
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("write {}", path.display()))
}
