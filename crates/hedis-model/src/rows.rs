//! Generated table rows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Well-known table and column names.
pub mod columns {
    pub const MEMBER_TABLE: &str = "MEMBER";
    pub const ENROLLMENT_TABLE: &str = "ENROLLMENT";
    pub const RX_TABLE: &str = "RX";

    pub const MEMBER_ID: &str = "MEM_NBR";
    pub const GENDER: &str = "MEM_GENDER";
    pub const AGE: &str = "MEM_AGE";
    pub const DOB: &str = "MEM_DOB";
    pub const PRODUCT_LINE: &str = "PRODUCT_LINE";
    pub const PRODUCT_ID: &str = "PRODUCT_ID";
    pub const ENROLLMENT_START: &str = "ENR_START";
    pub const ENROLLMENT_END: &str = "ENR_END";
    pub const RESULT_VALUE: &str = "RESULT_VALUE";

    /// Monthly enrollment flags `FLD00`..`FLD23`.
    pub const MONTHLY_FLAG_COUNT: u32 = 24;

    pub const TRACE_COMPONENT: &str = "_COMPONENT";
    pub const TRACE_SUB_EVENT: &str = "_SUB_EVENT";
    pub const TRACE_ROLE: &str = "_ROLE";
    pub const TRACE_VALUE_SET: &str = "_VALUE_SET_NAME";
    pub const TRACE_CODE: &str = "_CODE";
    pub const TRACE_CODE_SYSTEM: &str = "_CODE_SYSTEM";
    pub const TRACE_CODE_SOURCE: &str = "_CODE_SOURCE";
    pub const TRACE_LINK_KEY: &str = "_LINK_KEY";

    /// Trace columns carry provenance for validation and never reach output files.
    pub fn is_trace(column: &str) -> bool {
        column.starts_with('_')
    }

    pub fn monthly_flag(index: u32) -> String {
        format!("FLD{index:02}")
    }
}

/// How the code on a generated row was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    Explicit,
    Curated,
    CatalogExact,
    CatalogPattern,
    ExpiredFallback,
    Unresolved,
}

impl CodeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Curated => "curated",
            Self::CatalogExact => "catalog_exact",
            Self::CatalogPattern => "catalog_pattern",
            Self::ExpiredFallback => "expired_fallback",
            Self::Unresolved => "unresolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "explicit" => Some(Self::Explicit),
            "curated" => Some(Self::Curated),
            "catalog_exact" => Some(Self::CatalogExact),
            "catalog_pattern" => Some(Self::CatalogPattern),
            "expired_fallback" => Some(Self::ExpiredFallback),
            "unresolved" => Some(Self::Unresolved),
            _ => None,
        }
    }
}

impl fmt::Display for CodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Integer(_) | Self::Date(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Dates, or text holding an ISO date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Text form used in exported files; null is empty.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One row: column name to cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, CellValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(CellValue::as_text)
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(CellValue::as_date)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn member_id(&self) -> Option<&str> {
        self.text(columns::MEMBER_ID)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.0.iter().map(|(column, value)| (column.as_str(), value))
    }

    /// The first date-valued non-trace cell; clinical rows carry one service date.
    pub fn event_date(&self) -> Option<NaiveDate> {
        self.0
            .iter()
            .filter(|(column, _)| !columns::is_trace(column))
            .find_map(|(_, value)| match value {
                CellValue::Date(date) => Some(*date),
                _ => None,
            })
    }
}

/// Generated rows grouped by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRowSet {
    tables: BTreeMap<String, Vec<Row>>,
}

impl OutputRowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row; table names are normalized to upper case.
    pub fn push(&mut self, table: &str, row: Row) {
        self.tables
            .entry(table.trim().to_ascii_uppercase())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .get(&table.trim().to_ascii_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rows_for_member<'a>(
        &'a self,
        table: &str,
        member_id: &'a str,
    ) -> impl Iterator<Item = &'a Row> + use<'a> {
        self.rows(table)
            .iter()
            .filter(move |row| row.member_id() == Some(member_id))
    }

    /// Every row for a member across tables.
    pub fn member_rows<'a>(
        &'a self,
        member_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Row)> + 'a {
        self.tables.iter().flat_map(move |(table, rows)| {
            rows.iter()
                .filter(move |row| row.member_id() == Some(member_id))
                .map(move |row| (table.as_str(), row))
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(table, rows)| (table.as_str(), rows.as_slice()))
    }

    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .map(|(table, rows)| (table.clone(), rows.len()))
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Appends every row of `other`, preserving order.
    pub fn merge(&mut self, other: OutputRowSet) {
        for (table, rows) in other.tables {
            self.tables.entry(table).or_default().extend(rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_case_insensitive() {
        let mut rows = OutputRowSet::new();
        rows.push("lab", Row::new().with(columns::MEMBER_ID, "M1"));
        assert_eq!(rows.rows("LAB").len(), 1);
        assert_eq!(rows.rows("Lab").len(), 1);
        assert!(rows.rows("VISIT").is_empty());
    }

    #[test]
    fn merge_keeps_order() {
        let mut left = OutputRowSet::new();
        left.push("VISIT", Row::new().with(columns::MEMBER_ID, "M1"));
        let mut right = OutputRowSet::new();
        right.push("VISIT", Row::new().with(columns::MEMBER_ID, "M2"));
        right.push("LAB", Row::new().with(columns::MEMBER_ID, "M2"));
        left.merge(right);
        let ids: Vec<_> = left
            .rows("VISIT")
            .iter()
            .filter_map(Row::member_id)
            .collect();
        assert_eq!(ids, ["M1", "M2"]);
        assert_eq!(left.total_rows(), 3);
        assert_eq!(left.member_rows("M2").count(), 2);
    }

    #[test]
    fn event_date_skips_trace_columns() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let row = Row::new()
            .with("_STAMP", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .with("SERV_DT", date)
            .with(columns::MEMBER_ID, "M1");
        assert_eq!(row.event_date(), Some(date));
    }

    #[test]
    fn code_source_round_trips_through_text() {
        for source in [
            CodeSource::Explicit,
            CodeSource::Curated,
            CodeSource::CatalogExact,
            CodeSource::CatalogPattern,
            CodeSource::ExpiredFallback,
            CodeSource::Unresolved,
        ] {
            assert_eq!(CodeSource::parse(source.as_str()), Some(source));
        }
    }
}
