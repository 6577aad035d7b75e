//! Catalog loading.
//!
//! The value-set directory arrives as a CSV export whose headers vary between
//! releases ("Value Set Name", "ValueSet", "Effective Date", ...). Headers are
//! matched loosely and rows describing the same code with the same dates are
//! merged into one entry listing every value set.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use hedis_model::{CatalogEntry, CodeSystem};
use tracing::{info, warn};

use crate::catalog::CodeCatalog;
use crate::error::CatalogError;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d", "%Y/%m/%d"];

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    code: usize,
    code_system: Option<usize>,
    value_set: usize,
    effective: Option<usize>,
    expiration: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, CatalogError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_lowercase().replace('_', " "))
            .collect();
        let find = |predicate: &dyn Fn(&str) -> bool| {
            normalized.iter().position(|header| predicate(header))
        };

        let code = find(&|header| header == "code").ok_or_else(|| missing(path, "Code"))?;
        let value_set = find(&|header| {
            header == "value set name" || header == "medication list name"
        })
        .or_else(|| {
            find(&|header| {
                (header.contains("value set") || header.contains("valueset"))
                    && !header.contains("oid")
                    && !header.contains("version")
            })
        })
        .ok_or_else(|| missing(path, "Value Set Name"))?;
        let code_system = find(&|header| {
            header.contains("code system") && !header.contains("oid") && !header.contains("version")
        });
        Ok(Self {
            code,
            code_system,
            value_set,
            effective: find(&|header| header.contains("effective")),
            expiration: find(&|header| header.contains("expiration")),
        })
    }
}

fn missing(path: &Path, column: &'static str) -> CatalogError {
    CatalogError::MissingColumn {
        path: path.to_path_buf(),
        column,
    }
}

fn parse_date(raw: &str, path: &Path, row: usize) -> Result<Option<NaiveDate>, CatalogError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // Spreadsheet exports append a midnight time component.
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .map(Some)
        .ok_or_else(|| CatalogError::InvalidDate {
            path: path.to_path_buf(),
            row,
            value: trimmed.to_string(),
        })
}

/// Loads a value-set directory CSV.
pub fn load_catalog_csv(path: &Path) -> Result<CodeCatalog, CatalogError> {
    let file = std::fs::File::open(path).map_err(|error| CatalogError::io(path, error))?;
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("catalog");
    load_catalog_from_reader(file, label, path)
}

/// Loads a catalog from any reader. `origin` is used only in error messages.
pub fn load_catalog_from_reader<R: Read>(
    reader: R,
    label: &str,
    origin: &Path,
) -> Result<CodeCatalog, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|error| CatalogError::csv(origin, &error))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers, origin)?;

    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut positions: BTreeMap<(String, String, Option<NaiveDate>, Option<NaiveDate>), usize> =
        BTreeMap::new();
    let mut skipped = 0usize;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|error| CatalogError::csv(origin, &error))?;
        let row = index + 2;
        let field = |column: Option<usize>| column.and_then(|i| record.get(i)).unwrap_or("");

        let code = field(Some(columns.code));
        let value_sets: Vec<&str> = field(Some(columns.value_set))
            .split([';', '|'])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if code.is_empty() || value_sets.is_empty() {
            skipped += 1;
            continue;
        }
        let code_system = match field(columns.code_system) {
            "" => CodeSystem::infer(code),
            raw => CodeSystem::parse(raw),
        };
        let effective = parse_date(field(columns.effective), origin, row)?;
        let expiration = parse_date(field(columns.expiration), origin, row)?;

        let key = (
            code.to_string(),
            code_system.label().to_string(),
            effective,
            expiration,
        );
        let position = *positions.entry(key).or_insert_with(|| {
            entries.push(CatalogEntry {
                code: code.to_string(),
                code_system,
                value_sets: Vec::new(),
                effective_date: effective,
                expiration_date: expiration,
            });
            entries.len() - 1
        });
        let entry = &mut entries[position];
        for name in value_sets {
            if !entry.in_value_set(name) {
                entry.value_sets.push(name.to_string());
            }
        }
    }

    if skipped > 0 {
        warn!(
            source = %origin.display(),
            skipped,
            "skipped catalog rows without a code or value set"
        );
    }
    let catalog = CodeCatalog::from_entries(label, entries);
    info!(
        source = %origin.display(),
        entries = catalog.len(),
        value_sets = catalog.value_set_names().count(),
        "loaded code catalog"
    );
    Ok(catalog)
}

/// Loads a curated medication table: `{ list: { "NDC": [..], "RxNorm": [..] } }`.
///
/// Curated codes carry no dates and are always valid.
pub fn load_curated_json(path: &Path) -> Result<CodeCatalog, CatalogError> {
    let content =
        std::fs::read_to_string(path).map_err(|error| CatalogError::io(path, error))?;
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("curated");
    curated_from_json_str(&content, label, path)
}

pub fn curated_from_json_str(
    content: &str,
    label: &str,
    origin: &Path,
) -> Result<CodeCatalog, CatalogError> {
    let lists: BTreeMap<String, BTreeMap<String, Vec<String>>> =
        serde_json::from_str(content).map_err(|source| CatalogError::Json {
            path: origin.to_path_buf(),
            source,
        })?;
    let mut catalog = CodeCatalog::new(label);
    for (list, systems) in &lists {
        for (system, codes) in systems {
            let code_system = CodeSystem::parse(system);
            let codes = codes
                .iter()
                .map(String::as_str)
                .map(str::trim)
                .filter(|code| !code.is_empty());
            for code in codes {
                catalog.insert(CatalogEntry::new(code, code_system.clone(), list));
            }
        }
    }
    info!(
        source = %origin.display(),
        lists = lists.len(),
        entries = catalog.len(),
        "loaded curated code table"
    );
    Ok(catalog)
}
