//! Run manifest: what went in, what came out.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use hedis_generate::BatchOutcome;
use hedis_model::RuleSet;
use serde::Serialize;
use tracing::debug;

const BUFFER_SIZE: usize = 65536;

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};

    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let digest = hex::encode(hasher.finalize());
    debug!(path = %path.display(), sha256 = %digest, "hashed input");
    Ok(digest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationTotals {
    pub passed: usize,
    pub failed: usize,
}

fn row_counts(outcome: &BatchOutcome) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for output in &outcome.outputs {
        for (table, rows) in output.rows.iter() {
            *counts.entry(table.to_string()).or_default() += rows.len();
        }
    }
    counts
}

/// Written next to the tables so a run can be reproduced and audited.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub measure: String,
    pub measurement_year: i32,
    pub seed: u64,
    pub allow_expired_fallback: bool,
    pub inputs: Vec<InputFile>,
    pub scenarios: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub row_counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationTotals>,
}

impl RunManifest {
    pub fn new(rules: &RuleSet, seed: u64, outcome: &BatchOutcome) -> Self {
        let mut reports = outcome.reports().peekable();
        let validation = reports.peek().is_some().then(|| {
            let (passed, failed) = reports.fold((0, 0), |(passed, failed), report| {
                if report.passed {
                    (passed + 1, failed)
                } else {
                    (passed, failed + 1)
                }
            });
            ValidationTotals { passed, failed }
        });
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            measure: rules.measure().to_string(),
            measurement_year: rules.measurement_year(),
            seed,
            allow_expired_fallback: false,
            inputs: Vec::new(),
            scenarios: outcome.succeeded() + outcome.failed(),
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
            row_counts: row_counts(outcome),
            validation,
        }
    }

    #[must_use]
    pub fn with_expired_fallback(mut self, allow: bool) -> Self {
        self.allow_expired_fallback = allow;
        self
    }

    /// Records an input file and its hash.
    pub fn hash_input(&mut self, role: &str, path: &Path) -> io::Result<()> {
        let sha256 = sha256_file(path)?;
        self.inputs.push(InputFile {
            role: role.to_string(),
            path: path.display().to_string(),
            sha256,
        });
        Ok(())
    }
}
