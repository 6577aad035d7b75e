//! CLI argument definitions for the HEDIS mockup generator.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use hedis_generate::DEFAULT_SEED;

#[derive(Parser)]
#[command(
    name = "hedis-mockup",
    version,
    about = "HEDIS mockup generator - rule-driven test data with round-trip validation",
    long_about = "Generate synthetic member, enrollment, visit, lab and pharmacy rows for a\n\
                  HEDIS measure from a rule set, a value-set catalog and a list of scenarios.\n\
                  Every generated member is validated against its expected outcome."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate mock data for every scenario and write one CSV per table.
    Generate(GenerateArgs),

    /// Regenerate deterministically and print the validation results only.
    Validate(ValidateArgs),

    /// Compare two rule sets for the same measure.
    CompareRules(CompareArgs),

    /// List value sets in a catalog with their valid code counts.
    ValueSets(ValueSetArgs),
}

/// Inputs shared by `generate` and `validate`.
#[derive(Args)]
pub struct InputArgs {
    /// Measure rule set (YAML or JSON).
    #[arg(long = "rules", value_name = "PATH")]
    pub rules: PathBuf,

    /// Value-set directory CSV.
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Curated medication lists (JSON).
    #[arg(long = "curated", value_name = "PATH")]
    pub curated: Option<PathBuf>,

    /// Scenario documents (JSON array).
    #[arg(long = "scenarios", value_name = "PATH")]
    pub scenarios: PathBuf,

    /// Base seed for code selection.
    #[arg(long = "seed", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Fall back to codes outside their validity window when a value set has
    /// no valid code. Such rows fail code validation.
    #[arg(long = "allow-expired-fallback")]
    pub allow_expired_fallback: bool,
}

#[derive(Parser)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Column layout per table (JSON object of table name to column list).
    #[arg(long = "schema", value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Output directory for generated files.
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Skip round-trip validation.
    #[arg(long = "no-validate")]
    pub no_validate: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Also write validation_report.json into this directory.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CompareArgs {
    /// Reference rule set.
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,

    /// Candidate rule set.
    #[arg(value_name = "CANDIDATE")]
    pub candidate: PathBuf,
}

#[derive(Parser)]
pub struct ValueSetArgs {
    /// Value-set directory CSV.
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalog: PathBuf,

    /// Count valid codes for this measurement year.
    #[arg(long = "year")]
    pub year: Option<i32>,

    /// Only list value sets whose name contains this text.
    #[arg(long = "filter")]
    pub filter: Option<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
