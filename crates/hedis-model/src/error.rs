use chrono::NaiveDate;
use thiserror::Error;

/// A rule set or scenario that cannot be used as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("failed to parse rule set: {0}")]
    Parse(String),

    #[error("measure name must not be empty")]
    EmptyMeasure,

    #[error("age range is inverted: min {min} > max {max}")]
    InvertedAgeRange { min: u32, max: u32 },

    #[error("allowable gap days must be non-negative, got {0}")]
    NegativeGapDays(i64),

    #[error("continuous enrollment period must cover at least one month")]
    EmptyEnrollmentPeriod,

    #[error("component name must not be empty")]
    EmptyComponentName,

    #[error("component '{0}' has no target table")]
    MissingTargetTable(String),

    #[error("component '{0}' has no value set")]
    MissingValueSet(String),

    #[error("component '{0}' is defined more than once")]
    DuplicateComponent(String),

    #[error("repeated component '{0}' must occur at least once")]
    ZeroCount(String),

    #[error("repeated component '{component}' has negative separation {days}")]
    NegativeSeparation { component: String, days: i64 },

    #[error("composite component '{0}' has no sub-events")]
    EmptyComposite(String),

    #[error("composite component '{0}' nests another composite")]
    NestedComposite(String),

    #[error("composite component '{0}' has an empty link key")]
    EmptyLinkKey(String),

    #[error("member {member_id} references unknown component '{name}'")]
    UnknownComponent { member_id: String, name: String },

    #[error("member {member_id} flags exclusion '{name}' which the rule set does not define")]
    UnknownExclusion { member_id: String, name: String },

    #[error("member id {0} appears more than once in the batch")]
    DuplicateMember(String),
}

/// Date arithmetic that cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DateArithmeticError {
    #[error("enrollment span starts {start} after it ends {end}")]
    InvertedSpan { start: NaiveDate, end: NaiveDate },

    #[error(
        "occurrences of '{component}' on {previous} and {next} are {actual} days apart, \
         at least {required} required"
    )]
    SeparationViolated {
        component: String,
        previous: NaiveDate,
        next: NaiveDate,
        actual: i64,
        required: i64,
    },

    #[error("date '{0}' could not be parsed")]
    Unparseable(String),

    #[error("date arithmetic out of range: {0}")]
    OutOfRange(String),
}
