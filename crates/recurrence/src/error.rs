//! Recurrence grammar errors.

use thiserror::Error;

/// A recurrence specification could not be parsed or validated.
///
/// Never escapes the public resolver API: callers of [`crate::occurs_on`] and friends
/// only ever observe the documented fallback values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecParseError {
    #[error("empty recurrence specification")]
    Empty,

    #[error("malformed rule part `{0}` (expected KEY=VALUE)")]
    MalformedPart(String),

    #[error("unsupported rule key `{0}`")]
    UnknownKey(String),

    #[error("rule key `{0}` given more than once")]
    DuplicateKey(String),

    #[error("missing FREQ")]
    MissingFrequency,

    #[error("unsupported frequency `{0}`")]
    UnknownFrequency(String),

    #[error("invalid INTERVAL `{0}` (must be an integer >= 1)")]
    InvalidInterval(String),

    #[error("invalid BYDAY token `{0}`")]
    InvalidWeekday(String),

    #[error("invalid BYMONTHDAY `{0}` (must be 1..=31)")]
    InvalidMonthDay(String),

    #[error("invalid COUNT `{0}` (must be an integer >= 1)")]
    InvalidCount(String),

    #[error("invalid UNTIL `{0}` (expected YYYYMMDD or YYYYMMDDTHHMMSS[Z])")]
    InvalidUntil(String),

    #[error("COUNT and UNTIL are mutually exclusive")]
    CountAndUntil,

    #[error("{0}")]
    Unsupported(String),
}
