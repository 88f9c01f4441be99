//! Encoding errors.

use thiserror::Error;

/// Content that cannot be turned into a print stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("house name is empty")]
    MissingHouseName,

    #[error("message has neither a title nor content")]
    EmptyMessage,

    #[error("task without a title in group `{group}`")]
    BlankTaskTitle { group: String },

    #[error("weekly menu needs 7 days, got {0}")]
    IncompleteWeek(usize),

    #[error("line width {0} is outside 16..=80 columns")]
    InvalidLineWidth(usize),
}
