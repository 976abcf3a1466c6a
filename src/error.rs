//! Typed domain errors.
//!
//! IO-facing layers (loader, dataset export, config, CLI) use `anyhow`;
//! the variants here are the outcomes callers are expected to branch on.

use thiserror::Error;

/// A query string that is not a well-formed `Hand_Verb_Object_Target_Tool` descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryFormatError {
    #[error("expected 5 '_'-separated fields, found {found}: '{query}'")]
    FieldCount { query: String, found: usize },

    #[error("unknown hand type '{hand}' (expected LeftHand, RightHand, BothHands or None): '{query}'")]
    UnknownHandType { query: String, hand: String },

    #[error("field {position} ({name}) is empty, use 'None' instead: '{query}'")]
    EmptyField {
        query: String,
        position: usize,
        name: &'static str,
    },
}

impl QueryFormatError {
    /// The offending query text.
    pub fn query(&self) -> &str {
        match self {
            QueryFormatError::FieldCount { query, .. }
            | QueryFormatError::UnknownHandType { query, .. }
            | QueryFormatError::EmptyField { query, .. } => query,
        }
    }
}

/// A proposed edit that would break an interval invariant. Nothing is committed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintRejection {
    #[error("[{start:.3}, {end:.3}] overlaps another interval of the same owner")]
    Overlap { start: f64, end: f64 },

    #[error("[{start:.3}, {end:.3}] lies outside the video (0..{duration:.3})")]
    OutOfBounds { start: f64, end: f64, duration: f64 },

    #[error("interval of {length:.3}s is shorter than the {min:.3}s minimum")]
    TooShort { length: f64, min: f64 },

    #[error("no room left for a new interval")]
    NoRoom,

    #[error("no video loaded")]
    NoVideo,

    #[error("no query group for '{target}'")]
    NoGroup { target: String },

    #[error("text must not be empty")]
    EmptyText,
}

/// Rejected video metadata.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoContextError {
    #[error("duration must be finite and >= 0, got {0}")]
    Duration(f64),

    #[error("fps must be finite and > 0, got {0}")]
    Fps(f64),
}

/// A problem found while ingesting one inference result. Loading continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("result {record}: window {window} has {len} values, expected [start, end, score]")]
    WindowShape { record: usize, window: usize, len: usize },

    #[error("result {record}: window {window} [{start}, {end}] is not a valid range")]
    WindowRange {
        record: usize,
        window: usize,
        start: f64,
        end: f64,
    },

    #[error(transparent)]
    Query(#[from] QueryFormatError),
}
