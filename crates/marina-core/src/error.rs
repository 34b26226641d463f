//! Error types for marina-core

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation error raised while building domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid {field}: '{value}' is not one of the allowed values")]
    InvalidEnum { field: &'static str, value: String },

    #[error("Invalid interval: end {end} must be strictly after start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
