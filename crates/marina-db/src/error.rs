//! Error types for registry and ledger operations.

use chrono::{DateTime, Utc};
use marina_core::{CatwayNumber, ReservationId};
use thiserror::Error;

/// Errors that can occur during registry and ledger operations.
///
/// Every variant except `Database` and `Serialization` is a caller-input
/// problem and is never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced catway or reservation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catway number already registered.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Type or state outside the allowed set.
    #[error("Invalid {field}: '{value}' is not one of the allowed values")]
    InvalidEnum { field: &'static str, value: String },

    /// End not strictly after start.
    #[error("Invalid interval: end {end} must be strictly after start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Malformed or missing field value.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Requested interval overlaps an existing reservation on the same catway.
    #[error(
        "Reservation conflict on {catway}: [{start}, {end}) overlaps reservation {existing}"
    )]
    Conflict {
        catway: CatwayNumber,
        existing: ReservationId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored record could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// True for storage faults, false for anything the caller can fix.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Serialization(_))
    }
}

impl From<marina_core::Error> for Error {
    fn from(err: marina_core::Error) -> Self {
        match err {
            marina_core::Error::InvalidEnum { field, value } => Error::InvalidEnum { field, value },
            marina_core::Error::InvalidInterval { start, end } => {
                Error::InvalidInterval { start, end }
            }
            marina_core::Error::InvalidField(msg) => Error::InvalidField(msg),
            marina_core::Error::InvalidDate(msg) => {
                Error::InvalidField(format!("invalid date: {}", msg))
            }
        }
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Result type for registry and ledger operations.
pub type Result<T> = std::result::Result<T, Error>;
