//! Error types for marina-seed

use thiserror::Error;

/// Seed loading error type
///
/// Record-level problems never abort a run; they are logged and counted in
/// the [`SeedReport`](crate::SeedReport). Only unreadable files and storage
/// faults do.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON record error: {0}")]
    RonValue(#[from] ron::Error),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Database error: {0}")]
    Db(#[from] marina_db::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
