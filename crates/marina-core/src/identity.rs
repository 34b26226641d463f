//! Identity types for catways and reservations

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public number of a catway, the external reference key for a berth
///
/// Always positive; zero is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CatwayNumber(u32);

impl CatwayNumber {
    /// Create a catway number, rejecting zero
    pub fn new(number: u32) -> Result<Self> {
        if number == 0 {
            return Err(Error::InvalidField(
                "catway number must be a positive integer".to_string(),
            ));
        }
        Ok(Self(number))
    }

    /// Get the raw number
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for CatwayNumber {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CatwayNumber> for u32 {
    fn from(number: CatwayNumber) -> Self {
        number.0
    }
}

impl fmt::Display for CatwayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catway:{}", self.0)
    }
}

/// Opaque identifier of a reservation, assigned by the ledger at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub String);

impl ReservationId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
