//! Reservation domain types

use crate::error::{Error, Result};
use crate::identity::{CatwayNumber, ReservationId};
use crate::time::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A claim on a berth for the half-open interval `[start_date, end_date)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub catway_number: CatwayNumber,
    pub client_name: String,
    pub boat_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// The reserved span
    pub fn interval(&self) -> Result<Interval> {
        Interval::new(self.start_date, self.end_date)
    }
}

/// Fields of a reservation to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub client_name: String,
    pub boat_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewReservation {
    /// Create a new reservation request
    pub fn new(
        client_name: impl Into<String>,
        boat_name: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            boat_name: boat_name.into(),
            start_date,
            end_date,
        }
    }

    /// Trim names and check them, then check the interval ordering.
    ///
    /// Names are checked first so a request with both problems reports the
    /// missing name.
    pub fn validate(&self) -> Result<(String, String, Interval)> {
        let client = require_text("clientName", &self.client_name)?;
        let boat = require_text("boatName", &self.boat_name)?;
        let interval = Interval::new(self.start_date, self.end_date)?;
        Ok((client, boat, interval))
    }
}

/// Partial change to a reservation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationPatch {
    pub client_name: Option<String>,
    pub boat_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ReservationPatch {
    /// Whether either bound of the interval is being changed
    pub fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Merge this patch over `current`, validating every field it touches.
    ///
    /// Returns the merged record and, when the dates changed, the new interval
    /// that must be re-checked for overlap. `updated_at` is left to the caller.
    pub fn merge(&self, current: &Reservation) -> Result<(Reservation, Option<Interval>)> {
        let mut merged = current.clone();

        if let Some(name) = &self.client_name {
            merged.client_name = require_text("clientName", name)?;
        }
        if let Some(name) = &self.boat_name {
            merged.boat_name = require_text("boatName", name)?;
        }

        let interval = if self.touches_dates() {
            let interval = current
                .interval()?
                .with_bounds(self.start_date, self.end_date)?;
            merged.start_date = interval.start();
            merged.end_date = interval.end();
            Some(interval)
        } else {
            None
        };

        Ok((merged, interval))
    }
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidField(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}
