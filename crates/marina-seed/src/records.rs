//! Seed record shapes and file parsing

use crate::error::{Error, Result};
use marina_core::normalize::{normalize_state, normalize_type};
use marina_core::{parse_instant, CatwayNumber, CatwayState, CatwayType, NewReservation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A catway number as found in hand-edited files: `7` or `"7"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Text(String),
}

impl RawNumber {
    /// Resolve to a catway number, rejecting zero, negatives and non-numeric text
    pub fn to_number(&self) -> marina_core::Result<CatwayNumber> {
        let value = match self {
            RawNumber::Int(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                marina_core::Error::InvalidField(format!("catwayNumber '{}' is not a number", s))
            })?,
        };
        let value = u32::try_from(value).map_err(|_| {
            marina_core::Error::InvalidField(format!("catwayNumber {} is out of range", value))
        })?;
        CatwayNumber::new(value)
    }
}

/// One entry of a catways file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatwayRecord {
    pub catway_number: Option<RawNumber>,
    pub catway_type: Option<String>,
    pub catway_state: Option<String>,
}

impl CatwayRecord {
    /// Number, normalized type and normalized state
    pub fn resolve(&self) -> marina_core::Result<(CatwayNumber, CatwayType, CatwayState)> {
        let number = required_number(&self.catway_number)?;
        let catway_type = normalize_type(self.catway_type.as_deref().unwrap_or_default());
        let catway_state = normalize_state(self.catway_state.as_deref().unwrap_or_default());
        Ok((number, catway_type, catway_state))
    }
}

/// One entry of a reservations file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationRecord {
    pub catway_number: Option<RawNumber>,
    pub client_name: Option<String>,
    pub boat_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ReservationRecord {
    /// Target catway and the creation request.
    ///
    /// Names are passed through untrimmed; the ledger validates them.
    pub fn resolve(&self) -> marina_core::Result<(CatwayNumber, NewReservation)> {
        let number = required_number(&self.catway_number)?;
        let start = parse_instant(required("startDate", &self.start_date)?)?;
        let end = parse_instant(required("endDate", &self.end_date)?)?;
        let request = NewReservation::new(
            self.client_name.clone().unwrap_or_default(),
            self.boat_name.clone().unwrap_or_default(),
            start,
            end,
        );
        Ok((number, request))
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> marina_core::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| marina_core::Error::InvalidField(format!("{} is missing", field)))
}

fn required_number(value: &Option<RawNumber>) -> marina_core::Result<CatwayNumber> {
    value
        .as_ref()
        .ok_or_else(|| marina_core::Error::InvalidField("catwayNumber is missing".to_string()))?
        .to_number()
}

/// One entry of a records file, parsed but not yet checked against a record
/// shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Json(serde_json::Value),
    Ron(ron::Value),
}

impl RawRecord {
    /// Decode into a record shape; a failure concerns this entry only
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            RawRecord::Json(value) => Ok(serde_json::from_value(value)?),
            RawRecord::Ron(value) => Ok(value.into_rust()?),
        }
    }
}

/// Read a list of entries, choosing the format from the file extension
/// (`.json` or `.ron`).
///
/// Only the outer list has to be well formed. Each entry is decoded later with
/// [`RawRecord::decode`], so one malformed entry does not sink the file.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
            Ok(values.into_iter().map(RawRecord::Json).collect())
        }
        Some("ron") => {
            let values: Vec<ron::Value> = ron::from_str(&content)?;
            Ok(values.into_iter().map(RawRecord::Ron).collect())
        }
        _ => Err(Error::InvalidSchema(format!(
            "{}: expected a .json or .ron file",
            path.display()
        ))),
    }
}
