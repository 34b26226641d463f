//! Catway (berth) domain types

use crate::error::{Error, Result};
use crate::identity::CatwayNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length class of a berth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatwayType {
    Long,
    Short,
}

impl CatwayType {
    /// Wire/storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            CatwayType::Long => "long",
            CatwayType::Short => "short",
        }
    }
}

impl FromStr for CatwayType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "long" => Ok(CatwayType::Long),
            "short" => Ok(CatwayType::Short),
            other => Err(Error::InvalidEnum {
                field: "catwayType",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CatwayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational state of a berth
///
/// Advisory only: the ledger never reads it and never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatwayState {
    #[default]
    Free,
    Busy,
    Maintenance,
}

impl CatwayState {
    /// Wire/storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            CatwayState::Free => "free",
            CatwayState::Busy => "busy",
            CatwayState::Maintenance => "maintenance",
        }
    }
}

impl FromStr for CatwayState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(CatwayState::Free),
            "busy" => Ok(CatwayState::Busy),
            "maintenance" => Ok(CatwayState::Maintenance),
            other => Err(Error::InvalidEnum {
                field: "catwayState",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CatwayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A berth as returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catway {
    pub catway_number: CatwayNumber,
    pub catway_type: CatwayType,
    pub catway_state: CatwayState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial change to a catway; only type and state are mutable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatwayPatch {
    pub catway_type: Option<CatwayType>,
    pub catway_state: Option<CatwayState>,
}

impl CatwayPatch {
    /// Build a patch from raw strings, failing with `InvalidEnum` on unknown values
    pub fn parse(catway_type: Option<&str>, catway_state: Option<&str>) -> Result<Self> {
        Ok(Self {
            catway_type: catway_type.map(str::parse).transpose()?,
            catway_state: catway_state.map(str::parse).transpose()?,
        })
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.catway_type.is_none() && self.catway_state.is_none()
    }

    /// Apply to a catway, returning whether anything changed
    pub fn apply(&self, catway: &mut Catway) -> bool {
        let mut changed = false;
        if let Some(t) = self.catway_type {
            changed |= catway.catway_type != t;
            catway.catway_type = t;
        }
        if let Some(s) = self.catway_state {
            changed |= catway.catway_state != s;
            catway.catway_state = s;
        }
        changed
    }
}
