//! Catway model for database storage.

use crate::error::{Error, Result};
use marina_core::time::{from_nanos, to_nanos};
use marina_core::{Catway, CatwayNumber};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored catway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredCatway {
    /// Primary key - public catway number.
    #[primary_key]
    pub number: u32,
    /// `long` or `short`.
    pub catway_type: String,
    /// `free`, `busy` or `maintenance`.
    pub catway_state: String,
    /// Creation instant, ns since epoch.
    pub created_at: i64,
    /// Last change instant, ns since epoch.
    pub updated_at: i64,
}

impl StoredCatway {
    /// Create from a domain Catway.
    pub fn from_catway(catway: &Catway) -> Result<Self> {
        Ok(Self {
            number: catway.catway_number.raw(),
            catway_type: catway.catway_type.as_str().to_string(),
            catway_state: catway.catway_state.as_str().to_string(),
            created_at: to_nanos(catway.created_at)?,
            updated_at: to_nanos(catway.updated_at)?,
        })
    }

    /// Convert to a domain Catway.
    pub fn to_catway(&self) -> Result<Catway> {
        Ok(Catway {
            catway_number: CatwayNumber::new(self.number).map_err(corrupt)?,
            catway_type: self.catway_type.parse().map_err(corrupt)?,
            catway_state: self.catway_state.parse().map_err(corrupt)?,
            created_at: from_nanos(self.created_at),
            updated_at: from_nanos(self.updated_at),
        })
    }
}

pub(crate) fn corrupt(err: marina_core::Error) -> Error {
    Error::Serialization(format!("corrupt stored record: {}", err))
}
