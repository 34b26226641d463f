//! Reservation model for database storage.

use super::catway::corrupt;
use crate::error::Result;
use marina_core::time::{from_nanos, slot_key, to_nanos};
use marina_core::{CatwayNumber, Reservation, ReservationId};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredReservation {
    /// Primary key - generated reservation id.
    #[primary_key]
    pub id: String,
    /// Berth number followed by the order-preserving start instant.
    ///
    /// Scanning by [`berth_prefix`] yields one berth's reservations in start order.
    #[secondary_key]
    pub slot: String,
    /// Owning catway number.
    pub catway_number: u32,
    /// Client name.
    pub client_name: String,
    /// Boat name.
    pub boat_name: String,
    /// Inclusive start, ns since epoch.
    pub start_ns: i64,
    /// Exclusive end, ns since epoch.
    pub end_ns: i64,
    /// Creation instant, ns since epoch.
    pub created_at: i64,
    /// Last change instant, ns since epoch.
    pub updated_at: i64,
}

/// Key prefix shared by every reservation of one berth.
pub fn berth_prefix(number: u32) -> String {
    format!("{:010}/", number)
}

impl StoredReservation {
    /// Create from a domain Reservation.
    pub fn from_reservation(rsvp: &Reservation) -> Result<Self> {
        let number = rsvp.catway_number.raw();
        let start_ns = to_nanos(rsvp.start_date)?;
        Ok(Self {
            id: rsvp.id.as_str().to_string(),
            slot: format!("{}{}", berth_prefix(number), slot_key(start_ns)),
            catway_number: number,
            client_name: rsvp.client_name.clone(),
            boat_name: rsvp.boat_name.clone(),
            start_ns,
            end_ns: to_nanos(rsvp.end_date)?,
            created_at: to_nanos(rsvp.created_at)?,
            updated_at: to_nanos(rsvp.updated_at)?,
        })
    }

    /// Convert to a domain Reservation.
    pub fn to_reservation(&self) -> Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::new(self.id.clone()),
            catway_number: CatwayNumber::new(self.catway_number).map_err(corrupt)?,
            client_name: self.client_name.clone(),
            boat_name: self.boat_name.clone(),
            start_date: from_nanos(self.start_ns),
            end_date: from_nanos(self.end_ns),
            created_at: from_nanos(self.created_at),
            updated_at: from_nanos(self.updated_at),
        })
    }

    /// Half-open overlap against `[start_ns, end_ns)`.
    pub fn overlaps(&self, start_ns: i64, end_ns: i64) -> bool {
        self.start_ns < end_ns && start_ns < self.end_ns
    }
}
