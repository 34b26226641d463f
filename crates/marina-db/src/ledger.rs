//! Reservation ledger: the sole arbiter of overlap between reservations.
//!
//! # Concurrency
//!
//! `create` and `update` run the overlap check and the write under the berth's
//! lock and inside one read-write transaction, so two writers on the same
//! berth can never both pass the check against the same snapshot. Reads take
//! no lock.
//!
//! # Ordering
//!
//! Listings are always ordered by `start_date` ascending.

use crate::error::{Error, Result};
use crate::models::*;
use crate::queries::find_overlap;
use crate::store::Store;
use chrono::{DateTime, Utc};
use marina_core::time::{from_nanos, to_nanos};
use marina_core::{
    CatwayNumber, Interval, NewReservation, Reservation, ReservationId, ReservationPatch,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Ledger view over a [`Store`].
pub struct Ledger<'a> {
    store: &'a Store,
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All reservations of a catway, ordered by start ascending.
    pub fn list_for_berth(&self, number: CatwayNumber) -> Result<Vec<Reservation>> {
        self.require_catway(number)?;
        self.store
            .berth_rows(number.raw())?
            .iter()
            .map(StoredReservation::to_reservation)
            .collect()
    }

    /// One reservation, scoped to its catway.
    ///
    /// An id that exists under a different catway is reported as not found.
    pub fn get(&self, number: CatwayNumber, id: &ReservationId) -> Result<Reservation> {
        self.store
            .reservation_row(id.as_str())?
            .filter(|row| row.catway_number == number.raw())
            .ok_or_else(|| reservation_not_found(number, id))?
            .to_reservation()
    }

    /// The reservation covering `instant` on this catway, if any.
    pub fn active_at(
        &self,
        number: CatwayNumber,
        instant: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        self.require_catway(number)?;
        for row in self.store.berth_rows(number.raw())? {
            let reservation = row.to_reservation()?;
            if reservation.start_date > instant {
                break;
            }
            if reservation.interval()?.contains(instant) {
                return Ok(Some(reservation));
            }
        }
        Ok(None)
    }

    /// Book a catway for `[start_date, end_date)`.
    pub fn create(&self, number: CatwayNumber, request: &NewReservation) -> Result<Reservation> {
        self.store.with_berth_lock(number, || {
            let rw = self.store.db.rw_transaction()?;
            let catway: Option<StoredCatway> = rw.get().primary(number.raw())?;
            if catway.is_none() {
                return Err(catway_not_found(number));
            }

            let (client_name, boat_name, interval) = request.validate()?;
            check_free(&rw, number, &interval, None)?;

            let now = Utc::now();
            let reservation = Reservation {
                id: ReservationId::new(Uuid::new_v4().simple().to_string()),
                catway_number: number,
                client_name,
                boat_name,
                start_date: interval.start(),
                end_date: interval.end(),
                created_at: now,
                updated_at: now,
            };
            rw.insert(StoredReservation::from_reservation(&reservation)?)?;
            rw.commit()?;

            info!(
                catway = number.raw(),
                reservation = %reservation.id,
                %interval,
                "reservation created"
            );
            Ok(reservation)
        })
    }

    /// Change a reservation. When either date changes, the merged interval is
    /// re-validated and re-checked against every other reservation on the berth.
    pub fn update(
        &self,
        number: CatwayNumber,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation> {
        self.store.with_berth_lock(number, || {
            let rw = self.store.db.rw_transaction()?;
            let old: StoredReservation = rw
                .get()
                .primary(id.as_str().to_string())?
                .filter(|row: &StoredReservation| row.catway_number == number.raw())
                .ok_or_else(|| reservation_not_found(number, id))?;

            let current = old.to_reservation()?;
            let (mut merged, interval) = patch.merge(&current)?;
            if let Some(interval) = &interval {
                check_free(&rw, number, interval, Some(id))?;
            }
            merged.updated_at = Utc::now();

            rw.update(old, StoredReservation::from_reservation(&merged)?)?;
            rw.commit()?;

            info!(
                catway = number.raw(),
                reservation = %id,
                dates_changed = interval.is_some(),
                "reservation updated"
            );
            Ok(merged)
        })
    }

    /// Remove a reservation; the catway is untouched.
    pub fn delete(&self, number: CatwayNumber, id: &ReservationId) -> Result<()> {
        self.store.with_berth_lock(number, || {
            let rw = self.store.db.rw_transaction()?;
            let row: StoredReservation = rw
                .get()
                .primary(id.as_str().to_string())?
                .filter(|row: &StoredReservation| row.catway_number == number.raw())
                .ok_or_else(|| reservation_not_found(number, id))?;
            rw.remove(row)?;
            rw.commit()?;

            info!(catway = number.raw(), reservation = %id, "reservation deleted");
            Ok(())
        })
    }

    fn require_catway(&self, number: CatwayNumber) -> Result<()> {
        match self.store.catway_row(number.raw())? {
            Some(_) => Ok(()),
            None => Err(catway_not_found(number)),
        }
    }
}

fn check_free(
    rw: &native_db::transaction::RwTransaction<'_>,
    number: CatwayNumber,
    interval: &Interval,
    exclude: Option<&ReservationId>,
) -> Result<()> {
    let start_ns = to_nanos(interval.start())?;
    let end_ns = to_nanos(interval.end())?;
    let exclude = exclude.map(ReservationId::as_str);

    match find_overlap(rw, number.raw(), start_ns, end_ns, exclude)? {
        None => Ok(()),
        Some(existing) => {
            debug!(
                catway = number.raw(),
                existing = %existing.id,
                %interval,
                "reservation overlaps existing booking"
            );
            Err(Error::Conflict {
                catway: number,
                existing: ReservationId::new(existing.id),
                start: from_nanos(existing.start_ns),
                end: from_nanos(existing.end_ns),
            })
        }
    }
}

fn catway_not_found(number: CatwayNumber) -> Error {
    Error::NotFound(format!("catway {}", number.raw()))
}

fn reservation_not_found(number: CatwayNumber, id: &ReservationId) -> Error {
    Error::NotFound(format!("reservation {} on catway {}", id, number.raw()))
}
