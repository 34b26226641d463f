//! Common query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use native_db::transaction::RwTransaction;

impl Store {
    /// Get a stored catway by number.
    pub(crate) fn catway_row(&self, number: u32) -> Result<Option<StoredCatway>> {
        let r = self.db.r_transaction()?;
        Ok(r.get().primary(number)?)
    }

    /// Get all stored catways in number order.
    pub(crate) fn catway_rows(&self) -> Result<Vec<StoredCatway>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredCatway>()?;
        let iter = scan.all()?;
        let rows: std::result::Result<Vec<StoredCatway>, _> = iter.collect();
        rows.map_err(|e| Error::Database(e.to_string()))
    }

    /// Get a stored reservation by id.
    pub(crate) fn reservation_row(&self, id: &str) -> Result<Option<StoredReservation>> {
        let r = self.db.r_transaction()?;
        Ok(r.get().primary(id.to_string())?)
    }

    /// Get all reservations of a catway, ordered by start.
    pub(crate) fn berth_rows(&self, number: u32) -> Result<Vec<StoredReservation>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredReservation>(StoredReservationKey::slot)?;
        let prefix = berth_prefix(number);
        let iter = scan.start_with(prefix.as_str())?;
        let rows: std::result::Result<Vec<StoredReservation>, _> = iter.collect();
        rows.map_err(|e| Error::Database(e.to_string()))
    }
}

/// Reservations of a catway, ordered by start, as seen by a write transaction.
pub(crate) fn berth_rows_rw(rw: &RwTransaction<'_>, number: u32) -> Result<Vec<StoredReservation>> {
    let scan = rw
        .scan()
        .secondary::<StoredReservation>(StoredReservationKey::slot)?;
    let prefix = berth_prefix(number);
    let iter = scan.start_with(prefix.as_str())?;
    let rows: std::result::Result<Vec<StoredReservation>, _> = iter.collect();
    rows.map_err(|e| Error::Database(e.to_string()))
}

/// First reservation of the catway overlapping `[start_ns, end_ns)`, ignoring
/// the reservation with id `exclude`.
///
/// Rows arrive in start order, so the scan stops at the first row starting at
/// or after `end_ns`.
pub(crate) fn find_overlap(
    rw: &RwTransaction<'_>,
    number: u32,
    start_ns: i64,
    end_ns: i64,
    exclude: Option<&str>,
) -> Result<Option<StoredReservation>> {
    Ok(berth_rows_rw(rw, number)?
        .into_iter()
        .take_while(|row| row.start_ns < end_ns)
        .find(|row| exclude != Some(row.id.as_str()) && row.overlaps(start_ns, end_ns)))
}
