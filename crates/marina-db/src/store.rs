//! Database store wrapper.

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::models::*;
use crate::registry::Registry;
use marina_core::CatwayNumber;
use native_db::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tracing::info;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredCatway>().unwrap();
    models.define::<StoredReservation>().unwrap();
    models
});

/// Database store for catways and reservations.
///
/// Writes that read-check-write a berth's reservations run under that berth's
/// lock (see [`Store::with_berth_lock`]) and inside a single read-write
/// transaction.
pub struct Store {
    pub(crate) db: Database<'static>,
    berth_locks: BerthLocks,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        info!(path = %path.as_ref().display(), "opened marina database");
        Ok(Self {
            db,
            berth_locks: BerthLocks::default(),
        })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self {
            db,
            berth_locks: BerthLocks::default(),
        })
    }

    /// Berth registry view over this store.
    pub fn registry(&self) -> Registry<'_> {
        Registry::new(self)
    }

    /// Reservation ledger view over this store.
    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self)
    }

    /// Total number of catways and reservations.
    pub fn counts(&self) -> Result<(u64, u64)> {
        let r = self.db.r_transaction()?;
        let catways = r.len().primary::<StoredCatway>()?;
        let reservations = r.len().primary::<StoredReservation>()?;
        Ok((catways, reservations))
    }

    /// Run `f` while holding the berth's write lock.
    ///
    /// Every operation that checks a berth's reservations and then writes must
    /// go through here so two writers on the same berth cannot interleave.
    /// The berth's table entry lives only while some caller holds or waits on it.
    pub(crate) fn with_berth_lock<T>(
        &self,
        number: CatwayNumber,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let lock = self.berth_locks.handle(number);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.berth_locks.release(number, lock);
        result
    }

    /// Clear all data.
    pub fn clear(&self) -> Result<()> {
        let rw = self.db.rw_transaction()?;

        let reservations: Vec<StoredReservation> = {
            let scan = rw.scan().primary::<StoredReservation>()?;
            let iter = scan.all()?;
            let rows: std::result::Result<Vec<StoredReservation>, _> = iter.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };
        let catways: Vec<StoredCatway> = {
            let scan = rw.scan().primary::<StoredCatway>()?;
            let iter = scan.all()?;
            let rows: std::result::Result<Vec<StoredCatway>, _> = iter.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };

        for reservation in reservations {
            rw.remove(reservation)?;
        }
        for catway in catways {
            rw.remove(catway)?;
        }

        rw.commit()?;
        info!("cleared all catways and reservations");
        Ok(())
    }
}

/// One mutex per berth number with a caller in flight.
#[derive(Default)]
struct BerthLocks {
    table: Mutex<HashMap<u32, Arc<Mutex<()>>>>,
}

impl BerthLocks {
    fn handle(&self, number: CatwayNumber) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(number.raw()).or_default().clone()
    }

    /// Give back a handle, dropping the entry when no other caller shares it.
    fn release(&self, number: CatwayNumber, lock: Arc<Mutex<()>>) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let last = table
            .get(&number.raw())
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if last {
            table.remove(&number.raw());
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marina_core::{parse_instant, CatwayType, NewReservation};

    fn number(n: u32) -> CatwayNumber {
        CatwayNumber::new(n).unwrap()
    }

    #[test]
    fn test_counts_and_clear() {
        let store = Store::in_memory().unwrap();
        store.registry().create(number(1), CatwayType::Long).unwrap();
        store.registry().create(number(2), CatwayType::Short).unwrap();
        store
            .ledger()
            .create(
                number(1),
                &NewReservation::new(
                    "Dupont",
                    "BlueSea",
                    parse_instant("2025-09-01").unwrap(),
                    parse_instant("2025-09-05").unwrap(),
                ),
            )
            .unwrap();

        assert_eq!(store.counts().unwrap(), (2, 1));
        store.clear().unwrap();
        assert_eq!(store.counts().unwrap(), (0, 0));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marina.db");
        {
            let store = Store::open(&path).unwrap();
            store.registry().create(number(9), CatwayType::Short).unwrap();
        }
        let store = Store::open(&path).unwrap();
        let catway = store.registry().get(number(9)).unwrap();
        assert_eq!(catway.catway_type, CatwayType::Short);
    }

    #[test]
    fn test_berth_lock_is_shared_per_number() {
        let locks = BerthLocks::default();
        let a = locks.handle(number(1));
        let b = locks.handle(number(1));
        let c = locks.handle(number(2));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        locks.release(number(1), a);
        assert_eq!(locks.len(), 2);
        locks.release(number(1), b);
        locks.release(number(2), c);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_berth_locks_do_not_accumulate() {
        let store = Store::in_memory().unwrap();
        store.registry().create(number(1), CatwayType::Long).unwrap();
        let request = NewReservation::new(
            "Dupont",
            "BlueSea",
            parse_instant("2025-09-01").unwrap(),
            parse_instant("2025-09-05").unwrap(),
        );

        store.ledger().create(number(1), &request).unwrap();
        for n in 100..150 {
            assert!(store.ledger().create(number(n), &request).is_err());
        }
        store.registry().delete(number(1)).unwrap();
        assert_eq!(store.berth_locks.len(), 0);
    }
}
