//! Berth registry: the set of catways, their type and advisory state.

use crate::error::{Error, Result};
use crate::models::*;
use crate::queries::berth_rows_rw;
use crate::store::Store;
use chrono::Utc;
use marina_core::{Catway, CatwayNumber, CatwayPatch, CatwayState, CatwayType};
use tracing::{debug, info};

/// Registry view over a [`Store`].
///
/// The registry never looks at reservation data except to cascade a catway
/// deletion.
pub struct Registry<'a> {
    store: &'a Store,
}

impl<'a> Registry<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Register a new catway in the `free` state.
    pub fn create(&self, number: CatwayNumber, catway_type: CatwayType) -> Result<Catway> {
        self.create_with_state(number, catway_type, CatwayState::Free)
    }

    /// Register a new catway with an explicit initial state.
    pub fn create_with_state(
        &self,
        number: CatwayNumber,
        catway_type: CatwayType,
        catway_state: CatwayState,
    ) -> Result<Catway> {
        let now = Utc::now();
        let catway = Catway {
            catway_number: number,
            catway_type,
            catway_state,
            created_at: now,
            updated_at: now,
        };

        let rw = self.store.db.rw_transaction()?;
        let existing: Option<StoredCatway> = rw.get().primary(number.raw())?;
        if existing.is_some() {
            return Err(Error::DuplicateKey(format!(
                "catway {} already exists",
                number.raw()
            )));
        }
        rw.insert(StoredCatway::from_catway(&catway)?)?;
        rw.commit()?;

        info!(catway = number.raw(), %catway_type, %catway_state, "catway created");
        Ok(catway)
    }

    /// Look up a catway by number.
    pub fn get(&self, number: CatwayNumber) -> Result<Catway> {
        self.store
            .catway_row(number.raw())?
            .ok_or_else(|| not_found(number))?
            .to_catway()
    }

    /// Change type and/or state.
    pub fn update(&self, number: CatwayNumber, patch: CatwayPatch) -> Result<Catway> {
        if patch.is_empty() {
            debug!(catway = number.raw(), "empty catway patch");
            return self.get(number);
        }

        let rw = self.store.db.rw_transaction()?;
        let old: StoredCatway = rw
            .get()
            .primary(number.raw())?
            .ok_or_else(|| not_found(number))?;

        let mut catway = old.to_catway()?;
        if !patch.apply(&mut catway) {
            debug!(catway = number.raw(), "catway update changed nothing");
            return Ok(catway);
        }
        catway.updated_at = Utc::now();

        rw.update(old, StoredCatway::from_catway(&catway)?)?;
        rw.commit()?;

        info!(
            catway = number.raw(),
            catway_type = %catway.catway_type,
            catway_state = %catway.catway_state,
            "catway updated"
        );
        Ok(catway)
    }

    /// Remove a catway and every reservation on it, atomically.
    ///
    /// Returns the number of reservations removed with it.
    pub fn delete(&self, number: CatwayNumber) -> Result<usize> {
        self.store.with_berth_lock(number, || {
            let rw = self.store.db.rw_transaction()?;
            let catway: StoredCatway = rw
                .get()
                .primary(number.raw())?
                .ok_or_else(|| not_found(number))?;

            let reservations = berth_rows_rw(&rw, number.raw())?;
            let removed = reservations.len();
            for reservation in reservations {
                rw.remove(reservation)?;
            }
            rw.remove(catway)?;
            rw.commit()?;

            info!(catway = number.raw(), reservations = removed, "catway deleted");
            Ok(removed)
        })
    }

    /// All catways ordered by number.
    pub fn list(&self) -> Result<Vec<Catway>> {
        self.store
            .catway_rows()?
            .iter()
            .map(StoredCatway::to_catway)
            .collect()
    }
}

fn not_found(number: CatwayNumber) -> Error {
    Error::NotFound(format!("catway {}", number.raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marina_core::{parse_instant, NewReservation};

    fn number(n: u32) -> CatwayNumber {
        CatwayNumber::new(n).unwrap()
    }

    #[test]
    fn test_create_defaults_to_free() {
        let store = Store::in_memory().unwrap();
        let catway = store.registry().create(number(1), CatwayType::Long).unwrap();
        assert_eq!(catway.catway_state, CatwayState::Free);
        assert_eq!(store.registry().get(number(1)).unwrap(), catway);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let store = Store::in_memory().unwrap();
        store.registry().create(number(1), CatwayType::Long).unwrap();
        let err = store
            .registry()
            .create(number(1), CatwayType::Short)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(
            store.registry().get(number(1)).unwrap().catway_type,
            CatwayType::Long
        );
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.registry().get(number(5)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_type_and_state() {
        let store = Store::in_memory().unwrap();
        store.registry().create(number(2), CatwayType::Long).unwrap();

        let patch = CatwayPatch::parse(Some("short"), Some("maintenance")).unwrap();
        let updated = store.registry().update(number(2), patch).unwrap();
        assert_eq!(updated.catway_type, CatwayType::Short);
        assert_eq!(updated.catway_state, CatwayState::Maintenance);
        assert_eq!(store.registry().get(number(2)).unwrap(), updated);
    }

    #[test]
    fn test_empty_patch_keeps_record() {
        let store = Store::in_memory().unwrap();
        let created = store.registry().create(number(4), CatwayType::Long).unwrap();
        let same = store.registry().update(number(4), CatwayPatch::default()).unwrap();
        assert_eq!(same, created);
        assert!(matches!(
            store.registry().update(number(5), CatwayPatch::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = Store::in_memory().unwrap();
        let patch = CatwayPatch {
            catway_state: Some(CatwayState::Busy),
            ..Default::default()
        };
        assert!(matches!(
            store.registry().update(number(3), patch),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_enum_surfaces_as_db_error() {
        let err: Error = CatwayPatch::parse(Some("huge"), None).unwrap_err().into();
        assert!(matches!(err, Error::InvalidEnum { field: "catwayType", .. }));
    }

    #[test]
    fn test_list_is_ordered_by_number() {
        let store = Store::in_memory().unwrap();
        for n in [12, 3, 7, 1] {
            store.registry().create(number(n), CatwayType::Short).unwrap();
        }
        let numbers: Vec<u32> = store
            .registry()
            .list()
            .unwrap()
            .iter()
            .map(|c| c.catway_number.raw())
            .collect();
        assert_eq!(numbers, vec![1, 3, 7, 12]);
    }

    #[test]
    fn test_delete_cascades_reservations() {
        let store = Store::in_memory().unwrap();
        store.registry().create(number(1), CatwayType::Long).unwrap();
        store.registry().create(number(2), CatwayType::Long).unwrap();

        let mut ids = Vec::new();
        for (start, end) in [("2025-01-01", "2025-01-05"), ("2025-01-05", "2025-01-10"), ("2025-02-01", "2025-02-03")] {
            let rsvp = store
                .ledger()
                .create(
                    number(1),
                    &NewReservation::new(
                        "Dupont",
                        "BlueSea",
                        parse_instant(start).unwrap(),
                        parse_instant(end).unwrap(),
                    ),
                )
                .unwrap();
            ids.push(rsvp.id);
        }
        let survivor = store
            .ledger()
            .create(
                number(2),
                &NewReservation::new(
                    "Martin",
                    "Albatros",
                    parse_instant("2025-01-01").unwrap(),
                    parse_instant("2025-01-05").unwrap(),
                ),
            )
            .unwrap();

        assert_eq!(store.registry().delete(number(1)).unwrap(), 3);
        assert!(matches!(store.registry().get(number(1)), Err(Error::NotFound(_))));
        for id in &ids {
            assert!(matches!(
                store.ledger().get(number(1), id),
                Err(Error::NotFound(_))
            ));
        }
        assert_eq!(store.ledger().get(number(2), &survivor.id).unwrap(), survivor);
        assert_eq!(store.counts().unwrap(), (1, 1));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.registry().delete(number(4)),
            Err(Error::NotFound(_))
        ));
    }
}
