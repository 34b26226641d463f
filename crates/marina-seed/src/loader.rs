//! Seeder: pushes record lists through the registry and ledger

use crate::error::Result;
use crate::records::{read_records, CatwayRecord, RawRecord, ReservationRecord};
use marina_db::Store;
use std::path::Path;
use tracing::{info, warn};

/// Seeding options
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    /// Wipe every catway (and so every reservation) before loading
    pub replace: bool,
}

/// Outcome of a seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub catways_inserted: usize,
    pub catways_skipped: usize,
    pub reservations_inserted: usize,
    pub reservations_skipped: usize,
}

/// Loader for catway and reservation records
pub struct Seeder<'a> {
    store: &'a Store,
    options: SeedOptions,
}

impl<'a> Seeder<'a> {
    /// Create a new seeder over a store
    pub fn new(store: &'a Store, options: SeedOptions) -> Self {
        Self { store, options }
    }

    /// Load a catways file and, optionally, a reservations file.
    ///
    /// Both files are read before anything is written. Entries that do not
    /// decode as records are skipped like any other bad record.
    pub fn seed_files(
        &self,
        catways: impl AsRef<Path>,
        reservations: Option<&Path>,
    ) -> Result<SeedReport> {
        let catways = read_records(catways)?;
        let reservations = match reservations {
            Some(path) => read_records(path)?,
            None => Vec::new(),
        };
        self.run(
            catways.into_iter().map(RawRecord::decode::<CatwayRecord>),
            reservations
                .into_iter()
                .map(RawRecord::decode::<ReservationRecord>),
        )
    }

    /// Load parsed records.
    ///
    /// Catways go first so reservations can reference them. A bad record is
    /// logged and skipped; a storage fault aborts the run.
    pub fn seed(
        &self,
        catways: &[CatwayRecord],
        reservations: &[ReservationRecord],
    ) -> Result<SeedReport> {
        self.run(
            catways.iter().cloned().map(Ok),
            reservations.iter().cloned().map(Ok),
        )
    }

    fn run(
        &self,
        catways: impl IntoIterator<Item = Result<CatwayRecord>>,
        reservations: impl IntoIterator<Item = Result<ReservationRecord>>,
    ) -> Result<SeedReport> {
        if self.options.replace {
            self.store.clear()?;
            info!("replace mode: existing catways and reservations removed");
        }

        let mut report = SeedReport::default();

        for (index, decoded) in catways.into_iter().enumerate() {
            let inserted = match decoded {
                Ok(record) => self.insert_catway(index, &record)?,
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed catway record");
                    false
                }
            };
            if inserted {
                report.catways_inserted += 1;
            } else {
                report.catways_skipped += 1;
            }
        }

        for (index, decoded) in reservations.into_iter().enumerate() {
            let inserted = match decoded {
                Ok(record) => self.insert_reservation(index, &record)?,
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed reservation record");
                    false
                }
            };
            if inserted {
                report.reservations_inserted += 1;
            } else {
                report.reservations_skipped += 1;
            }
        }

        info!(
            catways_inserted = report.catways_inserted,
            catways_skipped = report.catways_skipped,
            reservations_inserted = report.reservations_inserted,
            reservations_skipped = report.reservations_skipped,
            "seed complete"
        );
        Ok(report)
    }

    fn insert_catway(&self, index: usize, record: &CatwayRecord) -> Result<bool> {
        let (number, catway_type, catway_state) = match record.resolve() {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(index, error = %err, "skipping catway record");
                return Ok(false);
            }
        };

        match self
            .store
            .registry()
            .create_with_state(number, catway_type, catway_state)
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_internal() => Err(err.into()),
            Err(err) => {
                warn!(index, catway = number.raw(), error = %err, "skipping catway record");
                Ok(false)
            }
        }
    }

    fn insert_reservation(&self, index: usize, record: &ReservationRecord) -> Result<bool> {
        let (number, request) = match record.resolve() {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(index, error = %err, "skipping reservation record");
                return Ok(false);
            }
        };

        match self.store.ledger().create(number, &request) {
            Ok(_) => Ok(true),
            Err(err) if err.is_internal() => Err(err.into()),
            Err(err) => {
                warn!(index, catway = number.raw(), error = %err, "skipping reservation record");
                Ok(false)
            }
        }
    }
}
