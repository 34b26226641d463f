//! Marina Seed - bulk loader for berth and reservation records
//!
//! Reads catway and reservation lists from JSON or RON files and pushes every
//! record through the live registry and ledger, so seeded data obeys the same
//! validation and no-overlap rules as any other write:
//! - Catway records with loosely spelled types and states
//! - Reservation records with RFC 3339 or `YYYY-MM-DD` dates
//! - Optional replace mode that wipes the store first

mod error;
mod loader;
mod records;

pub use error::{Error, Result};
pub use loader::{SeedOptions, SeedReport, Seeder};
pub use records::{read_records, CatwayRecord, RawNumber, RawRecord, ReservationRecord};
