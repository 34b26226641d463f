//! Marina DB - berth registry and reservation ledger on native_db
//!
//! Provides:
//! - `Store` - the database handle plus one write lock per berth
//! - `Registry` - catway create/get/update/delete/list, with cascading delete
//! - `Ledger` - reservations per catway with half-open overlap rejection
//!
//! Both views borrow the store, so one `Store` behind an `Arc` serves every
//! request thread.

mod error;
mod ledger;
mod models;
mod queries;
mod registry;
mod store;

pub use error::{Error, Result};
pub use ledger::Ledger;
pub use registry::Registry;
pub use store::Store;
