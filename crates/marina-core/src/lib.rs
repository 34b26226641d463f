//! Marina Core - Domain types for berth reservations
//!
//! This crate provides the value types shared by the registry, the ledger and
//! their callers:
//! - Catways (`Catway`, `CatwayType`, `CatwayState`, `CatwayPatch`)
//! - Reservations (`Reservation`, `NewReservation`, `ReservationPatch`)
//! - The half-open `Interval` and its overlap test
//! - Date parsing and normalization of imported berth attributes
//!
//! Nothing here touches storage; every constructor validates its input and
//! returns [`Error`] on bad data.

mod catway;
mod error;
mod identity;
pub mod normalize;
mod reservation;
pub mod time;

pub use catway::{Catway, CatwayPatch, CatwayState, CatwayType};
pub use error::{Error, Result};
pub use identity::{CatwayNumber, ReservationId};
pub use reservation::{NewReservation, Reservation, ReservationPatch};
pub use time::{parse_instant, Interval};
