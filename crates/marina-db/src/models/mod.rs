//! Database models for persistent storage.

mod catway;
mod reservation;

pub use catway::*;
pub use reservation::*;
