//! Marina server
//!
//! HTTP boundary for the reservation engine:
//! - JSON routes for catways and their reservations
//! - Bearer tokens signed with a BLAKE3 keyed hash
//! - RON configuration with environment overrides

pub mod api;
pub mod auth;
pub mod config;

pub use api::{dispatch, handle_request, AppState, Route};
pub use auth::{AuthError, Claims, Role, TokenSigner};
pub use config::{Config, ConfigError};
