//! # Reservations Shared
//!
//! Common types used across the reservations crates: database
//! configuration, the diagnostic logger sink and the config error type.

pub mod config;
pub mod error;
pub mod logger;

// Re-exports
pub use config::*;
pub use error::*;
pub use logger::*;
