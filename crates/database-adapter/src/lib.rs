//! # Reservations Adapter Layer
//!
//! Implementations of the store ports declared in the `database` crate.
//!
//! ## Structure
//!
//! - `repository/` - Document store implementations (in-memory and MongoDB)

pub mod repository;

pub use repository::in_memory::{InMemoryCollection, InMemoryDatabase};
pub use repository::mongo::{MongoCollection, MongoDatabase};
