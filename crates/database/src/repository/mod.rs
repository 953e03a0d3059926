//! Repository - Generic data access and the store port beneath it
//!
//! ```text
//! This crate                    │  Adapter crate
//! ──────────────────────────────┼────────────────────────
//! DocumentRepository<D>         │
//!   uses trait Collection ──────┼─▶ InMemoryCollection
//!   uses trait Database   ──────┼─▶ InMemoryDatabase
//! ```

pub mod abstract_repository;
pub mod collection;
