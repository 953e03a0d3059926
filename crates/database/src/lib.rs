//! # Reservations Database Layer
//!
//! A generic, type-parameterized repository over a document store.
//!
//! ```text
//! Domain service  │  This crate                       │  Adapter
//! ────────────────┼───────────────────────────────────┼──────────────────
//! create(fields) ─┼─▶ DocumentRepository<D>           │
//! find_one(f)     │     materialize / not-found       │
//!                 │            │                      │
//!                 │            ▼                      │
//!                 │   trait Collection (port) ────────┼─▶ InMemoryCollection
//! ```
//!
//! The repository never builds store-specific queries itself. It hands an
//! opaque [`Filter`] or [`Update`] to the [`Collection`] port and turns the
//! returned [`Record`] into an owned snapshot of the document type.

pub mod model;
pub mod repository;

pub use model::{
    document::{Document, DocumentId, Record, ID_FIELD},
    filter::Filter,
    update::Update,
    PayloadError,
};

pub use repository::{
    abstract_repository::{DocumentRepository, RepositoryError},
    collection::{Collection, Database, StoreError},
};
