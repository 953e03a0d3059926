//! Collection - The outbound port to a document-store driver
//!
//! The repository depends only on these traits. A driver adapter provides
//! the atomic single-document primitives; how it matches filters and
//! applies updates is its own business.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::document::Record;
use crate::model::filter::Filter;
use crate::model::update::Update;

/// Failures surfaced by the store. The repository passes these through
/// untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("E11000 duplicate key error collection: {collection} dup key: {{ {key}: {value} }}")]
    DuplicateKey {
        collection: String,
        key: String,
        value: String,
    },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// The store could not be reached or is in an unusable state
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A handle to one named collection
#[async_trait]
pub trait Collection: Send + Sync {
    /// Name of the collection this handle is bound to
    fn name(&self) -> &str;

    /// Persist a new record and return what was stored
    async fn insert_one(&self, record: Record) -> Result<Record, StoreError>;

    /// First record matching `filter`
    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>, StoreError>;

    /// Every record matching `filter`, in store order
    async fn find(&self, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Atomically apply `update` to the first match and return the
    /// post-update record
    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Record>, StoreError>;

    /// Atomically remove the first match and return the pre-deletion record
    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Record>, StoreError>;
}

/// An open connection that hands out collection handles by name
pub trait Database: Send + Sync {
    /// Name of the database
    fn name(&self) -> &str;

    /// Handle bound to the collection `name`. Repeated calls for the same
    /// name share storage.
    fn collection(&self, name: &str) -> Arc<dyn Collection>;
}
