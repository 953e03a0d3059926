//! DocumentRepository - Generic data access for one document type
//!
//! Concrete services hold a `DocumentRepository<MyDocument>` instead of
//! talking to the store. Every value handed back is a snapshot
//! deserialized from the store's record, detached from the store.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use shared::Logger;
use thiserror::Error;

use crate::model::document::{Document, DocumentId, Record, ID_FIELD};
use crate::model::filter::Filter;
use crate::model::update::Update;
use crate::repository::collection::{Collection, Database, StoreError};

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No document matched the filter. The filter is kept for diagnostics
    /// but stays out of the message.
    #[error("Document was not found.")]
    NotFound { collection: String, filter: Filter },

    /// Anything the store reported, passed through as-is
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Persistence(StoreError::Serialization(err))
    }
}

/// Typed repository bound to the collection of `D`
pub struct DocumentRepository<D> {
    collection: Arc<dyn Collection>,
    logger: Arc<dyn Logger>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for DocumentRepository<D> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            logger: Arc::clone(&self.logger),
            _marker: PhantomData,
        }
    }
}

impl<D> core::fmt::Debug for DocumentRepository<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl<D: Document> DocumentRepository<D> {
    pub fn new(collection: Arc<dyn Collection>, logger: Arc<dyn Logger>) -> Self {
        Self {
            collection,
            logger,
            _marker: PhantomData,
        }
    }

    /// Bind to the collection named by `D::COLLECTION`
    pub fn from_database(database: &dyn Database, logger: Arc<dyn Logger>) -> Self {
        Self::new(database.collection(D::COLLECTION), logger)
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Persist a new document under a freshly generated identifier
    pub async fn create(&self, fields: D::Fields) -> Result<D, RepositoryError> {
        let mut record = match serde_json::to_value(&fields)? {
            Value::Object(record) => record,
            _ => {
                return Err(StoreError::InvalidDocument(format!(
                    "{} fields must serialize to an object",
                    D::COLLECTION
                ))
                .into())
            }
        };
        record.insert(ID_FIELD.to_string(), DocumentId::new().into());

        let persisted = self.collection.insert_one(record).await?;
        Self::materialize(persisted)
    }

    /// First document matching `filter`
    ///
    /// Zero matches is [`RepositoryError::NotFound`], with a warning logged.
    pub async fn find_one(&self, filter: &Filter) -> Result<D, RepositoryError> {
        match self.collection.find_one(filter).await? {
            Some(record) => Self::materialize(record),
            None => Err(self.not_found(filter)),
        }
    }

    /// Atomically update the first match and return it as it is afterwards
    pub async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<D, RepositoryError> {
        match self.collection.find_one_and_update(filter, update).await? {
            Some(record) => Self::materialize(record),
            None => Err(self.not_found(filter)),
        }
    }

    /// Every document matching `filter`; no match is an empty list
    pub async fn find(&self, filter: &Filter) -> Result<Vec<D>, RepositoryError> {
        self.collection
            .find(filter)
            .await?
            .into_iter()
            .map(Self::materialize)
            .collect()
    }

    /// Atomically remove the first match and return it as it was
    ///
    /// Follows the same not-found policy as [`Self::find_one`].
    pub async fn find_one_and_delete(&self, filter: &Filter) -> Result<D, RepositoryError> {
        match self.collection.find_one_and_delete(filter).await? {
            Some(record) => Self::materialize(record),
            None => Err(self.not_found(filter)),
        }
    }

    fn materialize(record: Record) -> Result<D, RepositoryError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    fn not_found(&self, filter: &Filter) -> RepositoryError {
        let mut meta = HashMap::new();
        meta.insert("collection".to_string(), self.collection.name().to_string());
        meta.insert("filter".to_string(), filter.to_string());
        self.logger
            .warn("Document was not found with queryFilter", Some(&meta));

        RepositoryError::NotFound {
            collection: self.collection.name().to_string(),
            filter: filter.clone(),
        }
    }
}
