//! MongoDB Adapter - Collections served by a MongoDB deployment
//!
//! Filters and updates are handed to the server as-is; matching, update
//! operators and unique indexes are the server's job. Records cross the
//! boundary as relaxed extended JSON.

use std::sync::Arc;

use async_trait::async_trait;
use database::{Collection, Database, Filter, Record, StoreError, Update, ID_FIELD};
use mongodb::bson::{self, Bson, Document as BsonDocument};
use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::Client;
use serde_json::{Map, Value};

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// Handle to one collection of a MongoDB database
#[derive(Debug, Clone)]
pub struct MongoCollection {
    name: String,
    collection: mongodb::Collection<BsonDocument>,
}

impl MongoCollection {
    pub fn new(collection: mongodb::Collection<BsonDocument>) -> Self {
        Self {
            name: collection.name().to_string(),
            collection,
        }
    }

    fn driver_error(&self, err: DriverError) -> StoreError {
        store_error(&self.name, err)
    }
}

#[async_trait]
impl Collection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, record: Record) -> Result<Record, StoreError> {
        if !record.contains_key(ID_FIELD) {
            return Err(StoreError::InvalidDocument(format!(
                "document must carry an '{}' field",
                ID_FIELD
            )));
        }

        let document = to_bson(&record).map_err(StoreError::InvalidDocument)?;
        self.collection
            .insert_one(document)
            .await
            .map_err(|err| self.driver_error(err))?;

        let id = &record[ID_FIELD];
        tracing::debug!(collection = %self.name, id = %id, "inserted document");
        Ok(record)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let query = to_bson(filter.as_map()).map_err(StoreError::InvalidFilter)?;
        let found = self
            .collection
            .find_one(query)
            .await
            .map_err(|err| self.driver_error(err))?
            .map(from_bson)
            .transpose()?;

        tracing::debug!(collection = %self.name, filter = %filter, found = found.is_some(), "find_one");
        Ok(found)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let query = to_bson(filter.as_map()).map_err(StoreError::InvalidFilter)?;
        let mut cursor = self
            .collection
            .find(query)
            .await
            .map_err(|err| self.driver_error(err))?;

        let mut found = Vec::new();
        while cursor.advance().await.map_err(|err| self.driver_error(err))? {
            let document = cursor
                .deserialize_current()
                .map_err(|err| self.driver_error(err))?;
            found.push(from_bson(document)?);
        }

        tracing::debug!(collection = %self.name, filter = %filter, count = found.len(), "find");
        Ok(found)
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Record>, StoreError> {
        // The server refuses an empty modifier document
        if update.is_empty() {
            return self.find_one(filter).await;
        }

        let query = to_bson(filter.as_map()).map_err(StoreError::InvalidFilter)?;
        let modifications = to_bson(update.as_map()).map_err(StoreError::InvalidUpdate)?;
        let updated = self
            .collection
            .find_one_and_update(query, modifications)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|err| self.driver_error(err))?
            .map(from_bson)
            .transpose()?;

        tracing::debug!(collection = %self.name, filter = %filter, update = %update, "find_one_and_update");
        Ok(updated)
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let query = to_bson(filter.as_map()).map_err(StoreError::InvalidFilter)?;
        let removed = self
            .collection
            .find_one_and_delete(query)
            .await
            .map_err(|err| self.driver_error(err))?
            .map(from_bson)
            .transpose()?;

        tracing::debug!(collection = %self.name, filter = %filter, deleted = removed.is_some(), "find_one_and_delete");
        Ok(removed)
    }
}

/// A MongoDB database reached through one shared client
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    name: String,
    database: mongodb::Database,
}

impl MongoDatabase {
    /// Build a client for `uri` and bind it to the database `name`
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the
    /// first operation rather than here.
    pub async fn connect(uri: &str, name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|err| StoreError::Unavailable(format!("invalid connection string: {}", err)))?;

        tracing::info!(database = %name, "mongodb client ready");
        Ok(Self::from_client(&client, name))
    }

    pub fn from_client(client: &Client, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            database: client.database(&name),
            name,
        }
    }
}

impl Database for MongoDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(MongoCollection::new(self.database.collection::<BsonDocument>(name)))
    }
}

fn to_bson(map: &Map<String, Value>) -> Result<BsonDocument, String> {
    bson::to_document(map).map_err(|err| err.to_string())
}

fn from_bson(document: BsonDocument) -> Result<Record, StoreError> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::InvalidDocument(format!(
            "store returned a non-document value: {}",
            other
        ))),
    }
}

/// Unique index violations become `DuplicateKey`; anything else means the
/// store could not serve the request.
fn store_error(collection: &str, err: DriverError) -> StoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            Some(write.message.clone())
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY => Some(command.message.clone()),
        _ => None,
    };

    match duplicate {
        Some(message) => StoreError::DuplicateKey {
            collection: collection.to_string(),
            key: duplicate_key_field(&message).unwrap_or("index").to_string(),
            value: message,
        },
        None => StoreError::Unavailable(err.to_string()),
    }
}

/// `... index: room_1 dup key: { room: "101" }` -> `room`
fn duplicate_key_field(message: &str) -> Option<&str> {
    let (_, key) = message.split_once("dup key: {")?;
    let (field, _) = key.split_once(':')?;
    let field = field.trim();
    (!field.is_empty()).then_some(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_record_crosses_bson_boundary_unchanged() {
        let original = record(json!({
            "_id": "6f1c2f6e-3f0b-4c1e-9a53-2f0d8d0c9b11",
            "placeId": "p-1",
            "guests": 2,
            "rate": 99.5,
            "tags": ["window", "quiet"],
            "address": {"city": "Lisbon"},
            "note": null
        }));

        let stored = to_bson(&original).unwrap();
        assert_eq!(stored.get_str("placeId").unwrap(), "p-1");

        assert_eq!(from_bson(stored).unwrap(), original);
    }

    #[test]
    fn test_operators_are_passed_through() {
        let update = Update::new().set("placeId", "p-2").inc("guests", 1);
        let document = to_bson(update.as_map()).unwrap();

        assert_eq!(document.get_document("$set").unwrap().get_str("placeId").unwrap(), "p-2");
        assert!(document.contains_key("$inc"));

        let filter = Filter::new().gte("guests", 2).is_in("room", vec!["101", "102"]);
        let document = to_bson(filter.as_map()).unwrap();
        assert!(document.get_document("guests").unwrap().contains_key("$gte"));
        assert!(document.get_document("room").unwrap().contains_key("$in"));
    }

    #[test]
    fn test_duplicate_key_field_from_server_message() {
        let message = r#"E11000 duplicate key error collection: sleepr.rooms index: room_1 dup key: { room: "101" }"#;
        assert_eq!(duplicate_key_field(message), Some("room"));
        assert_eq!(duplicate_key_field("E11000 duplicate key error"), None);
    }

    #[tokio::test]
    async fn test_connect_binds_database_name() {
        let database = MongoDatabase::connect("mongodb://localhost:27017", "sleepr")
            .await
            .unwrap();
        assert_eq!(database.name(), "sleepr");
        assert_eq!(database.collection("reservations").name(), "reservations");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_uri() {
        let err = MongoDatabase::connect("mongodb://", "sleepr").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
