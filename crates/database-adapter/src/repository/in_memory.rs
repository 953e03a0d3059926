//! In-Memory Document Store
//!
//! A process-local implementation of the `Collection` and `Database`
//! ports. Useful for development and testing.
//!
//! Each operation takes the collection lock exactly once, so the match and
//! the mutation of `find_one_and_update`/`find_one_and_delete` are atomic.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use database::{Collection, Database, Filter, Record, StoreError, Update, ID_FIELD};

use super::query;

#[derive(Debug, Default)]
struct State {
    /// Insertion order is the store order
    records: Vec<Record>,
    /// Unique constraints besides `_id`
    unique_fields: Vec<String>,
}

/// One named collection of JSON records
///
/// Thread-safe implementation using RwLock.
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    state: RwLock<State>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Builder: enforce uniqueness of `field` on insert and update
    pub fn with_unique_index(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.unique_fields.contains(&field) {
            state.unique_fields.push(field);
        }
        self
    }

    /// Add a unique constraint to a live collection. Fails if the records
    /// already stored violate it.
    pub fn create_unique_index(&self, field: impl Into<String>) -> Result<(), StoreError> {
        let field = field.into();
        let mut state = self.write()?;
        if state.unique_fields.contains(&field) {
            return Ok(());
        }

        for (i, record) in state.records.iter().enumerate() {
            let Some(value) = query::lookup(record, &field) else {
                continue;
            };
            let clash = state.records[..i]
                .iter()
                .any(|earlier| same_key(earlier, &field, value));
            if clash {
                return Err(self.duplicate_key(&field, value));
            }
        }

        tracing::debug!(collection = %self.name, field = %field, "created unique index");
        state.unique_fields.push(field);
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| {
            StoreError::Unavailable(format!("collection '{}': failed to acquire read lock", self.name))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| {
            StoreError::Unavailable(format!("collection '{}': failed to acquire write lock", self.name))
        })
    }

    fn duplicate_key(&self, key: &str, value: &serde_json::Value) -> StoreError {
        StoreError::DuplicateKey {
            collection: self.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Reject `candidate` if it collides with another record on `_id` or a
    /// unique field. `skip` is the candidate's own position when updating.
    fn check_unique(
        &self,
        state: &State,
        candidate: &Record,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        let keys = std::iter::once(ID_FIELD).chain(state.unique_fields.iter().map(String::as_str));

        for key in keys {
            let Some(value) = query::lookup(candidate, key) else {
                continue;
            };
            let clash = state
                .records
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && same_key(other, key, value));
            if clash {
                return Err(self.duplicate_key(key, value));
            }
        }
        Ok(())
    }

    fn position(state: &State, filter: &Filter) -> Result<Option<usize>, StoreError> {
        for (i, record) in state.records.iter().enumerate() {
            if query::matches(record, filter.as_map())? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
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

        let mut state = self.write()?;
        self.check_unique(&state, &record, None)?;
        state.records.push(record.clone());

        let id = &record[ID_FIELD];
        tracing::debug!(collection = %self.name, id = %id, "inserted document");
        Ok(record)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let state = self.read()?;
        let found = Self::position(&state, filter)?.map(|i| state.records[i].clone());

        tracing::debug!(collection = %self.name, filter = %filter, found = found.is_some(), "find_one");
        Ok(found)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let state = self.read()?;
        let mut found = Vec::new();
        for record in state.records.iter() {
            if query::matches(record, filter.as_map())? {
                found.push(record.clone());
            }
        }

        tracing::debug!(collection = %self.name, filter = %filter, count = found.len(), "find");
        Ok(found)
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Record>, StoreError> {
        let mut state = self.write()?;
        let Some(i) = Self::position(&state, filter)? else {
            tracing::debug!(collection = %self.name, filter = %filter, "find_one_and_update: no match");
            return Ok(None);
        };

        // Work on a copy so a failing modifier leaves the stored record intact
        let mut updated = state.records[i].clone();
        query::apply_update(&mut updated, update.as_map())?;
        self.check_unique(&state, &updated, Some(i))?;
        state.records[i] = updated.clone();

        tracing::debug!(collection = %self.name, filter = %filter, update = %update, "find_one_and_update");
        Ok(Some(updated))
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let mut state = self.write()?;
        let removed = Self::position(&state, filter)?.map(|i| state.records.remove(i));

        tracing::debug!(collection = %self.name, filter = %filter, deleted = removed.is_some(), "find_one_and_delete");
        Ok(removed)
    }
}

/// In-memory database: a registry of named collections
///
/// Clones share the same collections.
#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    name: String,
    collections: Arc<RwLock<HashMap<String, Arc<InMemoryCollection>>>>,
}

impl InMemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Concrete handle for `name`, created on first use
    pub fn collection_handle(&self, name: &str) -> Arc<InMemoryCollection> {
        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(existing);
        }

        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let handle = collections.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(database = %self.name, collection = %name, "created collection");
            Arc::new(InMemoryCollection::new(name))
        });
        Arc::clone(handle)
    }

    /// Names of every collection created so far, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Database for InMemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        self.collection_handle(name)
    }
}

/// Whether `record` holds `value` under `key`, comparing numbers by value
fn same_key(record: &Record, key: &str, value: &serde_json::Value) -> bool {
    query::lookup(record, key).is_some_and(|stored| query::values_equal(stored, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{Document, DocumentId, DocumentRepository, RepositoryError};
    use serde::{Deserialize, Serialize};
    use shared::{LogLevel, MemoryLogger, NullLogger};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Booking {
        #[serde(rename = "_id")]
        id: DocumentId,
        guest: String,
        room: String,
        nights: i64,
        #[serde(default)]
        notes: Vec<String>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct NewBooking {
        guest: String,
        room: String,
        nights: i64,
    }

    impl Document for Booking {
        const COLLECTION: &'static str = "bookings";
        type Fields = NewBooking;

        fn id(&self) -> &DocumentId {
            &self.id
        }
    }

    fn booking(guest: &str, room: &str, nights: i64) -> NewBooking {
        NewBooking {
            guest: guest.to_string(),
            room: room.to_string(),
            nights,
        }
    }

    fn repository(db: &InMemoryDatabase) -> DocumentRepository<Booking> {
        DocumentRepository::from_database(db, Arc::new(NullLogger))
    }

    #[test]
    fn test_database_shares_collections() {
        let db = InMemoryDatabase::new("test");
        let a = db.collection_handle("bookings");
        let b = db.clone().collection_handle("bookings");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(db.collection_names(), vec!["bookings".to_string()]);
        assert_eq!(Database::name(&db), "test");
    }

    #[tokio::test]
    async fn test_create_then_find_round_trip() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);

        let created = repo.create(booking("ada", "101", 2)).await.unwrap();
        let found = repo.find_one(&Filter::by_id(created.id())).await.unwrap();

        assert_eq!(found, created);
        assert_eq!(repo.collection_name(), "bookings");
        assert_eq!(db.collection_handle("bookings").len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_one_on_empty_collection_is_not_found() {
        let db = InMemoryDatabase::new("test");
        let logger = MemoryLogger::new();
        let repo: DocumentRepository<Booking> =
            DocumentRepository::from_database(&db, Arc::new(logger.clone()));

        for filter in [
            Filter::new(),
            Filter::new().eq("guest", "ada"),
            Filter::by_id(&DocumentId::new()),
        ] {
            let err = repo.find_one(&filter).await.unwrap_err();
            assert!(matches!(err, RepositoryError::NotFound { .. }));
        }

        let warnings = logger.at_level(LogLevel::Warn);
        assert_eq!(warnings.len(), 3);
        assert_eq!(
            warnings[1].meta.get("collection").map(String::as_str),
            Some("bookings")
        );
    }

    #[tokio::test]
    async fn test_update_is_visible_to_later_reads() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        let created = repo.create(booking("ada", "101", 2)).await.unwrap();
        let filter = Filter::new().eq("guest", "ada");

        let updated = repo
            .find_one_and_update(
                &filter,
                &Update::new().set("room", "202").inc("nights", 1).push("notes", "late"),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.room, "202");
        assert_eq!(updated.nights, 3);
        assert_eq!(updated.notes, vec!["late".to_string()]);

        let read_back = repo.find_one(&filter).await.unwrap();
        assert_eq!(read_back, updated);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document_intact() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        let created = repo.create(booking("ada", "101", 2)).await.unwrap();

        let err = repo
            .find_one_and_update(
                &Filter::by_id(created.id()),
                &Update::new().set("room", "303").inc("guest", 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Persistence(StoreError::InvalidUpdate(_))
        ));

        let unchanged = repo.find_one(&Filter::by_id(created.id())).await.unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_find_returns_matches_in_insertion_order() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        repo.create(booking("ada", "101", 1)).await.unwrap();
        repo.create(booking("bob", "102", 4)).await.unwrap();
        repo.create(booking("cy", "103", 7)).await.unwrap();

        let long_stays = repo.find(&Filter::new().gte("nights", 4)).await.unwrap();
        let guests: Vec<&str> = long_stays.iter().map(|b| b.guest.as_str()).collect();
        assert_eq!(guests, vec!["bob", "cy"]);

        let none = repo.find(&Filter::new().eq("guest", "zed")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        let created = repo.create(booking("ada", "101", 2)).await.unwrap();
        let filter = Filter::by_id(created.id());

        let deleted = repo.find_one_and_delete(&filter).await.unwrap();
        assert_eq!(deleted, created);

        let err = repo.find_one_and_delete(&filter).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(db.collection_handle("bookings").is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_identical_payloads_get_distinct_ids() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);

        let a = repo.create(booking("ada", "101", 2)).await.unwrap();
        let b = repo.create(booking("ada", "101", 2)).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(repo.find(&Filter::new()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unique_index_violation_propagates() {
        let db = InMemoryDatabase::new("test");
        db.collection_handle("bookings")
            .create_unique_index("room")
            .unwrap();
        let repo = repository(&db);

        repo.create(booking("ada", "101", 2)).await.unwrap();
        let err = repo.create(booking("bob", "101", 1)).await.unwrap_err();

        match err {
            RepositoryError::Persistence(StoreError::DuplicateKey { key, value, .. }) => {
                assert_eq!(key, "room");
                assert_eq!(value, "\"101\"");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Updates are held to the same constraint
        repo.create(booking("bob", "102", 1)).await.unwrap();
        let err = repo
            .find_one_and_update(&Filter::new().eq("guest", "bob"), &Update::new().set("room", "101"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Persistence(StoreError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_unique_index_rejects_existing_duplicates() {
        let collection = InMemoryCollection::new("rooms");
        let runtime = tokio::runtime::Runtime::new().unwrap();
        for id in ["a", "b"] {
            let mut record = Record::new();
            record.insert(ID_FIELD.to_string(), id.into());
            record.insert("room".to_string(), "101".into());
            runtime.block_on(collection.insert_one(record)).unwrap();
        }

        let err = collection.create_unique_index("room").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_unique_index_compares_numbers_by_value() {
        let collection = InMemoryCollection::new("counters").with_unique_index("n");

        let mut first = Record::new();
        first.insert(ID_FIELD.to_string(), "a".into());
        first.insert("n".to_string(), serde_json::json!(1));
        collection.insert_one(first).await.unwrap();

        let mut second = Record::new();
        second.insert(ID_FIELD.to_string(), "b".into());
        second.insert("n".to_string(), serde_json::json!(1.0));
        let err = collection.insert_one(second).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { ref key, .. } if key == "n"));
        assert_eq!(collection.len().unwrap(), 1);
    }

    #[test]
    fn test_unique_index_rejects_existing_numeric_duplicates() {
        let collection = InMemoryCollection::new("counters");
        let runtime = tokio::runtime::Runtime::new().unwrap();
        for (id, n) in [("a", serde_json::json!(2)), ("b", serde_json::json!(2.0))] {
            let mut record = Record::new();
            record.insert(ID_FIELD.to_string(), id.into());
            record.insert("n".to_string(), n);
            runtime.block_on(collection.insert_one(record)).unwrap();
        }

        let err = collection.create_unique_index("n").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_insert_requires_id() {
        let collection = InMemoryCollection::new("rooms").with_unique_index("room");
        let err = collection.insert_one(Record::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_atomic() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        let created = repo.create(booking("ada", "101", 0)).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let repo = repo.clone();
            let filter = Filter::by_id(created.id());
            tasks.push(tokio::spawn(async move {
                repo.find_one_and_update(&filter, &Update::new().inc("nights", 1))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let final_state = repo.find_one(&Filter::by_id(created.id())).await.unwrap();
        assert_eq!(final_state.nights, 64);
    }

    #[tokio::test]
    async fn test_snapshots_are_detached() {
        let db = InMemoryDatabase::new("test");
        let repo = repository(&db);
        let mut created = repo.create(booking("ada", "101", 2)).await.unwrap();

        created.room = "999".to_string();

        let stored = repo.find_one(&Filter::by_id(created.id())).await.unwrap();
        assert_eq!(stored.room, "101");
    }
}
