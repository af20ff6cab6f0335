use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::firestore::api::operations::{Precondition, WriteResult};
use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::DocumentSnapshot;
use crate::firestore::error::{
    already_exists, failed_precondition, internal_error, not_found, FirestoreResult,
};
use crate::firestore::model::{DocumentKey, FieldPath, Timestamp};
use crate::firestore::query_evaluator::apply_query_to_documents;
use crate::firestore::value::{
    remove_value_at_field_path, set_value_at_field_path, value_for_field_path, DocumentData,
};

use super::Datastore;

#[derive(Clone, Debug)]
struct StoredDocument {
    data: DocumentData,
    create_time: Timestamp,
    update_time: Timestamp,
}

#[derive(Debug, Default)]
struct Store {
    documents: BTreeMap<DocumentKey, StoredDocument>,
    last_write_time: Option<Timestamp>,
}

impl Store {
    /// Commit times are strictly increasing so `UpdateTime` preconditions stay unambiguous.
    fn next_write_time(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let time = match self.last_write_time {
            Some(last) if now <= last => last.successor(),
            _ => now,
        };
        self.last_write_time = Some(time);
        time
    }

    fn snapshot(&self, key: &DocumentKey, read_time: Timestamp) -> DocumentSnapshot {
        match self.documents.get(key) {
            Some(stored) => DocumentSnapshot::new(
                key.clone(),
                stored.data.clone(),
                stored.create_time,
                stored.update_time,
                read_time,
            ),
            None => DocumentSnapshot::missing(key.clone(), read_time),
        }
    }

    fn check_precondition(&self, key: &DocumentKey, precondition: &Precondition) -> FirestoreResult<()> {
        let existing = self.documents.get(key);
        match (precondition, existing) {
            (Precondition::Exists(true), None) => Err(not_found(format!(
                "No document to update: {}",
                key.path()
            ))),
            (Precondition::Exists(false), Some(_)) => Err(already_exists(format!(
                "Document already exists: {}",
                key.path()
            ))),
            (Precondition::UpdateTime(expected), Some(stored)) if stored.update_time != *expected => {
                Err(failed_precondition(format!(
                    "Document {} was last updated at {}, expected {}",
                    key.path(),
                    stored.update_time,
                    expected
                )))
            }
            (Precondition::UpdateTime(_), None) => Err(failed_precondition(format!(
                "Document {} does not exist",
                key.path()
            ))),
            _ => Ok(()),
        }
    }

    fn write(&mut self, key: &DocumentKey, data: DocumentData) -> WriteResult {
        let write_time = self.next_write_time();
        let create_time = self
            .documents
            .get(key)
            .map(|stored| stored.create_time)
            .unwrap_or(write_time);
        self.documents.insert(
            key.clone(),
            StoredDocument {
                data,
                create_time,
                update_time: write_time,
            },
        );
        WriteResult { write_time }
    }
}

/// Datastore keeping every document in process memory.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    store: Arc<Mutex<Store>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> FirestoreResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| internal_error("In-memory datastore lock poisoned"))
    }

    fn existing_fields(store: &Store, key: &DocumentKey) -> DocumentData {
        store
            .documents
            .get(key)
            .map(|stored| stored.data.clone())
            .unwrap_or_default()
    }

    fn apply_field_paths(fields: &mut DocumentData, data: &DocumentData, field_paths: &[FieldPath]) {
        for path in field_paths {
            match value_for_field_path(data, path) {
                Some(value) => set_value_at_field_path(fields, path, value.clone()),
                None => {
                    remove_value_at_field_path(fields, path);
                }
            }
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let store = self.lock()?;
        Ok(store.snapshot(key, Timestamp::now()))
    }

    async fn create_document(&self, key: &DocumentKey, data: DocumentData) -> FirestoreResult<WriteResult> {
        let mut store = self.lock()?;
        store.check_precondition(key, &Precondition::Exists(false))?;
        Ok(store.write(key, data))
    }

    async fn set_document(
        &self,
        key: &DocumentKey,
        data: DocumentData,
        mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<WriteResult> {
        let mut store = self.lock()?;
        let fields = match mask {
            Some(mask) => {
                let mut fields = Self::existing_fields(&store, key);
                Self::apply_field_paths(&mut fields, &data, &mask);
                fields
            }
            None => data,
        };
        Ok(store.write(key, fields))
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: DocumentData,
        field_paths: Vec<FieldPath>,
        precondition: Precondition,
    ) -> FirestoreResult<WriteResult> {
        let mut store = self.lock()?;
        store.check_precondition(key, &precondition)?;
        let mut fields = Self::existing_fields(&store, key);
        Self::apply_field_paths(&mut fields, &data, &field_paths);
        Ok(store.write(key, fields))
    }

    async fn delete_document(
        &self,
        key: &DocumentKey,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteResult> {
        let mut store = self.lock()?;
        if let Some(precondition) = precondition {
            store.check_precondition(key, &precondition)?;
        }
        let write_time = store.next_write_time();
        store.documents.remove(key);
        Ok(WriteResult { write_time })
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let candidates = {
            let store = self.lock()?;
            let read_time = Timestamp::now();
            store
                .documents
                .keys()
                .filter(|key| query.matches_target(key))
                .map(|key| store.snapshot(key, read_time))
                .collect::<Vec<_>>()
        };
        apply_query_to_documents(candidates, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::FirestoreErrorCode;
    use serde_json::json;

    fn fields(name: &str) -> DocumentData {
        let mut map = DocumentData::new();
        map.insert("name".to_string(), json!(name));
        map
    }

    #[tokio::test]
    async fn in_memory_get_set() {
        let datastore = InMemoryDatastore::new();
        let key = DocumentKey::from_string("users/u1").unwrap();
        datastore.set_document(&key, fields("Ann"), None).await.unwrap();
        let snapshot = datastore.get_document(&key).await.unwrap();
        assert!(snapshot.exists());
        assert_eq!(snapshot.data().unwrap().get("name"), Some(&json!("Ann")));
        assert_eq!(snapshot.create_time(), snapshot.update_time());
    }

    #[tokio::test]
    async fn write_times_increase_and_create_time_is_kept() {
        let datastore = InMemoryDatastore::new();
        let key = DocumentKey::from_string("users/u1").unwrap();
        let first = datastore.create_document(&key, fields("Ann")).await.unwrap();
        let second = datastore.set_document(&key, fields("Bob"), None).await.unwrap();
        assert!(second.write_time > first.write_time);

        let snapshot = datastore.get_document(&key).await.unwrap();
        assert_eq!(snapshot.create_time(), Some(first.write_time));
        assert_eq!(snapshot.update_time(), Some(second.write_time));
    }

    #[tokio::test]
    async fn update_time_precondition() {
        let datastore = InMemoryDatastore::new();
        let key = DocumentKey::from_string("users/u1").unwrap();
        let written = datastore.create_document(&key, fields("Ann")).await.unwrap();
        let name = FieldPath::from_dot_separated("name").unwrap();

        let stale = Precondition::UpdateTime(Timestamp::new(0, 0));
        let err = datastore
            .update_document(&key, fields("Bob"), vec![name.clone()], stale)
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);

        let fresh = Precondition::UpdateTime(written.write_time);
        datastore
            .update_document(&key, fields("Bob"), vec![name], fresh)
            .await
            .unwrap();
        let snapshot = datastore.get_document(&key).await.unwrap();
        assert_eq!(snapshot.data().unwrap().get("name"), Some(&json!("Bob")));
    }

    #[tokio::test]
    async fn delete_is_idempotent_without_precondition() {
        let datastore = InMemoryDatastore::new();
        let key = DocumentKey::from_string("users/u1").unwrap();
        datastore.delete_document(&key, None).await.unwrap();
        let err = datastore
            .delete_document(&key, Some(Precondition::Exists(true)))
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::NotFound);
    }
}
