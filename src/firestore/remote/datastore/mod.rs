use async_trait::async_trait;

use crate::firestore::api::operations::{Precondition, WriteResult};
use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::DocumentSnapshot;
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DocumentKey, FieldPath};
use crate::firestore::value::DocumentData;

pub mod in_memory;

/// Backend that stores documents and evaluates queries.
///
/// Implementations own transport, authentication and consistency; callers
/// only see documents, write results and [`crate::firestore::FirestoreError`]s.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Datastore: Send + Sync + 'static {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    /// Fails with `already-exists` when the document is present.
    async fn create_document(&self, key: &DocumentKey, data: DocumentData) -> FirestoreResult<WriteResult>;

    /// Replaces the document, or only the masked fields when `mask` is set.
    async fn set_document(
        &self,
        key: &DocumentKey,
        data: DocumentData,
        mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<WriteResult>;

    /// Writes the value found at each of `field_paths` in `data`; paths
    /// missing from `data` delete the field.
    async fn update_document(
        &self,
        key: &DocumentKey,
        data: DocumentData,
        field_paths: Vec<FieldPath>,
        precondition: Precondition,
    ) -> FirestoreResult<WriteResult>;

    async fn delete_document(
        &self,
        key: &DocumentKey,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteResult>;

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;

    /// Server-side count aggregation. Defaults to counting `run_query` results.
    async fn run_count(&self, query: &QueryDefinition) -> FirestoreResult<u64> {
        Ok(self.run_query(query).await?.len() as u64)
    }
}

pub use in_memory::InMemoryDatastore;
