use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{ResourcePath, Timestamp};
use crate::firestore::remote::datastore::{Datastore, InMemoryDatastore};
use crate::firestore::value::DocumentData;

use super::converter::FirestoreDataConverter;
use super::operations::{self, Precondition, SetOptions, WriteResult};
use super::query::{ConvertedQuery, Query, QuerySnapshot, TypedQuerySnapshot};
use super::reference::{
    CollectionReference, ConvertedCollectionReference, ConvertedDocumentReference,
    DocumentReference,
};
use super::snapshot::{DocumentSnapshot, TypedDocumentSnapshot};

/// Handle to a document database.
///
/// Cloning is cheap; every clone talks to the same datastore.
#[derive(Clone)]
pub struct Firestore {
    datastore: Arc<dyn Datastore>,
}

impl Firestore {
    /// Creates a handle backed by the supplied datastore implementation.
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Returns a handle that stores documents in memory only.
    ///
    /// Useful for tests or demos where persistence/network access is not
    /// required.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDatastore::new()))
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.datastore
    }

    /// Creates a `CollectionReference` pointing at `path`.
    ///
    /// The path is interpreted relative to the database root using forward
    /// slashes to separate segments (e.g. `"users/u1/posts"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at `path`.
    ///
    /// The path must contain an even number of segments (collection/doc pairs).
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    /// Creates a query that targets every collection with the provided
    /// identifier, regardless of its parent path.
    pub fn collection_group(&self, collection_id: &str) -> FirestoreResult<Query> {
        Query::new_collection_group(self.clone(), collection_id.to_string())
    }

    /// Fetches the document behind `reference`.
    ///
    /// Returns a snapshot that may or may not contain data depending on whether
    /// the document exists.
    pub async fn get_doc(&self, reference: &DocumentReference) -> FirestoreResult<DocumentSnapshot> {
        self.datastore.get_document(reference.key()).await
    }

    /// Reads a document using the converter attached to a typed reference.
    pub async fn get_doc_with_converter<C>(
        &self,
        reference: &ConvertedDocumentReference<C>,
    ) -> FirestoreResult<TypedDocumentSnapshot<C>>
    where
        C: FirestoreDataConverter,
    {
        let snapshot = self.get_doc(reference.raw()).await?;
        Ok(snapshot.into_typed(reference.converter()))
    }

    /// Creates the document, failing with `already-exists` if it is present.
    pub async fn create_doc(
        &self,
        reference: &DocumentReference,
        data: DocumentData,
    ) -> FirestoreResult<WriteResult> {
        self.datastore.create_document(reference.key(), data).await
    }

    pub async fn create_doc_with_converter<C>(
        &self,
        reference: &ConvertedDocumentReference<C>,
        value: &C::Model,
    ) -> Result<WriteResult, C::Error>
    where
        C: FirestoreDataConverter,
    {
        let data = reference.converter().to_firestore(value)?;
        Ok(self.create_doc(reference.raw(), data).await?)
    }

    /// Writes the provided fields into the document, replacing it unless
    /// `options` asks for a merge.
    pub async fn set_doc(
        &self,
        reference: &DocumentReference,
        data: DocumentData,
        options: SetOptions,
    ) -> FirestoreResult<WriteResult> {
        let encoded = operations::encode_set_data(data, &options)?;
        self.datastore
            .set_document(reference.key(), encoded.data, encoded.mask)
            .await
    }

    pub async fn set_doc_with_converter<C>(
        &self,
        reference: &ConvertedDocumentReference<C>,
        value: &C::Model,
        options: SetOptions,
    ) -> Result<WriteResult, C::Error>
    where
        C: FirestoreDataConverter,
    {
        let data = reference.converter().to_firestore(value)?;
        Ok(self.set_doc(reference.raw(), data, options).await?)
    }

    /// Applies a partial update. Keys may be dotted field paths.
    ///
    /// Without an explicit precondition the document must exist.
    ///
    /// # Errors
    /// Returns `firestore/invalid-argument` if `data` is empty,
    /// `firestore/not-found` if the document does not exist and
    /// `firestore/failed-precondition` if `precondition` is not met.
    pub async fn update_doc(
        &self,
        reference: &DocumentReference,
        data: DocumentData,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteResult> {
        let encoded = operations::encode_update_data(data)?;
        self.datastore
            .update_document(
                reference.key(),
                encoded.data,
                encoded.field_paths,
                precondition.unwrap_or(Precondition::Exists(true)),
            )
            .await
    }

    /// Deletes the document. Succeeds when it does not exist unless a
    /// precondition says otherwise.
    pub async fn delete_doc(
        &self,
        reference: &DocumentReference,
        precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteResult> {
        self.datastore
            .delete_document(reference.key(), precondition)
            .await
    }

    /// Adds a new document with a generated id and returns its reference.
    pub async fn add_doc(
        &self,
        collection: &CollectionReference,
        data: DocumentData,
    ) -> FirestoreResult<DocumentReference> {
        let reference = collection.doc(None)?;
        self.create_doc(&reference, data).await?;
        Ok(reference)
    }

    pub async fn add_doc_with_converter<C>(
        &self,
        collection: &ConvertedCollectionReference<C>,
        value: &C::Model,
    ) -> Result<ConvertedDocumentReference<C>, C::Error>
    where
        C: FirestoreDataConverter,
    {
        let reference = collection.doc(None)?;
        self.create_doc_with_converter(&reference, value).await?;
        Ok(reference)
    }

    /// Executes `query` and returns the matching documents.
    pub async fn get_docs(&self, query: &Query) -> FirestoreResult<QuerySnapshot> {
        let documents = self.datastore.run_query(query.definition()).await?;
        let read_time = documents
            .first()
            .map(DocumentSnapshot::read_time)
            .unwrap_or_else(Timestamp::now);
        Ok(QuerySnapshot::new(documents, read_time))
    }

    pub async fn get_docs_with_converter<C>(
        &self,
        query: &ConvertedQuery<C>,
    ) -> FirestoreResult<TypedQuerySnapshot<C>>
    where
        C: FirestoreDataConverter,
    {
        let snapshot = self.get_docs(query.raw()).await?;
        Ok(TypedQuerySnapshot::new(snapshot, query.converter()))
    }

    /// Counts the documents matching `query` without transferring them.
    pub async fn count(&self, query: &Query) -> FirestoreResult<u64> {
        self.datastore.run_count(query.definition()).await
    }
}

impl Debug for Firestore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firestore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::PassthroughConverter;
    use crate::firestore::error::FirestoreErrorCode;
    use serde_json::{json, Value};

    fn data(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn set_get_and_delete() {
        let firestore = Firestore::in_memory();
        let reference = firestore.doc("users/u1").unwrap();
        firestore
            .set_doc(&reference, data(json!({"name": "Ann"})), SetOptions::default())
            .await
            .unwrap();
        let snapshot = firestore.get_doc(&reference).await.unwrap();
        assert_eq!(snapshot.data().unwrap().get("name"), Some(&json!("Ann")));

        firestore.delete_doc(&reference, None).await.unwrap();
        assert!(!firestore.get_doc(&reference).await.unwrap().exists());
    }

    #[tokio::test]
    async fn create_rejects_existing_documents() {
        let firestore = Firestore::in_memory();
        let reference = firestore.doc("users/u1").unwrap();
        firestore
            .create_doc(&reference, data(json!({"name": "Ann"})))
            .await
            .unwrap();
        let err = firestore
            .create_doc(&reference, data(json!({"name": "Bob"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn merge_set_and_update_keep_other_fields() {
        let firestore = Firestore::in_memory();
        let reference = firestore.doc("users/u1").unwrap();
        firestore
            .set_doc(
                &reference,
                data(json!({"name": "Ann", "address": {"city": "Paris", "zip": "75001"}})),
                SetOptions::default(),
            )
            .await
            .unwrap();
        firestore
            .set_doc(
                &reference,
                data(json!({"address": {"city": "Lyon"}})),
                SetOptions::merge_all(),
            )
            .await
            .unwrap();
        firestore
            .update_doc(&reference, data(json!({"address.zip": "69001", "age": 30})), None)
            .await
            .unwrap();

        let snapshot = firestore.get_doc(&reference).await.unwrap();
        assert_eq!(
            Value::Object(snapshot.data().unwrap().clone()),
            json!({"name": "Ann", "age": 30, "address": {"city": "Lyon", "zip": "69001"}})
        );
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let firestore = Firestore::in_memory();
        let reference = firestore.doc("users/missing").unwrap();
        let err = firestore
            .update_doc(&reference, data(json!({"name": "Ann"})), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::NotFound);
    }

    #[tokio::test]
    async fn add_with_converter_generates_ids() {
        let firestore = Firestore::in_memory();
        let users = firestore
            .collection("users")
            .unwrap()
            .with_converter(PassthroughConverter);
        let reference = firestore
            .add_doc_with_converter(&users, &data(json!({"name": "Ann"})))
            .await
            .unwrap();
        assert_eq!(reference.id().len(), 20);
        let snapshot = firestore.get_doc_with_converter(&reference).await.unwrap();
        assert_eq!(snapshot.data().unwrap(), Some(data(json!({"name": "Ann"}))));
        assert_eq!(firestore.count(&users.raw().query()).await.unwrap(), 1);
    }
}
