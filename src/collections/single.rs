use serde::Serialize;

use crate::firestore::api::{ConvertedDocumentReference, Precondition, SetOptions, WriteResult};

use super::collection::{Collection, Record};
use super::converter::{SchemaConverter, WriteConverter};
use super::error::CollectionsResult;
use super::metadata::MetadataOptions;
use super::schema::Validator;

/// A collection holding one document under a fixed key, such as a settings
/// document. Every operation targets `<collection>/<key>`.
pub struct SingleDocumentCollection<V>
where
    V: Validator,
{
    collection: Collection<V>,
    key: String,
}

impl<V> Clone for SingleDocumentCollection<V>
where
    V: Validator,
{
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            key: self.key.clone(),
        }
    }
}

impl<V> SingleDocumentCollection<V>
where
    V: Validator,
{
    pub(crate) fn new(collection: Collection<V>, key: impl Into<String>) -> Self {
        Self {
            collection,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying multi-document collection.
    pub fn collection(&self) -> &Collection<V> {
        &self.collection
    }

    pub fn document_path(&self) -> String {
        self.collection.document_path(&self.key)
    }

    pub fn with_metadata(&self, metadata: MetadataOptions) -> Self {
        Self::new(self.collection.with_metadata(metadata), self.key.clone())
    }

    pub fn read_doc(&self) -> CollectionsResult<ConvertedDocumentReference<SchemaConverter<V>>> {
        self.collection.read().doc(&self.key)
    }

    pub fn write_doc(&self) -> CollectionsResult<ConvertedDocumentReference<WriteConverter>> {
        self.collection.write().doc(&self.key)
    }

    pub async fn find(&self) -> CollectionsResult<Option<Record<V>>> {
        self.collection.find_by_id(&self.key).await
    }

    pub async fn find_or_throw(&self) -> CollectionsResult<Record<V>> {
        self.collection.find_by_id_or_throw(&self.key).await
    }

    pub async fn create<D>(&self, data: &D) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.collection.create(&self.key, data).await
    }

    pub async fn set<D>(&self, data: &D, options: SetOptions) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.collection.set(&self.key, data, options).await
    }

    pub async fn update<D>(&self, data: &D, precondition: Option<Precondition>) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.collection.update(&self.key, data, precondition).await
    }

    pub async fn delete(&self, precondition: Option<Precondition>) -> CollectionsResult<WriteResult> {
        self.collection.delete(&self.key, precondition).await
    }
}
