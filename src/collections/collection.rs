use std::sync::{Arc, LazyLock};

use serde::Serialize;

use crate::firestore::api::{
    ConvertedCollectionReference, ConvertedDocumentReference, ConvertedQuery, DocumentReference,
    Precondition, SetOptions, TypedQuerySnapshot, WriteResult,
};
use crate::firestore::Firestore;
use crate::logger::Logger;

use super::converter::{encode_document, ConverterCache, SchemaConverter, WriteConverter};
use super::error::{
    document_not_found, multiple_results, read_only, CollectionsError, CollectionsResult,
};
use super::metadata::{DocumentRecord, MetadataOptions};
use super::options::CollectionsOptions;
use super::path::{document_path, CollectionPath};
use super::query_spec::QuerySpec;
use super::schema::{SchemaNode, Validator};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firestore-collections/collection"));

/// A record read through a collection validated by `V`.
pub type Record<V> = DocumentRecord<<V as Validator>::Output>;

/// Typed access to the documents of one collection.
///
/// Reads are validated by the schema's validator and carry the metadata
/// selected with [`Collection::with_metadata`]. Writes strip metadata and
/// are not validated.
pub struct Collection<V>
where
    V: Validator,
{
    path: CollectionPath,
    options: CollectionsOptions,
    converters: Arc<ConverterCache<V>>,
    metadata: MetadataOptions,
    read_only: bool,
}

impl<V> Clone for Collection<V>
where
    V: Validator,
{
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            options: self.options.clone(),
            converters: Arc::clone(&self.converters),
            metadata: self.metadata,
            read_only: self.read_only,
        }
    }
}

impl<V> std::fmt::Debug for Collection<V>
where
    V: Validator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl<V> Collection<V>
where
    V: Validator,
{
    pub(crate) fn new(path: CollectionPath, node: &SchemaNode<V>, options: CollectionsOptions) -> Self {
        let converters = ConverterCache::new(
            Arc::clone(&node.validator),
            node.include_document_id,
            options.clone(),
        );
        Self {
            path,
            options,
            converters: Arc::new(converters),
            metadata: MetadataOptions::default(),
            read_only: node.read_only,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Slash-joined collection path, e.g. `users/u1/posts`.
    pub fn resolved_path(&self) -> String {
        self.path.resolve()
    }

    pub fn document_path(&self, document_id: &str) -> String {
        document_path(self.path.clone(), document_id)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn metadata(&self) -> MetadataOptions {
        self.metadata
    }

    /// The same collection returning `metadata` on reads.
    pub fn with_metadata(&self, metadata: MetadataOptions) -> Self {
        let mut collection = self.clone();
        collection.metadata = metadata;
        collection
    }

    pub fn database(&self) -> Firestore {
        self.options.database()
    }

    pub fn read(&self) -> ReadAccessors<'_, V> {
        ReadAccessors {
            collection: self,
            metadata: self.metadata,
        }
    }

    pub fn write(&self) -> WriteAccessors<'_, V> {
        WriteAccessors { collection: self }
    }

    pub async fn find_by_id(&self, document_id: &str) -> CollectionsResult<Option<Record<V>>> {
        let reference = self.read().doc(document_id)?;
        let snapshot = reference
            .firestore()
            .get_doc_with_converter(&reference)
            .await?;
        snapshot.data()
    }

    pub async fn find_by_id_or_throw(&self, document_id: &str) -> CollectionsResult<Record<V>> {
        self.find_by_id(document_id).await?.ok_or_else(|| {
            document_not_found(format!(
                "Document '{}' does not exist",
                self.document_path(document_id)
            ))
        })
    }

    /// Creates a document under a generated id.
    pub async fn add<D>(&self, data: &D) -> CollectionsResult<DocumentReference>
    where
        D: Serialize + ?Sized,
    {
        self.ensure_writable()?;
        let collection = self.write().collection()?;
        let value = serde_json::Value::Object(encode_document(data)?);
        let reference = collection
            .firestore()
            .add_doc_with_converter(&collection, &value)
            .await?;
        LOGGER.debug(format!("Added document '{}'", reference.path()));
        Ok(reference.raw().clone())
    }

    /// Creates the document, failing if it already exists.
    pub async fn create<D>(&self, document_id: &str, data: &D) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.ensure_writable()?;
        let reference = self.write().doc(document_id)?;
        let value = serde_json::Value::Object(encode_document(data)?);
        let result = reference
            .firestore()
            .create_doc_with_converter(&reference, &value)
            .await?;
        LOGGER.debug(format!("Created document '{}'", reference.path()));
        Ok(result)
    }

    pub async fn set<D>(&self, document_id: &str, data: &D, options: SetOptions) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.ensure_writable()?;
        let reference = self.write().doc(document_id)?;
        let value = serde_json::Value::Object(encode_document(data)?);
        let result = reference
            .firestore()
            .set_doc_with_converter(&reference, &value, options)
            .await?;
        LOGGER.debug(format!("Set document '{}'", reference.path()));
        Ok(result)
    }

    /// Partially updates the document. Keys of `data` may be dotted field paths.
    pub async fn update<D>(
        &self,
        document_id: &str,
        data: &D,
        precondition: Option<Precondition>,
    ) -> CollectionsResult<WriteResult>
    where
        D: Serialize + ?Sized,
    {
        self.ensure_writable()?;
        let reference = self.write().doc(document_id)?;
        let fields = encode_document(data)?;
        let result = reference
            .firestore()
            .update_doc(reference.raw(), fields, precondition)
            .await?;
        LOGGER.debug(format!("Updated document '{}'", reference.path()));
        Ok(result)
    }

    pub async fn delete(&self, document_id: &str, precondition: Option<Precondition>) -> CollectionsResult<WriteResult> {
        self.ensure_writable()?;
        let reference = self.write().doc(document_id)?;
        let result = reference
            .firestore()
            .delete_doc(reference.raw(), precondition)
            .await?;
        LOGGER.debug(format!("Deleted document '{}'", reference.path()));
        Ok(result)
    }

    /// The query `spec` describes, ready to run or to hand to other code.
    pub fn prepare(&self, spec: &QuerySpec) -> CollectionsResult<ConvertedQuery<SchemaConverter<V>>> {
        let base = self.read().collection()?.query();
        Ok(spec.apply_converted(&base)?)
    }

    /// Runs `spec`. Documents are validated only when their data is read.
    pub async fn query(&self, spec: &QuerySpec) -> CollectionsResult<TypedQuerySnapshot<SchemaConverter<V>>> {
        let query = self.prepare(spec)?;
        let snapshot = query
            .raw()
            .firestore()
            .get_docs_with_converter(&query)
            .await?;
        LOGGER.debug(format!(
            "Query '{}' on '{}' matched {} documents",
            spec.name,
            self.path,
            snapshot.len()
        ));
        Ok(snapshot)
    }

    pub async fn find_many(&self, spec: &QuerySpec) -> CollectionsResult<Vec<Record<V>>> {
        self.query(spec).await?.data()
    }

    /// The single match of `spec`, if any. More than one match is an error.
    pub async fn find_unique(&self, spec: &QuerySpec) -> CollectionsResult<Option<Record<V>>> {
        let snapshot = self.query(spec).await?;
        if snapshot.len() > 1 {
            return Err(multiple_results(&spec.name, snapshot.len()));
        }
        match snapshot.into_iter().next() {
            Some(document) => document.data(),
            None => Ok(None),
        }
    }

    pub async fn find_unique_or_throw(&self, spec: &QuerySpec) -> CollectionsResult<Record<V>> {
        self.find_unique(spec)
            .await?
            .ok_or_else(|| no_match(spec, &self.path))
    }

    /// The first match of `spec`. Later matches are never validated.
    pub async fn find_first(&self, spec: &QuerySpec) -> CollectionsResult<Option<Record<V>>> {
        match self.query(spec).await?.into_iter().next() {
            Some(document) => document.data(),
            None => Ok(None),
        }
    }

    pub async fn find_first_or_throw(&self, spec: &QuerySpec) -> CollectionsResult<Record<V>> {
        self.find_first(spec)
            .await?
            .ok_or_else(|| no_match(spec, &self.path))
    }

    /// Number of documents matching `spec`, counted by the database.
    pub async fn count(&self, spec: &QuerySpec) -> CollectionsResult<u64> {
        let query = self.prepare(spec)?;
        Ok(query.raw().firestore().count(query.raw()).await?)
    }

    fn ensure_writable(&self) -> CollectionsResult<()> {
        if self.read_only {
            return Err(read_only(&self.resolved_path()));
        }
        Ok(())
    }
}

fn no_match(spec: &QuerySpec, path: &CollectionPath) -> CollectionsError {
    document_not_found(format!("Query '{}' on '{path}' matched no documents", spec.name))
}

/// References whose reads go through the validating converter.
pub struct ReadAccessors<'a, V>
where
    V: Validator,
{
    collection: &'a Collection<V>,
    metadata: MetadataOptions,
}

impl<V> ReadAccessors<'_, V>
where
    V: Validator,
{
    pub fn with_metadata(mut self, metadata: MetadataOptions) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn converter(&self) -> Arc<SchemaConverter<V>> {
        self.collection.converters.get(self.metadata)
    }

    pub fn collection(&self) -> CollectionsResult<ConvertedCollectionReference<SchemaConverter<V>>> {
        let reference = self
            .collection
            .database()
            .collection(&self.collection.resolved_path())?;
        Ok(reference.with_shared_converter(self.converter()))
    }

    pub fn doc(&self, document_id: &str) -> CollectionsResult<ConvertedDocumentReference<SchemaConverter<V>>> {
        let reference = self
            .collection
            .database()
            .doc(&self.collection.document_path(document_id))?;
        Ok(reference.with_shared_converter(self.converter()))
    }

    /// Every collection sharing this collection's name, at any depth.
    pub fn collection_group(&self) -> CollectionsResult<ConvertedQuery<SchemaConverter<V>>> {
        let query = self
            .collection
            .database()
            .collection_group(self.collection.path.name())?;
        Ok(query.with_shared_converter(self.converter()))
    }
}

/// References whose writes only strip metadata.
pub struct WriteAccessors<'a, V>
where
    V: Validator,
{
    collection: &'a Collection<V>,
}

impl<V> WriteAccessors<'_, V>
where
    V: Validator,
{
    pub fn collection(&self) -> CollectionsResult<ConvertedCollectionReference<WriteConverter>> {
        let reference = self
            .collection
            .database()
            .collection(&self.collection.resolved_path())?;
        Ok(reference.with_converter(WriteConverter))
    }

    pub fn doc(&self, document_id: &str) -> CollectionsResult<ConvertedDocumentReference<WriteConverter>> {
        let reference = self
            .collection
            .database()
            .doc(&self.collection.document_path(document_id))?;
        Ok(reference.with_converter(WriteConverter))
    }
}
