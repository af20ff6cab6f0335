//! Declarative description of collections, their validators and nesting.

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::firestore::value::DocumentData;

use super::builder::CollectionNode;
use super::options::CollectionsOptions;
use super::path::CollectionPath;

/// Names a schema node reserves for its own settings. Sub-collections may
/// not use them.
pub const RESERVED_SCHEMA_KEYS: [&str; 5] = [
    "validator",
    "singleDocumentKey",
    "includeDocumentIdForValidation",
    "readOnly",
    "subCollections",
];

pub fn is_reserved_schema_key(name: &str) -> bool {
    RESERVED_SCHEMA_KEYS.contains(&name)
}

/// Parses raw document fields into the collection's typed shape.
pub trait Validator: Send + Sync + 'static {
    type Output: Serialize + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn validate(&self, data: DocumentData) -> Result<Self::Output, Self::Error>;
}

/// Validates by deserializing the fields into `T`.
pub struct SerdeValidator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeValidator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for SerdeValidator<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SerdeValidator<{}>", std::any::type_name::<T>())
    }
}

impl<T> Validator for SerdeValidator<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    type Output = T;
    type Error = serde_json::Error;

    fn validate(&self, data: DocumentData) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(data))
    }
}

/// Validator backed by a closure.
pub struct FnValidator<F, T, E> {
    validate: F,
    _marker: PhantomData<fn() -> (T, E)>,
}

pub fn validator_fn<F, T, E>(validate: F) -> FnValidator<F, T, E>
where
    F: Fn(DocumentData) -> Result<T, E> + Send + Sync + 'static,
{
    FnValidator {
        validate,
        _marker: PhantomData,
    }
}

impl<F, T, E> Validator for FnValidator<F, T, E>
where
    F: Fn(DocumentData) -> Result<T, E> + Send + Sync + 'static,
    T: Serialize + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    fn validate(&self, data: DocumentData) -> Result<T, E> {
        (self.validate)(data)
    }
}

/// Schema node with its validator type erased, so nodes validated by
/// different types can sit side by side in one tree.
pub(crate) trait ErasedSchema: Send + Sync {
    fn single_document_key(&self) -> Option<&str>;

    fn sub_collections(&self) -> &[(String, Arc<dyn ErasedSchema>)];

    fn build_node(&self, path: CollectionPath, options: &CollectionsOptions) -> CollectionNode;
}

/// Describes one collection.
pub struct SchemaNode<V>
where
    V: Validator,
{
    pub(crate) validator: Arc<V>,
    pub(crate) single_document_key: Option<String>,
    pub(crate) include_document_id: bool,
    pub(crate) read_only: bool,
    pub(crate) sub_collections: Vec<(String, Arc<dyn ErasedSchema>)>,
}

impl<V> SchemaNode<V>
where
    V: Validator,
{
    pub fn new(validator: V) -> Self {
        Self {
            validator: Arc::new(validator),
            single_document_key: None,
            include_document_id: false,
            read_only: false,
            sub_collections: Vec::new(),
        }
    }

    /// Marks the collection as holding one document stored under `key`.
    pub fn single_document_key(mut self, key: impl Into<String>) -> Self {
        self.single_document_key = Some(key.into());
        self
    }

    /// Passes the document id to the validator as the `_id` field.
    pub fn include_document_id_for_validation(mut self) -> Self {
        self.include_document_id = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Nests `node` under each document of this collection.
    pub fn sub_collection<W>(mut self, name: impl Into<String>, node: SchemaNode<W>) -> Self
    where
        W: Validator,
    {
        self.sub_collections.push((name.into(), Arc::new(node)));
        self
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn includes_document_id(&self) -> bool {
        self.include_document_id
    }

    pub fn sub_collection_names(&self) -> impl Iterator<Item = &str> {
        self.sub_collections.iter().map(|(name, _)| name.as_str())
    }
}

impl<V> Debug for SchemaNode<V>
where
    V: Validator,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaNode")
            .field("validator", &std::any::type_name::<V>())
            .field("single_document_key", &self.single_document_key)
            .field("include_document_id", &self.include_document_id)
            .field("read_only", &self.read_only)
            .field(
                "sub_collections",
                &self.sub_collection_names().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Root of a schema: the top-level collections by name.
#[derive(Default)]
pub struct Schema {
    pub(crate) collections: Vec<(String, Arc<dyn ErasedSchema>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection<V>(mut self, name: impl Into<String>, node: SchemaNode<V>) -> Self
    where
        V: Validator,
    {
        self.collections.push((name.into(), Arc::new(node)));
        self
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|(name, _)| name.as_str())
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("collections", &self.collection_names().collect::<Vec<_>>())
            .finish()
    }
}
