//! Typed collections over the document database.
//!
//! A [`Schema`] declares collections, the [`Validator`] each one's documents
//! must pass, and nested sub-collections. [`collections_builder`] turns it
//! into a [`CollectionTree`] of typed [`Collection`]s:
//!
//! ```
//! use firestore_collections::collections::{
//!     collections_builder, CollectionsOptions, Schema, SchemaNode, SerdeValidator,
//! };
//! use firestore_collections::firestore::Firestore;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let schema = Schema::new().collection("users", SchemaNode::new(SerdeValidator::<User>::new()));
//! let tree = collections_builder(&schema, CollectionsOptions::with_database(Firestore::in_memory()))?;
//! let users = tree.collection::<SerdeValidator<User>>("users")?;
//! assert_eq!(users.document_path("u1"), "users/u1");
//! # Ok::<(), firestore_collections::collections::CollectionsError>(())
//! ```

mod builder;
mod collection;
mod converter;
mod error;
mod metadata;
mod options;
mod path;
mod query_spec;
mod schema;
mod single;

pub use builder::{collections_builder, CollectionHandle, CollectionNode, CollectionTree, SubCollections};
pub use collection::{Collection, ReadAccessors, Record, WriteAccessors};
pub use converter::{encode_document, ConverterCache, SchemaConverter, WriteConverter};
pub use error::{CollectionsError, CollectionsErrorCode, CollectionsResult};
pub use metadata::{
    strip_metadata, DocumentRecord, MetadataOptions, CREATE_TIME_FIELD, ID_FIELD, METADATA_FIELDS,
    READ_TIME_FIELD, UPDATE_TIME_FIELD,
};
pub use options::{
    CollectionsOptions, DatabaseFactory, SnapshotTransform, ValidationErrorHandler,
    ValidationFailure,
};
pub use path::{document_path, CollectionPath};
pub use query_spec::{Condition, QuerySpec, WhereClause};
pub use schema::{
    is_reserved_schema_key, validator_fn, FnValidator, Schema, SchemaNode, SerdeValidator,
    Validator, RESERVED_SCHEMA_KEYS,
};
pub use single::SingleDocumentCollection;
