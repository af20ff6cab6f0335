//! Schema-validated, typed collections for a Firestore-style document database.
//!
//! * [`firestore`] is the client surface: references, immutable queries,
//!   snapshots, data converters and write preconditions over a pluggable
//!   [`firestore::remote::Datastore`] (an in-memory backend is included).
//! * [`collections`] maps a declarative [`collections::Schema`] onto that
//!   client, validating every document read and stripping metadata from
//!   every write.
//! * [`logger`] holds the named loggers each component writes through.

pub mod collections;
pub mod firestore;
pub mod logger;

pub use collections::{
    collections_builder, Collection, CollectionTree, CollectionsError, CollectionsOptions,
    CollectionsResult, DocumentRecord, MetadataOptions, QuerySpec, Schema, SchemaNode,
    SerdeValidator, SingleDocumentCollection, Validator,
};
pub use firestore::Firestore;
