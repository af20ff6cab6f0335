mod converter;
mod database;
pub(crate) mod operations;
pub(crate) mod query;
mod reference;
mod snapshot;

pub use converter::{FirestoreDataConverter, PassthroughConverter};
pub use database::Firestore;
pub use operations::{Precondition, SetOptions, WriteResult};
pub use query::{
    Bound, ConvertedQuery, FieldFilter, Filter, FilterOperator, LimitType, OrderBy,
    OrderDirection, Query, QueryConstraint, QueryDefinition, QuerySnapshot, QueryTarget,
    TypedQuerySnapshot,
};
pub use reference::{
    CollectionReference, ConvertedCollectionReference, ConvertedDocumentReference,
    DocumentReference,
};
pub use snapshot::{DocumentSnapshot, TypedDocumentSnapshot};
