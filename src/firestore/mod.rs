//! Document database client surface: references, queries, snapshots,
//! converters and the pluggable [`remote::datastore::Datastore`] backend.

pub mod api;
pub mod error;
pub mod model;
mod query_evaluator;
pub mod remote;
pub mod value;

pub use api::{
    CollectionReference, DocumentReference, DocumentSnapshot, Filter, FilterOperator, Firestore,
    FirestoreDataConverter, OrderDirection, Precondition, Query, QueryConstraint, SetOptions,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{FieldPath, Timestamp};
pub use value::DocumentData;
