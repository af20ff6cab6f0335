use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::firestore::value::DocumentData;

use super::snapshot::DocumentSnapshot;

/// Trait describing how to convert between user models and stored documents.
///
/// Writes use `to_firestore`, reads use `from_firestore`. Reads receive the
/// whole snapshot so converters can look at the document id and timestamps,
/// not just the field data. `from_firestore` is only called for snapshots of
/// existing documents.
pub trait FirestoreDataConverter: Send + Sync + 'static {
    /// The strongly typed model associated with this converter.
    type Model;

    /// Error surfaced by conversions. Client errors must convert into it
    /// unchanged so typed operations can report both through one type.
    type Error: From<FirestoreError>;

    /// Encodes the user model into document fields for writes.
    fn to_firestore(&self, value: &Self::Model) -> Result<DocumentData, Self::Error>;

    /// Decodes an existing document into the user model for reads.
    fn from_firestore(&self, snapshot: &DocumentSnapshot) -> Result<Self::Model, Self::Error>;
}

/// Default converter that leaves document fields unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughConverter;

impl FirestoreDataConverter for PassthroughConverter {
    type Model = DocumentData;
    type Error = FirestoreError;

    fn to_firestore(&self, value: &Self::Model) -> FirestoreResult<DocumentData> {
        Ok(value.clone())
    }

    fn from_firestore(&self, snapshot: &DocumentSnapshot) -> FirestoreResult<Self::Model> {
        Ok(snapshot.data().cloned().unwrap_or_default())
    }
}
