use std::sync::Arc;

use crate::firestore::model::{DocumentKey, ResourcePath, Timestamp};
use crate::firestore::value::DocumentData;

use super::converter::FirestoreDataConverter;

#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<DocumentData>,
    create_time: Option<Timestamp>,
    update_time: Option<Timestamp>,
    read_time: Timestamp,
}

impl DocumentSnapshot {
    /// Snapshot of an existing document.
    pub fn new(
        key: DocumentKey,
        data: DocumentData,
        create_time: Timestamp,
        update_time: Timestamp,
        read_time: Timestamp,
    ) -> Self {
        Self {
            key,
            data: Some(data),
            create_time: Some(create_time),
            update_time: Some(update_time),
            read_time,
        }
    }

    /// Snapshot reporting that no document exists at `key`.
    pub fn missing(key: DocumentKey, read_time: Timestamp) -> Self {
        Self {
            key,
            data: None,
            create_time: None,
            update_time: None,
            read_time,
        }
    }

    /// Returns whether the document exists on the backend.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the document fields if the snapshot contains data.
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn create_time(&self) -> Option<Timestamp> {
        self.create_time
    }

    pub fn update_time(&self) -> Option<Timestamp> {
        self.update_time
    }

    pub fn read_time(&self) -> Timestamp {
        self.read_time
    }

    pub fn into_typed<C>(self, converter: Arc<C>) -> TypedDocumentSnapshot<C>
    where
        C: FirestoreDataConverter,
    {
        TypedDocumentSnapshot::new(self, converter)
    }
}

/// Document snapshot that decodes its data through a converter on demand.
pub struct TypedDocumentSnapshot<C>
where
    C: FirestoreDataConverter,
{
    base: DocumentSnapshot,
    converter: Arc<C>,
}

impl<C> Clone for TypedDocumentSnapshot<C>
where
    C: FirestoreDataConverter,
{
    fn clone(&self) -> Self {
        Self::new(self.base.clone(), Arc::clone(&self.converter))
    }
}

impl<C> TypedDocumentSnapshot<C>
where
    C: FirestoreDataConverter,
{
    pub(crate) fn new(base: DocumentSnapshot, converter: Arc<C>) -> Self {
        Self { base, converter }
    }

    /// Runs the converter; `Ok(None)` when the document does not exist.
    pub fn data(&self) -> Result<Option<C::Model>, C::Error> {
        if !self.base.exists() {
            return Ok(None);
        }
        self.converter.from_firestore(&self.base).map(Some)
    }

    pub fn exists(&self) -> bool {
        self.base.exists()
    }

    pub fn id(&self) -> &str {
        self.base.id()
    }

    pub fn raw(&self) -> &DocumentSnapshot {
        &self.base
    }

    pub fn into_raw(self) -> DocumentSnapshot {
        self.base
    }
}
