use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

use super::converter::FirestoreDataConverter;
use super::database::Firestore;
use super::operations::{generate_auto_id, validate_document_id};
use super::query::{ConvertedQuery, Query};

/// Points at a collection: a path with an odd number of segments.
#[derive(Clone, Debug)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "'{path}' is not a collection path: it has {} segments",
                path.len()
            )));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Collection name, the last path segment.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Document owning this collection; `None` for root collections.
    pub fn parent(&self) -> Option<DocumentReference> {
        (self.path.len() >= 3)
            .then(|| DocumentKey::from_path(self.path.without_last()).ok())
            .flatten()
            .map(|key| DocumentReference {
                firestore: self.firestore.clone(),
                key,
            })
    }

    /// Document `document_id` of this collection, or a fresh auto id for `None`.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = match document_id {
            Some(id) => {
                validate_document_id(id)?;
                id.to_string()
            }
            None => generate_auto_id(),
        };
        let key = DocumentKey::from_path(self.path.child([id]))?;
        Ok(DocumentReference {
            firestore: self.firestore.clone(),
            key,
        })
    }

    pub fn query(&self) -> Query {
        Query::for_collection(self.firestore.clone(), self.path.clone())
    }

    pub fn with_converter<C>(&self, converter: C) -> ConvertedCollectionReference<C>
    where
        C: FirestoreDataConverter,
    {
        self.with_shared_converter(Arc::new(converter))
    }

    pub fn with_shared_converter<C>(&self, converter: Arc<C>) -> ConvertedCollectionReference<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedCollectionReference {
            raw: self.clone(),
            converter,
        }
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "collection {}", self.path)
    }
}

/// Points at one document.
#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        Ok(Self {
            firestore,
            key: DocumentKey::from_path(path)?,
        })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }

    /// Sub-collection at `path` below this document, e.g. `posts` or
    /// `posts/p1/comments`.
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let relative = ResourcePath::from_string(path)?;
        CollectionReference::new(
            self.firestore.clone(),
            self.key.path().child(relative.iter().cloned()),
        )
    }

    pub fn with_converter<C>(&self, converter: C) -> ConvertedDocumentReference<C>
    where
        C: FirestoreDataConverter,
    {
        self.with_shared_converter(Arc::new(converter))
    }

    pub fn with_shared_converter<C>(&self, converter: Arc<C>) -> ConvertedDocumentReference<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedDocumentReference {
            raw: self.clone(),
            converter,
        }
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "document {}", self.key.path())
    }
}

/// A collection reference carrying a converter.
///
/// Dereferences to the plain [`CollectionReference`]; `doc` and `query`
/// keep the converter attached.
pub struct ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    raw: CollectionReference,
    converter: Arc<C>,
}

impl<C> ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<ConvertedDocumentReference<C>> {
        Ok(self
            .raw
            .doc(document_id)?
            .with_shared_converter(Arc::clone(&self.converter)))
    }

    pub fn query(&self) -> ConvertedQuery<C> {
        self.raw
            .query()
            .with_shared_converter(Arc::clone(&self.converter))
    }

    pub fn raw(&self) -> &CollectionReference {
        &self.raw
    }

    pub fn converter(&self) -> Arc<C> {
        Arc::clone(&self.converter)
    }
}

impl<C> Clone for ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    fn clone(&self) -> Self {
        self.raw.with_shared_converter(Arc::clone(&self.converter))
    }
}

impl<C> Deref for ConvertedCollectionReference<C>
where
    C: FirestoreDataConverter,
{
    type Target = CollectionReference;

    fn deref(&self) -> &CollectionReference {
        &self.raw
    }
}

/// A document reference carrying a converter. Dereferences to the plain
/// [`DocumentReference`].
pub struct ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    raw: DocumentReference,
    converter: Arc<C>,
}

impl<C> ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    pub fn raw(&self) -> &DocumentReference {
        &self.raw
    }

    pub fn converter(&self) -> Arc<C> {
        Arc::clone(&self.converter)
    }
}

impl<C> Clone for ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    fn clone(&self) -> Self {
        self.raw.with_shared_converter(Arc::clone(&self.converter))
    }
}

impl<C> Deref for ConvertedDocumentReference<C>
where
    C: FirestoreDataConverter,
{
    type Target = DocumentReference;

    fn deref(&self) -> &DocumentReference {
        &self.raw
    }
}
