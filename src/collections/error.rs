use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::firestore::error::{FirestoreError, FirestoreErrorCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionsErrorCode {
    /// A stored document failed schema validation.
    Validation,
    /// A `*_or_throw` lookup found nothing.
    DocumentNotFound,
    /// A unique lookup matched more than one document.
    MultipleResults,
    InvalidSchema,
    ReadOnly,
    InvalidArgument,
    /// Error reported by the database client, passed through as-is.
    Firestore(FirestoreErrorCode),
}

impl CollectionsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionsErrorCode::Validation => "collections/validation",
            CollectionsErrorCode::DocumentNotFound => "collections/document-not-found",
            CollectionsErrorCode::MultipleResults => "collections/multiple-results",
            CollectionsErrorCode::InvalidSchema => "collections/invalid-schema",
            CollectionsErrorCode::ReadOnly => "collections/read-only",
            CollectionsErrorCode::InvalidArgument => "collections/invalid-argument",
            CollectionsErrorCode::Firestore(code) => code.as_str(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CollectionsError {
    pub code: CollectionsErrorCode,
    message: String,
    source: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl CollectionsError {
    pub fn new(code: CollectionsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<Arc<dyn Error + Send + Sync + 'static>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The client error this error wraps, if it came from the database client.
    pub fn firestore_error(&self) -> Option<&FirestoreError> {
        self.source.as_deref()?.downcast_ref::<FirestoreError>()
    }
}

impl Display for CollectionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for CollectionsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

impl From<FirestoreError> for CollectionsError {
    fn from(error: FirestoreError) -> Self {
        CollectionsError::new(CollectionsErrorCode::Firestore(error.code), error.message())
            .with_source(Arc::new(error) as Arc<dyn Error + Send + Sync>)
    }
}

pub type CollectionsResult<T> = Result<T, CollectionsError>;

pub fn validation_error(
    document_path: &str,
    source: Arc<dyn Error + Send + Sync + 'static>,
) -> CollectionsError {
    CollectionsError::new(
        CollectionsErrorCode::Validation,
        format!("Document '{document_path}' failed validation: {source}"),
    )
    .with_source(source)
}

pub fn document_not_found(message: impl Into<String>) -> CollectionsError {
    CollectionsError::new(CollectionsErrorCode::DocumentNotFound, message)
}

pub fn multiple_results(query_name: &str, count: usize) -> CollectionsError {
    CollectionsError::new(
        CollectionsErrorCode::MultipleResults,
        format!("Query '{query_name}' expected a unique result but matched {count} documents"),
    )
}

pub fn invalid_schema(message: impl Into<String>) -> CollectionsError {
    CollectionsError::new(CollectionsErrorCode::InvalidSchema, message)
}

pub fn read_only(collection_path: &str) -> CollectionsError {
    CollectionsError::new(
        CollectionsErrorCode::ReadOnly,
        format!("Collection '{collection_path}' holds read-only documents"),
    )
}

pub fn invalid_argument(message: impl Into<String>) -> CollectionsError {
    CollectionsError::new(CollectionsErrorCode::InvalidArgument, message)
}
