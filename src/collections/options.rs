use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::firestore::api::DocumentSnapshot;
use crate::firestore::value::DocumentData;
use crate::firestore::Firestore;

use super::error::CollectionsError;

/// Returns the database handle an operation runs against.
pub type DatabaseFactory = Arc<dyn Fn() -> Firestore + Send + Sync>;

/// Turns a failed validation into the error reported to the caller.
pub type ValidationErrorHandler = Arc<dyn Fn(ValidationFailure) -> CollectionsError + Send + Sync>;

/// Produces the raw field data handed to the validator.
pub type SnapshotTransform = Arc<dyn Fn(&DocumentSnapshot) -> DocumentData + Send + Sync>;

/// A document that did not pass its schema validator.
#[derive(Clone, Debug)]
pub struct ValidationFailure {
    document_path: String,
    document_id: String,
    error: Arc<dyn Error + Send + Sync + 'static>,
}

impl ValidationFailure {
    pub(crate) fn new(
        document_path: impl Into<String>,
        document_id: impl Into<String>,
        error: Arc<dyn Error + Send + Sync + 'static>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            document_id: document_id.into(),
            error,
        }
    }

    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// The error returned by the validator.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    pub fn into_error(self) -> Arc<dyn Error + Send + Sync + 'static> {
        self.error
    }
}

/// Settings shared by every collection produced by
/// [`collections_builder`](super::collections_builder).
#[derive(Clone)]
pub struct CollectionsOptions {
    database: DatabaseFactory,
    validation_error_handler: Option<ValidationErrorHandler>,
    snapshot_transform: Option<SnapshotTransform>,
}

impl CollectionsOptions {
    /// Options resolving the database through `factory` on every operation.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Firestore + Send + Sync + 'static,
    {
        Self {
            database: Arc::new(factory),
            validation_error_handler: None,
            snapshot_transform: None,
        }
    }

    /// Options bound to a single database handle.
    pub fn with_database(firestore: Firestore) -> Self {
        Self::new(move || firestore.clone())
    }

    pub fn with_validation_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ValidationFailure) -> CollectionsError + Send + Sync + 'static,
    {
        self.validation_error_handler = Some(Arc::new(handler));
        self
    }

    /// Runs `transform` on each snapshot before validation instead of
    /// reading the snapshot's fields directly.
    pub fn with_snapshot_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&DocumentSnapshot) -> DocumentData + Send + Sync + 'static,
    {
        self.snapshot_transform = Some(Arc::new(transform));
        self
    }

    pub fn database(&self) -> Firestore {
        (self.database)()
    }

    pub fn validation_error_handler(&self) -> Option<&ValidationErrorHandler> {
        self.validation_error_handler.as_ref()
    }

    pub fn snapshot_transform(&self) -> Option<&SnapshotTransform> {
        self.snapshot_transform.as_ref()
    }
}

impl Debug for CollectionsOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionsOptions")
            .field(
                "validation_error_handler",
                &self.validation_error_handler.is_some(),
            )
            .field("snapshot_transform", &self.snapshot_transform.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn factory_runs_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let options = CollectionsOptions::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Firestore::in_memory()
        });
        options.database();
        options.database();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_hides_closures() {
        let options = CollectionsOptions::with_database(Firestore::in_memory())
            .with_snapshot_transform(|snapshot| snapshot.data().cloned().unwrap_or_default());
        let rendered = format!("{options:?}");
        assert!(rendered.contains("snapshot_transform: true"));
        assert!(rendered.contains("validation_error_handler: false"));
    }
}
