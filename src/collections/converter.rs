use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, LazyLock, Mutex};

use serde_json::Value;

use crate::firestore::api::{DocumentSnapshot, FirestoreDataConverter};
use crate::firestore::value::DocumentData;
use crate::logger::Logger;

use super::error::{invalid_argument, validation_error, CollectionsError, CollectionsResult};
use super::metadata::{strip_metadata, DocumentRecord, MetadataOptions, ID_FIELD};
use super::options::{CollectionsOptions, SnapshotTransform, ValidationErrorHandler, ValidationFailure};
use super::schema::Validator;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firestore-collections/converter"));

/// Read converter: validates stored documents and attaches metadata.
///
/// Writing through it serializes the validated data and drops metadata.
pub struct SchemaConverter<V>
where
    V: Validator,
{
    validator: Arc<V>,
    include_document_id: bool,
    metadata: MetadataOptions,
    validation_error_handler: Option<ValidationErrorHandler>,
    snapshot_transform: Option<SnapshotTransform>,
}

impl<V> SchemaConverter<V>
where
    V: Validator,
{
    pub fn new(validator: Arc<V>, include_document_id: bool, metadata: MetadataOptions) -> Self {
        Self {
            validator,
            include_document_id,
            metadata,
            validation_error_handler: None,
            snapshot_transform: None,
        }
    }

    /// Picks up the validation error handler and snapshot transform from `options`.
    pub fn with_options(mut self, options: &CollectionsOptions) -> Self {
        self.validation_error_handler = options.validation_error_handler().cloned();
        self.snapshot_transform = options.snapshot_transform().cloned();
        self
    }

    pub fn metadata(&self) -> MetadataOptions {
        self.metadata
    }

    fn raw_data(&self, snapshot: &DocumentSnapshot) -> DocumentData {
        let mut data = match &self.snapshot_transform {
            Some(transform) => transform(snapshot),
            None => snapshot.data().cloned().unwrap_or_default(),
        };
        if self.include_document_id {
            data.insert(ID_FIELD.to_string(), Value::String(snapshot.id().to_string()));
        }
        data
    }

    fn validation_failed(&self, snapshot: &DocumentSnapshot, error: V::Error) -> CollectionsError {
        let path = snapshot.path().canonical_string();
        let error: Arc<dyn Error + Send + Sync> = Arc::new(error);
        match &self.validation_error_handler {
            Some(handler) => {
                let substituted = handler(ValidationFailure::new(
                    path.clone(),
                    snapshot.id(),
                    error,
                ));
                LOGGER.warn(format!(
                    "Validation of '{path}' failed; handler reported: {substituted}"
                ));
                substituted
            }
            None => validation_error(&path, error),
        }
    }
}

impl<V> FirestoreDataConverter for SchemaConverter<V>
where
    V: Validator,
{
    type Model = DocumentRecord<V::Output>;
    type Error = CollectionsError;

    fn to_firestore(&self, value: &Self::Model) -> CollectionsResult<DocumentData> {
        encode_document(&value.data)
    }

    fn from_firestore(&self, snapshot: &DocumentSnapshot) -> CollectionsResult<Self::Model> {
        let data = self
            .validator
            .validate(self.raw_data(snapshot))
            .map_err(|error| self.validation_failed(snapshot, error))?;
        Ok(DocumentRecord::from_snapshot(data, snapshot, self.metadata))
    }
}

/// Write converter: strips metadata keys and performs no validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteConverter;

impl FirestoreDataConverter for WriteConverter {
    type Model = Value;
    type Error = CollectionsError;

    fn to_firestore(&self, value: &Value) -> CollectionsResult<DocumentData> {
        match value {
            Value::Object(fields) => {
                let mut fields = fields.clone();
                strip_metadata(&mut fields);
                Ok(fields)
            }
            other => Err(invalid_argument(format!(
                "Documents must be maps, got {other}"
            ))),
        }
    }

    fn from_firestore(&self, snapshot: &DocumentSnapshot) -> CollectionsResult<Value> {
        Ok(Value::Object(snapshot.data().cloned().unwrap_or_default()))
    }
}

/// Serializes `value` into document fields without metadata.
pub fn encode_document<T>(value: &T) -> CollectionsResult<DocumentData>
where
    T: serde::Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|err| {
        invalid_argument(format!("Failed to serialize document: {err}"))
            .with_source(Arc::new(err) as Arc<dyn Error + Send + Sync>)
    })?;
    WriteConverter.to_firestore(&value)
}

/// Read converters of one collection, one per distinct [`MetadataOptions`].
pub struct ConverterCache<V>
where
    V: Validator,
{
    validator: Arc<V>,
    include_document_id: bool,
    options: CollectionsOptions,
    converters: Mutex<HashMap<MetadataOptions, Arc<SchemaConverter<V>>>>,
}

impl<V> ConverterCache<V>
where
    V: Validator,
{
    pub fn new(validator: Arc<V>, include_document_id: bool, options: CollectionsOptions) -> Self {
        Self {
            validator,
            include_document_id,
            options,
            converters: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, metadata: MetadataOptions) -> Arc<SchemaConverter<V>> {
        let mut converters = match self.converters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(converters.entry(metadata).or_insert_with(|| {
            LOGGER.debug(format!("Building read converter for {metadata:?}"));
            Arc::new(
                SchemaConverter::new(
                    Arc::clone(&self.validator),
                    self.include_document_id,
                    metadata,
                )
                .with_options(&self.options),
            )
        }))
    }

    pub fn len(&self) -> usize {
        match self.converters.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
