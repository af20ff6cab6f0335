//! Metadata fields attached to documents read through a collection.
//!
//! The document id and the server timestamps are never part of the
//! validated shape. They are re-attached to every read result and removed
//! from every write.

use std::ops::{Deref, DerefMut};

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::firestore::api::DocumentSnapshot;
use crate::firestore::model::Timestamp;
use crate::firestore::value::DocumentData;

pub const ID_FIELD: &str = "_id";
pub const CREATE_TIME_FIELD: &str = "_createTime";
pub const UPDATE_TIME_FIELD: &str = "_updateTime";
pub const READ_TIME_FIELD: &str = "_readTime";

pub const METADATA_FIELDS: [&str; 4] = [
    ID_FIELD,
    CREATE_TIME_FIELD,
    UPDATE_TIME_FIELD,
    READ_TIME_FIELD,
];

/// Selects the metadata attached to read results.
///
/// The id is included unless explicitly turned off; timestamps only on request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MetadataOptions {
    pub id: bool,
    pub create_time: bool,
    pub update_time: bool,
    pub read_time: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            id: true,
            create_time: false,
            update_time: false,
            read_time: false,
        }
    }
}

impl MetadataOptions {
    /// Id plus every timestamp.
    pub fn all() -> Self {
        Self {
            id: true,
            create_time: true,
            update_time: true,
            read_time: true,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.id = false;
        self
    }

    pub fn with_create_time(mut self) -> Self {
        self.create_time = true;
        self
    }

    pub fn with_update_time(mut self) -> Self {
        self.update_time = true;
        self
    }

    pub fn with_read_time(mut self) -> Self {
        self.read_time = true;
        self
    }
}

/// A validated document together with the metadata requested for it.
///
/// Dereferences to the validated data. Serializes as a single flat map in
/// which metadata keys replace validated fields of the same name.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentRecord<T> {
    pub id: Option<String>,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
    pub read_time: Option<Timestamp>,
    pub data: T,
}

impl<T> DocumentRecord<T> {
    pub(crate) fn from_snapshot(data: T, snapshot: &DocumentSnapshot, options: MetadataOptions) -> Self {
        Self {
            id: options.id.then(|| snapshot.id().to_string()),
            create_time: snapshot.create_time().filter(|_| options.create_time),
            update_time: snapshot.update_time().filter(|_| options.update_time),
            read_time: options.read_time.then(|| snapshot.read_time()),
            data,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DocumentRecord<U> {
        DocumentRecord {
            id: self.id,
            create_time: self.create_time,
            update_time: self.update_time,
            read_time: self.read_time,
            data: f(self.data),
        }
    }
}

impl<T: Serialize> DocumentRecord<T> {
    /// The flat map form of this record.
    pub fn to_document_data(&self) -> serde_json::Result<DocumentData> {
        let mut fields = match serde_json::to_value(&self.data)? {
            Value::Object(fields) => fields,
            Value::Null => DocumentData::new(),
            other => {
                return Err(serde_json::Error::custom(format!(
                    "document data must serialize to a map, got {other}"
                )))
            }
        };
        if let Some(id) = &self.id {
            fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        }
        let timestamps = [
            (CREATE_TIME_FIELD, self.create_time),
            (UPDATE_TIME_FIELD, self.update_time),
            (READ_TIME_FIELD, self.read_time),
        ];
        for (field, time) in timestamps {
            if let Some(time) = time {
                fields.insert(field.to_string(), Value::String(time.to_rfc3339()));
            }
        }
        Ok(fields)
    }
}

impl<T> Deref for DocumentRecord<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for DocumentRecord<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: Serialize> Serialize for DocumentRecord<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = self.to_document_data().map_err(S::Error::custom)?;
        fields.serialize(serializer)
    }
}

/// Removes every metadata key from `data`. Returns how many were present.
pub fn strip_metadata(data: &mut DocumentData) -> usize {
    METADATA_FIELDS
        .iter()
        .filter(|field| data.remove(**field).is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::DocumentKey;
    use serde_json::json;

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot::new(
            DocumentKey::from_string("users/u1").unwrap(),
            DocumentData::new(),
            Timestamp::new(10, 0),
            Timestamp::new(20, 0),
            Timestamp::new(30, 0),
        )
    }

    #[test]
    fn default_options_attach_only_the_id() {
        let record = DocumentRecord::from_snapshot(json!({"name": "Ann"}), &snapshot(), MetadataOptions::default());
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"_id": "u1", "name": "Ann"}));
    }

    #[test]
    fn metadata_wins_over_validated_fields() {
        let options = MetadataOptions::default().with_update_time();
        let record = DocumentRecord::from_snapshot(
            json!({"_id": "other", "_updateTime": "yesterday"}),
            &snapshot(),
            options,
        );
        let fields = record.to_document_data().unwrap();
        assert_eq!(fields.get(ID_FIELD), Some(&json!("u1")));
        assert_eq!(
            fields.get(UPDATE_TIME_FIELD),
            Some(&json!(Timestamp::new(20, 0).to_rfc3339()))
        );
        assert!(!fields.contains_key(CREATE_TIME_FIELD));
    }

    #[test]
    fn scalar_data_does_not_serialize() {
        let record = DocumentRecord::from_snapshot(json!(3), &snapshot(), MetadataOptions::default());
        assert!(record.to_document_data().is_err());
    }

    #[test]
    fn strips_all_metadata_keys() {
        let mut data = match json!({"_id": "u1", "_readTime": "t", "name": "Ann"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(strip_metadata(&mut data), 2);
        assert_eq!(Value::Object(data), json!({"name": "Ann"}));
    }
}
