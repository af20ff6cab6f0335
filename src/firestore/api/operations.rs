use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde_json::Value;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{FieldPath, Timestamp};
use crate::firestore::value::{set_value_at_field_path, DocumentData};

const AUTO_ID_LENGTH: usize = 20;

/// Options that configure the behaviour of `set_doc` writes.
#[derive(Clone, Debug, Default)]
pub struct SetOptions {
    /// When `true`, the provided data is merged into the existing document.
    pub merge: bool,
    /// Explicit field mask that should be merged. When set, this takes
    /// precedence over the `merge` flag.
    pub merge_fields: Option<Vec<FieldPath>>,
}

impl SetOptions {
    /// Builds set options that merge every field present in the provided data.
    pub fn merge_all() -> Self {
        Self {
            merge: true,
            merge_fields: None,
        }
    }

    /// Builds set options that merge only the specified field paths.
    pub fn merge_fields<I>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = FieldPath>,
    {
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        for field in fields {
            if seen.insert(field.canonical_string()) {
                unique.push(field);
            }
        }
        if unique.is_empty() {
            return Err(invalid_argument(
                "merge_fields requires at least one field path",
            ));
        }
        Ok(Self {
            merge: false,
            merge_fields: Some(unique),
        })
    }

    /// Indicates whether the write should behave like a merge.
    pub fn is_merge(&self) -> bool {
        self.merge || self.merge_fields.is_some()
    }
}

/// Condition the backend checks before applying a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// The document must (or must not) exist.
    Exists(bool),
    /// The document must exist and have been last updated at exactly this time.
    UpdateTime(Timestamp),
}

/// Outcome of a committed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteResult {
    pub write_time: Timestamp,
}

/// Set data after field-mask resolution.
#[derive(Clone, Debug)]
pub struct EncodedSetData {
    pub data: DocumentData,
    pub mask: Option<Vec<FieldPath>>,
}

/// Update data expanded from dotted keys into nested maps plus the touched paths.
#[derive(Clone, Debug)]
pub struct EncodedUpdateData {
    pub data: DocumentData,
    pub field_paths: Vec<FieldPath>,
}

pub fn encode_set_data(data: DocumentData, options: &SetOptions) -> FirestoreResult<EncodedSetData> {
    let available = collect_leaf_paths(&data);
    let mask = if let Some(mask) = options.merge_fields.as_ref() {
        let available: HashSet<String> = available.iter().map(FieldPath::canonical_string).collect();
        for field in mask {
            if !available.contains(&field.canonical_string())
                && !is_parent_of_any(field, &available)
            {
                return Err(invalid_argument(format!(
                    "Field '{field}' is specified in merge_fields but missing from the provided data"
                )));
            }
        }
        Some(mask.clone())
    } else if options.merge {
        Some(available)
    } else {
        None
    };
    Ok(EncodedSetData { data, mask })
}

pub fn encode_update_data(data: DocumentData) -> FirestoreResult<EncodedUpdateData> {
    if data.is_empty() {
        return Err(invalid_argument(
            "update_doc requires at least one field/value pair",
        ));
    }
    let mut nested = DocumentData::new();
    let mut field_paths = Vec::with_capacity(data.len());
    for (key, value) in data {
        let path = FieldPath::from_dot_separated(&key)?;
        set_value_at_field_path(&mut nested, &path, value);
        field_paths.push(path);
    }
    Ok(EncodedUpdateData {
        data: nested,
        field_paths,
    })
}

pub fn validate_document_id(id: &str) -> FirestoreResult<()> {
    if id.is_empty() {
        return Err(invalid_argument("Document ID cannot be empty."));
    }
    if id.contains('/') {
        return Err(invalid_argument(format!(
            "Document ID '{id}' cannot contain '/'."
        )));
    }
    if id == "." || id == ".." {
        return Err(invalid_argument(format!("Document ID '{id}' is reserved.")));
    }
    Ok(())
}

pub fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

fn collect_leaf_paths(data: &DocumentData) -> Vec<FieldPath> {
    let mut paths = Vec::new();
    collect_leaf_paths_into(data, &mut Vec::new(), &mut paths);
    paths
}

fn collect_leaf_paths_into(data: &DocumentData, parent: &mut Vec<String>, out: &mut Vec<FieldPath>) {
    for (key, value) in data {
        parent.push(key.clone());
        match value {
            Value::Object(map) if !map.is_empty() => collect_leaf_paths_into(map, parent, out),
            _ => {
                if let Ok(path) = FieldPath::new(parent.iter().cloned()) {
                    out.push(path);
                }
            }
        }
        parent.pop();
    }
}

fn is_parent_of_any(field: &FieldPath, available: &HashSet<String>) -> bool {
    let prefix = format!("{}.", field.canonical_string());
    available.iter().any(|path| path.starts_with(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_collects_leaf_paths() {
        let encoded = encode_set_data(
            data(json!({"name": "Ann", "address": {"city": "Paris"}})),
            &SetOptions::merge_all(),
        )
        .unwrap();
        let mask: Vec<String> = encoded
            .mask
            .unwrap()
            .iter()
            .map(FieldPath::canonical_string)
            .collect();
        assert_eq!(mask, vec!["address.city", "name"]);
    }

    #[test]
    fn merge_fields_must_exist_in_data() {
        let options =
            SetOptions::merge_fields([FieldPath::from_dot_separated("age").unwrap()]).unwrap();
        let err = encode_set_data(data(json!({"name": "Ann"})), &options).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");

        let options =
            SetOptions::merge_fields([FieldPath::from_dot_separated("address").unwrap()]).unwrap();
        assert!(encode_set_data(data(json!({"address": {"city": "Paris"}})), &options).is_ok());
    }

    #[test]
    fn update_expands_dotted_keys() {
        let encoded = encode_update_data(data(json!({"address.city": "Lyon", "age": 31}))).unwrap();
        assert_eq!(
            Value::Object(encoded.data),
            json!({"address": {"city": "Lyon"}, "age": 31})
        );
        assert_eq!(encoded.field_paths.len(), 2);
    }

    #[test]
    fn update_rejects_empty_data() {
        assert!(encode_update_data(DocumentData::new()).is_err());
    }

    #[test]
    fn document_ids_are_validated() {
        assert!(validate_document_id("u1").is_ok());
        assert!(validate_document_id("").is_err());
        assert!(validate_document_id("a/b").is_err());
        assert!(validate_document_id("..").is_err());
        assert_eq!(generate_auto_id().len(), AUTO_ID_LENGTH);
    }
}
