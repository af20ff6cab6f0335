use serde_json::Value;

use crate::firestore::model::FieldPath;

use super::DocumentData;

pub fn value_for_field_path<'a>(data: &'a DocumentData, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes `value` at `path`, creating (or replacing non-map) intermediate maps.
pub fn set_value_at_field_path(data: &mut DocumentData, path: &FieldPath, value: Value) {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = data;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(DocumentData::new()));
        if !entry.is_object() {
            *entry = Value::Object(DocumentData::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

pub fn remove_value_at_field_path(data: &mut DocumentData, path: &FieldPath) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = data;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    current.remove(last)
}

/// Merges `incoming` into `target`; nested maps merge recursively, every other value replaces.
pub fn deep_merge(target: &mut DocumentData, incoming: DocumentData) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
