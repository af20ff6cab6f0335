//! Document field data and the helpers the datastore needs to work with it.

mod compare;
mod field_access;

pub use compare::{compare_values, values_equal};
pub use field_access::{deep_merge, remove_value_at_field_path, set_value_at_field_path, value_for_field_path};
pub use serde_json::Value;

/// Field data of a single document.
pub type DocumentData = serde_json::Map<String, Value>;
