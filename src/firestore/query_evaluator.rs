use std::cmp::Ordering;

use serde_json::Value;

use crate::firestore::api::{
    Bound, DocumentSnapshot, FieldFilter, Filter, FilterOperator, LimitType, OrderBy,
    OrderDirection, QueryDefinition,
};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::FieldPath;
use crate::firestore::value::{compare_values, value_for_field_path, values_equal};

/// Applies the provided query definition to a set of candidate documents and returns
/// the filtered, ordered, and bounded result set.
///
/// Documents are ordered by the explicit `order_by` clauses followed by the
/// document name. Documents missing a field used in `order_by` are excluded.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> FirestoreResult<Vec<DocumentSnapshot>> {
    let order_by = effective_order_by(definition);
    validate_bound(definition.start_at(), &order_by)?;
    validate_bound(definition.end_at(), &order_by)?;

    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| snapshot.exists())
        .filter(|snapshot| definition.matches_target(snapshot.document_key()))
        .filter(|snapshot| has_order_by_fields(snapshot, definition.order_by()))
        .filter(|snapshot| {
            definition
                .filters()
                .iter()
                .all(|filter| document_satisfies_filter(snapshot, filter))
        })
        .collect();

    filtered.sort_by(|left, right| compare_snapshots(left, right, &order_by));

    if let Some(bound) = definition.start_at() {
        filtered.retain(|snapshot| !is_before_start_bound(snapshot, bound, &order_by));
    }

    if let Some(bound) = definition.end_at() {
        filtered.retain(|snapshot| !is_after_end_bound(snapshot, bound, &order_by));
    }

    let offset = definition.offset().unwrap_or(0) as usize;
    match definition.limit_type() {
        LimitType::First => {
            filtered.drain(0..offset.min(filtered.len()));
            if let Some(limit) = definition.limit() {
                filtered.truncate(limit as usize);
            }
        }
        LimitType::Last => {
            let keep = filtered.len().saturating_sub(offset);
            filtered.truncate(keep);
            if let Some(limit) = definition.limit() {
                let limit = limit as usize;
                if filtered.len() > limit {
                    let start = filtered.len() - limit;
                    filtered.drain(0..start);
                }
            }
        }
    }

    Ok(filtered)
}

fn effective_order_by(definition: &QueryDefinition) -> Vec<OrderBy> {
    let mut order_by = definition.order_by().to_vec();
    if !order_by.iter().any(|order| order.field().is_document_id()) {
        let direction = order_by
            .last()
            .map(OrderBy::direction)
            .unwrap_or(OrderDirection::Ascending);
        order_by.push(OrderBy::new(FieldPath::document_id(), direction));
    }
    order_by
}

fn validate_bound(bound: Option<&Bound>, order_by: &[OrderBy]) -> FirestoreResult<()> {
    match bound {
        Some(bound) if bound.values().len() > order_by.len() => Err(invalid_argument(format!(
            "Too many arguments provided to a query cursor: {} values for {} order_by clauses",
            bound.values().len(),
            order_by.len()
        ))),
        _ => Ok(()),
    }
}

fn has_order_by_fields(snapshot: &DocumentSnapshot, order_by: &[OrderBy]) -> bool {
    order_by
        .iter()
        .all(|order| get_field_value(snapshot, order.field()).is_some())
}

fn document_satisfies_filter(snapshot: &DocumentSnapshot, filter: &Filter) -> bool {
    match filter {
        Filter::Field(field_filter) => match get_field_value(snapshot, field_filter.field()) {
            Some(value) => evaluate_filter(field_filter, &value),
            None => false,
        },
        Filter::And(filters) => filters
            .iter()
            .all(|filter| document_satisfies_filter(snapshot, filter)),
        Filter::Or(filters) => filters
            .iter()
            .any(|filter| document_satisfies_filter(snapshot, filter)),
    }
}

fn evaluate_filter(filter: &FieldFilter, value: &Value) -> bool {
    let operand = filter.value();
    match filter.operator() {
        FilterOperator::Equal => values_equal(value, operand),
        FilterOperator::NotEqual => !value.is_null() && !values_equal(value, operand),
        FilterOperator::LessThan => same_type(value, operand) && compare_values(value, operand) == Ordering::Less,
        FilterOperator::LessThanOrEqual => {
            same_type(value, operand) && compare_values(value, operand) != Ordering::Greater
        }
        FilterOperator::GreaterThan => {
            same_type(value, operand) && compare_values(value, operand) == Ordering::Greater
        }
        FilterOperator::GreaterThanOrEqual => {
            same_type(value, operand) && compare_values(value, operand) != Ordering::Less
        }
        FilterOperator::ArrayContains => match value {
            Value::Array(values) => values.iter().any(|candidate| values_equal(candidate, operand)),
            _ => false,
        },
        FilterOperator::ArrayContainsAny => match (value, operand) {
            (Value::Array(values), Value::Array(needles)) => needles
                .iter()
                .any(|needle| values.iter().any(|candidate| values_equal(candidate, needle))),
            _ => false,
        },
        FilterOperator::In => match operand {
            Value::Array(needles) => needles.iter().any(|needle| values_equal(value, needle)),
            _ => false,
        },
        FilterOperator::NotIn => match operand {
            Value::Array(needles) => {
                !value.is_null() && needles.iter().all(|needle| !values_equal(value, needle))
            }
            _ => false,
        },
    }
}

/// Range comparisons only match values of the same type.
fn same_type(left: &Value, right: &Value) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right)
}

fn get_field_value(snapshot: &DocumentSnapshot, field: &FieldPath) -> Option<Value> {
    if field.is_document_id() {
        return Some(Value::String(snapshot.path().canonical_string()));
    }
    value_for_field_path(snapshot.data()?, field).cloned()
}

fn compare_snapshots(left: &DocumentSnapshot, right: &DocumentSnapshot, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let left_value = get_field_value(left, order.field()).unwrap_or(Value::Null);
        let right_value = get_field_value(right, order.field()).unwrap_or(Value::Null);

        let mut ordering = compare_values(&left_value, &right_value);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn is_before_start_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> bool {
    let ordering = compare_snapshot_to_bound(snapshot, bound, order_by);
    if bound.inclusive() {
        ordering == Ordering::Less
    } else {
        ordering != Ordering::Greater
    }
}

fn is_after_end_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> bool {
    let ordering = compare_snapshot_to_bound(snapshot, bound, order_by);
    if bound.inclusive() {
        ordering == Ordering::Greater
    } else {
        ordering != Ordering::Less
    }
}

fn compare_snapshot_to_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> Ordering {
    for (order, bound_value) in order_by.iter().zip(bound.values()) {
        let snapshot_value = get_field_value(snapshot, order.field()).unwrap_or(Value::Null);
        let bound_value = if order.field().is_document_id() {
            document_name_bound(snapshot, bound_value)
        } else {
            bound_value.clone()
        };

        let mut ordering = compare_values(&snapshot_value, &bound_value);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A bare document id in a `__name__` cursor is resolved against the snapshot's collection.
fn document_name_bound(snapshot: &DocumentSnapshot, value: &Value) -> Value {
    match value {
        Value::String(id) if !id.contains('/') => Value::String(format!(
            "{}/{}",
            snapshot.document_key().collection_path(),
            id
        )),
        other => other.clone(),
    }
}
