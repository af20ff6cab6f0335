use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Total ordering across value types, following the database's type order:
/// null, booleans, numbers, strings, arrays, maps.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (l, r) in a.iter().zip(b.iter()) {
                match compare_values(l, r) {
                    Ordering::Equal => continue,
                    non_eq => return non_eq,
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            // serde_json maps iterate in key order unless `preserve_order` is enabled.
            let mut left_entries: Vec<_> = a.iter().collect();
            let mut right_entries: Vec<_> = b.iter().collect();
            left_entries.sort_by(|l, r| l.0.cmp(r.0));
            right_entries.sort_by(|l, r| l.0.cmp(r.0));
            for ((lk, lv), (rk, rv)) in left_entries.iter().zip(right_entries.iter()) {
                match lk.cmp(rk).then_with(|| compare_values(lv, rv)) {
                    Ordering::Equal => continue,
                    non_eq => return non_eq,
                }
            }
            left_entries.len().cmp(&right_entries.len())
        }
        _ => type_order(left).cmp(&type_order(right)),
    }
}

/// Equality with numeric normalization, so `1` equals `1.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Ordering::Equal
}

fn type_order(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(left: &Number, right: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return a.cmp(&b);
    }
    let a = left.as_f64().unwrap_or(f64::NAN);
    let b = right.as_f64().unwrap_or(f64::NAN);
    // NaN sorts before every other number.
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orders_across_types() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!([])), Ordering::Less);
        assert_eq!(compare_values(&json!([1]), &json!({})), Ordering::Less);
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(-1.5), &json!(-2)), Ordering::Greater);
    }

    #[test]
    fn arrays_compare_lexicographically() {
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1])), Ordering::Greater);
    }
}
