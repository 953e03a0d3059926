//! Filter evaluation and update application over JSON records
//!
//! Supports the subset of the document query language the services use:
//! dotted field paths, `$eq $ne $gt $gte $lt $lte $in $nin $exists`,
//! top-level `$and`/`$or`, and the `$set $unset $inc $push` modifiers.

use std::cmp::Ordering;

use database::{Record, StoreError, ID_FIELD};
use serde_json::{Map, Number, Value};

/// Value at a dotted path such as `address.city`
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Does `record` satisfy `filter`?
pub fn matches(record: &Record, filter: &Map<String, Value>) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for branch in branches(key, condition)? {
                    if !matches(record, branch)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for branch in branches(key, condition)? {
                    if matches(record, branch)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top level operator: {}",
                    op
                )))
            }
            path => matches_condition(lookup(record, path), condition)?,
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn branches<'a>(op: &str, condition: &'a Value) -> Result<Vec<&'a Map<String, Value>>, StoreError> {
    let items = condition
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| StoreError::InvalidFilter(format!("{} must be a nonempty array", op)))?;

    items
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| {
                StoreError::InvalidFilter(format!("{} entries must be objects", op))
            })
        })
        .collect()
}

fn is_operator_object(condition: &Value) -> bool {
    match condition {
        Value::Object(ops) => !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    let ops = match condition {
        Value::Object(ops) if is_operator_object(condition) => ops,
        _ => return Ok(field_equals(actual, condition)),
    };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => field_equals(actual, arg),
            "$ne" => !field_equals(actual, arg),
            "$gt" => compares(actual, arg, |o| o == Ordering::Greater),
            "$gte" => compares(actual, arg, |o| o != Ordering::Less),
            "$lt" => compares(actual, arg, |o| o == Ordering::Less),
            "$lte" => compares(actual, arg, |o| o != Ordering::Greater),
            "$in" => in_list(op, actual, arg)?,
            "$nin" => !in_list(op, actual, arg)?,
            "$exists" => {
                let wanted = arg.as_bool().ok_or_else(|| {
                    StoreError::InvalidFilter("$exists expects a boolean".to_string())
                })?;
                actual.is_some() == wanted
            }
            other => {
                return Err(StoreError::InvalidFilter(format!("unknown operator: {}", other)))
            }
        };

        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn in_list(op: &str, actual: Option<&Value>, arg: &Value) -> Result<bool, StoreError> {
    let candidates = arg
        .as_array()
        .ok_or_else(|| StoreError::InvalidFilter(format!("{} needs an array", op)))?;
    Ok(candidates.iter().any(|c| field_equals(actual, c)))
}

/// Equality with array fields matching any element, and a missing field
/// matching `null`
fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

/// Value equality where numbers compare numerically (`1 == 1.0`)
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compares(actual: Option<&Value>, arg: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|value| compare(value, arg))
        .map(accept)
        .unwrap_or(false)
}

/// Ordering between values of the same kind; mixed kinds never compare
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Apply an update document to `record` in place.
///
/// On error the record may be partially modified; callers apply to a copy.
pub fn apply_update(record: &mut Record, update: &Map<String, Value>) -> Result<(), StoreError> {
    for (op, fields) in update {
        let fields = fields.as_object().ok_or_else(|| {
            StoreError::InvalidUpdate(format!("modifier {} expects an object", op))
        })?;

        for (path, value) in fields {
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err(StoreError::InvalidUpdate(format!(
                    "performing an update on the path '{}' would modify the immutable field '{}'",
                    path, ID_FIELD
                )));
            }

            match op.as_str() {
                "$set" => set_path(record, path, value.clone())?,
                "$unset" => {
                    remove_path(record, path);
                }
                "$inc" => {
                    let by = match value {
                        Value::Number(by) => by,
                        _ => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "cannot increment with non-numeric argument for '{}'",
                                path
                            )))
                        }
                    };
                    let next = match lookup(record, path) {
                        None => Value::Number(by.clone()),
                        Some(Value::Number(current)) => add_numbers(current, by)?,
                        Some(_) => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "cannot apply $inc to a value of non-numeric type at '{}'",
                                path
                            )))
                        }
                    };
                    set_path(record, path, next)?;
                }
                "$push" => {
                    let next = match lookup(record, path) {
                        None => Value::Array(vec![value.clone()]),
                        Some(Value::Array(items)) => {
                            let mut items = items.clone();
                            items.push(value.clone());
                            Value::Array(items)
                        }
                        Some(_) => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "the field '{}' must be an array",
                                path
                            )))
                        }
                    };
                    set_path(record, path, next)?;
                }
                other => {
                    return Err(StoreError::InvalidUpdate(format!("unknown modifier: {}", other)))
                }
            }
        }
    }
    Ok(())
}

fn add_numbers(a: &Number, b: &Number) -> Result<Value, StoreError> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(Value::from(sum));
        }
    }

    let sum = a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| StoreError::InvalidUpdate("$inc produced a non-finite number".to_string()))
}

fn set_path(record: &mut Record, path: &str, value: Value) -> Result<(), StoreError> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidUpdate(format!("empty field path '{}'", path)))?;

    let mut current = record;
    for segment in segments {
        let child = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = child.as_object_mut().ok_or_else(|| {
            StoreError::InvalidUpdate(format!(
                "cannot create field '{}' inside a non-object at '{}'",
                last, path
            ))
        })?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn remove_path(record: &mut Record, path: &str) -> Option<Value> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop()?;

    let mut current = record;
    for segment in segments {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    current.remove(last)
}
