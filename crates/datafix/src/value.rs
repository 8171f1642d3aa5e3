//! An in-memory tree and its operation set.
//!
//! [`Value`] is the representation the type system reads through, and a
//! convenient default for callers that do not already hold a format-specific
//! tree.

use std::collections::BTreeMap;

use crate::ops::{DynamicOps, Number};
use crate::result::DataResult;

/// An in-memory tree node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / unknown.
    #[default]
    Empty,
    /// Boolean.
    Bool(bool),
    /// Number of some width.
    Number(Number),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a map from string keys.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Number::Int(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Number::Long(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(Number::Double(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

/// [`DynamicOps`] for [`Value`].
///
/// # Example
///
/// ```
/// use datafix::{DynamicOps, Value, ValueOps};
///
/// let ops = ValueOps;
/// let map = ops.create_map(vec![("name".to_string(), ops.create_string("Steve"))]);
/// let renamed = ops.set(&ops.remove(&map, "name"), "nick", ops.create_string("Steve"));
///
/// assert!(!ops.has(&renamed, "name"));
/// assert_eq!(ops.get(&renamed, "nick"), Some(Value::from("Steve")));
/// // The input is untouched.
/// assert!(ops.has(&map, "name"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueOps;

fn mismatch<T>(expected: &str, found: &Value) -> DataResult<T> {
    DataResult::error(format!("expected {expected}, found {}", found.kind()))
}

impl DynamicOps for ValueOps {
    type Value = Value;

    fn empty(&self) -> Value {
        Value::Empty
    }

    fn create_string(&self, value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn create_numeric(&self, value: Number) -> Value {
        Value::Number(value)
    }

    fn create_bool(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn is_map(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn is_list(&self, value: &Value) -> bool {
        matches!(value, Value::List(_))
    }

    fn is_string(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn is_number(&self, value: &Value) -> bool {
        matches!(value, Value::Number(_))
    }

    fn is_bool(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn get_string_value(&self, value: &Value) -> DataResult<String> {
        match value {
            Value::String(s) => DataResult::success(s.clone()),
            other => mismatch("string", other),
        }
    }

    fn get_number_value(&self, value: &Value) -> DataResult<Number> {
        match value {
            Value::Number(n) => DataResult::success(*n),
            other => mismatch("number", other),
        }
    }

    fn get_bool_value(&self, value: &Value) -> DataResult<bool> {
        match value {
            Value::Bool(b) => DataResult::success(*b),
            other => mismatch("bool", other),
        }
    }

    fn create_list(&self, items: Vec<Value>) -> Value {
        Value::List(items)
    }

    fn get_list(&self, value: &Value) -> DataResult<Vec<Value>> {
        match value {
            Value::List(items) => DataResult::success(items.clone()),
            other => mismatch("list", other),
        }
    }

    fn create_map(&self, entries: Vec<(String, Value)>) -> Value {
        Value::Map(entries.into_iter().collect())
    }

    fn get_map_entries(&self, value: &Value) -> DataResult<Vec<(String, Value)>> {
        match value {
            Value::Map(map) => {
                DataResult::success(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            other => mismatch("map", other),
        }
    }

    fn get(&self, value: &Value, key: &str) -> Option<Value> {
        match value {
            Value::Map(map) => map.get(key).cloned(),
            _ => None,
        }
    }

    fn has(&self, value: &Value, key: &str) -> bool {
        matches!(value, Value::Map(map) if map.contains_key(key))
    }

    fn merge_to_map(&self, map: &Value, key: &str, field: Value) -> DataResult<Value> {
        match map {
            Value::Empty => DataResult::success(Value::map([(key, field)])),
            Value::Map(entries) => {
                let mut entries = entries.clone();
                entries.insert(key.to_string(), field);
                DataResult::success(Value::Map(entries))
            }
            other => mismatch("map", other),
        }
    }

    fn convert_to<U: DynamicOps>(&self, target: &U, value: &Value) -> U::Value {
        match value {
            Value::Empty => target.empty(),
            Value::Bool(b) => target.create_bool(*b),
            Value::Number(n) => target.create_numeric(*n),
            Value::String(s) => target.create_string(s),
            Value::List(items) => {
                target.create_list(items.iter().map(|v| self.convert_to(target, v)).collect())
            }
            Value::Map(map) => target.create_map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.convert_to(target, v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_report_mismatches() {
        let ops = ValueOps;
        let err = ops.get_string_value(&Value::from(3)).error_message().map(str::to_string);
        assert_eq!(err.as_deref(), Some("expected string, found number"));
        assert!(ops.get_bool_value(&Value::Bool(true)).is_success());
    }

    #[test]
    fn set_on_empty_creates_map() {
        let ops = ValueOps;
        let value = ops.set(&Value::Empty, "a", Value::from(1));
        assert_eq!(value, Value::map([("a", Value::from(1))]));
    }

    #[test]
    fn set_on_primitive_is_unchanged() {
        let ops = ValueOps;
        let value = ops.set(&Value::from("x"), "a", Value::from(1));
        assert_eq!(value, Value::from("x"));
    }

    #[test]
    fn merge_maps_prefers_right() {
        let ops = ValueOps;
        let left = Value::map([("a", Value::from(1)), ("b", Value::from(2))]);
        let right = Value::map([("b", Value::from(3))]);
        let merged = ops.merge_maps(&left, &right).result().unwrap();
        assert_eq!(merged, Value::map([("a", Value::from(1)), ("b", Value::from(3))]));
    }

    #[test]
    fn merge_to_list_appends() {
        let ops = ValueOps;
        let list = ops.merge_to_list(&Value::Empty, Value::from(1)).result().unwrap();
        let list = ops.merge_to_list(&list, Value::from(2)).result().unwrap();
        assert_eq!(list, Value::List(vec![Value::from(1), Value::from(2)]));
        assert!(ops.merge_to_list(&Value::from(true), Value::from(1)).is_error());
    }

    #[test]
    fn convert_to_self_is_identity() {
        let ops = ValueOps;
        let value = Value::map([
            ("list", Value::List(vec![Value::from(1), Value::from("two")])),
            ("flag", Value::Bool(false)),
            ("nested", Value::map([("x", Value::from(1.5))])),
        ]);
        assert_eq!(ops.convert_to(&ValueOps, &value), value);
    }
}
