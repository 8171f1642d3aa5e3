//! # datafix-json
//!
//! [`DynamicOps`] for [`serde_json::Value`], so JSON documents can be
//! migrated by `datafix` without an intermediate copy.
//!
//! - `null` is the empty value.
//! - Integers that fit in `i32` read as `Int`, other integers as `Long`.
//!   Unsigned integers above `i64::MAX` read as `Double`.
//! - Floats read as `Double`. NaN and infinities have no JSON form and are
//!   written as `null`.
//!
//! ```
//! use datafix::{Dynamic, Value, ValueOps};
//! use datafix_json::JsonOps;
//! use serde_json::json;
//!
//! let player = Dynamic::new(JsonOps, json!({"playerName": "Steve", "level": 3}));
//! let renamed = player.rename_field("playerName", "name");
//! assert_eq!(renamed.value(), &json!({"name": "Steve", "level": 3}));
//!
//! let in_memory = renamed.convert(ValueOps);
//! assert_eq!(
//!     in_memory.value(),
//!     &Value::map([("name", Value::from("Steve")), ("level", Value::from(3))])
//! );
//! ```

use datafix::{DataResult, DynamicOps, Number};
use serde_json::{Map, Value};

/// The operation set for `serde_json::Value` trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOps;

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch<T>(expected: &str, found: &Value) -> DataResult<T> {
    DataResult::error(format!("expected {expected}, found {}", kind(found)))
}

fn to_number(number: &serde_json::Number) -> Number {
    if let Some(i) = number.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Number::Int(small),
            Err(_) => Number::Long(i),
        }
    } else if let Some(u) = number.as_u64() {
        Number::Double(u as f64)
    } else {
        Number::Double(number.as_f64().unwrap_or(f64::NAN))
    }
}

impl DynamicOps for JsonOps {
    type Value = Value;

    fn empty(&self) -> Value {
        Value::Null
    }

    fn create_string(&self, value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn create_numeric(&self, value: Number) -> Value {
        if value.is_integral() {
            Value::from(value.as_i64())
        } else {
            serde_json::Number::from_f64(value.as_f64())
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
    }

    fn create_bool(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn is_map(&self, value: &Value) -> bool {
        value.is_object()
    }

    fn is_list(&self, value: &Value) -> bool {
        value.is_array()
    }

    fn is_string(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn is_number(&self, value: &Value) -> bool {
        value.is_number()
    }

    fn is_bool(&self, value: &Value) -> bool {
        value.is_boolean()
    }

    fn get_string_value(&self, value: &Value) -> DataResult<String> {
        match value {
            Value::String(s) => DataResult::success(s.clone()),
            other => mismatch("string", other),
        }
    }

    fn get_number_value(&self, value: &Value) -> DataResult<Number> {
        match value {
            Value::Number(n) => DataResult::success(to_number(n)),
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
        Value::Array(items)
    }

    fn get_list(&self, value: &Value) -> DataResult<Vec<Value>> {
        match value {
            Value::Array(items) => DataResult::success(items.clone()),
            other => mismatch("array", other),
        }
    }

    fn create_map(&self, entries: Vec<(String, Value)>) -> Value {
        Value::Object(entries.into_iter().collect::<Map<String, Value>>())
    }

    fn get_map_entries(&self, value: &Value) -> DataResult<Vec<(String, Value)>> {
        match value {
            Value::Object(map) => {
                DataResult::success(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            other => mismatch("object", other),
        }
    }

    fn get(&self, value: &Value, key: &str) -> Option<Value> {
        value.as_object()?.get(key).cloned()
    }

    fn has(&self, value: &Value, key: &str) -> bool {
        value.as_object().is_some_and(|map| map.contains_key(key))
    }

    fn merge_to_map(&self, map: &Value, key: &str, field: Value) -> DataResult<Value> {
        match map {
            Value::Null => {
                let mut entries = Map::new();
                entries.insert(key.to_string(), field);
                DataResult::success(Value::Object(entries))
            }
            Value::Object(entries) => {
                let mut entries = entries.clone();
                entries.insert(key.to_string(), field);
                DataResult::success(Value::Object(entries))
            }
            other => mismatch("object", other),
        }
    }

    fn remove(&self, value: &Value, key: &str) -> Value {
        match value {
            Value::Object(map) => {
                let mut map = map.clone();
                map.remove(key);
                Value::Object(map)
            }
            other => other.clone(),
        }
    }

    fn convert_to<U: DynamicOps>(&self, target: &U, value: &Value) -> U::Value {
        match value {
            Value::Null => target.empty(),
            Value::Bool(b) => target.create_bool(*b),
            Value::Number(n) => target.create_numeric(to_number(n)),
            Value::String(s) => target.create_string(s),
            Value::Array(items) => {
                target.create_list(items.iter().map(|v| self.convert_to(target, v)).collect())
            }
            Value::Object(map) => target.create_map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.convert_to(target, v)))
                    .collect(),
            ),
        }
    }
}
