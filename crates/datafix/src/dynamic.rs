//! Tagged values: a tree node bundled with the operation set that reads it.

use core::fmt;

use crate::codec::Decoder;
use crate::ops::{DynamicOps, Number};
use crate::result::DataResult;
use crate::types::TypeReference;

/// A value of some representation together with its [`DynamicOps`].
///
/// `Dynamic` is immutable: every method returns a new `Dynamic` and leaves
/// `self` alone, so rules can hand the same value to several branches
/// without aliasing concerns.
///
/// # Example
///
/// ```
/// use datafix::{Dynamic, Value, ValueOps};
///
/// let player = Dynamic::new(ValueOps, Value::map([("playerName", Value::from("Steve"))]));
/// let renamed = player.rename_field("playerName", "name").set("score", player.create_int(0));
///
/// assert_eq!(renamed.get("name").flat_map(|d| d.as_string()).result().as_deref(), Some("Steve"));
/// assert!(!renamed.has("playerName"));
/// assert!(player.has("playerName"));
/// ```
#[derive(Clone)]
pub struct Dynamic<O: DynamicOps> {
    ops: O,
    value: O::Value,
}

impl<O: DynamicOps> Dynamic<O> {
    /// Bundle `value` with `ops`.
    pub fn new(ops: O, value: O::Value) -> Self {
        Self { ops, value }
    }

    /// The empty value of `ops`.
    pub fn empty(ops: O) -> Self {
        let value = ops.empty();
        Self { ops, value }
    }

    /// The operation set.
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// The underlying tree node.
    pub fn value(&self) -> &O::Value {
        &self.value
    }

    /// Take the underlying tree node.
    pub fn into_value(self) -> O::Value {
        self.value
    }

    /// Replace the underlying node with `f(value)`.
    pub fn map_value(self, f: impl FnOnce(&O, O::Value) -> O::Value) -> Self {
        let value = f(&self.ops, self.value);
        Self {
            ops: self.ops,
            value,
        }
    }

    fn wrap(&self, value: O::Value) -> Self {
        Self {
            ops: self.ops.clone(),
            value,
        }
    }

    // ── Construction with the same ops ──────────────────────────────

    /// An empty map.
    pub fn empty_map(&self) -> Self {
        self.wrap(self.ops.empty_map())
    }

    /// An empty list.
    pub fn empty_list(&self) -> Self {
        self.wrap(self.ops.empty_list())
    }

    /// A string.
    pub fn create_string(&self, value: &str) -> Self {
        self.wrap(self.ops.create_string(value))
    }

    /// A 32-bit integer.
    pub fn create_int(&self, value: i32) -> Self {
        self.wrap(self.ops.create_int(value))
    }

    /// A 64-bit integer.
    pub fn create_long(&self, value: i64) -> Self {
        self.wrap(self.ops.create_long(value))
    }

    /// A 64-bit float.
    pub fn create_double(&self, value: f64) -> Self {
        self.wrap(self.ops.create_double(value))
    }

    /// A boolean.
    pub fn create_bool(&self, value: bool) -> Self {
        self.wrap(self.ops.create_bool(value))
    }

    /// A list of the given elements.
    pub fn create_list(&self, items: impl IntoIterator<Item = Dynamic<O>>) -> Self {
        self.wrap(self.ops.create_list(items.into_iter().map(Dynamic::into_value).collect()))
    }

    /// A map of the given entries.
    pub fn create_map<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, Dynamic<O>)>) -> Self {
        self.wrap(
            self.ops.create_map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into_value()))
                    .collect(),
            ),
        )
    }

    // ── Map access ──────────────────────────────────────────────────

    /// The field `key`, or an error naming the missing key.
    pub fn get(&self, key: &str) -> DataResult<Self> {
        DataResult::from_option(self.get_opt(key), || format!("missing field `{key}`"))
    }

    /// The field `key`, if present.
    pub fn get_opt(&self, key: &str) -> Option<Self> {
        self.ops.get(&self.value, key).map(|v| self.wrap(v))
    }

    /// Returns true if the map contains `key`.
    pub fn has(&self, key: &str) -> bool {
        self.ops.has(&self.value, key)
    }

    /// Set `key` to `field`.
    pub fn set(&self, key: &str, field: Dynamic<O>) -> Self {
        self.wrap(self.ops.set(&self.value, key, field.value))
    }

    /// Remove `key`.
    pub fn remove(&self, key: &str) -> Self {
        self.wrap(self.ops.remove(&self.value, key))
    }

    /// Move the field `from` to `to`. Absent fields leave the value unchanged.
    pub fn rename_field(&self, from: &str, to: &str) -> Self {
        match self.ops.get(&self.value, from) {
            Some(field) if from != to => {
                let removed = self.ops.remove(&self.value, from);
                self.wrap(self.ops.set(&removed, to, field))
            }
            _ => self.clone(),
        }
    }

    /// Replace the field `key` with `f(field)`. Absent fields are untouched.
    pub fn update(&self, key: &str, f: impl FnOnce(Dynamic<O>) -> Dynamic<O>) -> Self {
        match self.get_opt(key) {
            Some(field) => self.set(key, f(field)),
            None => self.clone(),
        }
    }

    /// Merge all entries of `other` into this map; `other` wins on conflicts.
    pub fn merge(&self, other: &Dynamic<O>) -> DataResult<Self> {
        self.ops
            .merge_maps(&self.value, &other.value)
            .map(|v| self.wrap(v))
    }

    // ── Readers ─────────────────────────────────────────────────────

    /// Read as a string.
    pub fn as_string(&self) -> DataResult<String> {
        self.ops.get_string_value(&self.value)
    }

    /// Read as a number of any width.
    pub fn as_number(&self) -> DataResult<Number> {
        self.ops.get_number_value(&self.value)
    }

    /// Read as an `i32`; fails for floats and out-of-range integers.
    pub fn as_i32(&self) -> DataResult<i32> {
        self.as_number().flat_map(|n| {
            DataResult::from_option(n.as_i32(), || format!("number {n} is not a 32-bit integer"))
        })
    }

    /// Read as an `i64`; floats are truncated.
    pub fn as_i64(&self) -> DataResult<i64> {
        self.as_number().map(|n| n.as_i64())
    }

    /// Read as an `f64`.
    pub fn as_f64(&self) -> DataResult<f64> {
        self.as_number().map(|n| n.as_f64())
    }

    /// Read as a boolean.
    pub fn as_bool(&self) -> DataResult<bool> {
        self.ops.get_bool_value(&self.value)
    }

    /// Read the elements of a list.
    pub fn as_list(&self) -> DataResult<Vec<Self>> {
        self.ops
            .get_list(&self.value)
            .map(|items| items.into_iter().map(|v| self.wrap(v)).collect())
    }

    /// Read the entries of a map.
    pub fn as_map_entries(&self) -> DataResult<Vec<(String, Self)>> {
        self.ops
            .get_map_entries(&self.value)
            .map(|entries| entries.into_iter().map(|(k, v)| (k, self.wrap(v))).collect())
    }

    /// Returns true if this is a map.
    pub fn is_map(&self) -> bool {
        self.ops.is_map(&self.value)
    }

    /// Re-express this value under another operation set.
    pub fn convert<U: DynamicOps>(&self, target: U) -> Dynamic<U> {
        let value = self.ops.convert_to(&target, &self.value);
        Dynamic::new(target, value)
    }

    /// Decode into a typed value, discarding the remainder.
    pub fn decode<A, D: Decoder<A>>(&self, decoder: &D) -> DataResult<A> {
        decoder.parse(&self.ops, &self.value)
    }
}

impl<O: DynamicOps> PartialEq for Dynamic<O> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<O: DynamicOps> fmt::Debug for Dynamic<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("ops", &self.ops)
            .field("value", &self.value)
            .finish()
    }
}

/// A [`Dynamic`] labelled with the [`TypeReference`] it is an instance of.
///
/// This is the unit handed to
/// [`DataFixer::update_tagged`](crate::DataFixer::update_tagged).
#[derive(Clone)]
pub struct TaggedDynamic<O: DynamicOps> {
    /// Logical type of the value.
    pub type_ref: TypeReference,
    /// The value itself.
    pub value: Dynamic<O>,
}

impl<O: DynamicOps> TaggedDynamic<O> {
    /// Tag `value` with `type_ref`.
    pub fn new(type_ref: TypeReference, value: Dynamic<O>) -> Self {
        Self { type_ref, value }
    }
}

impl<O: DynamicOps> PartialEq for TaggedDynamic<O> {
    fn eq(&self, other: &Self) -> bool {
        self.type_ref == other.type_ref && self.value == other.value
    }
}

impl<O: DynamicOps> fmt::Debug for TaggedDynamic<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedDynamic")
            .field("type_ref", &self.type_ref)
            .field("value", &self.value.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueOps};

    fn player() -> Dynamic<ValueOps> {
        Dynamic::new(
            ValueOps,
            Value::map([("playerName", Value::from("Steve")), ("level", Value::from(3))]),
        )
    }

    #[test]
    fn rename_moves_value() {
        let renamed = player().rename_field("playerName", "name");
        assert_eq!(renamed.get("name").flat_map(|d| d.as_string()).result().as_deref(), Some("Steve"));
        assert!(!renamed.has("playerName"));
    }

    #[test]
    fn rename_absent_is_noop() {
        let original = player();
        assert_eq!(original.rename_field("missing", "name"), original);
    }

    #[test]
    fn update_transforms_field() {
        let bumped = player().update("level", |d| {
            let next = d.as_i32().result().unwrap_or(0) + 1;
            d.create_int(next)
        });
        assert_eq!(bumped.get("level").flat_map(|d| d.as_i32()).result(), Some(4));
    }

    #[test]
    fn get_missing_reports_key() {
        let missing = player().get("score");
        assert_eq!(missing.error_message(), Some("missing field `score`"));
    }

    #[test]
    fn as_i32_rejects_double() {
        let d = player().create_double(1.5);
        assert!(d.as_i32().is_error());
        assert_eq!(d.as_f64().result(), Some(1.5));
    }

    #[test]
    fn create_map_and_list() {
        let base = player();
        let list = base.create_list([base.create_int(1), base.create_int(2)]);
        let map = base.create_map([("xs", list.clone())]);
        assert_eq!(map.get("xs").result(), Some(list));
        assert_eq!(map.get("xs").flat_map(|l| l.as_list()).result().map(|l| l.len()), Some(2));
    }
}
