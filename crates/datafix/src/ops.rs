//! The format-agnostic operation set over tree-shaped values.
//!
//! A [`DynamicOps`] implementation knows how to build, inspect and restructure
//! one concrete tree representation (an in-memory [`Value`](crate::Value), a
//! `serde_json::Value`, ...). Everything above this layer, codecs, types and
//! rewrite rules, is written against the trait and never sees the concrete
//! tree.
//!
//! Every operation takes its inputs by reference and returns a new value.

use core::fmt;

use crate::result::DataResult;

/// A numeric primitive, tagged with the width it was created with.
///
/// Equality is numeric: two integral numbers compare as `i64`, anything
/// involving a floating point number compares as `f64`. This keeps values
/// equal when they travel through a representation that does not preserve
/// integer widths.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// 8-bit signed integer.
    Byte(i8),
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
}

impl Number {
    /// Returns true for the integer variants.
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Byte(_) | Self::Short(_) | Self::Int(_) | Self::Long(_))
    }

    /// The value widened to `i64`. Floats are truncated toward zero.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Byte(v) => i64::from(v),
            Self::Short(v) => i64::from(v),
            Self::Int(v) => i64::from(v),
            Self::Long(v) => v,
            Self::Float(v) => v as i64,
            Self::Double(v) => v as i64,
        }
    }

    /// The value as `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Byte(v) => f64::from(v),
            Self::Short(v) => f64::from(v),
            Self::Int(v) => f64::from(v),
            Self::Long(v) => v as f64,
            Self::Float(v) => f64::from(v),
            Self::Double(v) => v,
        }
    }

    /// The value as `i64` without loss: integral numbers always convert,
    /// floats only when they are whole and inside `[-2^63, 2^63)`.
    pub fn to_i64_exact(&self) -> Option<i64> {
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if self.is_integral() {
            return Some(self.as_i64());
        }
        let v = self.as_f64();
        if v.is_finite() && v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v) {
            Some(v as i64)
        } else {
            None
        }
    }

    /// The value as `i32`, if it is integral and fits.
    pub fn as_i32(&self) -> Option<i32> {
        if self.is_integral() {
            i32::try_from(self.as_i64()).ok()
        } else {
            None
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        if self.is_integral() && other.is_integral() {
            self.as_i64() == other.as_i64()
        } else {
            self.as_f64() == other.as_f64()
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}b"),
            Self::Short(v) => write!(f, "{v}s"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
        }
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Capability table for one concrete tree representation.
///
/// Implementations are usually zero-sized handles (`ValueOps`, `JsonOps`),
/// so they are cheap to clone and are carried by every
/// [`Dynamic`](crate::Dynamic).
///
/// Maps are keyed by strings. Reading a primitive out of a node of the wrong
/// shape yields a [`DataResult`] error, never a panic.
pub trait DynamicOps: Clone + fmt::Debug + Send + Sync + 'static {
    /// The concrete tree node type.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// The "absent" value. Converting anything unrecognized yields this.
    fn empty(&self) -> Self::Value;

    /// An empty map.
    fn empty_map(&self) -> Self::Value {
        self.create_map(Vec::new())
    }

    /// An empty list.
    fn empty_list(&self) -> Self::Value {
        self.create_list(Vec::new())
    }

    // ── Primitive construction ──────────────────────────────────────

    /// A string node.
    fn create_string(&self, value: &str) -> Self::Value;

    /// A numeric node of the given width.
    fn create_numeric(&self, value: Number) -> Self::Value;

    /// An 8-bit integer node.
    fn create_byte(&self, value: i8) -> Self::Value {
        self.create_numeric(Number::Byte(value))
    }

    /// A 16-bit integer node.
    fn create_short(&self, value: i16) -> Self::Value {
        self.create_numeric(Number::Short(value))
    }

    /// A 32-bit integer node.
    fn create_int(&self, value: i32) -> Self::Value {
        self.create_numeric(Number::Int(value))
    }

    /// A 64-bit integer node.
    fn create_long(&self, value: i64) -> Self::Value {
        self.create_numeric(Number::Long(value))
    }

    /// A 32-bit float node.
    fn create_float(&self, value: f32) -> Self::Value {
        self.create_numeric(Number::Float(value))
    }

    /// A 64-bit float node.
    fn create_double(&self, value: f64) -> Self::Value {
        self.create_numeric(Number::Double(value))
    }

    /// A boolean node.
    fn create_bool(&self, value: bool) -> Self::Value;

    // ── Predicates ──────────────────────────────────────────────────

    /// Returns true if `value` is the empty value.
    fn is_empty_value(&self, value: &Self::Value) -> bool {
        *value == self.empty()
    }

    /// Returns true for map nodes.
    fn is_map(&self, value: &Self::Value) -> bool;

    /// Returns true for list nodes.
    fn is_list(&self, value: &Self::Value) -> bool;

    /// Returns true for string nodes.
    fn is_string(&self, value: &Self::Value) -> bool;

    /// Returns true for numeric nodes.
    fn is_number(&self, value: &Self::Value) -> bool;

    /// Returns true for boolean nodes.
    fn is_bool(&self, value: &Self::Value) -> bool;

    // ── Primitive readers ───────────────────────────────────────────

    /// Read a string node.
    fn get_string_value(&self, value: &Self::Value) -> DataResult<String>;

    /// Read a numeric node.
    fn get_number_value(&self, value: &Self::Value) -> DataResult<Number>;

    /// Read a boolean node.
    fn get_bool_value(&self, value: &Self::Value) -> DataResult<bool>;

    // ── Lists ───────────────────────────────────────────────────────

    /// Build a list from its elements.
    fn create_list(&self, items: Vec<Self::Value>) -> Self::Value;

    /// Read the elements of a list node.
    fn get_list(&self, value: &Self::Value) -> DataResult<Vec<Self::Value>>;

    /// Append `item` to `list`. The empty value is treated as an empty list.
    fn merge_to_list(&self, list: &Self::Value, item: Self::Value) -> DataResult<Self::Value> {
        if self.is_empty_value(list) {
            return DataResult::success(self.create_list(vec![item]));
        }
        self.get_list(list).map(|mut items| {
            items.push(item);
            self.create_list(items)
        })
    }

    // ── Maps ────────────────────────────────────────────────────────

    /// Build a map from key-value pairs. Later duplicates win.
    fn create_map(&self, entries: Vec<(String, Self::Value)>) -> Self::Value;

    /// Read the entries of a map node.
    fn get_map_entries(&self, value: &Self::Value) -> DataResult<Vec<(String, Self::Value)>>;

    /// Look up `key` in a map node. Non-maps have no keys.
    fn get(&self, value: &Self::Value, key: &str) -> Option<Self::Value> {
        self.get_map_entries(value)
            .result()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if the map node contains `key`.
    fn has(&self, value: &Self::Value, key: &str) -> bool {
        self.get(value, key).is_some()
    }

    /// Set `key` to `field`. Non-map inputs other than the empty value are
    /// returned unchanged.
    fn set(&self, value: &Self::Value, key: &str, field: Self::Value) -> Self::Value {
        self.merge_to_map(value, key, field)
            .result()
            .unwrap_or_else(|| value.clone())
    }

    /// Remove `key`. Non-map inputs are returned unchanged.
    fn remove(&self, value: &Self::Value, key: &str) -> Self::Value {
        match self.get_map_entries(value).result() {
            Some(entries) => {
                self.create_map(entries.into_iter().filter(|(k, _)| k != key).collect())
            }
            None => value.clone(),
        }
    }

    /// Insert or replace one entry. The empty value is treated as an empty map.
    fn merge_to_map(&self, map: &Self::Value, key: &str, field: Self::Value) -> DataResult<Self::Value> {
        let mut entries = if self.is_empty_value(map) {
            Vec::new()
        } else {
            match self.get_map_entries(map) {
                DataResult::Success(entries) => entries,
                DataResult::Error { message, .. } => return DataResult::error(message),
            }
        };
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), field));
        DataResult::success(self.create_map(entries))
    }

    /// Merge every entry of `other` into `map`; entries of `other` win.
    fn merge_maps(&self, map: &Self::Value, other: &Self::Value) -> DataResult<Self::Value> {
        let additions = match self.get_map_entries(other) {
            DataResult::Success(entries) => entries,
            DataResult::Error { message, .. } => {
                return DataResult::error(format!("cannot merge non-map: {message}"))
            }
        };
        additions
            .into_iter()
            .fold(DataResult::success(map.clone()), |acc, (key, value)| {
                acc.flat_map(|current| self.merge_to_map(&current, &key, value))
            })
    }

    // ── Cross-representation conversion ─────────────────────────────

    /// Re-express `value` in the representation of `target`.
    ///
    /// Primitives, lists and maps are converted recursively; anything this
    /// representation does not recognize becomes `target.empty()`.
    fn convert_to<U: DynamicOps>(&self, target: &U, value: &Self::Value) -> U::Value;
}
