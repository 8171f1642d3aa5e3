use core::fmt;
use core::marker::PhantomData;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::Codec;
use crate::result::{join_messages, DataResult};
use crate::types::{Type, TypeReference, TypeRegistry};
use crate::value::{Value, ValueOps};

/// A leaf type that reads by decoding and re-encoding through a codec.
pub struct CodecType<A, C> {
    name: String,
    codec: C,
    _marker: PhantomData<fn() -> A>,
}

impl<A, C: Codec<A>> CodecType<A, C> {
    /// Wrap `codec`; `name` is used by `describe`.
    pub fn new(name: &str, codec: C) -> Self {
        Self {
            name: name.to_string(),
            codec,
            _marker: PhantomData,
        }
    }
}

impl<A, C> fmt::Debug for CodecType<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodecType({})", self.name)
    }
}

impl<A, C> Type for CodecType<A, C>
where
    C: Codec<A> + Send + Sync,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn read(&self, input: &Value, _registry: &TypeRegistry) -> DataResult<Value> {
        self.codec
            .parse(&ValueOps, input)
            .flat_map(|value| self.codec.encode_start(&value, &ValueOps))
    }
}

/// A single named map field.
#[derive(Debug)]
pub struct FieldType {
    name: String,
    element: Arc<dyn Type>,
    optional: bool,
}

impl FieldType {
    /// A field that must be present.
    pub fn required(name: &str, element: Arc<dyn Type>) -> Self {
        Self {
            name: name.to_string(),
            element,
            optional: false,
        }
    }

    /// A field that may be absent.
    pub fn optional(name: &str, element: Arc<dyn Type>) -> Self {
        Self {
            name: name.to_string(),
            element,
            optional: true,
        }
    }
}

impl Type for FieldType {
    fn describe(&self) -> String {
        let marker = if self.optional { "?" } else { "" };
        format!("{}{marker}: {}", self.name, self.element.describe())
    }

    fn field_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value> {
        let fields = match input {
            Value::Map(fields) => fields,
            Value::Empty if self.optional => return DataResult::success(Value::Map(BTreeMap::new())),
            other => return DataResult::error(format!("expected map, found {}", other.kind())),
        };
        match fields.get(&self.name) {
            Some(field) => self
                .element
                .read(field, registry)
                .map(|value| Value::map([(self.name.clone(), value)]))
                .map_error(|m| format!("field `{}`: {m}", self.name)),
            None if self.optional => DataResult::success(Value::Map(BTreeMap::new())),
            None => DataResult::error(format!("missing field `{}`", self.name)),
        }
    }
}

/// The union of several map-shaped types, optionally keeping unclaimed keys.
///
/// With `remainder` set, keys that no part claims are carried through
/// verbatim, so fields added by a future version survive a read.
#[derive(Debug)]
pub struct AllOfType {
    parts: Vec<Arc<dyn Type>>,
    remainder: bool,
}

impl AllOfType {
    /// Combine `parts`; see the type docs for `remainder`.
    pub fn new(parts: Vec<Arc<dyn Type>>, remainder: bool) -> Self {
        Self { parts, remainder }
    }
}

impl Type for AllOfType {
    fn describe(&self) -> String {
        let mut parts: Vec<String> = self.parts.iter().map(|p| p.describe()).collect();
        if self.remainder {
            parts.push("..".to_string());
        }
        format!("{{{}}}", parts.join(", "))
    }

    fn field_names(&self) -> Vec<String> {
        self.parts.iter().flat_map(|p| p.field_names()).collect()
    }

    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value> {
        let fields = match input {
            Value::Map(fields) => fields.clone(),
            Value::Empty => BTreeMap::new(),
            other => return DataResult::error(format!("expected map, found {}", other.kind())),
        };

        let mut out = BTreeMap::new();
        let mut message = String::new();
        for part in &self.parts {
            match part.read(&Value::Map(fields.clone()), registry) {
                DataResult::Success(Value::Map(read)) => out.extend(read),
                DataResult::Success(other) => {
                    message = join_messages(
                        &message,
                        &format!("part `{}` produced {}", part.describe(), other.kind()),
                    );
                }
                DataResult::Error { message: err, partial } => {
                    message = join_messages(&message, &err);
                    if let Some(Value::Map(read)) = partial {
                        out.extend(read);
                    }
                }
            }
        }

        if self.remainder {
            let claimed = self.field_names();
            for (key, value) in fields {
                if !claimed.contains(&key) {
                    out.entry(key).or_insert(value);
                }
            }
        }

        if message.is_empty() {
            DataResult::success(Value::Map(out))
        } else {
            DataResult::partial(Value::Map(out), message)
        }
    }
}

/// A homogeneous list.
#[derive(Debug)]
pub struct ListType {
    element: Arc<dyn Type>,
}

impl ListType {
    /// A list whose elements are `element`.
    pub fn new(element: Arc<dyn Type>) -> Self {
        Self { element }
    }
}

impl Type for ListType {
    fn describe(&self) -> String {
        format!("[{}]", self.element.describe())
    }

    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value> {
        let items = match input {
            Value::List(items) => items,
            other => return DataResult::error(format!("expected list, found {}", other.kind())),
        };
        let mut out = Vec::with_capacity(items.len());
        let mut message = String::new();
        for (index, item) in items.iter().enumerate() {
            match self.element.read(item, registry) {
                DataResult::Success(value) => out.push(value),
                DataResult::Error { message: err, partial } => {
                    message = join_messages(&message, &format!("[{index}]: {err}"));
                    out.extend(partial);
                }
            }
        }
        if message.is_empty() {
            DataResult::success(Value::List(out))
        } else {
            DataResult::partial(Value::List(out), message)
        }
    }
}

/// A lazily resolved pointer to another registered type.
///
/// Resolution happens on every read, against the registry the read is
/// performed with, so mutually recursive types can be registered in any
/// order.
#[derive(Debug)]
pub struct ReferenceType {
    target: TypeReference,
}

impl ReferenceType {
    /// Point at `target`.
    pub fn new(target: TypeReference) -> Self {
        Self { target }
    }
}

impl Type for ReferenceType {
    fn describe(&self) -> String {
        format!("&{}", self.target)
    }

    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value> {
        match registry.get(&self.target) {
            Some(ty) => ty.read(input, registry),
            None => DataResult::error(format!("unresolved type reference `{}`", self.target)),
        }
    }
}

/// Decorator that exposes a reference and delegates everything else.
#[derive(Debug)]
pub struct NamedType {
    reference: TypeReference,
    delegate: Arc<dyn Type>,
}

impl NamedType {
    /// Expose `delegate` under `reference`.
    pub fn new(reference: TypeReference, delegate: Arc<dyn Type>) -> Self {
        Self {
            reference,
            delegate,
        }
    }

    /// The wrapped type.
    pub fn delegate(&self) -> &Arc<dyn Type> {
        &self.delegate
    }
}

impl Type for NamedType {
    fn reference(&self) -> Option<&TypeReference> {
        Some(&self.reference)
    }

    fn describe(&self) -> String {
        format!("{}={}", self.reference, self.delegate.describe())
    }

    fn field_names(&self) -> Vec<String> {
        self.delegate.field_names()
    }

    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value> {
        self.delegate.read(input, registry)
    }
}
