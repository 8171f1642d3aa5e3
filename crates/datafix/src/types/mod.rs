//! The structural type system.
//!
//! A [`TypeReference`] names a logical entity ("player", "world") and stays
//! stable across versions. A [`Type`] describes what that entity looks like
//! in one schema version. Types are usually produced from a
//! [`TypeTemplate`] written with the [`dsl`] functions and registered in a
//! [`TypeRegistry`] under their reference.
//!
//! Types read through the in-memory [`Value`] tree; [`read_dynamic`] bridges
//! any other representation via `convert_to`.

use core::fmt;
use std::sync::Arc;

use crate::codec::Codec;
use crate::dynamic::Dynamic;
use crate::ops::DynamicOps;
use crate::result::DataResult;
use crate::value::{Value, ValueOps};

mod kinds;
mod registry;
mod template;

pub use kinds::{AllOfType, CodecType, FieldType, ListType, NamedType, ReferenceType};
pub use registry::TypeRegistry;
pub use template::{dsl, EmptyFamily, ListFamily, TypeFamily, TypeTemplate};

/// Stable identifier of a migrated entity kind.
///
/// Cheap to clone; compares by name.
///
/// ```
/// use datafix::TypeReference;
///
/// let player = TypeReference::new("player");
/// assert_eq!(player, TypeReference::from("player"));
/// assert_eq!(player.to_string(), "player");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeReference(Arc<str>);

impl TypeReference {
    /// Create a reference with the given name.
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// The name of the reference.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeReference {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeReference({})", self.0)
    }
}

/// A concrete structural type.
///
/// `read` is the type's codec seen from the migration side: it validates a
/// tree against the type and returns the normalized tree, or a
/// [`DataResult`] error describing the first mismatches (with the salvaged
/// part as a partial value where possible).
pub trait Type: fmt::Debug + Send + Sync {
    /// The externally visible reference, for types registered under one.
    fn reference(&self) -> Option<&TypeReference> {
        None
    }

    /// A short human readable description of the shape.
    fn describe(&self) -> String;

    /// Top-level map keys this type claims.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Validate and normalize `input`. References resolve through `registry`.
    fn read(&self, input: &Value, registry: &TypeRegistry) -> DataResult<Value>;
}

/// Read a [`Dynamic`] of any representation through `ty`.
pub fn read_dynamic<O: DynamicOps>(
    ty: &dyn Type,
    registry: &TypeRegistry,
    input: &Dynamic<O>,
) -> DataResult<Dynamic<O>> {
    let canonical = input.ops().convert_to(&ValueOps, input.value());
    ty.read(&canonical, registry).map(|value| {
        let converted = ValueOps.convert_to(input.ops(), &value);
        Dynamic::new(input.ops().clone(), converted)
    })
}

/// A type backed by a hand-written codec and exposed under `reference`.
pub fn leaf_type<A, C>(reference: TypeReference, codec: C) -> Arc<dyn Type>
where
    A: 'static,
    C: Codec<A> + Send + Sync + 'static,
{
    let description = reference.to_string();
    Arc::new(NamedType::new(
        reference,
        Arc::new(CodecType::new(&description, codec)),
    ))
}
