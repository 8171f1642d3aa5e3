//! Versioned schemas and the registry that orders them.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaError;
use crate::types::TypeRegistry;

/// A totally ordered schema generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataVersion(u32);

impl DataVersion {
    /// Wrap a raw version number.
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// The raw version number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for DataVersion {
    fn from(version: u32) -> Self {
        Self(version)
    }
}

impl fmt::Display for DataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

type RegisterTypes = dyn Fn(&mut TypeRegistry) -> Result<(), SchemaError> + Send + Sync;

/// The complete set of types for one [`DataVersion`].
///
/// Types are registered by a hook that runs the first time
/// [`types`](Self::types) is called. A schema that
/// [`extends`](Self::extends) a parent starts from a copy of the parent's
/// types, so each version only declares what changed. The resulting
/// registry is frozen and memoized.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use datafix::types::dsl::*;
/// use datafix::{DataVersion, Schema, TypeReference};
///
/// let v1 = Arc::new(Schema::new(DataVersion::new(1)).register_types(|types| {
///     types.register_template(TypeReference::new("player"), &all_of([field("playerName", string())]))
/// }));
/// let v2 = Schema::new(DataVersion::new(2))
///     .extends(v1.clone())
///     .register_types(|types| {
///         types.register_template(TypeReference::new("player"), &all_of([field("name", string())]))
///     });
///
/// let player = v2.types().unwrap().require(&TypeReference::new("player")).unwrap();
/// assert_eq!(player.field_names(), vec!["name"]);
/// ```
pub struct Schema {
    version: DataVersion,
    parent: Option<Arc<Schema>>,
    hook: Option<Box<RegisterTypes>>,
    types: OnceLock<Result<Arc<TypeRegistry>, SchemaError>>,
}

impl Schema {
    /// A schema for `version` with no parent and no types.
    pub fn new(version: DataVersion) -> Self {
        Self {
            version,
            parent: None,
            hook: None,
            types: OnceLock::new(),
        }
    }

    /// Inherit the parent's types as the starting point.
    pub fn extends(mut self, parent: Arc<Schema>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the hook that registers this version's types.
    ///
    /// The hook receives the only mutable handle to the registry; once it
    /// returns, the registry is frozen.
    pub fn register_types<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut TypeRegistry) -> Result<(), SchemaError> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// This schema's version.
    pub fn version(&self) -> DataVersion {
        self.version
    }

    /// The parent schema, if any.
    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    /// The frozen type registry, built on first access.
    ///
    /// A failing hook is memoized too: every call returns the same error.
    pub fn types(&self) -> Result<Arc<TypeRegistry>, SchemaError> {
        self.types.get_or_init(|| self.build_types()).clone()
    }

    fn build_types(&self) -> Result<Arc<TypeRegistry>, SchemaError> {
        let mut registry = match &self.parent {
            Some(parent) => parent.types()?.unfrozen_copy(),
            None => TypeRegistry::new(),
        };
        if let Some(hook) = &self.hook {
            hook(&mut registry)?;
        }
        registry.freeze();
        debug!(version = %self.version, types = registry.len(), "built schema types");
        Ok(Arc::new(registry))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("parent", &self.parent.as_ref().map(|p| p.version))
            .field("built", &self.types.get().is_some())
            .finish()
    }
}

/// All schemas of an application, ordered by version.
///
/// Filled once during bootstrap, then [`freeze`](Self::freeze)d and read
/// concurrently.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<DataVersion, Arc<Schema>>,
    frozen: bool,
}

impl SchemaRegistry {
    /// An empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema. Each version may be registered once.
    pub fn register(&mut self, schema: impl Into<Arc<Schema>>) -> Result<(), SchemaError> {
        let schema = schema.into();
        if self.frozen {
            return Err(SchemaError::Frozen {
                what: format!("schema {}", schema.version()),
            });
        }
        if self.schemas.contains_key(&schema.version()) {
            return Err(SchemaError::DuplicateVersion {
                version: schema.version(),
            });
        }
        self.schemas.insert(schema.version(), schema);
        Ok(())
    }

    /// The schema for `version`, if registered.
    pub fn get(&self, version: DataVersion) -> Option<&Arc<Schema>> {
        self.schemas.get(&version)
    }

    /// The schema for `version`, or [`SchemaError::UnknownVersion`].
    pub fn require(&self, version: DataVersion) -> Result<&Arc<Schema>, SchemaError> {
        self.get(version)
            .ok_or(SchemaError::UnknownVersion { version })
    }

    /// The schema with the highest version, or [`SchemaError::Empty`].
    pub fn latest(&self) -> Result<&Arc<Schema>, SchemaError> {
        self.schemas
            .values()
            .next_back()
            .ok_or(SchemaError::Empty)
    }

    /// All registered versions, ascending.
    pub fn versions(&self) -> Vec<DataVersion> {
        self.schemas.keys().copied().collect()
    }

    /// The registered versions walked from `from` to `to`, both included.
    ///
    /// Ascending when `from < to`, descending when `from > to`, and just
    /// `[from]` when they are equal. Both endpoints must be registered.
    pub fn path(&self, from: DataVersion, to: DataVersion) -> Result<Vec<DataVersion>, SchemaError> {
        self.require(from)?;
        self.require(to)?;
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let mut versions: Vec<DataVersion> = self.schemas.range(low..=high).map(|(v, _)| *v).collect();
        if from > to {
            versions.reverse();
        }
        Ok(versions)
    }

    /// Returns true if `a` and `b` are distinct and no registered version
    /// lies strictly between them.
    pub fn adjacent(&self, a: DataVersion, b: DataVersion) -> bool {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        low != high && self.schemas.range(low..=high).count() == 2
    }

    /// Reject all further registrations. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(schemas = self.schemas.len(), "freezing schema registry");
        }
        self.frozen = true;
    }

    /// Returns true once frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schema is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
