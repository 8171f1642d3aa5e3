use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::SchemaError;
use crate::types::{EmptyFamily, NamedType, Type, TypeReference, TypeTemplate};

/// Maps [`TypeReference`]s to the concrete types of one schema version.
///
/// A registry is filled during schema construction and then frozen; after
/// [`freeze`](Self::freeze) every registration fails with
/// [`SchemaError::Frozen`], which is what makes a built schema safe to share
/// across threads.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<TypeReference, Arc<dyn Type>>,
    frozen: bool,
}

impl TypeRegistry {
    /// An empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` under its own reference, replacing any previous type.
    pub fn register(&mut self, ty: Arc<dyn Type>) -> Result<(), SchemaError> {
        let reference = match ty.reference() {
            Some(reference) => reference.clone(),
            None => {
                return Err(SchemaError::MissingReference {
                    description: ty.describe(),
                })
            }
        };
        self.ensure_open(&reference)?;
        trace!(reference = %reference, shape = %ty.describe(), "registering type");
        self.types.insert(reference, ty);
        Ok(())
    }

    /// Instantiate `template` against an empty family and register the
    /// result under `reference`.
    pub fn register_template(
        &mut self,
        reference: TypeReference,
        template: &TypeTemplate,
    ) -> Result<(), SchemaError> {
        self.ensure_open(&reference)?;
        let instantiated = template
            .apply(&EmptyFamily)
            .map_err(|source| SchemaError::Template {
                reference: reference.clone(),
                source,
            })?;
        self.register(Arc::new(NamedType::new(reference, instantiated)))
    }

    fn ensure_open(&self, reference: &TypeReference) -> Result<(), SchemaError> {
        if self.frozen {
            return Err(SchemaError::Frozen {
                what: format!("type `{reference}`"),
            });
        }
        Ok(())
    }

    /// The type registered under `reference`.
    pub fn get(&self, reference: &TypeReference) -> Option<Arc<dyn Type>> {
        self.types.get(reference).cloned()
    }

    /// The type registered under `reference`, or [`SchemaError::UnknownType`].
    pub fn require(&self, reference: &TypeReference) -> Result<Arc<dyn Type>, SchemaError> {
        self.get(reference).ok_or_else(|| SchemaError::UnknownType {
            reference: reference.clone(),
        })
    }

    /// Returns true if a type is registered under `reference`.
    pub fn contains(&self, reference: &TypeReference) -> bool {
        self.types.contains_key(reference)
    }

    /// All registered references, in order.
    pub fn references(&self) -> Vec<TypeReference> {
        self.types.keys().cloned().collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Reject all further registrations. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns true once [`freeze`](Self::freeze) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A mutable copy with the same types, for building a derived registry.
    pub fn unfrozen_copy(&self) -> Self {
        Self {
            types: self.types.clone(),
            frozen: false,
        }
    }
}
