use std::sync::Arc;

use crate::error::TemplateError;
use crate::types::{AllOfType, FieldType, ListType, ReferenceType, Type, TypeReference};

/// Supplies the concrete types a template's [`TypeTemplate::Id`] slots
/// resolve to.
pub trait TypeFamily {
    /// The member at `index`, if bound.
    fn member(&self, index: usize) -> Option<Arc<dyn Type>>;
}

/// A family with no members. Templates registered in a schema are
/// instantiated against this.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFamily;

impl TypeFamily for EmptyFamily {
    fn member(&self, _index: usize) -> Option<Arc<dyn Type>> {
        None
    }
}

/// A family binding slot `i` to the `i`-th type.
#[derive(Debug, Clone, Default)]
pub struct ListFamily(pub Vec<Arc<dyn Type>>);

impl TypeFamily for ListFamily {
    fn member(&self, index: usize) -> Option<Arc<dyn Type>> {
        self.0.get(index).cloned()
    }
}

/// A version-agnostic blueprint of a structural shape.
///
/// Build templates with the functions in [`dsl`]; instantiate them with
/// [`apply`](Self::apply).
#[derive(Debug, Clone)]
pub enum TypeTemplate {
    /// An already concrete type.
    Leaf(Arc<dyn Type>),
    /// A named map field.
    Field {
        /// Field name.
        name: String,
        /// Shape of the field's value.
        element: Box<TypeTemplate>,
        /// Whether the field may be absent.
        optional: bool,
    },
    /// All of the given map fragments, optionally keeping unclaimed keys.
    AllOf {
        /// The fragments.
        parts: Vec<TypeTemplate>,
        /// Keep keys no fragment claims.
        remainder: bool,
    },
    /// A list of the element shape.
    List(Box<TypeTemplate>),
    /// Another registered type, resolved lazily.
    Reference(TypeReference),
    /// Slot `n` of the family the template is applied to.
    Id(usize),
}

impl TypeTemplate {
    /// Instantiate against `family`.
    ///
    /// Deterministic and side-effect free: the same family yields a
    /// structurally identical type.
    pub fn apply(&self, family: &dyn TypeFamily) -> Result<Arc<dyn Type>, TemplateError> {
        Ok(match self {
            Self::Leaf(ty) => Arc::clone(ty),
            Self::Field {
                name,
                element,
                optional,
            } => {
                let element = element.apply(family)?;
                if *optional {
                    Arc::new(FieldType::optional(name, element))
                } else {
                    Arc::new(FieldType::required(name, element))
                }
            }
            Self::AllOf { parts, remainder } => {
                let parts = parts
                    .iter()
                    .map(|part| part.apply(family))
                    .collect::<Result<Vec<_>, _>>()?;
                Arc::new(AllOfType::new(parts, *remainder))
            }
            Self::List(element) => Arc::new(ListType::new(element.apply(family)?)),
            Self::Reference(target) => Arc::new(ReferenceType::new(target.clone())),
            Self::Id(index) => family
                .member(*index)
                .ok_or(TemplateError::UnboundFamilyIndex { index: *index })?,
        })
    }
}

/// Constructors for [`TypeTemplate`]s.
///
/// ```
/// use datafix::types::dsl::*;
/// use datafix::types::EmptyFamily;
///
/// let player = all_with_remainder([
///     field("name", string()),
///     optional_field("position", all_of([
///         field("x", double()),
///         field("y", double()),
///         field("z", double()),
///     ])),
///     field("inventory", list_of(reference("item"))),
/// ]);
/// let ty = player.apply(&EmptyFamily).unwrap();
/// assert_eq!(ty.field_names(), vec!["name", "position", "inventory"]);
/// ```
pub mod dsl {
    use std::sync::Arc;

    use crate::codec::{BOOL, DOUBLE, FLOAT, INT, LONG, STRING};
    use crate::types::{CodecType, Type, TypeReference, TypeTemplate};

    /// A required field.
    pub fn field(name: &str, element: TypeTemplate) -> TypeTemplate {
        TypeTemplate::Field {
            name: name.to_string(),
            element: Box::new(element),
            optional: false,
        }
    }

    /// An optional field.
    pub fn optional_field(name: &str, element: TypeTemplate) -> TypeTemplate {
        TypeTemplate::Field {
            name: name.to_string(),
            element: Box::new(element),
            optional: true,
        }
    }

    /// All of the given fragments; unclaimed keys are dropped on read.
    pub fn all_of(parts: impl IntoIterator<Item = TypeTemplate>) -> TypeTemplate {
        TypeTemplate::AllOf {
            parts: parts.into_iter().collect(),
            remainder: false,
        }
    }

    /// All of the given fragments; unclaimed keys are kept verbatim.
    pub fn all_with_remainder(parts: impl IntoIterator<Item = TypeTemplate>) -> TypeTemplate {
        TypeTemplate::AllOf {
            parts: parts.into_iter().collect(),
            remainder: true,
        }
    }

    /// A list.
    pub fn list_of(element: TypeTemplate) -> TypeTemplate {
        TypeTemplate::List(Box::new(element))
    }

    /// A lazily resolved reference.
    pub fn reference(target: &str) -> TypeTemplate {
        TypeTemplate::Reference(TypeReference::new(target))
    }

    /// Family slot `index`.
    pub fn id(index: usize) -> TypeTemplate {
        TypeTemplate::Id(index)
    }

    /// A concrete type.
    pub fn leaf(ty: Arc<dyn Type>) -> TypeTemplate {
        TypeTemplate::Leaf(ty)
    }

    /// String primitive.
    pub fn string() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("string", STRING)))
    }

    /// `i32` primitive.
    pub fn int() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("int", INT)))
    }

    /// `i64` primitive.
    pub fn long() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("long", LONG)))
    }

    /// `f32` primitive.
    pub fn float() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("float", FLOAT)))
    }

    /// `f64` primitive.
    pub fn double() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("double", DOUBLE)))
    }

    /// Boolean primitive.
    pub fn bool() -> TypeTemplate {
        leaf(Arc::new(CodecType::new("bool", BOOL)))
    }
}
