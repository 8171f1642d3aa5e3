//! Error types for integrity failures.
//!
//! Data problems travel through [`DataResult`](crate::DataResult). The enums
//! here report misuse of the registries, rules and fixer: registering after a
//! freeze, asking for a version that was never registered, forcing a rule that
//! does not match. The operation that returns one of these has not mutated
//! anything.

use crate::schema::DataVersion;
use crate::types::TypeReference;

/// A recoverable data failure converted into a standard error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DataError {
    /// The message carried by the originating [`DataResult`](crate::DataResult).
    pub message: String,
}

impl DataError {
    /// Create a new error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Instantiating a type template failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    /// The template referenced a family member that the family does not bind.
    #[error("type family has no member at index {index}")]
    UnboundFamilyIndex { index: usize },
}

/// Misuse of a schema, schema registry or type registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// A registration was attempted on a frozen registry.
    #[error("registry is frozen: cannot register {what}")]
    Frozen { what: String },
    /// Two schemas were registered for the same version.
    #[error("a schema for {version} is already registered")]
    DuplicateVersion { version: DataVersion },
    /// No schema exists for the requested version.
    #[error("no schema registered for {version}")]
    UnknownVersion { version: DataVersion },
    /// `latest` was called on a registry without schemas.
    #[error("schema registry is empty")]
    Empty,
    /// No type is registered under the requested reference.
    #[error("no type registered for `{reference}`")]
    UnknownType { reference: TypeReference },
    /// A type without a reference cannot be registered by itself.
    #[error("type `{description}` has no reference and cannot be registered")]
    MissingReference { description: String },
    /// A schema extends a parent that is not the schema registered for
    /// the parent's version.
    #[error("schema {version} extends {parent}, which is not registered")]
    UnregisteredParent {
        version: DataVersion,
        parent: DataVersion,
    },
    /// A template could not be instantiated while registering `reference`.
    #[error("template for `{reference}` failed: {source}")]
    Template {
        reference: TypeReference,
        #[source]
        source: TemplateError,
    },
}

/// A strict rule application did not match.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// The rule was not applicable to a value of the given type.
    #[error("rule `{rule}` is not applicable to `{reference}`")]
    NotApplicable {
        rule: String,
        reference: TypeReference,
    },
}

/// Misconfiguration of the data fixer or an invalid `update` request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixerError {
    /// A schema or registry operation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A fix names a version that has no schema.
    #[error("fix `{fix}` references {version}, which has no schema")]
    UnknownFixVersion { fix: String, version: DataVersion },
    /// A fix joins two versions that are not neighbors in the schema registry.
    #[error("fix `{fix}` spans {from}→{to}, which are not adjacent schema versions")]
    NonAdjacentEdge {
        fix: String,
        from: DataVersion,
        to: DataVersion,
    },
    /// A fix starts and ends on the same version.
    #[error("fix `{fix}` starts and ends at {version}")]
    EmptyEdge { fix: String, version: DataVersion },
    /// A fallible fix reported a fatal error; the whole update is aborted.
    #[error("fix `{fix}` failed on {from}→{to}: {reason}")]
    FixFailed {
        fix: String,
        from: DataVersion,
        to: DataVersion,
        reason: String,
    },
    /// A downgrade was requested while downgrades are disabled.
    #[error("downgrade from {from} to {to} is disabled")]
    DowngradeDisabled { from: DataVersion, to: DataVersion },
}
