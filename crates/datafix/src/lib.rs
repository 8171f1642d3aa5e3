//! # datafix
//!
//! Schema-versioned data migration for long-lived persisted data.
//!
//! Data written by an old version of a program is loaded into a
//! representation-agnostic [`Dynamic`], migrated by a [`DataFixer`] one schema
//! version at a time, and finally decoded with a typed [`Codec`](codec::Codec).
//! The engine never touches bytes: format adapters (such as `datafix-json`)
//! implement [`DynamicOps`] for their own tree type.
//!
//! ## How It Works
//!
//! 1. Every schema version registers the [`Type`](types::Type)s it knows
//!    under stable [`TypeReference`]s, usually via the [`types::dsl`].
//! 2. Each change between two neighboring versions is a [`Fix`]: a
//!    [`TypeRewriteRule`] for one type on one version edge.
//! 3. [`DataFixer::update`] walks the versions between the data's version
//!    and the target, applying the fixes of each edge in registration order.
//!
//! ## Key Concepts
//!
//! - **No rule, no change**: an edge without fixes for a type leaves the
//!   value as it is.
//! - **Immutable values**: every operation returns a new value, so a failed
//!   migration never leaves half-migrated data behind.
//! - **Two error channels**: data problems are [`DataResult`]s; misuse of
//!   the registries and fixer comes back as typed errors.
//! - **Frozen after bootstrap**: registries reject writes once frozen and
//!   are then safe to share between threads.
//!
//! ## Example
//!
//! ```
//! use datafix::prelude::*;
//!
//! let player = TypeReference::new("player");
//! let v = DataVersion::new;
//!
//! let mut builder = DataFixerBuilder::<ValueOps>::new();
//! for version in [1, 2, 3] {
//!     builder.add_schema(Schema::new(v(version))).unwrap();
//! }
//! builder
//!     .add_fix(Fix::with_rule(
//!         "rename playerName",
//!         player.clone(),
//!         v(1),
//!         v(2),
//!         fixes::rename_field(player.clone(), "playerName", "name"),
//!     ))
//!     .add_fix(Fix::with_rule(
//!         "add score",
//!         player.clone(),
//!         v(2),
//!         v(3),
//!         fixes::add_field(player.clone(), "score", Value::from(0)),
//!     ));
//! let fixer = builder.build().unwrap();
//!
//! let old = Dynamic::new(ValueOps, Value::map([("playerName", Value::from("Steve"))]));
//! let new = fixer.update_to_current(&player, old, v(1)).unwrap();
//! assert_eq!(
//!     new.value(),
//!     &Value::map([("name", Value::from("Steve")), ("score", Value::from(0))])
//! );
//! ```

pub mod codec;
mod dynamic;
pub mod error;
pub mod fixer;
pub mod fixes;
mod ops;
pub mod prelude;
mod result;
pub mod rewrite;
pub mod schema;
pub mod types;
mod value;

pub use dynamic::{Dynamic, TaggedDynamic};
pub use error::{DataError, FixerError, RuleError, SchemaError, TemplateError};
pub use fixer::{DataFixer, DataFixerBuilder, Fix, FixerConfig};
pub use ops::{DynamicOps, Number};
pub use result::DataResult;
pub use rewrite::TypeRewriteRule;
pub use schema::{DataVersion, Schema, SchemaRegistry};
pub use types::{Type, TypeReference, TypeRegistry, TypeTemplate};
pub use value::{Value, ValueOps};

// Re-export proc macros when the `macros` feature is enabled.
#[cfg(feature = "macros")]
pub use datafix_macros::data_fix;
