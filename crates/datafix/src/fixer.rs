//! The migration engine.
//!
//! A [`DataFixer`] owns a frozen [`SchemaRegistry`] and the [`Fix`]es that
//! join its versions. [`DataFixer::update`] walks the registered versions
//! between two endpoints one edge at a time and applies every fix registered
//! for that edge and the value's type. Edges without fixes are no-ops.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dynamic::{Dynamic, TaggedDynamic};
use crate::error::{FixerError, SchemaError};
use crate::ops::DynamicOps;
use crate::rewrite::TypeRewriteRule;
use crate::schema::{DataVersion, Schema, SchemaRegistry};
use crate::types::TypeReference;

/// A transform that may abort the update with a reason.
pub type TryTransform<O> = dyn Fn(Dynamic<O>) -> Result<Dynamic<O>, String> + Send + Sync;

enum FixBody<O: DynamicOps> {
    Rule(TypeRewriteRule<O>),
    Fallible(Arc<TryTransform<O>>),
}

impl<O: DynamicOps> Clone for FixBody<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Rule(rule) => Self::Rule(rule.clone()),
            Self::Fallible(transform) => Self::Fallible(Arc::clone(transform)),
        }
    }
}

/// A single transformation of one type across one version edge.
pub struct Fix<O: DynamicOps> {
    name: String,
    type_ref: TypeReference,
    from: DataVersion,
    to: DataVersion,
    body: FixBody<O>,
}

impl<O: DynamicOps> Fix<O> {
    /// A fix running `transform` on values of `type_ref`.
    pub fn new<F>(name: &str, type_ref: TypeReference, from: DataVersion, to: DataVersion, transform: F) -> Self
    where
        F: Fn(Dynamic<O>) -> Dynamic<O> + Send + Sync + 'static,
    {
        let rule = TypeRewriteRule::for_type(type_ref.clone(), name, transform);
        Self::with_rule(name, type_ref, from, to, rule)
    }

    /// A fix whose transform may fail. An `Err` aborts the whole
    /// [`DataFixer::update`] with [`FixerError::FixFailed`].
    pub fn try_new<F>(name: &str, type_ref: TypeReference, from: DataVersion, to: DataVersion, transform: F) -> Self
    where
        F: Fn(Dynamic<O>) -> Result<Dynamic<O>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            type_ref,
            from,
            to,
            body: FixBody::Fallible(Arc::new(transform)),
        }
    }

    /// A fix backed by an arbitrary rule.
    ///
    /// The fixer only runs the rule for values of `type_ref`.
    pub fn with_rule(
        name: &str,
        type_ref: TypeReference,
        from: DataVersion,
        to: DataVersion,
        rule: TypeRewriteRule<O>,
    ) -> Self {
        Self {
            name: name.to_string(),
            type_ref,
            from,
            to,
            body: FixBody::Rule(rule),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type this fix migrates.
    pub fn type_ref(&self) -> &TypeReference {
        &self.type_ref
    }

    /// Source version.
    pub fn from(&self) -> DataVersion {
        self.from
    }

    /// Target version.
    pub fn to(&self) -> DataVersion {
        self.to
    }

    /// The rule the fix applies, or `None` for a fallible fix.
    pub fn rule(&self) -> Option<&TypeRewriteRule<O>> {
        match &self.body {
            FixBody::Rule(rule) => Some(rule),
            FixBody::Fallible(_) => None,
        }
    }

    /// Returns true if the fix was built with [`try_new`](Self::try_new).
    pub fn is_fallible(&self) -> bool {
        matches!(self.body, FixBody::Fallible(_))
    }

    // A rule that does not match leaves the value as it was.
    fn run(&self, type_ref: &TypeReference, input: Dynamic<O>, edge: Edge) -> Result<Dynamic<O>, FixerError> {
        if type_ref != &self.type_ref {
            return Ok(input);
        }
        match &self.body {
            FixBody::Rule(rule) => Ok(rule.apply(type_ref, &input)),
            FixBody::Fallible(transform) => transform(input).map_err(|reason| FixerError::FixFailed {
                fix: self.name.clone(),
                from: edge.0,
                to: edge.1,
                reason,
            }),
        }
    }
}

impl<O: DynamicOps> Clone for Fix<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            type_ref: self.type_ref.clone(),
            from: self.from,
            to: self.to,
            body: self.body.clone(),
        }
    }
}

impl<O: DynamicOps> fmt::Debug for Fix<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fix")
            .field("name", &self.name)
            .field("type_ref", &self.type_ref)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("fallible", &self.is_fallible())
            .finish()
    }
}

/// Configuration for the data fixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// If true, every fix must join two neighboring schema versions.
    /// Otherwise a fix runs on the edge that arrives at its target version.
    pub strict_edges: bool,
    /// If true, `update` accepts a target below the source version.
    pub allow_downgrade: bool,
    /// If true, a downgrade edge without its own fixes reuses the fixes
    /// registered for the opposite direction.
    pub reverse_fixes_on_downgrade: bool,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            strict_edges: true,
            allow_downgrade: true,
            reverse_fixes_on_downgrade: true,
        }
    }
}

/// Collects schemas and fixes, then validates them into a [`DataFixer`].
pub struct DataFixerBuilder<O: DynamicOps> {
    schemas: SchemaRegistry,
    fixes: Vec<Fix<O>>,
    config: FixerConfig,
}

impl<O: DynamicOps> Default for DataFixerBuilder<O> {
    fn default() -> Self {
        Self {
            schemas: SchemaRegistry::new(),
            fixes: Vec::new(),
            config: FixerConfig::default(),
        }
    }
}

impl<O: DynamicOps> DataFixerBuilder<O> {
    /// An empty builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: FixerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a schema. Versions must be unique.
    pub fn add_schema(&mut self, schema: impl Into<Arc<Schema>>) -> Result<&mut Self, FixerError> {
        self.schemas.register(schema)?;
        Ok(self)
    }

    /// Register a fix. Fixes on the same edge and type run in the order
    /// they are added.
    pub fn add_fix(&mut self, fix: Fix<O>) -> &mut Self {
        self.fixes.push(fix);
        self
    }

    /// Freeze the schemas, build their types, validate every fix and index
    /// the fixes by edge.
    pub fn build(mut self) -> Result<DataFixer<O>, FixerError> {
        self.schemas.freeze();
        let current = self.schemas.latest()?.version();
        self.check_schemas()?;

        let mut edges: BTreeMap<Edge, BTreeMap<TypeReference, Vec<Fix<O>>>> = BTreeMap::new();
        for fix in &self.fixes {
            let edge = self.edge_for(fix)?;
            trace!(fix = %fix.name, from = %edge.0, to = %edge.1, "indexing fix");
            edges
                .entry(edge)
                .or_default()
                .entry(fix.type_ref.clone())
                .or_default()
                .push(fix.clone());
        }

        debug!(
            schemas = self.schemas.len(),
            fixes = self.fixes.len(),
            current = %current,
            "built data fixer"
        );
        Ok(DataFixer {
            schemas: self.schemas,
            fixes: self.fixes,
            edges,
            current,
            config: self.config,
        })
    }

    // Parents must be the registered schema of their version, and every
    // registration hook runs once here instead of on first use.
    fn check_schemas(&self) -> Result<(), FixerError> {
        for version in self.schemas.versions() {
            let schema = self.schemas.require(version)?;
            if let Some(parent) = schema.parent() {
                let registered = self
                    .schemas
                    .get(parent.version())
                    .is_some_and(|known| Arc::ptr_eq(known, parent));
                if !registered {
                    return Err(FixerError::Schema(SchemaError::UnregisteredParent {
                        version,
                        parent: parent.version(),
                    }));
                }
            }
            schema.types()?;
        }
        Ok(())
    }

    fn edge_for(&self, fix: &Fix<O>) -> Result<Edge, FixerError> {
        for version in [fix.from, fix.to] {
            if self.schemas.get(version).is_none() {
                return Err(FixerError::UnknownFixVersion {
                    fix: fix.name.clone(),
                    version,
                });
            }
        }
        if fix.from == fix.to {
            return Err(FixerError::EmptyEdge {
                fix: fix.name.clone(),
                version: fix.from,
            });
        }
        if self.schemas.adjacent(fix.from, fix.to) {
            return Ok((fix.from, fix.to));
        }
        if self.config.strict_edges {
            return Err(FixerError::NonAdjacentEdge {
                fix: fix.name.clone(),
                from: fix.from,
                to: fix.to,
            });
        }
        // The last step of the walk from `from` to `to`.
        let path = self.schemas.path(fix.from, fix.to)?;
        match path.as_slice() {
            [.., before, last] => Ok((*before, *last)),
            _ => Err(FixerError::Schema(SchemaError::UnknownVersion { version: fix.to })),
        }
    }
}

type Edge = (DataVersion, DataVersion);

/// Migrates dynamic values between schema versions.
///
/// Immutable once built; share it freely across threads.
///
/// # Example
///
/// ```
/// use datafix::fixes;
/// use datafix::{DataFixerBuilder, DataVersion, Dynamic, Fix, Schema, TypeReference, Value, ValueOps};
///
/// let player = TypeReference::new("player");
/// let v = DataVersion::new;
///
/// let mut builder = DataFixerBuilder::<ValueOps>::new();
/// builder.add_schema(Schema::new(v(1))).unwrap();
/// builder.add_schema(Schema::new(v(2))).unwrap();
/// builder.add_fix(Fix::with_rule(
///     "rename player name",
///     player.clone(),
///     v(1),
///     v(2),
///     fixes::rename_field(player.clone(), "playerName", "name"),
/// ));
/// let fixer = builder.build().unwrap();
///
/// let input = Dynamic::new(ValueOps, Value::map([("playerName", Value::from("Steve"))]));
/// let output = fixer.update(&player, input, v(1), v(2)).unwrap();
/// assert_eq!(output.value(), &Value::map([("name", Value::from("Steve"))]));
/// ```
pub struct DataFixer<O: DynamicOps> {
    schemas: SchemaRegistry,
    fixes: Vec<Fix<O>>,
    edges: BTreeMap<Edge, BTreeMap<TypeReference, Vec<Fix<O>>>>,
    current: DataVersion,
    config: FixerConfig,
}

impl<O: DynamicOps> DataFixer<O> {
    /// Migrate `input`, a value of `type_ref`, from `from` to `to`.
    ///
    /// Equal versions return the input untouched. Both versions must have
    /// a registered schema. Types without fixes pass through unchanged. The
    /// first failing fix aborts the walk with [`FixerError::FixFailed`].
    pub fn update(
        &self,
        type_ref: &TypeReference,
        input: Dynamic<O>,
        from: DataVersion,
        to: DataVersion,
    ) -> Result<Dynamic<O>, FixerError> {
        if to < from && !self.config.allow_downgrade {
            return Err(FixerError::DowngradeDisabled { from, to });
        }
        let path = self.schemas.path(from, to)?;
        if path.len() < 2 {
            debug!(type_ref = %type_ref, version = %from, "identity migration");
            return Ok(input);
        }

        let mut value = input;
        for step in path.windows(2) {
            value = self.step(type_ref, value, step[0], step[1])?;
        }
        Ok(value)
    }

    /// Migrate a [`TaggedDynamic`], keeping its type reference.
    pub fn update_tagged(
        &self,
        input: TaggedDynamic<O>,
        from: DataVersion,
        to: DataVersion,
    ) -> Result<TaggedDynamic<O>, FixerError> {
        let value = self.update(&input.type_ref, input.value, from, to)?;
        Ok(TaggedDynamic::new(input.type_ref, value))
    }

    /// Migrate from `from` to the newest registered version.
    pub fn update_to_current(
        &self,
        type_ref: &TypeReference,
        input: Dynamic<O>,
        from: DataVersion,
    ) -> Result<Dynamic<O>, FixerError> {
        self.update(type_ref, input, from, self.current)
    }

    fn step(
        &self,
        type_ref: &TypeReference,
        value: Dynamic<O>,
        from: DataVersion,
        to: DataVersion,
    ) -> Result<Dynamic<O>, FixerError> {
        let fixes = self.fixes_for(type_ref, (from, to)).or_else(|| {
            if from > to && self.config.reverse_fixes_on_downgrade {
                self.fixes_for(type_ref, (to, from))
            } else {
                None
            }
        });
        let Some(fixes) = fixes else {
            trace!(type_ref = %type_ref, from = %from, to = %to, "no fixes on edge");
            return Ok(value);
        };
        fixes.iter().try_fold(value, |value, fix| {
            trace!(type_ref = %type_ref, from = %from, to = %to, fix = %fix.name, "applying fix");
            fix.run(type_ref, value, (from, to))
        })
    }

    fn fixes_for(&self, type_ref: &TypeReference, edge: Edge) -> Option<&[Fix<O>]> {
        self.edges
            .get(&edge)
            .and_then(|by_type| by_type.get(type_ref))
            .map(Vec::as_slice)
    }

    /// The newest registered version.
    pub fn current_version(&self) -> DataVersion {
        self.current
    }

    /// Returns true if data at `version` is older than the current version.
    pub fn needs_update(&self, version: DataVersion) -> bool {
        version < self.current
    }

    /// The frozen schema registry.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// All fixes, in registration order.
    pub fn registered_fixes(&self) -> &[Fix<O>] {
        &self.fixes
    }

    /// The configuration the fixer was built with.
    pub fn config(&self) -> &FixerConfig {
        &self.config
    }
}

impl<O: DynamicOps> fmt::Debug for DataFixer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFixer")
            .field("versions", &self.schemas.versions())
            .field("fixes", &self.fixes)
            .field("current", &self.current)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixes;
    use crate::value::{Value, ValueOps};

    fn v(version: u32) -> DataVersion {
        DataVersion::new(version)
    }

    fn player() -> TypeReference {
        TypeReference::new("player")
    }

    fn builder(versions: &[u32]) -> DataFixerBuilder<ValueOps> {
        let mut builder = DataFixerBuilder::new();
        for version in versions {
            builder.add_schema(Schema::new(v(*version))).unwrap();
        }
        builder
    }

    fn dynamic(value: Value) -> Dynamic<ValueOps> {
        Dynamic::new(ValueOps, value)
    }

    #[test]
    fn empty_builder_fails() {
        let err = DataFixerBuilder::<ValueOps>::new().build().unwrap_err();
        assert_eq!(err, FixerError::Schema(SchemaError::Empty));
    }

    #[test]
    fn unknown_fix_version_rejected() {
        let mut builder = builder(&[1, 2]);
        builder.add_fix(Fix::new("bad", player(), v(1), v(3), |d| d));
        assert_eq!(
            builder.build().unwrap_err(),
            FixerError::UnknownFixVersion {
                fix: "bad".to_string(),
                version: v(3)
            }
        );
    }

    #[test]
    fn empty_edge_rejected() {
        let mut builder = builder(&[1, 2]);
        builder.add_fix(Fix::new("loop", player(), v(1), v(1), |d| d));
        assert!(matches!(builder.build(), Err(FixerError::EmptyEdge { .. })));
    }

    #[test]
    fn strict_edges_reject_skips() {
        let mut builder = builder(&[1, 2, 3]);
        builder.add_fix(Fix::new("skip", player(), v(1), v(3), |d| d));
        assert!(matches!(builder.build(), Err(FixerError::NonAdjacentEdge { .. })));
    }

    #[test]
    fn lenient_edges_run_on_arrival() {
        let mut builder = builder(&[1, 2, 3]).with_config(FixerConfig {
            strict_edges: false,
            ..FixerConfig::default()
        });
        builder.add_fix(Fix::with_rule(
            "skip",
            player(),
            v(1),
            v(3),
            fixes::add_field(player(), "late", Value::from(true)),
        ));
        let fixer = builder.build().unwrap();
        let input = dynamic(Value::map::<&str>([]));
        let at_two = fixer.update(&player(), input.clone(), v(1), v(2)).unwrap();
        assert_eq!(at_two, input);
        let at_three = fixer.update(&player(), input, v(1), v(3)).unwrap();
        assert!(at_three.has("late"));
    }

    #[test]
    fn equal_versions_return_input() {
        let mut builder = builder(&[1, 2]);
        builder.add_fix(Fix::new("wipe", player(), v(1), v(2), |d| d.empty_map()));
        let fixer = builder.build().unwrap();
        let input = dynamic(Value::map([("a", Value::from(1))]));
        assert_eq!(fixer.update(&player(), input.clone(), v(2), v(2)).unwrap(), input);
    }

    #[test]
    fn unknown_endpoint_is_error() {
        let fixer = builder(&[1, 2]).build().unwrap();
        let err = fixer
            .update(&player(), dynamic(Value::Empty), v(1), v(5))
            .unwrap_err();
        assert_eq!(
            err,
            FixerError::Schema(SchemaError::UnknownVersion { version: v(5) })
        );
    }

    #[test]
    fn fixes_on_one_edge_run_in_order() {
        let mut builder = builder(&[1, 2]);
        builder
            .add_fix(Fix::new("first", player(), v(1), v(2), |d| {
                d.set("trace", d.create_string("first"))
            }))
            .add_fix(Fix::with_rule(
                "never",
                player(),
                v(1),
                v(2),
                TypeRewriteRule::fail(),
            ))
            .add_fix(Fix::new("second", player(), v(1), v(2), |d| {
                let seen = d.get("trace").flat_map(|t| t.as_string()).result().unwrap_or_default();
                d.set("trace", d.create_string(&format!("{seen},second")))
            }));
        let fixer = builder.build().unwrap();
        let output = fixer
            .update(&player(), dynamic(Value::map::<&str>([])), v(1), v(2))
            .unwrap();
        assert_eq!(
            output.get("trace").flat_map(|t| t.as_string()).result().as_deref(),
            Some("first,second")
        );
    }

    #[test]
    fn failing_fix_aborts_the_update() {
        let mut builder = builder(&[1, 2, 3]);
        builder
            .add_fix(Fix::new("score", player(), v(1), v(2), |d| d.set("score", d.create_int(0))))
            .add_fix(Fix::try_new("needs name", player(), v(2), v(3), |d| {
                if d.has("name") {
                    Ok(d)
                } else {
                    Err("player has no name".to_string())
                }
            }))
            .add_fix(Fix::new("never reached", player(), v(2), v(3), |d| d.set("late", d.create_bool(true))));
        let fixer = builder.build().unwrap();

        let input = dynamic(Value::map([("nick", Value::from("steve"))]));
        let kept = input.clone();
        let err = fixer.update(&player(), input, v(1), v(3)).unwrap_err();
        assert_eq!(
            err,
            FixerError::FixFailed {
                fix: "needs name".to_string(),
                from: v(2),
                to: v(3),
                reason: "player has no name".to_string(),
            }
        );
        assert_eq!(kept.value(), &Value::map([("nick", Value::from("steve"))]));

        let named = dynamic(Value::map([("name", Value::from("Steve"))]));
        let output = fixer.update(&player(), named, v(1), v(3)).unwrap();
        assert!(output.has("score"));
        assert!(output.has("late"));
    }

    #[test]
    fn fallible_fix_ignores_other_types() {
        let mut builder = builder(&[1, 2]);
        builder.add_fix(Fix::try_new("reject", player(), v(1), v(2), |_| Err("no".to_string())));
        let fixer = builder.build().unwrap();
        let input = dynamic(Value::map::<&str>([]));
        let world = TypeReference::new("world");
        assert_eq!(fixer.update(&world, input.clone(), v(1), v(2)).unwrap(), input);
        assert!(fixer.registered_fixes()[0].is_fallible());
        assert!(fixer.registered_fixes()[0].rule().is_none());
    }

    #[test]
    fn build_runs_schema_type_hooks() {
        let mut builder = DataFixerBuilder::<ValueOps>::new();
        builder
            .add_schema(Schema::new(v(1)).register_types(|_| {
                Err(SchemaError::UnknownType {
                    reference: TypeReference::new("missing"),
                })
            }))
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            FixerError::Schema(SchemaError::UnknownType {
                reference: TypeReference::new("missing")
            })
        );
    }

    #[test]
    fn build_rejects_unregistered_parent() {
        let orphan_parent = Arc::new(Schema::new(v(1)));
        let mut builder = builder(&[1]);
        builder
            .add_schema(Schema::new(v(2)).extends(orphan_parent))
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            FixerError::Schema(SchemaError::UnregisteredParent {
                version: v(2),
                parent: v(1)
            })
        );
    }

    #[test]
    fn downgrade_prefers_exact_fixes() {
        let mut builder = builder(&[1, 2]);
        builder
            .add_fix(Fix::with_rule(
                "up",
                player(),
                v(1),
                v(2),
                fixes::rename_field(player(), "a", "b"),
            ))
            .add_fix(Fix::with_rule(
                "down",
                player(),
                v(2),
                v(1),
                fixes::rename_field(player(), "b", "c"),
            ));
        let fixer = builder.build().unwrap();
        let output = fixer
            .update(&player(), dynamic(Value::map([("b", Value::from(1))])), v(2), v(1))
            .unwrap();
        assert_eq!(output.value(), &Value::map([("c", Value::from(1))]));
    }

    #[test]
    fn downgrade_can_be_disabled() {
        let fixer = builder(&[1, 2])
            .with_config(FixerConfig {
                allow_downgrade: false,
                ..FixerConfig::default()
            })
            .build()
            .unwrap();
        assert_eq!(
            fixer
                .update(&player(), dynamic(Value::Empty), v(2), v(1))
                .unwrap_err(),
            FixerError::DowngradeDisabled { from: v(2), to: v(1) }
        );
    }

    #[test]
    fn no_reverse_reuse_when_disabled() {
        let mut builder = builder(&[1, 2]).with_config(FixerConfig {
            reverse_fixes_on_downgrade: false,
            ..FixerConfig::default()
        });
        builder.add_fix(Fix::with_rule(
            "mark",
            player(),
            v(1),
            v(2),
            fixes::set_field(player(), "marked", Value::from(true)),
        ));
        let fixer = builder.build().unwrap();
        let input = dynamic(Value::map::<&str>([]));
        assert_eq!(fixer.update(&player(), input.clone(), v(2), v(1)).unwrap(), input);
    }

    #[test]
    fn current_version_and_needs_update() {
        let fixer = builder(&[1, 4, 2]).build().unwrap();
        assert_eq!(fixer.current_version(), v(4));
        assert!(fixer.needs_update(v(2)));
        assert!(!fixer.needs_update(v(4)));
        assert!(fixer.schemas().is_frozen());
        assert!(fixer.registered_fixes().is_empty());
    }

    #[test]
    fn config_defaults_from_partial_json() {
        let config: FixerConfig = serde_json::from_str(r#"{"allow_downgrade": false}"#).unwrap();
        assert_eq!(
            config,
            FixerConfig {
                allow_downgrade: false,
                ..FixerConfig::default()
            }
        );
        let round_trip: FixerConfig =
            serde_json::from_value(serde_json::to_value(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn fixer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DataFixer<ValueOps>>();
    }
}
