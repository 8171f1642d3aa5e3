//! Composable rewrite rules over dynamic values.
//!
//! A [`TypeRewriteRule`] either matches a `(type, value)` pair and produces a
//! rewritten value, or reports itself not applicable. Rules are plain data:
//! combinators build bigger rules out of smaller ones and the resulting tree
//! can be inspected through [`name`](TypeRewriteRule::name).

use core::fmt;
use std::sync::Arc;

use crate::dynamic::Dynamic;
use crate::error::RuleError;
use crate::ops::DynamicOps;
use crate::types::TypeReference;

/// A stateless value transform shared between rule instances.
pub type Transform<O> = dyn Fn(Dynamic<O>) -> Dynamic<O> + Send + Sync;

/// A rewrite rule.
///
/// # Example
///
/// ```
/// use datafix::{Dynamic, TypeReference, TypeRewriteRule, Value, ValueOps};
///
/// let player = TypeReference::new("player");
/// let rename = TypeRewriteRule::for_type(player.clone(), "rename playerName", |d: Dynamic<ValueOps>| {
///     d.rename_field("playerName", "name")
/// });
///
/// let input = Dynamic::new(ValueOps, Value::map([("playerName", Value::from("Steve"))]));
/// let output = rename.apply(&player, &input);
/// assert!(output.has("name"));
///
/// // Other types are left alone.
/// let world = TypeReference::new("world");
/// assert_eq!(rename.apply(&world, &input), input);
/// assert!(rename.apply_or_throw(&world, &input).is_err());
/// ```
pub enum TypeRewriteRule<O: DynamicOps> {
    /// Always applicable; returns the input.
    Identity,
    /// Never applicable.
    Fail,
    /// Always applicable; runs the transform.
    Simple {
        name: String,
        transform: Arc<Transform<O>>,
    },
    /// Applicable only to values of `reference`.
    ForType {
        reference: TypeReference,
        name: String,
        transform: Arc<Transform<O>>,
    },
    /// Both rules in sequence; inapplicable if either is.
    AndThen(Arc<TypeRewriteRule<O>>, Arc<TypeRewriteRule<O>>),
    /// The first rule, or the second where the first does not apply.
    OrElse(Arc<TypeRewriteRule<O>>, Arc<TypeRewriteRule<O>>),
    /// The rule, or the unchanged input where it does not apply.
    OrKeep(Arc<TypeRewriteRule<O>>),
    /// The rule, restricted to values of `reference`.
    IfType(TypeReference, Arc<TypeRewriteRule<O>>),
}

impl<O: DynamicOps> TypeRewriteRule<O> {
    /// The rule that matches everything and changes nothing.
    pub fn identity() -> Self {
        Self::Identity
    }

    /// The rule that matches nothing.
    pub fn fail() -> Self {
        Self::Fail
    }

    /// An unconditional transform.
    pub fn simple<F>(name: &str, transform: F) -> Self
    where
        F: Fn(Dynamic<O>) -> Dynamic<O> + Send + Sync + 'static,
    {
        Self::Simple {
            name: name.to_string(),
            transform: Arc::new(transform),
        }
    }

    /// A transform for values of `reference` only.
    pub fn for_type<F>(reference: TypeReference, name: &str, transform: F) -> Self
    where
        F: Fn(Dynamic<O>) -> Dynamic<O> + Send + Sync + 'static,
    {
        Self::ForType {
            reference,
            name: name.to_string(),
            transform: Arc::new(transform),
        }
    }

    /// Run `self`, then `next` on its output.
    pub fn and_then(self, next: Self) -> Self {
        Self::AndThen(Arc::new(self), Arc::new(next))
    }

    /// Run `self`, falling back to `fallback` where `self` does not apply.
    pub fn or_else(self, fallback: Self) -> Self {
        Self::OrElse(Arc::new(self), Arc::new(fallback))
    }

    /// Make the rule total: a non-match returns the input unchanged.
    pub fn or_keep(self) -> Self {
        Self::OrKeep(Arc::new(self))
    }

    /// Restrict the rule to values of `reference`.
    pub fn if_type(self, reference: TypeReference) -> Self {
        Self::IfType(reference, Arc::new(self))
    }

    /// Chain `rules` with [`and_then`](Self::and_then) in iteration order.
    ///
    /// An empty sequence is the identity.
    pub fn seq(rules: impl IntoIterator<Item = Self>) -> Self {
        rules
            .into_iter()
            .reduce(Self::and_then)
            .unwrap_or(Self::Identity)
    }

    /// A readable rendering of the rule tree.
    pub fn name(&self) -> String {
        match self {
            Self::Identity => "identity".to_string(),
            Self::Fail => "fail".to_string(),
            Self::Simple { name, .. } => name.clone(),
            Self::ForType {
                reference, name, ..
            } => format!("{name}@{reference}"),
            Self::AndThen(first, second) => format!("({} then {})", first.name(), second.name()),
            Self::OrElse(first, second) => format!("({} or {})", first.name(), second.name()),
            Self::OrKeep(rule) => format!("{}?", rule.name()),
            Self::IfType(reference, rule) => format!("[{reference}] {}", rule.name()),
        }
    }

    /// Rewrite `input`, declared as `reference`.
    ///
    /// Returns `None` when the rule is not applicable.
    pub fn rewrite(&self, reference: &TypeReference, input: &Dynamic<O>) -> Option<Dynamic<O>> {
        match self {
            Self::Identity => Some(input.clone()),
            Self::Fail => None,
            Self::Simple { transform, .. } => Some(transform(input.clone())),
            Self::ForType {
                reference: target,
                transform,
                ..
            } => (target == reference).then(|| transform(input.clone())),
            Self::AndThen(first, second) => first
                .rewrite(reference, input)
                .and_then(|mid| second.rewrite(reference, &mid)),
            Self::OrElse(first, second) => first
                .rewrite(reference, input)
                .or_else(|| second.rewrite(reference, input)),
            Self::OrKeep(rule) => Some(
                rule.rewrite(reference, input)
                    .unwrap_or_else(|| input.clone()),
            ),
            Self::IfType(target, rule) => {
                if target == reference {
                    rule.rewrite(reference, input)
                } else {
                    None
                }
            }
        }
    }

    /// Rewrite `input`, or return it unchanged when the rule does not apply.
    pub fn apply(&self, reference: &TypeReference, input: &Dynamic<O>) -> Dynamic<O> {
        self.rewrite(reference, input)
            .unwrap_or_else(|| input.clone())
    }

    /// Rewrite `input`, failing when the rule does not apply.
    pub fn apply_or_throw(
        &self,
        reference: &TypeReference,
        input: &Dynamic<O>,
    ) -> Result<Dynamic<O>, RuleError> {
        self.rewrite(reference, input)
            .ok_or_else(|| RuleError::NotApplicable {
                rule: self.name(),
                reference: reference.clone(),
            })
    }
}

impl<O: DynamicOps> Clone for TypeRewriteRule<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Identity => Self::Identity,
            Self::Fail => Self::Fail,
            Self::Simple { name, transform } => Self::Simple {
                name: name.clone(),
                transform: Arc::clone(transform),
            },
            Self::ForType {
                reference,
                name,
                transform,
            } => Self::ForType {
                reference: reference.clone(),
                name: name.clone(),
                transform: Arc::clone(transform),
            },
            Self::AndThen(a, b) => Self::AndThen(Arc::clone(a), Arc::clone(b)),
            Self::OrElse(a, b) => Self::OrElse(Arc::clone(a), Arc::clone(b)),
            Self::OrKeep(rule) => Self::OrKeep(Arc::clone(rule)),
            Self::IfType(reference, rule) => Self::IfType(reference.clone(), Arc::clone(rule)),
        }
    }
}

impl<O: DynamicOps> fmt::Display for TypeRewriteRule<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl<O: DynamicOps> fmt::Debug for TypeRewriteRule<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRewriteRule({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueOps};
    use proptest::prelude::*;

    type Rule = TypeRewriteRule<ValueOps>;

    fn player() -> TypeReference {
        TypeReference::new("player")
    }

    fn world() -> TypeReference {
        TypeReference::new("world")
    }

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::identity(),
            Rule::fail(),
            Rule::simple("mark", |d| d.set("marked", d.create_bool(true))),
            Rule::for_type(player(), "rename", |d| d.rename_field("a", "b")),
            Rule::for_type(world(), "drop", |d| d.remove("a")),
            Rule::simple("bump", |d| d.update("n", |n| {
                let next = n.as_i64().result().unwrap_or(0) + 1;
                n.create_long(next)
            }))
            .if_type(player()),
        ]
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Empty),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::btree_map("[abn]", inner, 0..4).prop_map(Value::Map),
            ]
        })
    }

    fn reference_strategy() -> impl Strategy<Value = TypeReference> {
        prop_oneof![Just(player()), Just(world())]
    }

    proptest! {
        #[test]
        fn identity_is_unit_of_and_then(
            index in 0usize..6,
            reference in reference_strategy(),
            value in value_strategy(),
        ) {
            let rule = sample_rules()[index].clone();
            let input = Dynamic::new(ValueOps, value);
            let plain = rule.rewrite(&reference, &input);
            let left = Rule::identity().and_then(rule.clone()).rewrite(&reference, &input);
            let right = rule.and_then(Rule::identity()).rewrite(&reference, &input);
            prop_assert_eq!(&left, &plain);
            prop_assert_eq!(&right, &plain);
        }

        #[test]
        fn fail_is_unit_of_or_else(
            index in 0usize..6,
            reference in reference_strategy(),
            value in value_strategy(),
        ) {
            let rule = sample_rules()[index].clone();
            let input = Dynamic::new(ValueOps, value);
            let plain = rule.rewrite(&reference, &input);
            let left = Rule::fail().or_else(rule.clone()).rewrite(&reference, &input);
            let right = rule.or_else(Rule::fail()).rewrite(&reference, &input);
            prop_assert_eq!(&left, &plain);
            prop_assert_eq!(&right, &plain);
        }

        #[test]
        fn or_keep_is_total(
            index in 0usize..6,
            reference in reference_strategy(),
            value in value_strategy(),
        ) {
            let rule = sample_rules()[index].clone().or_keep();
            let input = Dynamic::new(ValueOps, value);
            prop_assert!(rule.rewrite(&reference, &input).is_some());
        }
    }

    #[test]
    fn and_then_short_circuits() {
        let input = Dynamic::new(ValueOps, Value::map([("a", Value::from(1))]));
        let rule = Rule::fail().and_then(Rule::simple("mark", |d| d.set("x", d.create_int(1))));
        assert!(rule.rewrite(&player(), &input).is_none());
        let rule = Rule::identity().and_then(Rule::fail());
        assert!(rule.rewrite(&player(), &input).is_none());
    }

    #[test]
    fn or_else_first_match_wins() {
        let input = Dynamic::new(ValueOps, Value::map([("a", Value::from(1))]));
        let rule = Rule::simple("first", |d| d.set("by", d.create_string("first")))
            .or_else(Rule::simple("second", |d| d.set("by", d.create_string("second"))));
        let output = rule.apply(&player(), &input);
        assert_eq!(
            output.get("by").flat_map(|d| d.as_string()).result().as_deref(),
            Some("first")
        );
    }

    #[test]
    fn if_type_filters() {
        let input = Dynamic::new(ValueOps, Value::map([("a", Value::from(1))]));
        let rule = Rule::simple("drop", |d| d.remove("a")).if_type(player());
        assert!(!rule.apply(&player(), &input).has("a"));
        assert!(rule.apply(&world(), &input).has("a"));
    }

    #[test]
    fn apply_or_throw_names_rule() {
        let input = Dynamic::empty(ValueOps);
        let rule = Rule::for_type(player(), "rename", |d| d);
        let err = rule.apply_or_throw(&world(), &input).unwrap_err();
        assert_eq!(
            err,
            RuleError::NotApplicable {
                rule: "rename@player".to_string(),
                reference: world(),
            }
        );
    }

    #[test]
    fn seq_of_nothing_is_identity() {
        let input = Dynamic::new(ValueOps, Value::from(3));
        assert_eq!(Rule::seq([]).rewrite(&player(), &input), Some(input));
    }

    #[test]
    fn names_render_the_tree() {
        let rule = Rule::for_type(player(), "a", |d| d)
            .or_keep()
            .and_then(Rule::fail().or_else(Rule::identity()));
        assert_eq!(rule.to_string(), "(a@player? then (fail or identity))");
    }

    #[test]
    fn rules_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Rule>();
    }
}
