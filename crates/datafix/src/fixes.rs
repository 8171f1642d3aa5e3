//! Ready-made rules for the common field-level migrations.
//!
//! Every helper returns a [`TypeRewriteRule`] restricted to one
//! [`TypeReference`]. Helpers never fail: where the input does not have the
//! shape a helper expects, the value is returned unchanged.
//!
//! ```
//! use datafix::fixes;
//! use datafix::{Dynamic, TypeReference, Value, ValueOps};
//!
//! let player = TypeReference::new("player");
//! let rule = fixes::rename_field::<ValueOps>(player.clone(), "playerName", "name")
//!     .and_then(fixes::add_field(player.clone(), "score", Value::from(0)));
//!
//! let input = Dynamic::new(ValueOps, Value::map([("playerName", Value::from("Steve"))]));
//! let output = rule.apply(&player, &input);
//! assert_eq!(
//!     output.value(),
//!     &Value::map([("name", Value::from("Steve")), ("score", Value::from(0))])
//! );
//! ```

use crate::dynamic::Dynamic;
use crate::ops::DynamicOps;
use crate::rewrite::TypeRewriteRule;
use crate::types::TypeReference;
use crate::value::{Value, ValueOps};

fn constant<O: DynamicOps>(like: &Dynamic<O>, value: &Value) -> Dynamic<O> {
    Dynamic::new(like.ops().clone(), ValueOps.convert_to(like.ops(), value))
}

/// Rename `from` to `to`. An absent `from` leaves the value unchanged.
pub fn rename_field<O: DynamicOps>(reference: TypeReference, from: &str, to: &str) -> TypeRewriteRule<O> {
    let name = format!("rename_field({from} -> {to})");
    let (from, to) = (from.to_string(), to.to_string());
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        input.rename_field(&from, &to)
    })
}

/// Move `from` to `to`.
///
/// Same as [`rename_field`]; reads better when the field changes meaning
/// rather than spelling.
pub fn move_field<O: DynamicOps>(reference: TypeReference, from: &str, to: &str) -> TypeRewriteRule<O> {
    let name = format!("move_field({from} -> {to})");
    let (from, to) = (from.to_string(), to.to_string());
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        input.rename_field(&from, &to)
    })
}

/// Add `key` with `default` unless the key is already present.
pub fn add_field<O: DynamicOps>(reference: TypeReference, key: &str, default: Value) -> TypeRewriteRule<O> {
    let name = format!("add_field({key})");
    let key = key.to_string();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        if input.has(&key) {
            input
        } else {
            let field = constant(&input, &default);
            input.set(&key, field)
        }
    })
}

/// Set `key` to `value`, overwriting any existing value.
pub fn set_field<O: DynamicOps>(reference: TypeReference, key: &str, value: Value) -> TypeRewriteRule<O> {
    let name = format!("set_field({key})");
    let key = key.to_string();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        let field = constant(&input, &value);
        input.set(&key, field)
    })
}

/// Remove `key`.
pub fn remove_field<O: DynamicOps>(reference: TypeReference, key: &str) -> TypeRewriteRule<O> {
    let name = format!("remove_field({key})");
    let key = key.to_string();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| input.remove(&key))
}

/// Replace the field `key` with `f(field)`. Absent fields are untouched.
pub fn transform_field<O, F>(reference: TypeReference, key: &str, f: F) -> TypeRewriteRule<O>
where
    O: DynamicOps,
    F: Fn(Dynamic<O>) -> Dynamic<O> + Send + Sync + 'static,
{
    let name = format!("transform_field({key})");
    let key = key.to_string();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| input.update(&key, &f))
}

/// Copy `from` to `to`, keeping `from`. An absent `from` is a no-op.
pub fn copy_field<O: DynamicOps>(reference: TypeReference, from: &str, to: &str) -> TypeRewriteRule<O> {
    let name = format!("copy_field({from} -> {to})");
    let (from, to) = (from.to_string(), to.to_string());
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        match input.get_opt(&from) {
            Some(field) => input.set(&to, field),
            None => input,
        }
    })
}

/// Move `fields` into a nested map under `target`.
///
/// All-or-nothing: if any of `fields` is missing the value is unchanged.
pub fn group_fields<O: DynamicOps>(
    reference: TypeReference,
    target: &str,
    fields: &[&str],
) -> TypeRewriteRule<O> {
    let name = format!("group_fields({} -> {target})", fields.join(", "));
    let target = target.to_string();
    let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        let mut grouped = Vec::with_capacity(fields.len());
        for key in &fields {
            match input.get_opt(key) {
                Some(value) => grouped.push((key.clone(), value)),
                None => return input,
            }
        }
        let nested = input.create_map(grouped);
        fields
            .iter()
            .fold(input, |acc, key| acc.remove(key))
            .set(&target, nested)
    })
}

/// Lift the entries of the nested map `field` to the top level.
///
/// Existing top-level keys win over nested ones. An absent or non-map
/// `field` leaves the value unchanged.
pub fn flatten_field<O: DynamicOps>(reference: TypeReference, field: &str) -> TypeRewriteRule<O> {
    let name = format!("flatten_field({field})");
    let field = field.to_string();
    TypeRewriteRule::for_type(reference, &name, move |input: Dynamic<O>| {
        let entries = match input.get_opt(&field) {
            Some(nested) if nested.is_map() => nested.as_map_entries(),
            _ => return input,
        };
        let Some(entries) = entries.result() else {
            return input;
        };
        entries
            .into_iter()
            .fold(input.remove(&field), |acc, (key, value)| {
                if acc.has(&key) {
                    acc
                } else {
                    acc.set(&key, value)
                }
            })
    })
}
