//! End-to-end migrations over JSON documents.

use std::sync::Arc;
use std::thread;

use datafix::prelude::*;
use datafix::types::dsl::*;
use datafix::{FixerError, SchemaError};
use datafix_json::JsonOps;
use serde_json::json;

fn v(version: u32) -> DataVersion {
    DataVersion::new(version)
}

fn player() -> TypeReference {
    TypeReference::new("player")
}

fn json(value: serde_json::Value) -> Dynamic<JsonOps> {
    Dynamic::new(JsonOps, value)
}

fn schemas(builder: &mut DataFixerBuilder<JsonOps>, versions: &[u32]) {
    for version in versions {
        builder.add_schema(Schema::new(v(*version))).unwrap();
    }
}

/// v1 → v2 rename, v2 → v3 add score, v3 → v4 add active.
fn player_fixer() -> DataFixer<JsonOps> {
    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[1, 2, 3, 4]);
    builder
        .add_fix(Fix::with_rule(
            "rename playerName",
            player(),
            v(1),
            v(2),
            fixes::rename_field(player(), "playerName", "name"),
        ))
        .add_fix(Fix::with_rule(
            "add score",
            player(),
            v(2),
            v(3),
            fixes::add_field(player(), "score", Value::from(0)),
        ))
        .add_fix(Fix::with_rule(
            "add active",
            player(),
            v(3),
            v(4),
            fixes::add_field(player(), "active", Value::from(true)),
        ));
    builder.build().unwrap()
}

#[test]
fn group_coordinates_into_position() {
    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[1, 2]);
    builder.add_fix(Fix::with_rule(
        "group position",
        player(),
        v(1),
        v(2),
        fixes::group_fields(player(), "position", &["x", "y", "z"]),
    ));
    let fixer = builder.build().unwrap();

    let input = json(json!({"x": 100.5, "y": 64.0, "z": -200.25, "name": "Steve"}));
    let output = fixer.update(&player(), input, v(1), v(2)).unwrap();

    assert_eq!(
        output.value(),
        &json!({"name": "Steve", "position": {"x": 100.5, "y": 64.0, "z": -200.25}})
    );
    for key in ["x", "y", "z"] {
        assert!(!output.has(key));
    }
}

#[test]
fn chain_from_one_to_four() {
    let fixer = player_fixer();
    let output = fixer
        .update(&player(), json(json!({"playerName": "Steve"})), v(1), v(4))
        .unwrap();
    assert_eq!(
        output.value(),
        &json!({"name": "Steve", "score": 0, "active": true})
    );
}

#[test]
fn partial_chain_stops_at_target() {
    let fixer = player_fixer();
    let output = fixer
        .update(&player(), json(json!({"playerName": "Steve"})), v(1), v(3))
        .unwrap();
    assert_eq!(output.value(), &json!({"name": "Steve", "score": 0}));
    assert!(fixer.needs_update(v(3)));
    assert_eq!(fixer.current_version(), v(4));
}

#[test]
fn equal_versions_are_identity() {
    let fixer = player_fixer();
    for version in [1, 2, 3, 4] {
        let input = json(json!({"playerName": "Steve", "x": [1, 2]}));
        let output = fixer
            .update(&player(), input.clone(), v(version), v(version))
            .unwrap();
        assert_eq!(output, input);
    }
}

#[test]
fn edge_without_fixes_is_noop() {
    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[1, 2, 3]);
    builder.add_fix(Fix::with_rule(
        "world only",
        TypeReference::new("world"),
        v(1),
        v(2),
        fixes::remove_field(TypeReference::new("world"), "seed"),
    ));
    let fixer = builder.build().unwrap();

    let input = json(json!({"seed": 42, "name": "Steve"}));
    assert_eq!(fixer.update(&player(), input.clone(), v(1), v(2)).unwrap(), input);
    assert_eq!(fixer.update(&player(), input.clone(), v(2), v(3)).unwrap(), input);
}

#[test]
fn unknown_type_passes_through() {
    let fixer = player_fixer();
    let input = json(json!({"playerName": "Steve"}));
    let output = fixer
        .update(&TypeReference::new("entity"), input.clone(), v(1), v(4))
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn unknown_version_is_an_error() {
    let fixer = player_fixer();
    let err = fixer
        .update(&player(), json(json!({})), v(0), v(4))
        .unwrap_err();
    assert_eq!(
        err,
        FixerError::Schema(SchemaError::UnknownVersion { version: v(0) })
    );
}

#[test]
fn rename_round_trip_over_two_steps() {
    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[1, 2, 3]);
    builder
        .add_fix(Fix::with_rule(
            "a to b",
            player(),
            v(1),
            v(2),
            fixes::rename_field(player(), "a", "b"),
        ))
        .add_fix(Fix::with_rule(
            "b to a",
            player(),
            v(2),
            v(3),
            fixes::rename_field(player(), "b", "a"),
        ));
    let fixer = builder.build().unwrap();

    let input = json(json!({"a": {"deep": [1, 2, 3]}, "other": "x"}));
    let output = fixer.update(&player(), input.clone(), v(1), v(3)).unwrap();
    assert_eq!(output, input);
}

#[test]
fn group_then_flatten_restores_flat_shape() {
    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[1, 2, 3]);
    builder
        .add_fix(Fix::with_rule(
            "group",
            player(),
            v(1),
            v(2),
            fixes::group_fields(player(), "position", &["x", "y", "z"]),
        ))
        .add_fix(Fix::with_rule(
            "flatten",
            player(),
            v(2),
            v(3),
            fixes::flatten_field(player(), "position"),
        ));
    let fixer = builder.build().unwrap();

    let input = json(json!({"x": 1.5, "y": 2.0, "z": -3.25, "name": "Steve"}));
    assert_eq!(fixer.update(&player(), input.clone(), v(1), v(3)).unwrap(), input);
}

#[test]
fn downgrade_symmetry() {
    // Every fix here is its own structural inverse.
    let toggle = |name: &str| {
        let name = name.to_string();
        move |d: Dynamic<JsonOps>| {
            let flipped = !d.get(&name).flat_map(|f| f.as_bool()).result().unwrap_or(false);
            d.set(&name, d.create_bool(flipped))
        }
    };
    let negate = |d: Dynamic<JsonOps>| {
        d.update("score", |s| s.create_long(-s.as_i64().result().unwrap_or(0)))
    };

    let mut builder = DataFixerBuilder::new();
    schemas(&mut builder, &[100, 150, 200]);
    builder
        .add_fix(Fix::new("toggle hardcore", player(), v(100), v(150), toggle("hardcore")))
        .add_fix(Fix::new("negate score", player(), v(150), v(200), negate));
    let fixer = builder.build().unwrap();

    let original = json(json!({"name": "Steve", "hardcore": true, "score": 12}));
    let down = fixer.update(&player(), original.clone(), v(200), v(100)).unwrap();
    assert_eq!(down.value(), &json!({"name": "Steve", "hardcore": false, "score": -12}));
    let up = fixer.update(&player(), down, v(100), v(200)).unwrap();
    assert_eq!(up, original);
}

#[test]
fn tagged_update_keeps_reference() {
    let fixer = player_fixer();
    let tagged = TaggedDynamic::new(player(), json(json!({"playerName": "Alex"})));
    let output = fixer.update_tagged(tagged, v(1), v(2)).unwrap();
    assert_eq!(output.type_ref, player());
    assert_eq!(output.value.value(), &json!({"name": "Alex"}));
}

#[test]
fn fixer_is_shared_across_threads() {
    let fixer = Arc::new(player_fixer());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let fixer = Arc::clone(&fixer);
            thread::spawn(move || {
                let input = json(json!({"playerName": format!("player-{i}")}));
                fixer.update_to_current(&player(), input, v(1)).unwrap()
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle.join().unwrap();
        assert_eq!(
            output.value(),
            &json!({"name": format!("player-{i}"), "score": 0, "active": true})
        );
    }
}

#[test]
fn schema_types_validate_migrated_data() {
    let mut builder = DataFixerBuilder::new();
    let v1 = Arc::new(Schema::new(v(1)).register_types(|types| {
        types.register_template(
            player(),
            &all_with_remainder([field("playerName", string())]),
        )
    }));
    let v2 = Schema::new(v(2)).extends(v1.clone()).register_types(|types| {
        types.register_template(
            player(),
            &all_with_remainder([field("name", string()), field("score", int())]),
        )
    });
    builder.add_schema(v1).unwrap();
    builder.add_schema(v2).unwrap();
    builder.add_fix(Fix::with_rule(
        "rename and score",
        player(),
        v(1),
        v(2),
        fixes::rename_field(player(), "playerName", "name")
            .and_then(fixes::add_field(player(), "score", Value::from(0))),
    ));
    let fixer = builder.build().unwrap();

    let output = fixer
        .update(&player(), json(json!({"playerName": "Steve", "extra": 1})), v(1), v(2))
        .unwrap();
    let types = fixer.schemas().require(v(2)).unwrap().types().unwrap();
    let ty = types.require(&player()).unwrap();
    let read = datafix::types::read_dynamic(ty.as_ref(), &types, &output);
    assert_eq!(read.result(), Some(output));

    let stale = json(json!({"playerName": "Steve"}));
    let read = datafix::types::read_dynamic(ty.as_ref(), &types, &stale);
    assert!(read.is_error());
}
