//! Round trips between the in-memory tree and `serde_json::Value`.

use datafix::{Dynamic, DynamicOps, Value, ValueOps};
use datafix_json::JsonOps;
use proptest::prelude::*;
use serde_json::json;

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Empty),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1.0e9f64..1.0e9).prop_map(Value::from),
        ".{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::List),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..5).prop_map(Value::Map),
        ]
    })
}

fn json_strategy() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        (-1.0e9f64..1.0e9).prop_map(serde_json::Value::from),
        "[a-z ]{0,8}".prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..5).prop_map(|map| {
                serde_json::Value::Object(map.into_iter().collect())
            }),
        ]
    })
}

proptest! {
    #[test]
    fn value_through_json_round_trips(value in value_strategy()) {
        let json = ValueOps.convert_to(&JsonOps, &value);
        let back = JsonOps.convert_to(&ValueOps, &json);
        prop_assert_eq!(back, value);
    }

    #[test]
    fn json_through_value_round_trips(json in json_strategy()) {
        let value = JsonOps.convert_to(&ValueOps, &json);
        let back = ValueOps.convert_to(&JsonOps, &value);
        prop_assert_eq!(back, json);
    }
}

#[test]
fn dynamic_convert_keeps_structure() {
    let input = json!({
        "name": "Steve",
        "pos": [100.5, 64.0, -200.25],
        "flags": {"op": true},
        "level": 3,
        "nick": null
    });
    let converted = Dynamic::new(JsonOps, input.clone()).convert(ValueOps);
    assert_eq!(
        converted.get("level").flat_map(|d| d.as_i32()).result(),
        Some(3)
    );
    assert!(converted.get("flags").result().is_some_and(|d| d.is_map()));
    assert_eq!(converted.convert(JsonOps).value(), &input);
}

#[test]
fn field_helpers_work_on_json() {
    let player = Dynamic::new(JsonOps, json!({"x": 1, "y": 2}));
    let updated = player
        .remove("x")
        .set("z", player.create_int(3))
        .update("y", |y| y.create_long(y.as_i64().result().unwrap_or(0) * 10));
    assert_eq!(updated.value(), &json!({"y": 20, "z": 3}));
}
