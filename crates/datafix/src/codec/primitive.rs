use crate::codec::{Decoder, Encoder};
use crate::ops::{DynamicOps, Number};
use crate::result::DataResult;

fn merge_primitive<O: DynamicOps>(ops: &O, prefix: O::Value, value: O::Value) -> DataResult<O::Value> {
    if ops.is_empty_value(&prefix) {
        DataResult::success(value)
    } else {
        DataResult::error(format!("cannot merge primitive into non-empty prefix {prefix:?}"))
    }
}

/// Codec for `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

/// The string codec.
pub const STRING: StringCodec = StringCodec;

impl Encoder<String> for StringCodec {
    fn encode<O: DynamicOps>(&self, input: &String, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        merge_primitive(ops, prefix, ops.create_string(input))
    }
}

impl Decoder<String> for StringCodec {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(String, O::Value)> {
        ops.get_string_value(input).map(|s| (s, ops.empty()))
    }
}

/// Codec for `bool`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

/// The boolean codec.
pub const BOOL: BoolCodec = BoolCodec;

impl Encoder<bool> for BoolCodec {
    fn encode<O: DynamicOps>(&self, input: &bool, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        merge_primitive(ops, prefix, ops.create_bool(*input))
    }
}

impl Decoder<bool> for BoolCodec {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(bool, O::Value)> {
        ops.get_bool_value(input).map(|b| (b, ops.empty()))
    }
}

// Integers are range-checked on decode; a float with a fractional part is
// rejected rather than truncated.
macro_rules! integer_codec {
    ($(#[$doc:meta])* $name:ident, $konst:ident, $ty:ty, $create:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        $(#[$doc])*
        pub const $konst: $name = $name;

        impl Encoder<$ty> for $name {
            fn encode<O: DynamicOps>(&self, input: &$ty, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
                merge_primitive(ops, prefix, ops.$create(*input))
            }
        }

        impl Decoder<$ty> for $name {
            fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<($ty, O::Value)> {
                ops.get_number_value(input).flat_map(|n| {
                    match n.to_i64_exact().map(<$ty>::try_from) {
                        Some(Ok(v)) => DataResult::success((v, ops.empty())),
                        _ => DataResult::error(format!(
                            "number {n} does not fit in {}",
                            stringify!($ty)
                        )),
                    }
                })
            }
        }
    };
}

integer_codec!(
    /// Codec for `i8`.
    ByteCodec, BYTE, i8, create_byte
);
integer_codec!(
    /// Codec for `i16`.
    ShortCodec, SHORT, i16, create_short
);
integer_codec!(
    /// Codec for `i32`.
    IntCodec, INT, i32, create_int
);
integer_codec!(
    /// Codec for `i64`.
    LongCodec, LONG, i64, create_long
);

/// Codec for `f32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

/// The `f32` codec.
pub const FLOAT: FloatCodec = FloatCodec;

impl Encoder<f32> for FloatCodec {
    fn encode<O: DynamicOps>(&self, input: &f32, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        merge_primitive(ops, prefix, ops.create_float(*input))
    }
}

impl Decoder<f32> for FloatCodec {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(f32, O::Value)> {
        ops.get_number_value(input).flat_map(|n| {
            let value = match n {
                Number::Float(v) => v,
                other => {
                    let wide = other.as_f64();
                    let narrow = wide as f32;
                    if wide.is_finite() && narrow.is_infinite() {
                        return DataResult::error(format!("number {n} does not fit in f32"));
                    }
                    narrow
                }
            };
            DataResult::success((value, ops.empty()))
        })
    }
}

/// Codec for `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleCodec;

/// The `f64` codec.
pub const DOUBLE: DoubleCodec = DoubleCodec;

impl Encoder<f64> for DoubleCodec {
    fn encode<O: DynamicOps>(&self, input: &f64, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        merge_primitive(ops, prefix, ops.create_double(*input))
    }
}

impl Decoder<f64> for DoubleCodec {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(f64, O::Value)> {
        ops.get_number_value(input).map(|n| (n.as_f64(), ops.empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueOps};

    #[test]
    fn string_roundtrip() {
        let encoded = STRING.encode_start(&"hi".to_string(), &ValueOps).result().unwrap();
        assert_eq!(encoded, Value::from("hi"));
        assert_eq!(STRING.parse(&ValueOps, &encoded).result().as_deref(), Some("hi"));
    }

    #[test]
    fn byte_rejects_out_of_range() {
        let result = BYTE.parse(&ValueOps, &Value::from(300));
        assert_eq!(result.error_message(), Some("number 300 does not fit in i8"));
    }

    #[test]
    fn int_accepts_whole_double() {
        assert_eq!(INT.parse(&ValueOps, &Value::from(64.0)).result(), Some(64));
        assert!(INT.parse(&ValueOps, &Value::from(64.5)).is_error());
    }

    #[test]
    fn long_rejects_doubles_beyond_its_range() {
        let result = LONG.parse(&ValueOps, &Value::from(1e19));
        assert_eq!(result.error_message(), Some("number 10000000000000000000d does not fit in i64"));
        assert!(LONG.parse(&ValueOps, &Value::from(-1e19)).is_error());
        assert_eq!(LONG.parse(&ValueOps, &Value::from(4096.0)).result(), Some(4096));
    }

    #[test]
    fn float_rejects_doubles_beyond_its_range() {
        let result = FLOAT.parse(&ValueOps, &Value::from(1e300));
        assert!(result.error_message().unwrap_or_default().ends_with("does not fit in f32"));
        assert_eq!(FLOAT.parse(&ValueOps, &Value::from(1.5)).result(), Some(1.5));
        let inf = FLOAT.parse(&ValueOps, &Value::from(f64::INFINITY)).result();
        assert_eq!(inf, Some(f32::INFINITY));
    }

    #[test]
    fn primitive_refuses_non_empty_prefix() {
        let result = INT.encode(&1, &ValueOps, Value::from("taken"));
        assert!(result.is_error());
    }

    #[test]
    fn double_reads_any_width() {
        assert_eq!(DOUBLE.parse(&ValueOps, &Value::from(3)).result(), Some(3.0));
        assert_eq!(FLOAT.parse(&ValueOps, &Value::from(0.5)).result(), Some(0.5));
    }

    #[test]
    fn bool_mismatch() {
        assert!(BOOL.parse(&ValueOps, &Value::from("true")).is_error());
    }
}
