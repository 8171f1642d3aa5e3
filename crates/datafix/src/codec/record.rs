use core::marker::PhantomData;

use crate::codec::MapCodec;
use crate::ops::DynamicOps;
use crate::result::DataResult;

/// One field of a record: a [`MapCodec`] plus the getter that reads the
/// field's value out of the record when encoding.
pub struct RecordField<M, F, R, G> {
    codec: M,
    getter: G,
    _marker: PhantomData<fn(&R) -> F>,
}

impl<M, F, R, G> RecordField<M, F, R, G>
where
    M: MapCodec<F>,
    G: Fn(&R) -> F,
{
    /// Pair `codec` with `getter`.
    pub fn new(codec: M, getter: G) -> Self {
        Self {
            codec,
            getter,
            _marker: PhantomData,
        }
    }

    fn encode_from<O: DynamicOps>(&self, record: &R, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        self.codec.encode_map(&(self.getter)(record), ops, prefix)
    }
}

/// A tuple of [`RecordField`]s that together describe a record `R`.
///
/// Implemented for tuples of one to eight fields.
pub trait FieldSet<R> {
    /// The decoded field values, in declaration order.
    type Values;

    /// All keys read or written by the fields.
    fn keys(&self) -> Vec<String>;

    /// Write every field of `record` into `prefix`.
    fn encode_fields<O: DynamicOps>(&self, record: &R, ops: &O, prefix: O::Value) -> DataResult<O::Value>;

    /// Read every field. All failing fields are reported, not just the first.
    fn decode_fields<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<Self::Values>;
}

macro_rules! impl_field_set {
    ($(($idx:tt, $m:ident, $f:ident, $g:ident, $v:ident)),+) => {
        impl<R, $($m, $f, $g),+> FieldSet<R> for ($(RecordField<$m, $f, R, $g>,)+)
        where
            $($m: MapCodec<$f>, $g: Fn(&R) -> $f,)+
        {
            type Values = ($($f,)+);

            fn keys(&self) -> Vec<String> {
                let mut keys = Vec::new();
                $(keys.extend(self.$idx.codec.keys());)+
                keys
            }

            fn encode_fields<O: DynamicOps>(&self, record: &R, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
                let result = DataResult::success(prefix);
                $(let result = result.flat_map(|prefix| self.$idx.encode_from(record, ops, prefix));)+
                result
            }

            fn decode_fields<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<Self::Values> {
                $(let $v = self.$idx.codec.decode_map(ops, input);)+
                let mut messages: Vec<String> = Vec::new();
                $(if let Some(message) = $v.error_message() {
                    messages.push(message.to_string());
                })+
                match ($($v.result_or_partial(),)+) {
                    ($(Some($v),)+) if messages.is_empty() => DataResult::success(($($v,)+)),
                    ($(Some($v),)+) => DataResult::partial(($($v,)+), messages.join("; ")),
                    _ => DataResult::error(messages.join("; ")),
                }
            }
        }
    };
}

impl_field_set!((0, M0, F0, G0, v0));
impl_field_set!((0, M0, F0, G0, v0), (1, M1, F1, G1, v1));
impl_field_set!((0, M0, F0, G0, v0), (1, M1, F1, G1, v1), (2, M2, F2, G2, v2));
impl_field_set!(
    (0, M0, F0, G0, v0),
    (1, M1, F1, G1, v1),
    (2, M2, F2, G2, v2),
    (3, M3, F3, G3, v3)
);
impl_field_set!(
    (0, M0, F0, G0, v0),
    (1, M1, F1, G1, v1),
    (2, M2, F2, G2, v2),
    (3, M3, F3, G3, v3),
    (4, M4, F4, G4, v4)
);
impl_field_set!(
    (0, M0, F0, G0, v0),
    (1, M1, F1, G1, v1),
    (2, M2, F2, G2, v2),
    (3, M3, F3, G3, v3),
    (4, M4, F4, G4, v4),
    (5, M5, F5, G5, v5)
);
impl_field_set!(
    (0, M0, F0, G0, v0),
    (1, M1, F1, G1, v1),
    (2, M2, F2, G2, v2),
    (3, M3, F3, G3, v3),
    (4, M4, F4, G4, v4),
    (5, M5, F5, G5, v5),
    (6, M6, F6, G6, v6)
);
impl_field_set!(
    (0, M0, F0, G0, v0),
    (1, M1, F1, G1, v1),
    (2, M2, F2, G2, v2),
    (3, M3, F3, G3, v3),
    (4, M4, F4, G4, v4),
    (5, M5, F5, G5, v5),
    (6, M6, F6, G6, v6),
    (7, M7, F7, G7, v7)
);

/// A record codec assembled by [`RecordCodecBuilder::create`].
pub struct RecordCodec<S, C, R> {
    fields: S,
    constructor: C,
    _marker: PhantomData<fn() -> R>,
}

impl<S, C, R> MapCodec<R> for RecordCodec<S, C, R>
where
    S: FieldSet<R>,
    C: Fn(S::Values) -> R,
{
    fn keys(&self) -> Vec<String> {
        self.fields.keys()
    }

    fn encode_map<O: DynamicOps>(&self, input: &R, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        self.fields.encode_fields(input, ops, prefix)
    }

    fn decode_map<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<R> {
        self.fields
            .decode_fields(ops, input)
            .map(|values| (self.constructor)(values))
    }
}

/// Builds record codecs from field descriptors.
///
/// # Example
///
/// ```
/// use datafix::codec::{Codec, Decoder, Encoder, MapCodec, RecordCodecBuilder, INT, STRING};
/// use datafix::{Value, ValueOps};
///
/// #[derive(Debug, PartialEq)]
/// struct Player {
///     name: String,
///     score: i32,
/// }
///
/// let codec = RecordCodecBuilder::create(
///     (
///         STRING.field_of("name").for_getter(|p: &Player| p.name.clone()),
///         INT.optional_field_of_or("score", 0).for_getter(|p: &Player| p.score),
///     ),
///     |(name, score)| Player { name, score },
/// )
/// .codec();
///
/// let steve = Player { name: "Steve".into(), score: 3 };
/// let encoded = codec.encode_start(&steve, &ValueOps).result().unwrap();
/// assert_eq!(
///     encoded,
///     Value::map([("name", Value::from("Steve")), ("score", Value::from(3))])
/// );
/// assert_eq!(codec.parse(&ValueOps, &encoded).result(), Some(steve));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodecBuilder;

impl RecordCodecBuilder {
    /// Compose `fields` and a constructor into a record [`MapCodec`].
    pub fn create<R, S, C>(fields: S, constructor: C) -> RecordCodec<S, C, R>
    where
        S: FieldSet<R>,
        C: Fn(S::Values) -> R,
    {
        RecordCodec {
            fields,
            constructor,
            _marker: PhantomData,
        }
    }
}
