//! Typed, bidirectional codecs built on [`DynamicOps`].
//!
//! A [`Codec`] moves a Rust value into and out of any tree representation.
//! A [`MapCodec`] does the same for a *fragment* of a map, which is what lets
//! several field codecs contribute to one record; see
//! [`RecordCodecBuilder`].
//!
//! Decoding never panics on malformed input. Mismatches come back as
//! [`DataResult`] errors whose messages name the offending field or index.

use core::marker::PhantomData;

use crate::ops::DynamicOps;
use crate::result::{join_messages, DataResult};

mod primitive;
mod record;

pub use primitive::{
    BoolCodec, ByteCodec, DoubleCodec, FloatCodec, IntCodec, LongCodec, ShortCodec, StringCodec,
    BOOL, BYTE, DOUBLE, FLOAT, INT, LONG, SHORT, STRING,
};
pub use record::{FieldSet, RecordCodec, RecordCodecBuilder, RecordField};

/// Writes a value of type `A` into a tree.
pub trait Encoder<A> {
    /// Encode `input`, merging the result into `prefix`.
    ///
    /// Map-shaped encodings add their entries to a map prefix; primitives
    /// require the prefix to be `ops.empty()`.
    fn encode<O: DynamicOps>(&self, input: &A, ops: &O, prefix: O::Value) -> DataResult<O::Value>;

    /// Encode `input` into a fresh value.
    fn encode_start<O: DynamicOps>(&self, input: &A, ops: &O) -> DataResult<O::Value> {
        self.encode(input, ops, ops.empty())
    }
}

/// Reads a value of type `A` out of a tree.
pub trait Decoder<A> {
    /// Decode `input`, returning the value and the unconsumed remainder.
    ///
    /// For map-shaped codecs the remainder is the input map without the keys
    /// this decoder consumed; for everything else it is `ops.empty()`.
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(A, O::Value)>;

    /// Decode `input` and drop the remainder.
    fn parse<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<A> {
        self.decode(ops, input).map(|(value, _)| value)
    }
}

/// An [`Encoder`] and [`Decoder`] for the same type, plus combinators.
pub trait Codec<A>: Encoder<A> + Decoder<A> {
    /// Adapt this codec to `B` with an infallible mapping in each direction.
    fn xmap<B, F, G>(self, to: F, from: G) -> XMap<Self, A, F, G>
    where
        Self: Sized,
        F: Fn(A) -> B,
        G: Fn(&B) -> A,
    {
        XMap {
            inner: self,
            to,
            from,
            _marker: PhantomData,
        }
    }

    /// Adapt this codec to `B` with mappings that may reject values.
    fn flat_xmap<B, F, G>(self, to: F, from: G) -> FlatXMap<Self, A, F, G>
    where
        Self: Sized,
        F: Fn(A) -> DataResult<B>,
        G: Fn(&B) -> DataResult<A>,
    {
        FlatXMap {
            inner: self,
            to,
            from,
            _marker: PhantomData,
        }
    }

    /// A codec for `Vec<A>` encoded as a list.
    fn list_of(self) -> ListCodec<Self, A>
    where
        Self: Sized,
    {
        ListCodec {
            element: self,
            _marker: PhantomData,
        }
    }

    /// A required map field named `name`.
    fn field_of(self, name: &str) -> FieldCodec<Self, A>
    where
        Self: Sized,
    {
        FieldCodec {
            name: name.to_string(),
            inner: self,
            _marker: PhantomData,
        }
    }

    /// An optional map field named `name`, decoded as `Option<A>`.
    fn optional_field_of(self, name: &str) -> OptionalFieldCodec<Self, A>
    where
        Self: Sized,
    {
        OptionalFieldCodec {
            name: name.to_string(),
            inner: self,
            _marker: PhantomData,
        }
    }

    /// A map field named `name` that falls back to `default` when absent.
    fn optional_field_of_or(self, name: &str, default: A) -> DefaultedFieldCodec<Self, A>
    where
        Self: Sized,
        A: Clone,
    {
        DefaultedFieldCodec {
            name: name.to_string(),
            inner: self,
            default,
        }
    }
}

impl<A, T: Encoder<A> + Decoder<A>> Codec<A> for T {}

/// Encodes and decodes one fragment of a map.
///
/// Map codecs compose: a record is the union of its fields' fragments.
pub trait MapCodec<A> {
    /// The keys this codec reads and writes.
    fn keys(&self) -> Vec<String>;

    /// Add this fragment's entries to `prefix` (a map or the empty value).
    fn encode_map<O: DynamicOps>(&self, input: &A, ops: &O, prefix: O::Value) -> DataResult<O::Value>;

    /// Read this fragment from `input`, which must be a map.
    fn decode_map<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<A>;

    /// Lift into a full [`Codec`] over map values.
    fn codec(self) -> MapCodecCodec<Self, A>
    where
        Self: Sized,
    {
        MapCodecCodec {
            inner: self,
            _marker: PhantomData,
        }
    }

    /// Pair this fragment with the accessor that reads it out of a record.
    fn for_getter<R, G>(self, getter: G) -> RecordField<Self, A, R, G>
    where
        Self: Sized,
        G: Fn(&R) -> A,
    {
        RecordField::new(self, getter)
    }
}

// ── Combinators ─────────────────────────────────────────────────────

/// See [`Codec::xmap`].
pub struct XMap<C, A, F, G> {
    inner: C,
    to: F,
    from: G,
    _marker: PhantomData<fn() -> A>,
}

impl<C, A, B, F, G> Encoder<B> for XMap<C, A, F, G>
where
    C: Encoder<A>,
    F: Fn(A) -> B,
    G: Fn(&B) -> A,
{
    fn encode<O: DynamicOps>(&self, input: &B, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        self.inner.encode(&(self.from)(input), ops, prefix)
    }
}

impl<C, A, B, F, G> Decoder<B> for XMap<C, A, F, G>
where
    C: Decoder<A>,
    F: Fn(A) -> B,
    G: Fn(&B) -> A,
{
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(B, O::Value)> {
        self.inner
            .decode(ops, input)
            .map(|(value, rest)| ((self.to)(value), rest))
    }
}

/// See [`Codec::flat_xmap`].
pub struct FlatXMap<C, A, F, G> {
    inner: C,
    to: F,
    from: G,
    _marker: PhantomData<fn() -> A>,
}

impl<C, A, B, F, G> Encoder<B> for FlatXMap<C, A, F, G>
where
    C: Encoder<A>,
    F: Fn(A) -> DataResult<B>,
    G: Fn(&B) -> DataResult<A>,
{
    fn encode<O: DynamicOps>(&self, input: &B, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        (self.from)(input).flat_map(|value| self.inner.encode(&value, ops, prefix))
    }
}

impl<C, A, B, F, G> Decoder<B> for FlatXMap<C, A, F, G>
where
    C: Decoder<A>,
    F: Fn(A) -> DataResult<B>,
    G: Fn(&B) -> DataResult<A>,
{
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(B, O::Value)> {
        self.inner
            .decode(ops, input)
            .flat_map(|(value, rest)| (self.to)(value).map(|mapped| (mapped, rest)))
    }
}

/// See [`Codec::list_of`].
pub struct ListCodec<C, A> {
    element: C,
    _marker: PhantomData<fn() -> A>,
}

impl<C: Encoder<A>, A> Encoder<Vec<A>> for ListCodec<C, A> {
    fn encode<O: DynamicOps>(&self, input: &Vec<A>, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        let mut items = if ops.is_empty_value(&prefix) {
            Vec::with_capacity(input.len())
        } else {
            match ops.get_list(&prefix) {
                DataResult::Success(items) => items,
                DataResult::Error { message, .. } => {
                    return DataResult::error(format!("cannot append list to prefix: {message}"))
                }
            }
        };
        for (index, element) in input.iter().enumerate() {
            match self.element.encode_start(element, ops) {
                DataResult::Success(encoded) => items.push(encoded),
                DataResult::Error { message, .. } => {
                    return DataResult::error(format!("[{index}]: {message}"))
                }
            }
        }
        DataResult::success(ops.create_list(items))
    }
}

impl<C: Decoder<A>, A> Decoder<Vec<A>> for ListCodec<C, A> {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(Vec<A>, O::Value)> {
        let items = match ops.get_list(input) {
            DataResult::Success(items) => items,
            DataResult::Error { message, .. } => return DataResult::error(message),
        };
        let mut decoded = Vec::with_capacity(items.len());
        let mut message = String::new();
        for (index, item) in items.iter().enumerate() {
            match self.element.parse(ops, item) {
                DataResult::Success(value) => decoded.push(value),
                DataResult::Error { message: err, partial } => {
                    message = join_messages(&message, &format!("[{index}]: {err}"));
                    decoded.extend(partial);
                }
            }
        }
        if message.is_empty() {
            DataResult::success((decoded, ops.empty()))
        } else {
            DataResult::partial((decoded, ops.empty()), message)
        }
    }
}

/// See [`Codec::field_of`].
pub struct FieldCodec<C, A> {
    name: String,
    inner: C,
    _marker: PhantomData<fn() -> A>,
}

impl<C: Codec<A>, A> MapCodec<A> for FieldCodec<C, A> {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn encode_map<O: DynamicOps>(&self, input: &A, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        self.inner
            .encode_start(input, ops)
            .map_error(|m| format!("field `{}`: {m}", self.name))
            .flat_map(|encoded| ops.merge_to_map(&prefix, &self.name, encoded))
    }

    fn decode_map<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<A> {
        match ops.get(input, &self.name) {
            Some(field) => self
                .inner
                .parse(ops, &field)
                .map_error(|m| format!("field `{}`: {m}", self.name)),
            None => DataResult::error(format!("missing field `{}`", self.name)),
        }
    }
}

/// See [`Codec::optional_field_of`].
pub struct OptionalFieldCodec<C, A> {
    name: String,
    inner: C,
    _marker: PhantomData<fn() -> A>,
}

impl<C: Codec<A>, A> MapCodec<Option<A>> for OptionalFieldCodec<C, A> {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn encode_map<O: DynamicOps>(
        &self,
        input: &Option<A>,
        ops: &O,
        prefix: O::Value,
    ) -> DataResult<O::Value> {
        match input {
            Some(value) => self
                .inner
                .encode_start(value, ops)
                .map_error(|m| format!("field `{}`: {m}", self.name))
                .flat_map(|encoded| ops.merge_to_map(&prefix, &self.name, encoded)),
            None => DataResult::success(prefix),
        }
    }

    fn decode_map<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<Option<A>> {
        match ops.get(input, &self.name) {
            Some(field) => self
                .inner
                .parse(ops, &field)
                .map(Some)
                .map_error(|m| format!("field `{}`: {m}", self.name)),
            None => DataResult::success(None),
        }
    }
}

/// See [`Codec::optional_field_of_or`].
pub struct DefaultedFieldCodec<C, A> {
    name: String,
    inner: C,
    default: A,
}

impl<C: Codec<A>, A: Clone> MapCodec<A> for DefaultedFieldCodec<C, A> {
    fn keys(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn encode_map<O: DynamicOps>(&self, input: &A, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        self.inner
            .encode_start(input, ops)
            .map_error(|m| format!("field `{}`: {m}", self.name))
            .flat_map(|encoded| ops.merge_to_map(&prefix, &self.name, encoded))
    }

    fn decode_map<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<A> {
        match ops.get(input, &self.name) {
            Some(field) => self
                .inner
                .parse(ops, &field)
                .map_error(|m| format!("field `{}`: {m}", self.name)),
            None => DataResult::success(self.default.clone()),
        }
    }
}

/// See [`MapCodec::codec`].
pub struct MapCodecCodec<M, A> {
    inner: M,
    _marker: PhantomData<fn() -> A>,
}

impl<M: MapCodec<A>, A> Encoder<A> for MapCodecCodec<M, A> {
    fn encode<O: DynamicOps>(&self, input: &A, ops: &O, prefix: O::Value) -> DataResult<O::Value> {
        if !ops.is_empty_value(&prefix) && !ops.is_map(&prefix) {
            return DataResult::error(format!("cannot merge map fields into {prefix:?}"));
        }
        // A record with every field absent is still a map.
        let prefix = if ops.is_empty_value(&prefix) { ops.empty_map() } else { prefix };
        self.inner.encode_map(input, ops, prefix)
    }
}

impl<M: MapCodec<A>, A> Decoder<A> for MapCodecCodec<M, A> {
    fn decode<O: DynamicOps>(&self, ops: &O, input: &O::Value) -> DataResult<(A, O::Value)> {
        if !ops.is_map(input) {
            return DataResult::error(format!("expected a map, found {input:?}"));
        }
        let remainder = self
            .inner
            .keys()
            .iter()
            .fold(input.clone(), |rest, key| ops.remove(&rest, key));
        self.inner
            .decode_map(ops, input)
            .map(|value| (value, remainder))
    }
}
