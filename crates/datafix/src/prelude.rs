//! Everything needed to declare schemas and fixes.

pub use crate::codec::{Codec, Decoder, Encoder, MapCodec, RecordCodecBuilder};
pub use crate::fixes;
pub use crate::types::dsl;
pub use crate::{
    DataFixer, DataFixerBuilder, DataResult, DataVersion, Dynamic, DynamicOps, Fix, FixerConfig,
    Schema, SchemaRegistry, TaggedDynamic, TypeReference, TypeRewriteRule, Value, ValueOps,
};
