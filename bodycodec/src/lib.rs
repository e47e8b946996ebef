//! # bodycodec
//!
//! Converts between typed payloads and transport bodies, with the byte format
//! supplied per call by a [`BinaryCodec`].
//!
//! A payload has one of three shapes, each with its own body codec:
//!
//! - [`Empty`]: no payload; never reads the body
//! - [`Single`]: one value; the body is fully buffered before decoding
//! - [`Multiple`]: a lazy [`Streaming`] sequence; bytes are read and produced
//!   only as elements are pulled
//!
//! Body codecs are immutable and meant to be built once per route and reused.
//! [`BodyCodec::erase`] turns any of them into an [`ErasedBodyCodec`] so
//! different shapes can share one [`BodyCodecRegistry`].
//!
//! ## Example
//!
//! ```ignore
//! use bodycodec::prelude::*;
//!
//! let single = Single::new(Schema::<Greeting>::named("acme.Greeting"));
//! let codec = JsonCodec::new();
//!
//! let body = single.encode(Greeting { name: "ada".into() }, &codec);
//! let greeting = single.decode(body, &codec).await?;
//! ```

mod body;
mod body_codec;
mod erased;
mod streaming;

pub use body::Body;
pub use body_codec::{BodyCodec, BodyKind, Empty, Multiple, Single};
pub use erased::{AnyCodec, AnyValue, BodyCodecRegistry, ErasedBodyCodec};
pub use streaming::Streaming;

pub use bodycodec_core::{
    BinaryCodec, BodyError, ByteStream, CodecError, Error, FrameDecoder, FrameEncoder, Framing,
    JsonCodec, MessageLimits, ProtoCodec, Schema, SchemaKind, ValueStream,
};

// Re-export several crates
pub use bodycodec_core;
pub use bytes;
pub use futures;

pub mod prelude {
    //! A prelude providing the most common types.
    pub use crate::{
        BinaryCodec, Body, BodyCodec, BodyKind, Empty, Error, JsonCodec, MessageLimits,
        Multiple, ProtoCodec, Schema, Single, Streaming,
    };
}
