//! Binary codec trait.
//!
//! A [`BinaryCodec`] is a format-specific encoder/decoder bound to one
//! element type. Codecs are supplied per call, so the same body codec can be
//! driven with whichever format was negotiated at the edge.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;

use crate::error::{CodecError, Error};
use crate::limits::MessageLimits;

/// A lazy sequence of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// A lazy sequence of decoded elements, failing in-band.
pub type ValueStream<T> = Pin<Box<dyn Stream<Item = Result<T, Error>> + Send>>;

/// Encoder/decoder bound to element type `T`.
///
/// The streaming methods take `&self` but return `'static` streams;
/// implementations capture a clone of whatever state they need. Most
/// implementations delegate to [`FrameDecoder`](crate::FrameDecoder) and
/// [`FrameEncoder`](crate::FrameEncoder).
///
/// # Example
///
/// ```ignore
/// use bodycodec_core::{BinaryCodec, ByteStream, CodecError, FrameDecoder, FrameEncoder, Framing, MessageLimits, ValueStream};
/// use bytes::Bytes;
///
/// #[derive(Clone, Copy)]
/// struct U16Codec;
///
/// impl BinaryCodec<u16> for U16Codec {
///     fn name(&self) -> &'static str { "u16" }
///
///     fn decode_one(&self, bytes: &[u8]) -> Result<u16, CodecError> {
///         let raw: [u8; 2] = bytes.try_into().map_err(|_| CodecError::new("expected 2 bytes"))?;
///         Ok(u16::from_be_bytes(raw))
///     }
///
///     fn encode_one(&self, value: &u16) -> Result<Bytes, CodecError> {
///         Ok(Bytes::copy_from_slice(&value.to_be_bytes()))
///     }
///
///     fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<u16> {
///         Box::pin(FrameDecoder::new(chunks, *self, Framing::Fixed(2)).with_limits(limits))
///     }
///
///     fn encode_stream(&self, values: ValueStream<u16>) -> ByteStream {
///         Box::pin(FrameEncoder::new(values, *self, Framing::Fixed(2)))
///     }
/// }
/// ```
pub trait BinaryCodec<T>: Send + Sync {
    /// Format name (e.g. "json", "proto").
    fn name(&self) -> &'static str;

    /// Decode one element from a complete byte block.
    fn decode_one(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Encode one element into a byte block.
    fn encode_one(&self, value: &T) -> Result<Bytes, CodecError>;

    /// Decode a lazy sequence of byte chunks into a lazy sequence of elements.
    ///
    /// Codec failures surface in-band as [`Error::Decode`] at the offending
    /// position; chunk failures are passed through unchanged.
    fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<T>;

    /// Encode a lazy sequence of elements into a lazy sequence of byte chunks.
    fn encode_stream(&self, values: ValueStream<T>) -> ByteStream;
}

impl<T, C> BinaryCodec<T> for Arc<C>
where
    C: BinaryCodec<T> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (**self).decode_one(bytes)
    }

    fn encode_one(&self, value: &T) -> Result<Bytes, CodecError> {
        (**self).encode_one(value)
    }

    fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<T> {
        (**self).decode_stream(chunks, limits)
    }

    fn encode_stream(&self, values: ValueStream<T>) -> ByteStream {
        (**self).encode_stream(values)
    }
}
