//! Protobuf codec via `prost`.

use bytes::Bytes;
use prost::Message;

use crate::codec::{BinaryCodec, ByteStream, ValueStream};
use crate::error::CodecError;
use crate::framing::{FrameDecoder, FrameEncoder, Framing};
use crate::limits::MessageLimits;

/// Protobuf codec for any `T: prost::Message + Default`.
///
/// Streams are always enveloped: protobuf messages are not self-delimiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtoCodec;

impl<T> BinaryCodec<T> for ProtoCodec
where
    T: Message + Default + Send + 'static,
{
    fn name(&self) -> &'static str {
        "proto"
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<T, CodecError> {
        T::decode(bytes).map_err(|e| CodecError::new(format!("protobuf decoding failed: {e}")))
    }

    fn encode_one(&self, value: &T) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(value.encode_to_vec()))
    }

    fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<T> {
        Box::pin(FrameDecoder::new(chunks, *self, Framing::Enveloped).with_limits(limits))
    }

    fn encode_stream(&self, values: ValueStream<T>) -> ByteStream {
        Box::pin(FrameEncoder::new(values, *self, Framing::Enveloped))
    }
}
