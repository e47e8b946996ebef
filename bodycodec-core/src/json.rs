//! JSON codec via `serde_json`.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{BinaryCodec, ByteStream, ValueStream};
use crate::error::CodecError;
use crate::framing::{FrameDecoder, FrameEncoder, Framing};
use crate::limits::MessageLimits;

/// JSON codec for any `T: Serialize + DeserializeOwned`.
///
/// Streams are enveloped by default; [`JsonCodec::newline_delimited`]
/// switches to NDJSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec {
    framing: Framing,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self {
            framing: Framing::Enveloped,
        }
    }
}

impl JsonCodec {
    /// Create an enveloped JSON codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec that streams newline-delimited JSON.
    pub fn newline_delimited() -> Self {
        Self {
            framing: Framing::Delimited(b'\n'),
        }
    }

    /// The stream framing this codec uses.
    pub fn framing(&self) -> Framing {
        self.framing
    }
}

impl<T> BinaryCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CodecError::new(format!("JSON decoding failed: {e}")))
    }

    fn encode_one(&self, value: &T) -> Result<Bytes, CodecError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| CodecError::new(format!("JSON encoding failed: {e}")))
    }

    fn decode_stream(&self, chunks: ByteStream, limits: MessageLimits) -> ValueStream<T> {
        Box::pin(FrameDecoder::new(chunks, *self, self.framing).with_limits(limits))
    }

    fn encode_stream(&self, values: ValueStream<T>) -> ByteStream {
        Box::pin(FrameEncoder::new(values, *self, self.framing))
    }
}
