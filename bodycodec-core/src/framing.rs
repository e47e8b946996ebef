//! Stream framing.
//!
//! A multi-element body is a sequence of frames. This module provides the
//! framing kinds a codec can pick and two stream adapters:
//!
//! - [`FrameDecoder`]: parses frames out of a byte stream and decodes each one
//! - [`FrameEncoder`]: encodes each element and wraps it into a frame
//!
//! Enveloped framing follows the Connect streaming format:
//!
//! ```text
//! [flags:1][length:4][payload:length]
//! ```

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;

use crate::codec::{BinaryCodec, ByteStream, ValueStream};
use crate::error::Error;
use crate::limits::MessageLimits;

/// Envelope flags.
pub mod envelope_flags {
    /// Regular message.
    pub const MESSAGE: u8 = 0x00;
    /// End of stream.
    pub const END_STREAM: u8 = 0x02;
}

/// Envelope header size (flags + length).
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// How elements are delimited inside a byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// `[flags:1][length:4][payload]` envelopes, terminated by an end-of-stream envelope.
    Enveloped,
    /// Every element is exactly this many bytes.
    Fixed(usize),
    /// Elements are separated by this byte (e.g. `b'\n'` for NDJSON).
    Delimited(u8),
}

/// Length field for a payload of `len` bytes.
///
/// Fails with [`Error::Encode`] if the payload does not fit the 4-byte field.
pub fn envelope_length(len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| {
        Error::encode(format!(
            "message of {len} bytes exceeds the maximum envelope length of {} bytes",
            u32::MAX
        ))
    })
}

/// Wrap payload in an envelope with the given flags.
///
/// The payload length must fit in a `u32`; check it with [`envelope_length`].
pub fn wrap_envelope(flags: u8, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&[flags]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Parse an envelope header.
///
/// Returns `(flags, length)`, or `None` if there aren't enough bytes yet.
pub fn parse_envelope_header(data: &[u8]) -> Option<(u8, u32)> {
    if data.len() < ENVELOPE_HEADER_SIZE {
        return None;
    }

    let flags = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);

    Some((flags, length))
}

/// A frame parsed out of the buffer.
enum DecodedFrame<T> {
    /// A decoded element.
    Message(T),
    /// A delimiter with nothing in front of it.
    Skip,
    /// End-of-stream envelope.
    EndStream,
}

/// Stream adapter that decodes framed elements from a byte stream.
///
/// The decoder pulls the next chunk only when the buffer does not hold a
/// complete frame, so no bytes are read ahead of demand. The first error is
/// yielded and ends the stream; elements yielded before it stay valid.
///
/// # Example
///
/// ```ignore
/// let decoder = FrameDecoder::new(chunks, JsonCodec::default(), Framing::Enveloped);
///
/// while let Some(result) = decoder.next().await {
///     let msg: MyMessage = result?;
/// }
/// ```
pub struct FrameDecoder<C, T> {
    /// The underlying byte stream.
    stream: ByteStream,
    /// Buffer for incomplete frames.
    buffer: BytesMut,
    codec: C,
    framing: Framing,
    limits: MessageLimits,
    /// Bytes at the front of the buffer already searched for a delimiter.
    scanned: usize,
    /// Whether the stream has finished (end-of-stream, end of input, or error).
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<C, T> FrameDecoder<C, T>
where
    C: BinaryCodec<T>,
{
    /// Create a new frame decoder with default limits.
    pub fn new(stream: ByteStream, codec: C, framing: Framing) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            codec,
            framing,
            limits: MessageLimits::default(),
            scanned: 0,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Set the per-frame size limit.
    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Check if the stream has finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode_message(&self, bytes: &[u8]) -> Result<T, Error> {
        self.limits.check_size(bytes.len())?;
        Ok(self.codec.decode_one(bytes)?)
    }

    /// Try to parse a complete frame from the buffer.
    ///
    /// Returns `Ok(None)` if more data is needed.
    fn try_parse_frame(&mut self) -> Result<Option<DecodedFrame<T>>, Error> {
        match self.framing {
            Framing::Enveloped => {
                let Some((flags, length)) = parse_envelope_header(&self.buffer) else {
                    return Ok(None);
                };
                self.limits.check_size(length as usize)?;

                let frame_size = ENVELOPE_HEADER_SIZE + length as usize;
                if self.buffer.len() < frame_size {
                    return Ok(None);
                }

                let frame = self.buffer.split_to(frame_size);
                match flags {
                    envelope_flags::END_STREAM => Ok(Some(DecodedFrame::EndStream)),
                    envelope_flags::MESSAGE => {
                        let msg = self.decode_message(&frame[ENVELOPE_HEADER_SIZE..])?;
                        Ok(Some(DecodedFrame::Message(msg)))
                    }
                    other => Err(Error::decode(format!("invalid frame flags: 0x{other:02x}"))),
                }
            }
            Framing::Fixed(0) => Err(Error::decode("fixed frame width must be non-zero")),
            Framing::Fixed(width) => {
                if self.buffer.len() < width {
                    return Ok(None);
                }
                let frame = self.buffer.split_to(width);
                Ok(Some(DecodedFrame::Message(self.decode_message(&frame)?)))
            }
            Framing::Delimited(delimiter) => {
                let found = self.buffer[self.scanned..]
                    .iter()
                    .position(|b| *b == delimiter);
                let Some(offset) = found else {
                    self.scanned = self.buffer.len();
                    // an unterminated frame must still fit the limit
                    self.limits.check_size(self.buffer.len())?;
                    return Ok(None);
                };
                let pos = self.scanned + offset;
                self.scanned = 0;
                let frame = self.buffer.split_to(pos + 1);
                let segment = &frame[..pos];
                if segment.is_empty() {
                    return Ok(Some(DecodedFrame::Skip));
                }
                Ok(Some(DecodedFrame::Message(self.decode_message(segment)?)))
            }
        }
    }

    /// Handle end of input. Returns a final item, if any.
    fn finish_input(&mut self) -> Option<Result<T, Error>> {
        self.finished = true;
        if self.buffer.is_empty() {
            tracing::trace!(target: "bodycodec", "frame stream ended");
            return None;
        }

        let remaining = self.buffer.split();
        self.scanned = 0;
        match self.framing {
            // a trailing element without a delimiter is still an element
            Framing::Delimited(_) => Some(self.decode_message(&remaining)),
            _ => Some(Err(Error::decode(format!(
                "stream ended with {} bytes of incomplete data",
                remaining.len()
            )))),
        }
    }
}

impl<C, T> Unpin for FrameDecoder<C, T> {}

impl<C, T> Stream for FrameDecoder<C, T>
where
    C: BinaryCodec<T>,
{
    type Item = Result<T, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match this.try_parse_frame() {
                Ok(Some(DecodedFrame::Message(msg))) => return Poll::Ready(Some(Ok(msg))),
                Ok(Some(DecodedFrame::Skip)) => continue,
                Ok(Some(DecodedFrame::EndStream)) => {
                    tracing::trace!(target: "bodycodec", "end-of-stream envelope received");
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Ok(None) => {
                    // Need more data
                }
                Err(e) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => return Poll::Ready(this.finish_input()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// State of the frame encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    /// Encoding elements from the inner stream.
    Streaming,
    /// Need to send the end-of-stream envelope.
    SendEndStream,
    /// All frames have been sent.
    Done,
}

/// Stream adapter that encodes elements into frames.
///
/// One frame is produced per element pulled from the inner stream. Enveloped
/// streams are terminated by an end-of-stream envelope carrying `{}`.
/// An error from the inner stream or from the codec is yielded and ends the
/// stream.
pub struct FrameEncoder<C, T> {
    /// The underlying element stream.
    stream: ValueStream<T>,
    codec: C,
    framing: Framing,
    state: EncoderState,
}

impl<C, T> FrameEncoder<C, T>
where
    C: BinaryCodec<T>,
{
    /// Create a new frame encoder.
    pub fn new(stream: ValueStream<T>, codec: C, framing: Framing) -> Self {
        Self {
            stream,
            codec,
            framing,
            state: EncoderState::Streaming,
        }
    }

    /// Check if the encoder has finished sending all frames.
    pub fn is_finished(&self) -> bool {
        self.state == EncoderState::Done
    }

    fn encode_frame(&self, msg: &T) -> Result<Bytes, Error> {
        let payload = self
            .codec
            .encode_one(msg)
            .map_err(|e| Error::encode(e.message()))?;

        Ok(match self.framing {
            Framing::Enveloped => {
                envelope_length(payload.len())?;
                wrap_envelope(envelope_flags::MESSAGE, &payload)
            }
            Framing::Fixed(_) => payload,
            Framing::Delimited(delimiter) => {
                let mut frame = BytesMut::with_capacity(payload.len() + 1);
                frame.extend_from_slice(&payload);
                frame.extend_from_slice(&[delimiter]);
                frame.freeze()
            }
        })
    }
}

impl<C, T> Unpin for FrameEncoder<C, T> {}

impl<C, T> Stream for FrameEncoder<C, T>
where
    C: BinaryCodec<T>,
{
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.state {
                EncoderState::Streaming => match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(msg))) => match this.encode_frame(&msg) {
                        Ok(frame) => return Poll::Ready(Some(Ok(frame))),
                        Err(e) => {
                            this.state = EncoderState::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                    },
                    Poll::Ready(Some(Err(e))) => {
                        this.state = EncoderState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        this.state = match this.framing {
                            Framing::Enveloped => EncoderState::SendEndStream,
                            _ => EncoderState::Done,
                        };
                    }
                    Poll::Pending => return Poll::Pending,
                },
                EncoderState::SendEndStream => {
                    this.state = EncoderState::Done;
                    return Poll::Ready(Some(Ok(wrap_envelope(envelope_flags::END_STREAM, b"{}"))));
                }
                EncoderState::Done => return Poll::Ready(None),
            }
        }
    }
}
