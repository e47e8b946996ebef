//! Error types shared by codecs and body codecs.
//!
//! - [`Error`]: the error kind surfaced by decode operations
//! - [`BodyError`]: failures reported by the transport body
//! - [`CodecError`]: format-layer diagnostics reported by a [`BinaryCodec`](crate::BinaryCodec)

use std::io;
use std::sync::Arc;

/// Errors surfaced while decoding or reading a body.
///
/// Encoding through a body codec never returns an error. A codec that fails
/// to encode produces a body whose read yields [`Error::Encode`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The codec rejected the bytes. Carries the codec's own message.
    #[error("decode error: {0}")]
    Decode(String),

    /// The codec could not encode an element.
    #[error("encode error: {0}")]
    Encode(String),

    /// The body could not be read.
    #[error(transparent)]
    Body(#[from] BodyError),

    /// A dynamically typed codec or value did not match the element type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl Error {
    /// Create a decode error from a codec message.
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Error::Decode(message.into())
    }

    /// Returns true if the codec rejected the content.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// Returns true if the failure came from the body.
    pub fn is_body(&self) -> bool {
        matches!(self, Error::Body(_))
    }

    /// Create an encode error from a codec message.
    pub fn encode<S: Into<String>>(message: S) -> Self {
        Error::Encode(message.into())
    }

    /// Get the codec message for decode and encode errors.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::Decode(msg) | Error::Encode(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Decode(err.message)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Body(BodyError::from(err))
    }
}

/// Failures reported by the transport body.
#[derive(Clone, Debug, thiserror::Error)]
pub enum BodyError {
    /// I/O failure while reading the body.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),

    /// Failure reported by the underlying transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body or a single frame is larger than the configured limit.
    #[error("message size {size} bytes exceeds maximum allowed size of {limit} bytes")]
    LengthLimitExceeded { size: usize, limit: usize },
}

impl From<io::Error> for BodyError {
    fn from(err: io::Error) -> Self {
        BodyError::Io(Arc::new(err))
    }
}

/// A diagnostic reported by a binary codec.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    /// Create a codec error with a message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the codec's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
