//! Transport body.
//!
//! [`Body`] is the opaque byte container body codecs read from and write to.
//! It can be materialized in full with [`Body::collect`] or read lazily with
//! [`Body::into_stream`], and it implements [`http_body::Body`] so it can be
//! handed to hyper or axum directly.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bodycodec_core::{BodyError, ByteStream, Error, MessageLimits};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use pin_project_lite::pin_project;

pin_project! {
    /// A transport body.
    ///
    /// This type can represent:
    /// - Empty bodies
    /// - Full bodies (a single contiguous block)
    /// - Streaming bodies (a lazy sequence of chunks)
    #[project = BodyProj]
    pub enum Body {
        /// Empty body.
        Empty,
        /// Full body with all data available.
        Full {
            data: Option<Bytes>,
        },
        /// Streaming body from an async stream.
        Streaming {
            #[pin]
            stream: ByteStream,
        },
    }
}

impl Body {
    /// Create an empty body.
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Create a body with the given data.
    pub fn full<B: Into<Bytes>>(data: B) -> Self {
        Body::Full {
            data: Some(data.into()),
        }
    }

    /// Create a streaming body from the given stream.
    pub fn streaming<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Body::Streaming {
            stream: Box::pin(stream),
        }
    }

    /// Create a body whose first read fails with `err`.
    pub fn failed(err: Error) -> Self {
        Body::streaming(stream::once(async move { Err(err) }))
    }

    /// Adapt any [`http_body::Body`], such as a hyper request body.
    ///
    /// Trailers are skipped; transport errors become [`BodyError::Transport`].
    pub fn from_http_body<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let stream = body
            .into_data_stream()
            .map_err(|e| {
                let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                Error::Body(BodyError::Transport(e.to_string()))
            });
        Body::streaming(stream)
    }

    /// Returns true for streaming bodies.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Body::Streaming { .. })
    }

    /// Read the whole body into one contiguous block.
    ///
    /// Fails with [`BodyError::LengthLimitExceeded`] as soon as the data read
    /// so far exceeds `limits`, and with the stream's own error if a chunk
    /// cannot be read.
    pub async fn collect(self, limits: MessageLimits) -> Result<Bytes, Error> {
        let bytes = match self {
            Body::Empty => Bytes::new(),
            Body::Full { data } => {
                let data = data.unwrap_or_default();
                limits.check_size(data.len())?;
                data
            }
            Body::Streaming { mut stream } => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    limits.check_size(buf.len() + chunk.len())?;
                    buf.extend_from_slice(&chunk);
                }
                buf.freeze()
            }
        };

        tracing::trace!(target: "bodycodec", size = bytes.len(), "body materialized");
        Ok(bytes)
    }

    /// Read the whole body with no size limit.
    pub async fn collect_unlimited(self) -> Result<Bytes, Error> {
        self.collect(MessageLimits::unlimited()).await
    }

    /// Expose the body as a lazy sequence of chunks.
    ///
    /// Dropping the returned stream drops the underlying source.
    pub fn into_stream(self) -> ByteStream {
        match self {
            Body::Empty => Box::pin(stream::empty()),
            Body::Full { data } => Box::pin(stream::iter(data.map(Ok))),
            Body::Streaming { stream } => stream,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Body::full(data)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::full(data)
    }
}

impl From<&'static [u8]> for Body {
    fn from(data: &'static [u8]) -> Self {
        Body::full(Bytes::from_static(data))
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Body::full(data)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Full { data } => f
                .debug_struct("Body::Full")
                .field("len", &data.as_ref().map_or(0, Bytes::len))
                .finish(),
            Body::Streaming { .. } => f.write_str("Body::Streaming"),
        }
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            BodyProj::Empty => Poll::Ready(None),
            BodyProj::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            BodyProj::Streaming { stream } => match stream.poll_next(cx) {
                Poll::Ready(Some(Ok(data))) => Poll::Ready(Some(Ok(Frame::data(data)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Full { data } => data.is_none(),
            Body::Streaming { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Body::Empty => SizeHint::with_exact(0),
            Body::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            Body::Streaming { .. } => SizeHint::default(),
        }
    }
}
