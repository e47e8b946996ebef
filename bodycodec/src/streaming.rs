//! Lazy element sequences.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bodycodec_core::{Error, ValueStream};
use futures::{Stream, StreamExt, stream};

/// A lazy, possibly infinite sequence of elements.
///
/// This is the value a [`Multiple`](crate::Multiple) body codec decodes to and
/// encodes from. Failures are delivered in-band: elements yielded before an
/// error stay valid.
///
/// # Example
///
/// ```ignore
/// let mut stream = multiple.decode(body, &codec).await?;
/// while let Some(msg) = stream.next().await {
///     let msg = msg?;
///     // process msg
/// }
/// ```
pub struct Streaming<T> {
    inner: ValueStream<T>,
}

impl<T> Streaming<T> {
    /// Create a new Streaming from a boxed stream.
    pub fn new(stream: ValueStream<T>) -> Self {
        Self { inner: stream }
    }

    /// Create a Streaming from any fallible stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Create a Streaming that yields every item of `values`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: 'static,
    {
        Self::from_stream(stream::iter(values).map(Ok))
    }

    /// Convert into the underlying stream.
    pub fn into_stream(self) -> ValueStream<T> {
        self.inner
    }
}

impl<T> Stream for Streaming<T> {
    type Item = Result<T, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> fmt::Debug for Streaming<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streaming").finish_non_exhaustive()
    }
}
