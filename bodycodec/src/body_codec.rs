//! Body codecs.
//!
//! A body codec knows the *shape* of a body and drives a caller-supplied
//! [`BinaryCodec`] against it. There are exactly three shapes:
//!
//! - [`Empty`]: no payload
//! - [`Single`]: one value, fully buffered
//! - [`Multiple`]: a lazy sequence of values, never fully buffered
//!
//! Body codecs are built once (typically when a route is defined) and shared
//! across every request matching it. They hold no per-request state.

use std::fmt;
use std::future::{Future, ready};

use bodycodec_core::{BinaryCodec, Error, MessageLimits, Schema};

use crate::body::Body;
use crate::erased::ErasedBodyCodec;
use crate::streaming::Streaming;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Empty {}
    impl<T> Sealed for super::Single<T> {}
    impl<T> Sealed for super::Multiple<T> {}
}

/// The shape tag of a body codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Empty,
    Single,
    Multiple,
}

impl BodyKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Empty => "empty",
            BodyKind::Single => "single",
            BodyKind::Multiple => "multiple",
        }
    }
}

/// Converts between a body and a value of type [`Self::Value`].
///
/// This trait is sealed: [`Empty`], [`Single`] and [`Multiple`] are the only
/// implementations.
pub trait BodyCodec: sealed::Sealed + Clone + Send + Sync + 'static {
    /// The outer payload type: `()`, `T`, or [`Streaming<T>`].
    type Value: Send + 'static;

    /// The schema-described element type.
    type Element: 'static;

    /// The shape of this body codec.
    fn kind(&self) -> BodyKind;

    /// The element schema.
    fn schema(&self) -> Schema<Self::Element>;

    /// The decoded value when this body codec never reads the body or the
    /// codec: always for [`Empty`], and for a [`Single`] over the unit schema.
    fn unit_value(&self) -> Option<Self::Value>;

    /// Decode a body into a value.
    fn decode(
        &self,
        body: Body,
        codec: &dyn BinaryCodec<Self::Element>,
    ) -> impl Future<Output = Result<Self::Value, Error>> + Send;

    /// Encode a value into a body.
    fn encode(&self, value: Self::Value, codec: &dyn BinaryCodec<Self::Element>) -> Body;

    /// Erase the value and element types for heterogeneous storage.
    fn erase(self) -> ErasedBodyCodec {
        ErasedBodyCodec::new(self)
    }
}

// ============================================================================
// Empty
// ============================================================================

/// A body that carries nothing.
///
/// Decoding ignores the body and the codec and never fails; encoding always
/// yields [`Body::empty`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Empty;

impl BodyCodec for Empty {
    type Value = ();
    type Element = ();

    fn kind(&self) -> BodyKind {
        BodyKind::Empty
    }

    fn schema(&self) -> Schema<()> {
        Schema::unit()
    }

    fn unit_value(&self) -> Option<()> {
        Some(())
    }

    fn decode(
        &self,
        _body: Body,
        _codec: &dyn BinaryCodec<()>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        ready(Ok(()))
    }

    fn encode(&self, _value: (), _codec: &dyn BinaryCodec<()>) -> Body {
        Body::empty()
    }
}

// ============================================================================
// Single
// ============================================================================

/// A body carrying exactly one value.
///
/// Decoding materializes the whole body before handing it to the codec.
/// A body declared with the unit schema is never read: it decodes to `()`
/// without touching the body or the codec.
pub struct Single<T> {
    schema: Schema<T>,
    /// Computed once from the schema.
    is_unit: bool,
    limits: MessageLimits,
}

impl<T> Single<T> {
    /// Create a single-value body codec with default limits.
    pub fn new(schema: Schema<T>) -> Self {
        Self {
            is_unit: schema.is_unit(),
            schema,
            limits: MessageLimits::default(),
        }
    }

    /// Set the limit applied when materializing the body.
    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The configured limits.
    pub fn limits(&self) -> MessageLimits {
        self.limits
    }
}

impl<T> Clone for Single<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            is_unit: self.is_unit,
            limits: self.limits,
        }
    }
}

impl<T> fmt::Debug for Single<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Single")
            .field("schema", &self.schema)
            .field("limits", &self.limits)
            .finish()
    }
}

impl<T> BodyCodec for Single<T>
where
    T: Send + 'static,
{
    type Value = T;
    type Element = T;

    fn kind(&self) -> BodyKind {
        BodyKind::Single
    }

    fn schema(&self) -> Schema<T> {
        self.schema.clone()
    }

    fn unit_value(&self) -> Option<T> {
        if self.is_unit {
            self.schema.unit_value()
        } else {
            None
        }
    }

    async fn decode(&self, body: Body, codec: &dyn BinaryCodec<T>) -> Result<T, Error> {
        if let Some(unit) = self.unit_value() {
            tracing::trace!(target: "bodycodec", "unit schema, body not read");
            return Ok(unit);
        }

        let bytes = body.collect(self.limits).await?;
        Ok(codec.decode_one(&bytes)?)
    }

    fn encode(&self, value: T, codec: &dyn BinaryCodec<T>) -> Body {
        match codec.encode_one(&value) {
            Ok(bytes) => Body::full(bytes),
            Err(e) => Body::failed(Error::encode(e.message())),
        }
    }
}

// ============================================================================
// Multiple
// ============================================================================

/// A body carrying a lazy sequence of values.
///
/// Decoding returns immediately with a [`Streaming`] that pulls one chunk at
/// a time from the body as elements are requested. Encoding returns a
/// streaming body that produces no bytes until it is polled.
pub struct Multiple<T> {
    schema: Schema<T>,
    limits: MessageLimits,
}

impl<T> Multiple<T> {
    /// Create a multi-value body codec with default per-frame limits.
    pub fn new(schema: Schema<T>) -> Self {
        Self {
            schema,
            limits: MessageLimits::default(),
        }
    }

    /// Set the limit applied to each frame.
    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The configured limits.
    pub fn limits(&self) -> MessageLimits {
        self.limits
    }

    /// Decode a body into a lazy sequence without going through a future.
    pub fn decode_stream(&self, body: Body, codec: &dyn BinaryCodec<T>) -> Streaming<T> {
        Streaming::new(codec.decode_stream(body.into_stream(), self.limits))
    }
}

impl<T> Clone for Multiple<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            limits: self.limits,
        }
    }
}

impl<T> fmt::Debug for Multiple<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiple")
            .field("schema", &self.schema)
            .field("limits", &self.limits)
            .finish()
    }
}

impl<T> BodyCodec for Multiple<T>
where
    T: Send + 'static,
{
    type Value = Streaming<T>;
    type Element = T;

    fn kind(&self) -> BodyKind {
        BodyKind::Multiple
    }

    fn schema(&self) -> Schema<T> {
        self.schema.clone()
    }

    fn unit_value(&self) -> Option<Streaming<T>> {
        None
    }

    fn decode(
        &self,
        body: Body,
        codec: &dyn BinaryCodec<T>,
    ) -> impl Future<Output = Result<Streaming<T>, Error>> + Send {
        ready(Ok(self.decode_stream(body, codec)))
    }

    fn encode(&self, value: Streaming<T>, codec: &dyn BinaryCodec<T>) -> Body {
        Body::Streaming {
            stream: codec.encode_stream(value.into_stream()),
        }
    }
}
