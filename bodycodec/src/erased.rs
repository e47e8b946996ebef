//! Type-erased body codecs.
//!
//! [`ErasedBodyCodec`] lets body codecs with different value types live in one
//! collection, e.g. a [`BodyCodecRegistry`] keyed by procedure name. The
//! variant behaviour is kept intact; only the static types are traded for a
//! runtime check against [`AnyCodec`] and [`AnyValue`].

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bodycodec_core::{BinaryCodec, Error};
use futures::future::BoxFuture;

use crate::body::Body;
use crate::body_codec::{BodyCodec, BodyKind};

/// A binary codec handle with its element type erased.
#[derive(Clone)]
pub struct AnyCodec {
    name: &'static str,
    element_name: &'static str,
    /// Holds an `Arc<dyn BinaryCodec<E>>`.
    inner: Arc<dyn Any + Send + Sync>,
}

impl AnyCodec {
    /// Erase a codec bound to element type `E`.
    pub fn new<E, C>(codec: C) -> Self
    where
        E: 'static,
        C: BinaryCodec<E> + 'static,
    {
        let typed: Arc<dyn BinaryCodec<E>> = Arc::new(codec);
        Self {
            name: typed.name(),
            element_name: type_name::<E>(),
            inner: Arc::new(typed),
        }
    }

    /// The codec's format name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The Rust type name of the element this codec is bound to.
    pub fn element_name(&self) -> &'static str {
        self.element_name
    }

    /// Recover the typed codec.
    pub fn downcast<E: 'static>(&self) -> Result<&dyn BinaryCodec<E>, Error> {
        self.inner
            .downcast_ref::<Arc<dyn BinaryCodec<E>>>()
            .map(|codec| codec.as_ref())
            .ok_or(Error::TypeMismatch {
                expected: type_name::<E>(),
                found: self.element_name,
            })
    }
}

impl fmt::Debug for AnyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCodec")
            .field("name", &self.name)
            .field("element", &self.element_name)
            .finish()
    }
}

/// A value with its type erased.
pub struct AnyValue {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl AnyValue {
    /// Erase a value.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// The Rust type name of the stored value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the stored value is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Recover the typed value.
    pub fn downcast<T: 'static>(self) -> Result<T, Error> {
        let found = self.type_name;
        self.value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::TypeMismatch {
                expected: type_name::<T>(),
                found,
            })
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a [`BodyCodec`].
trait DynBodyCodec: Send + Sync {
    fn decode<'a>(&'a self, body: Body, codec: &'a AnyCodec) -> BoxFuture<'a, Result<AnyValue, Error>>;

    fn encode(&self, value: AnyValue, codec: &AnyCodec) -> Result<Body, Error>;
}

impl<B: BodyCodec> DynBodyCodec for B {
    fn decode<'a>(&'a self, body: Body, codec: &'a AnyCodec) -> BoxFuture<'a, Result<AnyValue, Error>> {
        Box::pin(async move {
            if let Some(unit) = self.unit_value() {
                return Ok(AnyValue::new(unit));
            }
            let codec = codec.downcast::<B::Element>()?;
            let value = BodyCodec::decode(self, body, codec).await?;
            Ok(AnyValue::new(value))
        })
    }

    fn encode(&self, value: AnyValue, codec: &AnyCodec) -> Result<Body, Error> {
        let value = value.downcast::<B::Value>()?;
        if self.kind() == BodyKind::Empty {
            return Ok(Body::empty());
        }
        let codec = codec.downcast::<B::Element>()?;
        Ok(BodyCodec::encode(self, value, codec))
    }
}

/// A body codec with its value and element types erased.
///
/// Cloning is cheap; clones share the underlying body codec.
#[derive(Clone)]
pub struct ErasedBodyCodec {
    kind: BodyKind,
    schema_name: Arc<str>,
    inner: Arc<dyn DynBodyCodec>,
}

impl ErasedBodyCodec {
    /// Erase a body codec. Same as [`BodyCodec::erase`].
    pub fn new<B: BodyCodec>(body_codec: B) -> Self {
        Self {
            kind: body_codec.kind(),
            schema_name: Arc::from(body_codec.schema().name()),
            inner: Arc::new(body_codec),
        }
    }

    /// The shape of the underlying body codec.
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// The name of the element schema.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Decode a body.
    ///
    /// The codec must be bound to the element type, unless the body codec
    /// never reads the body ([`Empty`](crate::Empty), or a
    /// [`Single`](crate::Single) over the unit schema).
    pub async fn decode(&self, body: Body, codec: &AnyCodec) -> Result<AnyValue, Error> {
        self.inner.decode(body, codec).await
    }

    /// Encode a value.
    ///
    /// Fails only if the value, or the codec of a non-empty body codec, does
    /// not match the erased types.
    pub fn encode(&self, value: AnyValue, codec: &AnyCodec) -> Result<Body, Error> {
        self.inner.encode(value, codec)
    }
}

impl fmt::Debug for ErasedBodyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBodyCodec")
            .field("kind", &self.kind)
            .field("schema", &self.schema_name)
            .finish()
    }
}

/// Erased body codecs keyed by route or procedure name.
#[derive(Clone, Debug, Default)]
pub struct BodyCodecRegistry {
    codecs: HashMap<String, ErasedBodyCodec>,
}

impl BodyCodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body codec, returning the one it replaces.
    pub fn insert<K, B>(&mut self, key: K, body_codec: B) -> Option<ErasedBodyCodec>
    where
        K: Into<String>,
        B: BodyCodec,
    {
        let key = key.into();
        tracing::trace!(
            target: "bodycodec",
            key = %key,
            kind = body_codec.kind().as_str(),
            "body codec registered"
        );
        self.codecs.insert(key, body_codec.erase())
    }

    /// Look up a body codec.
    pub fn get(&self, key: &str) -> Option<&ErasedBodyCodec> {
        self.codecs.get(key)
    }

    /// Number of registered body codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Iterate over registered body codecs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErasedBodyCodec)> {
        self.codecs.iter().map(|(k, v)| (k.as_str(), v))
    }
}
