//! Element schemas.
//!
//! A [`Schema`] is an opaque, immutable description of the element type a
//! body carries. Body codecs only compare schemas and detect the unit schema;
//! they never interpret the structure.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// The shape of a schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// The unit/empty type. Carries no information.
    Unit,
    /// Any other element type.
    Value,
}

/// Description of an element type `T`.
///
/// Every schema for `()` is the unit schema, whatever its name. Equality and
/// hashing only look at the kind and, for other schemas, the name, so `T`
/// does not need to implement any traits itself.
///
/// # Example
///
/// ```
/// use bodycodec_core::Schema;
///
/// let unit = Schema::unit();
/// assert!(unit.is_unit());
/// assert_eq!(Schema::<()>::of(), unit);
///
/// let ints = Schema::<i32>::of();
/// assert!(!ints.is_unit());
/// assert_eq!(ints.name(), "i32");
/// ```
pub struct Schema<T> {
    name: Cow<'static, str>,
    kind: SchemaKind,
    unit: Option<fn() -> T>,
    _marker: PhantomData<fn() -> T>,
}

impl Schema<()> {
    /// The unit schema.
    pub fn unit() -> Self {
        Self::of()
    }
}

/// Producer for the unit value, `Some` only when `T` is `()`.
fn unit_producer<T: 'static>() -> Option<fn() -> T> {
    let make: Box<dyn Any> = Box::new((|| ()) as fn());
    make.downcast::<fn() -> T>().ok().map(|make| *make)
}

impl<T: 'static> Schema<T> {
    /// Schema named after the Rust type.
    pub fn of() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Schema with an explicit name, such as a fully-qualified message name.
    pub fn named<S: Into<Cow<'static, str>>>(name: S) -> Self {
        let unit = unit_producer::<T>();
        Self {
            name: name.into(),
            kind: if unit.is_some() {
                SchemaKind::Unit
            } else {
                SchemaKind::Value
            },
            unit,
            _marker: PhantomData,
        }
    }
}

impl<T> Schema<T> {
    /// The schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema kind.
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Returns true for the unit schema.
    pub fn is_unit(&self) -> bool {
        self.kind == SchemaKind::Unit
    }

    /// The only value of the unit schema, `None` for every other schema.
    pub fn unit_value(&self) -> Option<T> {
        self.unit.map(|make| make())
    }
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            unit: self.unit,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Schema<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind, other.kind) {
            (SchemaKind::Unit, SchemaKind::Unit) => true,
            (a, b) => a == b && self.name == other.name,
        }
    }
}

impl<T> Eq for Schema<T> {}

impl<T> Hash for Schema<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        if self.kind == SchemaKind::Value {
            self.name.hash(state);
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T> fmt::Display for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
