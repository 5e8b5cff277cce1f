//! Serializers and deserializers
//!
//! A [`Serializer`] turns a request entity into wire content and a
//! [`Deserializer`] turns a response body into the operation's declared
//! return type. Endpoints and operations refer to them through
//! [`SerializerRef`] / [`DeserializerRef`]; the [`CodecRegistry`] turns a
//! reference into an instance, caching builtins and singleton customs.
//!
//! Builtin codecs exist for JSON, plain text and, with the `xml` feature,
//! XML. Each builtin backend is probed once per process; an unavailable
//! backend fails every use with [`CodecError::CodecUnavailable`].

pub mod availability;
mod builtin;
mod registry;
mod resolution;

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::CodecError;
use crate::types::{ModelEntity, Reply, ReturnType};

pub use builtin::{JsonCodec, PlainCodec};
#[cfg(feature = "xml")]
pub use builtin::XmlCodec;
pub use registry::CodecRegistry;
pub use resolution::{resolve_deserializer, resolve_serializer};

/// Content types with a builtin codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Xml,
    Plain,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Plain => "text/plain; charset=utf-8",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a serializer is asked to encode.
#[derive(Debug, Clone, Copy)]
pub enum SerializeInput<'a> {
    Text(&'a str),
    Model(&'a dyn ModelEntity),
}

/// Encodes a request entity.
pub trait Serializer: Send + Sync {
    /// MIME type set on the request unless it already has one.
    fn content_type(&self) -> &str;

    fn serialize(&self, input: SerializeInput<'_>) -> Result<Bytes, CodecError>;
}

/// Decodes a response body into a [`Reply`] matching the declared return type.
pub trait Deserializer: Send + Sync {
    fn content_type(&self) -> &str;

    /// The concrete type this deserializer always produces, if it is fixed.
    ///
    /// A declared type that differs from the operation's return type is
    /// rejected before the deserializer is used.
    fn output_type(&self) -> Option<TypeId> {
        None
    }

    fn deserialize(&self, body: &[u8], target: &ReturnType) -> Result<Reply, CodecError>;
}

/// Whether a custom codec is created once or for every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Singleton,
    PerCall,
}

type Factory<T> = Arc<dyn Fn() -> Result<Arc<T>, CodecError> + Send + Sync>;

/// A user supplied codec: a registry key, a lifecycle and a factory.
pub struct CustomCodec<T: ?Sized> {
    key: String,
    lifecycle: Lifecycle,
    factory: Factory<T>,
}

impl<T: ?Sized> CustomCodec<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn instantiate(&self) -> Result<Arc<T>, CodecError> {
        (self.factory)()
    }
}

impl<T: ?Sized> Clone for CustomCodec<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            lifecycle: self.lifecycle,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: ?Sized> fmt::Debug for CustomCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCodec")
            .field("key", &self.key)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

/// Reference to a serializer declared on an endpoint or operation.
#[derive(Debug, Clone)]
pub enum SerializerRef {
    Builtin(ContentType),
    Custom(CustomCodec<dyn Serializer>),
}

impl SerializerRef {
    pub fn json() -> Self {
        Self::Builtin(ContentType::Json)
    }

    pub fn xml() -> Self {
        Self::Builtin(ContentType::Xml)
    }

    pub fn plain() -> Self {
        Self::Builtin(ContentType::Plain)
    }

    /// A custom serializer built by `factory`, which may fail.
    pub fn custom<S, F>(key: impl Into<String>, lifecycle: Lifecycle, factory: F) -> Self
    where
        S: Serializer + 'static,
        F: Fn() -> Result<S, CodecError> + Send + Sync + 'static,
    {
        Self::Custom(CustomCodec {
            key: key.into(),
            lifecycle,
            factory: Arc::new(move || factory().map(|s| Arc::new(s) as Arc<dyn Serializer>)),
        })
    }

    /// A singleton custom serializer created with `Default`.
    pub fn of<S: Serializer + Default + 'static>() -> Self {
        Self::custom(std::any::type_name::<S>(), Lifecycle::Singleton, || {
            Ok(S::default())
        })
    }

    pub fn key(&self) -> String {
        match self {
            Self::Builtin(ct) => format!("builtin:{ct}"),
            Self::Custom(c) => c.key().to_string(),
        }
    }
}

/// Reference to a deserializer declared on an endpoint or operation.
#[derive(Debug, Clone)]
pub enum DeserializerRef {
    Builtin(ContentType),
    Custom(CustomCodec<dyn Deserializer>),
}

impl DeserializerRef {
    pub fn json() -> Self {
        Self::Builtin(ContentType::Json)
    }

    pub fn xml() -> Self {
        Self::Builtin(ContentType::Xml)
    }

    pub fn plain() -> Self {
        Self::Builtin(ContentType::Plain)
    }

    /// A custom deserializer built by `factory`, which may fail.
    pub fn custom<D, F>(key: impl Into<String>, lifecycle: Lifecycle, factory: F) -> Self
    where
        D: Deserializer + 'static,
        F: Fn() -> Result<D, CodecError> + Send + Sync + 'static,
    {
        Self::Custom(CustomCodec {
            key: key.into(),
            lifecycle,
            factory: Arc::new(move || factory().map(|d| Arc::new(d) as Arc<dyn Deserializer>)),
        })
    }

    /// A singleton custom deserializer created with `Default`.
    pub fn of<D: Deserializer + Default + 'static>() -> Self {
        Self::custom(std::any::type_name::<D>(), Lifecycle::Singleton, || {
            Ok(D::default())
        })
    }

    pub fn key(&self) -> String {
        match self {
            Self::Builtin(ct) => format!("builtin:{ct}"),
            Self::Custom(c) => c.key().to_string(),
        }
    }

    pub fn is_builtin(&self, content_type: ContentType) -> bool {
        matches!(self, Self::Builtin(ct) if *ct == content_type)
    }
}
