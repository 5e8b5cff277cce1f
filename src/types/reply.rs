//! Declared return types and the values an invocation yields.

use std::any::{Any, TypeId};
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::{HttpResponse, ResponseBody};
use crate::error::CodecError;

pub(crate) type DecodeFn = fn(&[u8]) -> Result<Box<dyn Any + Send>, CodecError>;

/// Monomorphized decoders for one model type.
///
/// Captured once when the operation is declared, so no type information has
/// to be recovered at invocation time.
#[derive(Clone, Copy)]
pub struct ModelType {
    type_id: TypeId,
    name: &'static str,
    json: DecodeFn,
    #[cfg(feature = "xml")]
    xml: DecodeFn,
}

impl ModelType {
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            json: decode_json::<T>,
            #[cfg(feature = "xml")]
            xml: decode_xml::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn decode_json(&self, bytes: &[u8]) -> Result<Box<dyn Any + Send>, CodecError> {
        (self.json)(bytes)
    }

    #[cfg(feature = "xml")]
    pub(crate) fn decode_xml(&self, bytes: &[u8]) -> Result<Box<dyn Any + Send>, CodecError> {
        (self.xml)(bytes)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.name).finish()
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

fn decode_json<T>(bytes: &[u8]) -> Result<Box<dyn Any + Send>, CodecError>
where
    T: DeserializeOwned + Send + 'static,
{
    let value: T = serde_json::from_slice(bytes)?;
    Ok(Box::new(value))
}

#[cfg(feature = "xml")]
fn decode_xml<T>(bytes: &[u8]) -> Result<Box<dyn Any + Send>, CodecError>
where
    T: DeserializeOwned + Send + 'static,
{
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::failed("xml", e))?;
    let value: T = quick_xml::de::from_str(text)?;
    Ok(Box::new(value))
}

/// The return type an operation declares.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReturnType {
    #[default]
    Unit,
    Text,
    Bytes,
    Model(ModelType),
    /// The transport response, body untouched.
    RawResponse,
    /// The response body, untouched.
    RawEntity,
}

impl ReturnType {
    pub fn model<T>() -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self::Model(ModelType::of::<T>())
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::RawResponse | Self::RawEntity)
    }

    /// Types the plain pass-through deserializer can always produce.
    pub fn is_text_like(&self) -> bool {
        match self {
            Self::Text | Self::Bytes => true,
            Self::Model(model) => model.is::<String>(),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Unit => "unit".to_string(),
            Self::Text => "text".to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::Model(m) => m.name().to_string(),
            Self::RawResponse => "raw response".to_string(),
            Self::RawEntity => "raw entity".to_string(),
        }
    }
}

/// What an invocation returns.
pub enum Reply {
    /// Unit return types, content-absent statuses and asynchronous calls.
    None,
    Text(String),
    Bytes(Bytes),
    Model(Box<dyn Any + Send>),
    Response(HttpResponse),
    Entity(ResponseBody),
}

impl Reply {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Downcasts a decoded model; `None` if the reply holds something else.
    pub fn into_model<T: 'static>(self) -> Option<T> {
        match self {
            Self::Model(any) => any.downcast::<T>().ok().map(|b| *b),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Self::Response(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_entity(self) -> Option<ResponseBody> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Model(_) => f.write_str("Model(..)"),
            Self::Response(r) => f.debug_tuple("Response").field(&r.status).finish(),
            Self::Entity(e) => f.debug_tuple("Entity").field(e).finish(),
        }
    }
}
