//! Builtin JSON, XML and plain-text codecs.

use bytes::Bytes;

use super::{ContentType, Deserializer, SerializeInput, Serializer};
use crate::error::CodecError;
use crate::types::{Reply, ReturnType};

/// Replies every builtin deserializer produces the same way.
fn passthrough(body: &[u8], target: &ReturnType) -> Option<Reply> {
    match target {
        ReturnType::Unit => Some(Reply::None),
        ReturnType::Text => Some(Reply::Text(String::from_utf8_lossy(body).into_owned())),
        ReturnType::Bytes => Some(Reply::Bytes(Bytes::copy_from_slice(body))),
        _ => None,
    }
}

fn unsupported(codec: ContentType, target: &ReturnType) -> CodecError {
    CodecError::failed(
        codec.name(),
        format!("cannot produce a {} return value", target.describe()),
    )
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Serializer for JsonCodec {
    fn content_type(&self) -> &str {
        ContentType::Json.mime()
    }

    fn serialize(&self, input: SerializeInput<'_>) -> Result<Bytes, CodecError> {
        match input {
            // Text is taken to be JSON already.
            SerializeInput::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            SerializeInput::Model(model) => {
                let value = model.to_json_value()?;
                Ok(Bytes::from(serde_json::to_vec(&value)?))
            }
        }
    }
}

impl Deserializer for JsonCodec {
    fn content_type(&self) -> &str {
        ContentType::Json.mime()
    }

    fn deserialize(&self, body: &[u8], target: &ReturnType) -> Result<Reply, CodecError> {
        if let Some(reply) = passthrough(body, target) {
            return Ok(reply);
        }
        match target {
            ReturnType::Model(model) => Ok(Reply::Model(model.decode_json(body)?)),
            _ => Err(unsupported(ContentType::Json, target)),
        }
    }
}

/// XML codec backed by `quick-xml`.
#[cfg(feature = "xml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

#[cfg(feature = "xml")]
impl Serializer for XmlCodec {
    fn content_type(&self) -> &str {
        ContentType::Xml.mime()
    }

    fn serialize(&self, input: SerializeInput<'_>) -> Result<Bytes, CodecError> {
        match input {
            SerializeInput::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            SerializeInput::Model(model) => Ok(Bytes::from(model.to_xml()?)),
        }
    }
}

#[cfg(feature = "xml")]
impl Deserializer for XmlCodec {
    fn content_type(&self) -> &str {
        ContentType::Xml.mime()
    }

    fn deserialize(&self, body: &[u8], target: &ReturnType) -> Result<Reply, CodecError> {
        if let Some(reply) = passthrough(body, target) {
            return Ok(reply);
        }
        match target {
            ReturnType::Model(model) => Ok(Reply::Model(model.decode_xml(body)?)),
            _ => Err(unsupported(ContentType::Xml, target)),
        }
    }
}

/// Pass-through codec for text content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl Serializer for PlainCodec {
    fn content_type(&self) -> &str {
        ContentType::Plain.mime()
    }

    fn serialize(&self, input: SerializeInput<'_>) -> Result<Bytes, CodecError> {
        match input {
            SerializeInput::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            // A model that serializes to a bare string is sent as that string.
            SerializeInput::Model(model) => match model.to_json_value()? {
                serde_json::Value::String(s) => Ok(Bytes::from(s)),
                other => Ok(Bytes::from(other.to_string())),
            },
        }
    }
}

impl Deserializer for PlainCodec {
    fn content_type(&self) -> &str {
        ContentType::Plain.mime()
    }

    fn deserialize(&self, body: &[u8], target: &ReturnType) -> Result<Reply, CodecError> {
        if let Some(reply) = passthrough(body, target) {
            return Ok(reply);
        }
        match target {
            ReturnType::Model(model) if model.is::<String>() => Ok(Reply::Model(Box::new(
                String::from_utf8_lossy(body).into_owned(),
            ))),
            _ => Err(unsupported(ContentType::Plain, target)),
        }
    }
}
