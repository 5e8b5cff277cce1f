//! Runtime argument values passed to an operation.

use std::any::Any;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use serde::Serialize;

use super::RequestBody;
use crate::error::CodecError;
use crate::execution::http::interceptor::Interceptor;

/// A serializable model passed as a request entity.
///
/// Implemented for every `Serialize + Debug + Send + Sync + 'static` type.
pub trait ModelEntity: fmt::Debug + Send + Sync + 'static {
    fn to_json_value(&self) -> Result<serde_json::Value, CodecError>;

    #[cfg(feature = "xml")]
    fn to_xml(&self) -> Result<String, CodecError>;

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;
}

impl<T> ModelEntity for T
where
    T: Serialize + fmt::Debug + Send + Sync + 'static,
{
    fn to_json_value(&self) -> Result<serde_json::Value, CodecError> {
        Ok(serde_json::to_value(self)?)
    }

    #[cfg(feature = "xml")]
    fn to_xml(&self) -> Result<String, CodecError> {
        Ok(quick_xml::se::to_string(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A reader consumed at most once by the entity stage.
#[derive(Clone)]
pub struct StreamSource(Arc<Mutex<Option<Box<dyn Read + Send>>>>);

impl StreamSource {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(reader)))))
    }

    /// Takes the reader out; later calls return `None`.
    pub fn take(&self) -> Option<Box<dyn Read + Send>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_consumed(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consumed() {
            f.write_str("StreamSource(consumed)")
        } else {
            f.write_str("StreamSource(pending)")
        }
    }
}

/// Shared in-out text cell bound to a response header.
///
/// The caller keeps a clone and reads the header value after the invocation
/// returns. An unmatched slot keeps whatever it held before.
#[derive(Clone, Default)]
pub struct HeaderSlot(Arc<Mutex<Option<String>>>);

impl HeaderSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(Some(value.into()))))
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl fmt::Debug for HeaderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeaderSlot").field(&self.get()).finish()
    }
}

/// One positional argument of an invocation.
#[derive(Clone)]
pub enum Argument {
    /// A null argument; skipped by every parameter stage.
    Absent,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Bytes(Bytes),
    File(PathBuf),
    Stream(StreamSource),
    /// Already wire-typed entity.
    Body(RequestBody),
    Model(Arc<dyn ModelEntity>),
    /// Ordered name to values batch map; repeated values become repeated keys.
    Params(Vec<(String, Vec<String>)>),
    HeaderSlot(HeaderSlot),
    Interceptor(Arc<dyn Interceptor>),
}

impl Argument {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn model<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self::Model(Arc::new(value))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Self::Stream(StreamSource::new(reader))
    }

    pub fn interceptor(interceptor: impl Interceptor + 'static) -> Self {
        Self::Interceptor(Arc::new(interceptor))
    }

    /// Builds a batch map from `(name, value)` pairs; repeated names group
    /// their values under the first occurrence.
    pub fn params<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            match grouped.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into()),
                None => grouped.push((key, vec![value.into()])),
            }
        }
        Self::Params(grouped)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Bytes(_) => "bytes",
            Self::File(_) => "file",
            Self::Stream(_) => "stream",
            Self::Body(_) => "body",
            Self::Model(_) => "model",
            Self::Params(_) => "params",
            Self::HeaderSlot(_) => "header slot",
            Self::Interceptor(_) => "interceptor",
        }
    }

    /// Text form of a scalar argument.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::File(p) => f.debug_tuple("File").field(p).finish(),
            Self::Stream(s) => fmt::Debug::fmt(s, f),
            Self::Body(b) => f.debug_tuple("Body").field(b).finish(),
            Self::Model(m) => f.debug_tuple("Model").field(m).finish(),
            Self::Params(p) => f.debug_tuple("Params").field(p).finish(),
            Self::HeaderSlot(s) => fmt::Debug::fmt(s, f),
            Self::Interceptor(i) => write!(f, "Interceptor({})", i.name()),
        }
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Bytes> for Argument {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<RequestBody> for Argument {
    fn from(value: RequestBody) -> Self {
        Self::Body(value)
    }
}

impl From<HeaderSlot> for Argument {
    fn from(value: HeaderSlot) -> Self {
        Self::HeaderSlot(value)
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Note {
        title: String,
    }

    #[test]
    fn params_group_repeated_keys_in_first_seen_order() {
        let arg = Argument::params([("tag", "a"), ("page", "1"), ("tag", "b")]);
        let Argument::Params(pairs) = arg else {
            panic!("expected params");
        };
        assert_eq!(
            pairs,
            vec![
                ("tag".to_string(), vec!["a".to_string(), "b".to_string()]),
                ("page".to_string(), vec!["1".to_string()]),
            ]
        );
    }

    #[test]
    fn stream_source_is_taken_once() {
        let source = StreamSource::new(std::io::Cursor::new(b"abc".to_vec()));
        let copy = source.clone();
        assert!(source.take().is_some());
        assert!(copy.take().is_none());
        assert!(copy.is_consumed());
    }

    #[test]
    fn header_slot_is_shared_between_clones() {
        let slot = HeaderSlot::new();
        let bound = slot.clone();
        bound.set("etag-1");
        assert_eq!(slot.get().as_deref(), Some("etag-1"));
    }

    #[test]
    fn model_entity_exposes_json_and_concrete_type() {
        let arg = Argument::model(Note {
            title: "hi".into(),
        });
        let Argument::Model(model) = arg else {
            panic!("expected model");
        };
        assert_eq!(
            model.to_json_value().unwrap(),
            serde_json::json!({"title": "hi"})
        );
        assert!(model.as_any().downcast_ref::<Note>().is_some());
        assert!(model.type_name().ends_with("Note"));
    }

    #[test]
    fn option_maps_none_to_absent() {
        assert!(Argument::from(None::<String>).is_absent());
        assert_eq!(
            Argument::from(Some(7i64)).scalar_text().as_deref(),
            Some("7")
        );
    }
}
