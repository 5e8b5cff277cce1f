//! Request and response objects threaded through the processor chains.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use super::RequestMethod;
use crate::error::{RequestError, TransportError};

/// Mutable accumulator for one outgoing request.
///
/// Created once per invocation, mutated in place by every request stage and
/// consumed by the executor.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: RequestMethod,
    /// Unset until the URI stage has run.
    pub url: Option<Url>,
    /// Multi-valued, insertion ordered.
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: RequestMethod) -> Self {
        Self {
            method,
            url: None,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Appends a header without replacing earlier values of the same name.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), RequestError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Sets `Content-Type` unless one is already present.
    pub fn set_content_type_if_absent(&mut self, mime: &str) -> Result<(), RequestError> {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.append_header(CONTENT_TYPE.as_str(), mime)?;
        }
        Ok(())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), RequestError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| RequestError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

/// Wire representation of a request entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    /// Streamed from disk by the transport.
    File(PathBuf),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// In-memory content, if the body is not file backed.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => Some(&[]),
            Self::Bytes(b) => Some(b),
            Self::Text(t) => Some(t.as_bytes()),
            Self::File(_) => None,
        }
    }
}

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

enum BodyState {
    Buffered(Bytes),
    Streaming(BodyStream),
    Drained,
}

/// Response entity that is read, buffered or drained at most once.
///
/// The stream sits behind a `Mutex` only so the body is `Sync`; every read
/// goes through `&mut self` and never blocks on the lock.
pub struct ResponseBody {
    state: Mutex<BodyState>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: Mutex::new(BodyState::Buffered(bytes.into())),
        }
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            state: Mutex::new(BodyState::Streaming(Box::pin(stream))),
        }
    }

    fn state_mut(&mut self) -> &mut BodyState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the body has been read or drained.
    pub fn is_consumed(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            BodyState::Drained
        )
    }

    pub fn is_buffered(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            BodyState::Buffered(_)
        )
    }

    /// Reads a streamed body fully into memory so it can be read later.
    pub async fn buffer(&mut self) -> Result<(), TransportError> {
        let state = self.state_mut();
        let stream = match &mut *state {
            BodyState::Buffered(_) => return Ok(()),
            BodyState::Drained => return Err(TransportError::BodyConsumed),
            BodyState::Streaming(stream) => stream,
        };
        let mut collected = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => collected.extend_from_slice(&chunk),
                Err(e) => {
                    *state = BodyState::Drained;
                    return Err(e);
                }
            }
        }
        *state = BodyState::Buffered(collected.freeze());
        Ok(())
    }

    /// Takes the whole body. Subsequent reads fail with `BodyConsumed`.
    pub async fn bytes(&mut self) -> Result<Bytes, TransportError> {
        self.buffer().await?;
        match std::mem::replace(self.state_mut(), BodyState::Drained) {
            BodyState::Buffered(bytes) => Ok(bytes),
            _ => Err(TransportError::BodyConsumed),
        }
    }

    /// Takes the whole body as UTF-8 text, replacing invalid sequences.
    pub async fn text(&mut self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consumes and discards whatever is left. Calling it again is a no-op.
    pub async fn drain(&mut self) -> Result<(), TransportError> {
        let state = std::mem::replace(self.state_mut(), BodyState::Drained);
        if let BodyState::Streaming(mut stream) = state {
            while let Some(chunk) = stream.next().await {
                chunk?;
            }
        }
        Ok(())
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            BodyState::Buffered(b) => write!(f, "ResponseBody::Buffered({} bytes)", b.len()),
            BodyState::Streaming(_) => f.write_str("ResponseBody::Streaming"),
            BodyState::Drained => f.write_str("ResponseBody::Drained"),
        }
    }
}

/// Raw response produced by a transport.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Conventionally content-absent statuses.
    pub fn is_no_content(&self) -> bool {
        matches!(self.status, 204 | 205)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
