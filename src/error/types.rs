//! Core error types.

use thiserror::Error;

use crate::descriptor::InvocationDescriptor;
use crate::types::{Argument, HttpRequest, HttpResponse};

/// Coarse classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed call into the proxy.
    IllegalInvocation,
    /// A request stage failed before dispatch.
    RequestBuild,
    /// The transport could not complete the exchange.
    Transport,
    /// A response stage failed after dispatch.
    ResponseProcessing,
    /// The endpoint definition was rejected at proxy creation.
    Validation,
}

/// The underlying reason an invocation failed.
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("illegal invocation: {0}")]
    IllegalInvocation(String),

    #[error("request build failed in the {stage} stage: {source}")]
    RequestBuildFailed {
        stage: &'static str,
        #[source]
        source: RequestError,
    },

    #[error("transport failed: {0}")]
    TransportFailed(#[source] TransportError),

    #[error("response processing failed in the {stage} stage: {source}")]
    ResponseProcessingFailed {
        stage: &'static str,
        #[source]
        source: ResponseError,
    },

    #[error("endpoint validation failed: {0}")]
    ValidationFailed(#[source] ValidationError),
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IllegalInvocation(_) => ErrorCategory::IllegalInvocation,
            Self::RequestBuildFailed { .. } => ErrorCategory::RequestBuild,
            Self::TransportFailed(_) => ErrorCategory::Transport,
            Self::ResponseProcessingFailed { .. } => ErrorCategory::ResponseProcessing,
            Self::ValidationFailed(_) => ErrorCategory::Validation,
        }
    }
}

/// Failures raised by request stages.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("no argument is bound as the request entity")]
    MissingEntity,

    #[error("{count} arguments are bound as the request entity; exactly one is allowed")]
    MultipleEntity { count: usize },

    #[error("cannot resolve a request entity from {argument}: {reason}")]
    EntityResolutionFailed { argument: String, reason: String },

    #[error("{role} parameter '{name}' must be text, found {found}")]
    ParamType {
        role: &'static str,
        name: String,
        found: &'static str,
    },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request URI: {0}")]
    InvalidUri(String),

    #[error("endpoint host resolved to an empty value")]
    EmptyHost,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("interceptor '{name}' failed: {reason}")]
    Interceptor { name: String, reason: String },
}

/// Failures raised while dispatching a request.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("response body was already consumed")]
    BodyConsumed,

    #[error("transport configuration error: {0}")]
    Configuration(String),

    #[error("{original}; the error callback also failed: {secondary}")]
    CallbackFailed {
        original: Box<TransportError>,
        secondary: HandlerError,
    },
}

/// Failure reported by an [`ExecutionHandler`](crate::execution::ExecutionHandler) callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Returned when work is submitted to a worker pool that has shut down.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("the asynchronous worker pool is shut down")]
pub struct WorkerPoolClosed;

/// Failures raised by serializers and deserializers.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("codec '{codec}' is unavailable: {reason}")]
    CodecUnavailable { codec: String, reason: String },

    #[error("failed to instantiate codec '{codec}': {reason}")]
    InstantiationFailed { codec: String, reason: String },

    #[error("codec '{codec}' failed: {reason}")]
    Failed { codec: String, reason: String },
}

impl CodecError {
    pub fn failed(codec: impl Into<String>, reason: impl ToString) -> Self {
        Self::Failed {
            codec: codec.into(),
            reason: reason.to_string(),
        }
    }

    pub fn instantiation(codec: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstantiationFailed {
            codec: codec.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures raised by response stages.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("no deserializer is defined for a {return_type} return value")]
    ParserUndefined { return_type: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("unsuccessful response status {status}")]
    UnsuccessfulStatus { status: u16 },

    #[error("failed to read the response body: {0}")]
    Body(#[source] TransportError),

    #[error("the response was already taken by an earlier stage")]
    MissingResponse,
}

/// Failures raised by the endpoint validation gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("endpoint '{endpoint}' declares no host")]
    MissingHost { endpoint: String },

    #[error("endpoint '{endpoint}' uses unsupported scheme '{scheme}'")]
    InvalidScheme { endpoint: String, scheme: String },

    #[error("endpoint '{endpoint}' declares operation '{operation}' more than once")]
    DuplicateOperation { endpoint: String, operation: String },

    #[error("endpoint '{endpoint}' declares an invalid constant header '{name}': {reason}")]
    InvalidHeader {
        endpoint: String,
        name: String,
        reason: String,
    },

    #[error("endpoint '{endpoint}' could not bind a transport: {reason}")]
    TransportConfiguration { endpoint: String, reason: String },
}

fn render_arguments(arguments: &[Argument]) -> Vec<String> {
    arguments.iter().map(|a| format!("{a:?}")).collect()
}

/// The single error type returned by every proxy invocation.
///
/// Carries the endpoint and operation names, a debug rendering of each
/// argument, and, when the failure happened late enough, the partially built
/// request or the raw response that was received.
#[derive(Error, Debug)]
#[error("{endpoint}.{op}: {kind}", op = .operation.as_deref().unwrap_or("<definition>"))]
pub struct InvocationError {
    endpoint: String,
    operation: Option<String>,
    arguments: Vec<String>,
    request: Option<Box<HttpRequest>>,
    response: Option<Box<HttpResponse>>,
    #[source]
    kind: ErrorKind,
}

impl InvocationError {
    pub(crate) fn new(kind: ErrorKind, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            operation: None,
            arguments: Vec::new(),
            request: None,
            response: None,
            kind,
        }
    }

    pub(crate) fn for_descriptor(kind: ErrorKind, descriptor: &InvocationDescriptor) -> Self {
        Self {
            endpoint: descriptor.endpoint().name().to_string(),
            operation: Some(descriptor.operation().name().to_string()),
            arguments: render_arguments(descriptor.arguments()),
            request: None,
            response: None,
            kind,
        }
    }

    pub(crate) fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub(crate) fn with_arguments(mut self, arguments: &[Argument]) -> Self {
        self.arguments = render_arguments(arguments);
        self
    }

    pub(crate) fn with_request(mut self, request: Option<HttpRequest>) -> Self {
        self.request = request.map(Box::new);
        self
    }

    pub(crate) fn with_response(mut self, response: Option<HttpResponse>) -> Self {
        self.response = response.map(Box::new);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Debug renderings of the invocation arguments, in declaration order.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_deref()
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_deref()
    }

    pub fn response_mut(&mut self) -> Option<&mut HttpResponse> {
        self.response.as_deref_mut()
    }

    pub fn take_response(&mut self) -> Option<HttpResponse> {
        self.response.take().map(|r| *r)
    }

    pub fn is_illegal_invocation(&self) -> bool {
        self.category() == ErrorCategory::IllegalInvocation
    }

    pub fn is_request_failure(&self) -> bool {
        self.category() == ErrorCategory::RequestBuild
    }

    pub fn is_transport_failure(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn is_response_failure(&self) -> bool {
        self.category() == ErrorCategory::ResponseProcessing
    }

    pub fn is_validation_failure(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// The request-stage error, if this failure happened while building the request.
    pub fn request_error(&self) -> Option<&RequestError> {
        match &self.kind {
            ErrorKind::RequestBuildFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The response-stage error, if this failure happened while processing the response.
    pub fn response_error(&self) -> Option<&ResponseError> {
        match &self.kind {
            ErrorKind::ResponseProcessingFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The codec error behind this failure, from either chain.
    pub fn codec_error(&self) -> Option<&CodecError> {
        match &self.kind {
            ErrorKind::RequestBuildFailed {
                source: RequestError::Codec(e),
                ..
            }
            | ErrorKind::ResponseProcessingFailed {
                source: ResponseError::Codec(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}
