//! Request interceptors
//!
//! Interceptors are the last request stage: they see the fully built request
//! immediately before dispatch and may tweak it or short-circuit the
//! invocation with an error. Endpoint interceptors run first, then operation
//! interceptors, then interceptors passed as arguments.

use crate::descriptor::InvocationDescriptor;
use crate::error::RequestError;
use crate::types::HttpRequest;

/// Hook run against the built request.
pub trait Interceptor: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn intercept(
        &self,
        descriptor: &InvocationDescriptor,
        request: &mut HttpRequest,
    ) -> Result<(), RequestError>;
}

impl<F> Interceptor for F
where
    F: Fn(&InvocationDescriptor, &mut HttpRequest) -> Result<(), RequestError> + Send + Sync,
{
    fn intercept(
        &self,
        descriptor: &InvocationDescriptor,
        request: &mut HttpRequest,
    ) -> Result<(), RequestError> {
        self(descriptor, request)
    }
}

/// A simple logging interceptor backed by `tracing` (no bodies or header values).
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn intercept(
        &self,
        descriptor: &InvocationDescriptor,
        request: &mut HttpRequest,
    ) -> Result<(), RequestError> {
        tracing::debug!(
            target: "wirelink::http",
            invocation = %descriptor.id(),
            endpoint = %descriptor.endpoint().name(),
            operation = %descriptor.operation().name(),
            method = %request.method,
            url = %request.url().map(|u| u.as_str()).unwrap_or("<unset>"),
            headers = request.headers.len(),
            "sending request"
        );
        Ok(())
    }
}

/// Adds a fixed header to every request it sees.
#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    name: String,
    value: String,
}

impl HeaderInterceptor {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Interceptor for HeaderInterceptor {
    fn name(&self) -> &str {
        "header"
    }

    fn intercept(
        &self,
        _descriptor: &InvocationDescriptor,
        request: &mut HttpRequest,
    ) -> Result<(), RequestError> {
        request.append_header(&self.name, &self.value)
    }
}
