//! Request dispatch and outcome callbacks.

use std::fmt;
use std::sync::Arc;

use super::http::registry::TransportRegistry;
use super::http::session::SessionStore;
use crate::descriptor::InvocationDescriptor;
use crate::error::{HandlerError, TransportError};
use crate::types::{HttpRequest, HttpResponse};

/// Callbacks invoked with the outcome of every dispatch.
///
/// For asynchronous invocations they run on the worker that dispatched the
/// request.
pub trait ExecutionHandler: Send + Sync {
    /// Status in `200..=299`.
    fn on_success(&self, _descriptor: &InvocationDescriptor, _response: &HttpResponse) {}

    /// Any other status. The response is still returned to the pipeline.
    fn on_failure(&self, _descriptor: &InvocationDescriptor, _response: &HttpResponse) {}

    /// The transport failed. An error returned here is reported together
    /// with the transport error.
    fn on_error(
        &self,
        _descriptor: &InvocationDescriptor,
        _error: &TransportError,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Default handler that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExecutionHandler;

impl ExecutionHandler for LoggingExecutionHandler {
    fn on_success(&self, descriptor: &InvocationDescriptor, response: &HttpResponse) {
        tracing::debug!(target: "wirelink::http", invocation = %descriptor.id(), endpoint = %descriptor.endpoint().name(), operation = %descriptor.operation().name(), status = response.status, "request succeeded");
    }

    fn on_failure(&self, descriptor: &InvocationDescriptor, response: &HttpResponse) {
        tracing::debug!(target: "wirelink::http", invocation = %descriptor.id(), endpoint = %descriptor.endpoint().name(), operation = %descriptor.operation().name(), status = response.status, "request failed");
    }

    fn on_error(
        &self,
        descriptor: &InvocationDescriptor,
        error: &TransportError,
    ) -> Result<(), HandlerError> {
        tracing::debug!(target: "wirelink::http", invocation = %descriptor.id(), endpoint = %descriptor.endpoint().name(), operation = %descriptor.operation().name(), err = %error, "request error");
        Ok(())
    }
}

/// Dispatches built requests through the endpoint's bound transport.
#[derive(Clone)]
pub struct RequestExecutor {
    transports: Arc<TransportRegistry>,
    sessions: Arc<SessionStore>,
    handler: Arc<dyn ExecutionHandler>,
}

impl RequestExecutor {
    pub fn new(
        transports: Arc<TransportRegistry>,
        sessions: Arc<SessionStore>,
        handler: Arc<dyn ExecutionHandler>,
    ) -> Self {
        Self {
            transports,
            sessions,
            handler,
        }
    }

    /// Sends `request` and reports the outcome to the handler.
    ///
    /// Any status is returned as a response; only transport failures are
    /// errors. Stateful endpoints hold their session for the whole exchange.
    pub async fn execute(
        &self,
        request: HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<HttpResponse, TransportError> {
        let endpoint = descriptor.endpoint();
        let transport = self.transports.transport_for(endpoint.name());

        let result = if endpoint.is_stateful() {
            let session = self.sessions.session(endpoint.name());
            let mut session = session.lock().await;
            transport.execute_with_session(request, &mut session).await
        } else {
            transport.execute(request).await
        };

        match result {
            Ok(response) => {
                if response.is_success() {
                    self.handler.on_success(descriptor, &response);
                } else {
                    self.handler.on_failure(descriptor, &response);
                }
                Ok(response)
            }
            Err(error) => match self.handler.on_error(descriptor, &error) {
                Ok(()) => Err(error),
                Err(secondary) => Err(TransportError::CallbackFailed {
                    original: Box::new(error),
                    secondary,
                }),
            },
        }
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transports", &self.transports)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointDefinition, Operation};
    use crate::execution::http::transport::HttpTransport;
    use crate::types::{RequestMethod, ResponseBody};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
    use std::sync::Mutex;

    /// Replies with a fixed status, or fails, and records the cookies it saw.
    struct Scripted {
        status: Option<u16>,
        seen_cookies: Mutex<Vec<Option<String>>>,
    }

    impl Scripted {
        fn new(status: Option<u16>) -> Self {
            Self {
                status,
                seen_cookies: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen_cookies
                .lock()
                .unwrap()
                .push(request.header_values("cookie").first().map(|s| s.to_string()));
            let status = self
                .status
                .ok_or_else(|| TransportError::Connection("refused".into()))?;
            let mut headers = HeaderMap::new();
            headers.append(SET_COOKIE, HeaderValue::from_static("sid=42"));
            Ok(HttpResponse::new(status, headers, ResponseBody::empty()))
        }
    }

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
        fail_on_error: bool,
    }

    impl ExecutionHandler for Recording {
        fn on_success(&self, _d: &InvocationDescriptor, r: &HttpResponse) {
            self.events.lock().unwrap().push(format!("success {}", r.status));
        }

        fn on_failure(&self, _d: &InvocationDescriptor, r: &HttpResponse) {
            self.events.lock().unwrap().push(format!("failure {}", r.status));
        }

        fn on_error(&self, _d: &InvocationDescriptor, _e: &TransportError) -> Result<(), HandlerError> {
            self.events.lock().unwrap().push("error".into());
            if self.fail_on_error {
                Err(HandlerError::new("callback broke"))
            } else {
                Ok(())
            }
        }
    }

    fn setup(
        transport: Arc<Scripted>,
        handler: Arc<Recording>,
        stateful: bool,
    ) -> (RequestExecutor, InvocationDescriptor) {
        let mut builder = EndpointDefinition::builder("Exec")
            .host("localhost")
            .operation(Operation::get("ping", "/"));
        if stateful {
            builder = builder.stateful();
        }
        let endpoint = Arc::new(builder.build().unwrap());
        let registry = Arc::new(TransportRegistry::new(transport));
        registry.bind(&endpoint).unwrap();
        let executor = RequestExecutor::new(registry, Arc::new(SessionStore::new()), handler);
        let operation = endpoint.operation("ping").unwrap().clone();
        (executor, InvocationDescriptor::new(endpoint, operation, Vec::new()))
    }

    #[tokio::test]
    async fn routes_by_status_and_returns_the_response() {
        for (status, event) in [(200, "success 200"), (299, "success 299"), (404, "failure 404")] {
            let handler = Arc::new(Recording::default());
            let (executor, descriptor) =
                setup(Arc::new(Scripted::new(Some(status))), Arc::clone(&handler), false);
            let response = executor
                .execute(HttpRequest::new(RequestMethod::Get), &descriptor)
                .await
                .unwrap();
            assert_eq!(response.status, status);
            assert_eq!(*handler.events.lock().unwrap(), vec![event.to_string()]);
        }
    }

    #[tokio::test]
    async fn transport_errors_go_to_on_error() {
        let handler = Arc::new(Recording::default());
        let (executor, descriptor) = setup(Arc::new(Scripted::new(None)), Arc::clone(&handler), false);
        let err = executor
            .execute(HttpRequest::new(RequestMethod::Get), &descriptor)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
        assert_eq!(*handler.events.lock().unwrap(), vec!["error".to_string()]);
    }

    #[tokio::test]
    async fn failing_error_callback_keeps_both_errors() {
        let handler = Arc::new(Recording {
            fail_on_error: true,
            ..Default::default()
        });
        let (executor, descriptor) = setup(Arc::new(Scripted::new(None)), handler, false);
        let err = executor
            .execute(HttpRequest::new(RequestMethod::Get), &descriptor)
            .await
            .unwrap_err();
        match err {
            TransportError::CallbackFailed { original, secondary } => {
                assert!(matches!(*original, TransportError::Connection(_)));
                assert_eq!(secondary, HandlerError::new("callback broke"));
            }
            other => panic!("expected aggregated error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stateful_endpoints_reuse_their_session() {
        let transport = Arc::new(Scripted::new(Some(200)));
        let (executor, descriptor) =
            setup(Arc::clone(&transport), Arc::new(Recording::default()), true);
        for _ in 0..2 {
            executor
                .execute(HttpRequest::new(RequestMethod::Get), &descriptor)
                .await
                .unwrap();
        }
        assert_eq!(
            *transport.seen_cookies.lock().unwrap(),
            vec![None, Some("sid=42".to_string())]
        );
    }

    #[tokio::test]
    async fn stateless_endpoints_send_no_cookies() {
        let transport = Arc::new(Scripted::new(Some(200)));
        let (executor, descriptor) =
            setup(Arc::clone(&transport), Arc::new(Recording::default()), false);
        for _ in 0..2 {
            executor
                .execute(HttpRequest::new(RequestMethod::Get), &descriptor)
                .await
                .unwrap();
        }
        assert_eq!(*transport.seen_cookies.lock().unwrap(), vec![None, None]);
    }
}
