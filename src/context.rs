//! Process-scoped client context
//!
//! A [`ClientContext`] owns everything invocations share: the codec and
//! transport registries, stateful sessions, the asynchronous worker pool,
//! both processor chains and the proxy directory. It is created with
//! [`ClientContext::init`] or [`ClientContext::builder`] and released with
//! [`ClientContext::shutdown`].
//!
//! ```rust,ignore
//! let context = ClientContext::init(ContextConfig::from_env())?;
//! let users = context.proxy(users_endpoint()?)?;
//! let user = users
//!     .invoke("get_user", vec![Argument::text("1")])
//!     .await?
//!     .into_model::<User>();
//! let report = context.shutdown().await;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::codec::CodecRegistry;
use crate::endpoint::EndpointDefinition;
use crate::error::{ErrorKind, InvocationError, TransportError, ValidationError};
use crate::execution::{
    AsyncWorkerPool, ExecutionHandler, HttpTransport, LoggingExecutionHandler, ReqwestTransport,
    RequestExecutor, SessionStore, ShutdownReport, TransportRegistry,
};
use crate::proxy::{EndpointProxy, Pipeline};
use crate::request::RequestChain;
use crate::response::ResponseChain;
use crate::types::ContextConfig;

/// Owner of the shared invocation state.
pub struct ClientContext {
    config: ContextConfig,
    codecs: Arc<CodecRegistry>,
    transports: Arc<TransportRegistry>,
    sessions: Arc<SessionStore>,
    pipeline: Arc<Pipeline>,
    proxies: RwLock<HashMap<String, EndpointProxy>>,
    shutdown: Mutex<Option<ShutdownReport>>,
}

impl ClientContext {
    /// A context whose default transport is a [`ReqwestTransport`] built
    /// from `config.http`.
    pub fn init(config: ContextConfig) -> Result<Self, TransportError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::default()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn transports(&self) -> &Arc<TransportRegistry> {
        &self.transports
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The proxy for `definition`, created on first request.
    ///
    /// Proxies are keyed by endpoint name: a later definition with a name
    /// already in the directory gets the existing proxy. A new definition is
    /// validated and bound to its transport before the proxy is stored.
    pub fn proxy(&self, definition: EndpointDefinition) -> Result<EndpointProxy, InvocationError> {
        if let Some(existing) = self.lookup(definition.name()) {
            return Ok(existing);
        }

        let name = definition.name().to_string();
        let validation_failed =
            |e: ValidationError| InvocationError::new(ErrorKind::ValidationFailed(e), name.as_str());
        definition.validate().map_err(validation_failed)?;
        self.transports.bind(&definition).map_err(|e| {
            validation_failed(ValidationError::TransportConfiguration {
                endpoint: name.clone(),
                reason: e.to_string(),
            })
        })?;

        let proxy = EndpointProxy::new(Arc::new(definition), Arc::clone(&self.pipeline));
        let mut proxies = self.proxies.write().unwrap_or_else(PoisonError::into_inner);
        let stored = proxies.entry(name).or_insert(proxy).clone();
        tracing::debug!(target: "wirelink::context", endpoint = %stored.name(), "proxy registered");
        Ok(stored)
    }

    /// A previously created proxy.
    pub fn lookup(&self, endpoint: &str) -> Option<EndpointProxy> {
        self.proxies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()
    }

    pub fn is_shut_down(&self) -> bool {
        self.pipeline.pool.is_closed()
    }

    /// Drains asynchronous work within the configured grace period, then
    /// shuts down every transport. Later calls return the first report.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut done = self.shutdown.lock().await;
        if let Some(report) = *done {
            return report;
        }

        let report = self.pipeline.pool.shutdown(self.config.shutdown_grace).await;
        for transport in self.transports.transports() {
            transport.shutdown().await;
        }
        if report.abandoned > 0 {
            tracing::warn!(
                target: "wirelink::context",
                abandoned = report.abandoned,
                "asynchronous invocations abandoned at shutdown"
            );
        }
        *done = Some(report);
        report
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proxies: Vec<String> = self
            .proxies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("ClientContext")
            .field("config", &self.config)
            .field("codecs", &self.codecs)
            .field("transports", &self.transports)
            .field("pipeline", &self.pipeline)
            .field("proxies", &proxies)
            .finish()
    }
}

/// Builder for [`ClientContext`].
#[derive(Default)]
pub struct ClientContextBuilder {
    config: Option<ContextConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    handler: Option<Arc<dyn ExecutionHandler>>,
    codecs: Option<Arc<CodecRegistry>>,
}

impl ClientContextBuilder {
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the default reqwest transport.
    pub fn transport(self, transport: impl HttpTransport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    pub fn shared_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the logging execution handler.
    pub fn handler(self, handler: impl ExecutionHandler + 'static) -> Self {
        self.shared_handler(Arc::new(handler))
    }

    pub fn shared_handler(mut self, handler: Arc<dyn ExecutionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Uses a codec registry with pre-registered codecs.
    pub fn codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = Some(codecs);
        self
    }

    pub fn build(self) -> Result<ClientContext, TransportError> {
        let config = self.config.unwrap_or_default();
        let transport = match self.transport {
            Some(transport) => transport,
            None => ReqwestTransport::shared(&config.http)?,
        };
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(LoggingExecutionHandler));
        let codecs = self.codecs.unwrap_or_default();

        let transports = Arc::new(TransportRegistry::new(transport));
        let sessions = Arc::new(SessionStore::new());
        let pipeline = Arc::new(Pipeline {
            request: RequestChain::standard(Arc::clone(&codecs)),
            executor: RequestExecutor::new(
                Arc::clone(&transports),
                Arc::clone(&sessions),
                handler,
            ),
            response: ResponseChain::standard(Arc::clone(&codecs)),
            pool: Arc::new(AsyncWorkerPool::new(config.async_workers)),
        });
        tracing::debug!(
            target: "wirelink::context",
            async_workers = config.async_workers,
            shutdown_grace = ?config.shutdown_grace,
            "client context initialized"
        );

        Ok(ClientContext {
            config,
            codecs,
            transports,
            sessions,
            pipeline,
            proxies: RwLock::new(HashMap::new()),
            shutdown: Mutex::new(None),
        })
    }
}

impl fmt::Debug for ClientContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContextBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}
