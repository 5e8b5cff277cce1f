//! HTTP transport abstraction.
//!
//! The pipeline never talks to a socket itself. A transport receives the
//! fully built [`HttpRequest`] and returns the raw [`HttpResponse`] with its
//! body still streaming. [`ReqwestTransport`] is the default; tests and
//! embedders can inject their own.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use tokio_util::io::ReaderStream;

use super::session::SessionContext;
use crate::error::TransportError;
use crate::types::{HttpConfig, HttpRequest, HttpResponse, RequestBody, ResponseBody};

/// Executes built requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Executes with a session context: stored cookies are sent and
    /// `Set-Cookie` headers from the response are stored.
    async fn execute_with_session(
        &self,
        mut request: HttpRequest,
        session: &mut SessionContext,
    ) -> Result<HttpResponse, TransportError> {
        session.apply(&mut request);
        let response = self.execute(request).await?;
        session.absorb(&response);
        Ok(response)
    }

    /// Releases pooled resources. Called once when the owning context shuts down.
    async fn shutdown(&self) {}
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn shared(config: &HttpConfig) -> Result<Arc<dyn HttpTransport>, TransportError> {
        Ok(Arc::new(Self::new(config)?))
    }
}

fn build_client(cfg: &HttpConfig) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder().pool_max_idle_per_host(cfg.pool_max_idle_per_host);

    if let Some(timeout) = cfg.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(connect_timeout) = cfg.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    if let Some(proxy_url) = &cfg.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| TransportError::Configuration(format!("Invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }
    if let Some(user_agent) = &cfg.user_agent {
        builder = builder.user_agent(user_agent);
    }

    // Default headers
    if !cfg.headers.is_empty() {
        let mut headers = reqwest::header::HeaderMap::new();
        for (k, v) in &cfg.headers {
            let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
                TransportError::Configuration(format!("Invalid header name '{k}': {e}"))
            })?;
            let value = HeaderValue::from_str(v).map_err(|e| {
                TransportError::Configuration(format!("Invalid header value for '{k}': {e}"))
            })?;
            headers.insert(name, value);
        }
        builder = builder.default_headers(headers);
    }

    builder
        .build()
        .map_err(|e| TransportError::Configuration(format!("Failed to build HTTP client: {e}")))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request
            .url
            .ok_or_else(|| TransportError::Http("request has no URL".to_string()))?;
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(request.headers);
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Text(text) => builder.body(text),
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                builder.body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from));
        Ok(HttpResponse::new(
            status,
            headers,
            ResponseBody::from_stream(stream),
        ))
    }
}
