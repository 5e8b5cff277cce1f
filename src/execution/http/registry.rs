//! Endpoint to transport bindings.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::transport::{HttpTransport, ReqwestTransport};
use crate::endpoint::EndpointDefinition;
use crate::error::TransportError;
use crate::types::HttpConfig;

/// Supplies the transport of endpoints that do not use the shared default.
///
/// Endpoints declaring configurations with the same key share one transport.
pub trait TransportConfiguration: Send + Sync {
    fn key(&self) -> &str;

    fn transport(&self) -> Result<Arc<dyn HttpTransport>, TransportError>;
}

/// A [`ReqwestTransport`] built from its own [`HttpConfig`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfiguration {
    key: String,
    config: HttpConfig,
}

impl HttpTransportConfiguration {
    pub fn new(key: impl Into<String>, config: HttpConfig) -> Self {
        Self {
            key: key.into(),
            config,
        }
    }
}

impl TransportConfiguration for HttpTransportConfiguration {
    fn key(&self) -> &str {
        &self.key
    }

    fn transport(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
        ReqwestTransport::shared(&self.config)
    }
}

/// Binds endpoints to transports.
///
/// Bindings are written once per key; later attempts reuse what is stored.
pub struct TransportRegistry {
    default: Arc<dyn HttpTransport>,
    configured: RwLock<HashMap<String, Arc<dyn HttpTransport>>>,
    bindings: RwLock<HashMap<String, Arc<dyn HttpTransport>>>,
}

impl TransportRegistry {
    pub fn new(default: Arc<dyn HttpTransport>) -> Self {
        Self {
            default,
            configured: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.default)
    }

    /// Binds `endpoint` to its configured transport, or to the default.
    pub fn bind(&self, endpoint: &EndpointDefinition) -> Result<Arc<dyn HttpTransport>, TransportError> {
        if let Some(bound) = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint.name())
        {
            return Ok(Arc::clone(bound));
        }

        let transport = match endpoint.configuration() {
            Some(configuration) => self.configured(configuration.as_ref())?,
            None => self.default_transport(),
        };
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let bound = bindings
            .entry(endpoint.name().to_string())
            .or_insert(transport);
        tracing::debug!(
            target: "wirelink::http",
            endpoint = %endpoint.name(),
            configuration = ?endpoint.configuration().map(|c| c.key().to_string()),
            "endpoint bound to transport"
        );
        Ok(Arc::clone(bound))
    }

    fn configured(
        &self,
        configuration: &dyn TransportConfiguration,
    ) -> Result<Arc<dyn HttpTransport>, TransportError> {
        let key = configuration.key();
        if let Some(existing) = self
            .configured
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Arc::clone(existing));
        }
        let created = configuration.transport()?;
        let mut configured = self.configured.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(configured.entry(key.to_string()).or_insert(created)))
    }

    /// The transport bound to `endpoint`, or the default if it was never bound.
    pub fn transport_for(&self, endpoint: &str) -> Arc<dyn HttpTransport> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| self.default_transport())
    }

    /// The default transport followed by every configured one.
    pub fn transports(&self) -> Vec<Arc<dyn HttpTransport>> {
        let mut all = vec![self.default_transport()];
        all.extend(
            self.configured
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .cloned(),
        );
        all
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: Vec<String> = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("TransportRegistry")
            .field("bindings", &bindings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Operation;
    use crate::types::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Stub;

    #[async_trait]
    impl HttpTransport for Stub {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connection("stub".into()))
        }
    }

    struct Counting {
        key: &'static str,
        created: Arc<AtomicUsize>,
    }

    impl TransportConfiguration for Counting {
        fn key(&self) -> &str {
            self.key
        }

        fn transport(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Stub))
        }
    }

    fn endpoint(name: &str, created: Option<&Arc<AtomicUsize>>) -> EndpointDefinition {
        let mut builder = EndpointDefinition::builder(name)
            .host("localhost")
            .operation(Operation::get("ping", "/"));
        if let Some(created) = created {
            builder = builder.configuration(Counting {
                key: "shared",
                created: Arc::clone(created),
            });
        }
        builder.build().unwrap()
    }

    #[test]
    fn unconfigured_endpoints_use_the_default() {
        let default: Arc<dyn HttpTransport> = Arc::new(Stub);
        let registry = TransportRegistry::new(Arc::clone(&default));
        let bound = registry.bind(&endpoint("A", None)).unwrap();
        assert!(Arc::ptr_eq(&bound, &default));
        assert!(Arc::ptr_eq(&registry.transport_for("unknown"), &default));
    }

    #[test]
    fn configurations_with_the_same_key_share_a_transport() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = TransportRegistry::new(Arc::new(Stub));
        let a = registry.bind(&endpoint("A", Some(&created))).unwrap();
        let b = registry.bind(&endpoint("B", Some(&created))).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.transports().len(), 2);
    }

    #[test]
    fn first_binding_wins() {
        let created = Arc::new(AtomicUsize::new(0));
        let default: Arc<dyn HttpTransport> = Arc::new(Stub);
        let registry = TransportRegistry::new(Arc::clone(&default));
        let first = registry.bind(&endpoint("A", None)).unwrap();
        let second = registry.bind(&endpoint("A", Some(&created))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }
}
