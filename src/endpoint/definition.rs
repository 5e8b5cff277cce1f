//! Endpoint declarations.

use std::fmt;
use std::sync::Arc;

use super::operation::Operation;
use super::validation;
use crate::codec::{DeserializerRef, SerializerRef};
use crate::error::ValidationError;
use crate::execution::http::interceptor::Interceptor;
use crate::execution::http::registry::TransportConfiguration;

/// A remote API: its base location, shared behavior and declared operations.
pub struct EndpointDefinition {
    name: String,
    host: String,
    scheme: Option<String>,
    port: Option<u16>,
    path: String,
    headers: Vec<(String, String)>,
    serializer: Option<SerializerRef>,
    deserializer: Option<DeserializerRef>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    stateful: bool,
    asynchronous: bool,
    configuration: Option<Arc<dyn TransportConfiguration>>,
    operations: Vec<Arc<Operation>>,
}

impl EndpointDefinition {
    pub fn builder(name: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared host; may carry a full `scheme://host:port` base.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicitly declared scheme.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Root path; empty unless declared.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn serializer_ref(&self) -> Option<&SerializerRef> {
        self.serializer.as_ref()
    }

    pub fn deserializer_ref(&self) -> Option<&DeserializerRef> {
        self.deserializer.as_ref()
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn configuration(&self) -> Option<&Arc<dyn TransportConfiguration>> {
        self.configuration.as_ref()
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    pub fn operation(&self, name: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.name() == name)
    }

    /// Runs the validation gate again; proxies call this before binding.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}

impl fmt::Debug for EndpointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("stateful", &self.stateful)
            .field("asynchronous", &self.asynchronous)
            .field(
                "configuration",
                &self.configuration.as_ref().map(|c| c.key().to_string()),
            )
            .field(
                "operations",
                &self.operations.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`EndpointDefinition`].
pub struct EndpointBuilder {
    inner: EndpointDefinition,
}

impl EndpointBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            inner: EndpointDefinition {
                name: name.into(),
                host: String::new(),
                scheme: None,
                port: None,
                path: String::new(),
                headers: Vec::new(),
                serializer: None,
                deserializer: None,
                interceptors: Vec::new(),
                stateful: false,
                asynchronous: false,
                configuration: None,
                operations: Vec::new(),
            },
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.inner.host = host.into();
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.inner.scheme = Some(scheme.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.inner.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.push((name.into(), value.into()));
        self
    }

    pub fn serializer(mut self, serializer: SerializerRef) -> Self {
        self.inner.serializer = Some(serializer);
        self
    }

    pub fn deserializer(mut self, deserializer: DeserializerRef) -> Self {
        self.inner.deserializer = Some(deserializer);
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.inner.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn stateful(mut self) -> Self {
        self.inner.stateful = true;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.inner.asynchronous = true;
        self
    }

    pub fn configuration(mut self, configuration: impl TransportConfiguration + 'static) -> Self {
        self.inner.configuration = Some(Arc::new(configuration));
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.inner.operations.push(Arc::new(operation));
        self
    }

    /// Validates and returns the definition.
    pub fn build(self) -> Result<EndpointDefinition, ValidationError> {
        validation::validate(&self.inner)?;
        Ok(self.inner)
    }
}
