//! Request processor chain
//!
//! Builds the outgoing [`HttpRequest`] from an [`InvocationDescriptor`] by
//! running a fixed sequence of stages over one mutable request:
//!
//! 1. `uri`: scheme, host, port, root path and subpath
//! 2. `headers`: constant then argument-bound headers
//! 3. `path`: `:name` placeholder substitution
//! 4. `query`: constant then argument-bound query parameters
//! 5. `form`: url-encoded form body for entity-enclosing methods
//! 6. `entity`: the single entity argument, serialized if needed
//! 7. `interceptors`: endpoint, operation, then argument hooks
//!
//! The first failing stage aborts the chain.

mod entity;
mod form;
mod headers;
mod intercept;
mod path;
mod query;
mod uri;

use std::sync::Arc;

use crate::chain::{NamedStage, ProcessorChain};
use crate::codec::CodecRegistry;
use crate::descriptor::InvocationDescriptor;
use crate::error::RequestError;
use crate::types::HttpRequest;

pub use entity::EntityStage;
pub use form::FormStage;
pub use headers::HeaderStage;
pub use intercept::InterceptorStage;
pub use path::PathStage;
pub use query::QueryStage;
pub use uri::UriStage;

/// One step of request construction.
pub trait RequestStage: NamedStage + Send + Sync {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError>;
}

/// A stage failure together with the request as far as it was built.
#[derive(Debug)]
pub struct RequestChainFailure {
    pub stage: &'static str,
    pub error: RequestError,
    pub request: HttpRequest,
}

/// The ordered request stages.
#[derive(Debug)]
pub struct RequestChain {
    chain: ProcessorChain<dyn RequestStage>,
}

impl RequestChain {
    pub fn new(chain: ProcessorChain<dyn RequestStage>) -> Self {
        Self { chain }
    }

    /// The seven standard stages in their fixed order.
    pub fn standard(codecs: Arc<CodecRegistry>) -> Self {
        Self::new(
            ProcessorChain::<dyn RequestStage>::builder()
                .stage(Box::new(UriStage))
                .stage(Box::new(HeaderStage))
                .stage(Box::new(PathStage))
                .stage(Box::new(QueryStage))
                .stage(Box::new(FormStage))
                .stage(Box::new(EntityStage::new(codecs)))
                .stage(Box::new(InterceptorStage))
                .build(),
        )
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    /// Creates the request for the descriptor's method and runs every stage.
    pub fn run(&self, descriptor: &InvocationDescriptor) -> Result<HttpRequest, RequestChainFailure> {
        let mut request = HttpRequest::new(descriptor.method());
        for stage in self.chain.iter() {
            if let Err(error) = stage.process(&mut request, descriptor) {
                tracing::debug!(
                    target: "wirelink::request",
                    invocation = %descriptor.id(),
                    stage = stage.name(),
                    err = %error,
                    "request stage failed"
                );
                return Err(RequestChainFailure {
                    stage: stage.name(),
                    error,
                    request,
                });
            }
            tracing::trace!(target: "wirelink::request", invocation = %descriptor.id(), stage = stage.name(), "request stage done");
        }
        Ok(request)
    }
}

/// The URL composed by the URI stage.
fn url_mut(request: &mut HttpRequest) -> Result<&mut reqwest::Url, RequestError> {
    request
        .url
        .as_mut()
        .ok_or_else(|| RequestError::InvalidUri("no URI has been composed yet".to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::descriptor::InvocationDescriptor;
    use crate::endpoint::{EndpointBuilder, Operation};
    use crate::types::Argument;

    /// Builds a descriptor for the single operation declared on `endpoint`.
    pub fn descriptor(
        endpoint: EndpointBuilder,
        operation: Operation,
        arguments: Vec<Argument>,
    ) -> InvocationDescriptor {
        let name = operation.name().to_string();
        let endpoint = Arc::new(endpoint.operation(operation).build().unwrap());
        let operation = endpoint.operation(&name).unwrap().clone();
        InvocationDescriptor::new(endpoint, operation, arguments)
    }
}
