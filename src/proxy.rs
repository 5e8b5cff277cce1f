//! Endpoint proxies
//!
//! An [`EndpointProxy`] stands in for the declared endpoint: every call to
//! [`EndpointProxy::invoke`] names an operation and passes its positional
//! arguments, and runs the request chain, the executor and the response
//! chain in that order.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::InvocationDescriptor;
use crate::endpoint::{EndpointDefinition, Operation, ParamRole};
use crate::error::{ErrorKind, InvocationError};
use crate::execution::{AsyncWorkerPool, RequestExecutor};
use crate::request::RequestChain;
use crate::response::ResponseChain;
use crate::types::{Argument, HttpRequest, Reply};

/// The shared, stateless part of every invocation.
pub(crate) struct Pipeline {
    pub(crate) request: RequestChain,
    pub(crate) executor: RequestExecutor,
    pub(crate) response: ResponseChain,
    pub(crate) pool: Arc<AsyncWorkerPool>,
}

impl Pipeline {
    /// Sends a built request and maps the response to the reply.
    async fn dispatch(
        &self,
        request: HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<Reply, InvocationError> {
        let sent = request.clone();
        let response = self
            .executor
            .execute(request, descriptor)
            .await
            .map_err(|e| {
                InvocationError::for_descriptor(ErrorKind::TransportFailed(e), descriptor)
                    .with_request(Some(sent))
            })?;

        self.response
            .run(response, descriptor)
            .await
            .map_err(|failure| {
                InvocationError::for_descriptor(
                    ErrorKind::ResponseProcessingFailed {
                        stage: failure.stage,
                        source: failure.error,
                    },
                    descriptor,
                )
                .with_response(failure.response)
            })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &self.request)
            .field("executor", &self.executor)
            .field("response", &self.response)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Runtime stand-in for one declared endpoint.
///
/// Cheap to clone; clones share the definition and the owning context's
/// pipeline.
#[derive(Clone)]
pub struct EndpointProxy {
    definition: Arc<EndpointDefinition>,
    pipeline: Arc<Pipeline>,
}

impl EndpointProxy {
    pub(crate) fn new(definition: Arc<EndpointDefinition>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            definition,
            pipeline,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &EndpointDefinition {
        &self.definition
    }

    /// Invokes `operation` with positional `arguments`.
    ///
    /// Synchronous operations resolve to the decoded reply. Asynchronous
    /// ones return [`Reply::None`] as soon as the request is built; dispatch
    /// and response handling continue on the context's worker pool and any
    /// failure there is logged.
    pub async fn invoke(
        &self,
        operation: &str,
        arguments: Vec<Argument>,
    ) -> Result<Reply, InvocationError> {
        let illegal = |reason: String| {
            InvocationError::new(ErrorKind::IllegalInvocation(reason), self.name())
                .with_operation(operation)
                .with_arguments(&arguments)
        };
        let declared = self.definition.operation(operation).ok_or_else(|| {
            illegal(format!(
                "endpoint '{}' declares no operation '{operation}'",
                self.name()
            ))
        })?;
        check_arguments(declared, &arguments).map_err(illegal)?;

        let descriptor = InvocationDescriptor::new(
            Arc::clone(&self.definition),
            Arc::clone(declared),
            arguments,
        );
        tracing::debug!(
            target: "wirelink::proxy",
            invocation = %descriptor.id(),
            endpoint = %self.name(),
            operation = %operation,
            asynchronous = descriptor.is_asynchronous(),
            "invoking operation"
        );

        let request = self.pipeline.request.run(&descriptor).map_err(|failure| {
            InvocationError::for_descriptor(
                ErrorKind::RequestBuildFailed {
                    stage: failure.stage,
                    source: failure.error,
                },
                &descriptor,
            )
            .with_request(Some(failure.request))
        })?;

        if !descriptor.is_asynchronous() {
            return self.pipeline.dispatch(request, &descriptor).await;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let descriptor = Arc::new(descriptor);
        let submitted = Arc::clone(&descriptor);
        self.pipeline
            .pool
            .submit(async move {
                if let Err(e) = pipeline.dispatch(request, &submitted).await {
                    tracing::error!(
                        target: "wirelink::proxy",
                        invocation = %submitted.id(),
                        err = %e,
                        "asynchronous invocation failed"
                    );
                }
            })
            .map_err(|e| {
                InvocationError::for_descriptor(
                    ErrorKind::IllegalInvocation(e.to_string()),
                    &descriptor,
                )
            })?;
        Ok(Reply::None)
    }
}

impl fmt::Debug for EndpointProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointProxy")
            .field("endpoint", &self.definition.name())
            .field("operations", &self.definition.operations().len())
            .finish_non_exhaustive()
    }
}

/// Checks the argument count and that each argument can serve its role.
///
/// Only role-specific variants are checked here; textual conversions are
/// left to the request stages.
fn check_arguments(operation: &Operation, arguments: &[Argument]) -> Result<(), String> {
    let roles = operation.params();
    if roles.len() != arguments.len() {
        return Err(format!(
            "operation '{}' takes {} arguments, got {}",
            operation.name(),
            roles.len(),
            arguments.len()
        ));
    }
    for (index, (role, argument)) in roles.iter().zip(arguments).enumerate() {
        let fits = match (role, argument) {
            (_, Argument::Absent) => true,
            (ParamRole::ResponseHeader(_), argument) => matches!(argument, Argument::HeaderSlot(_)),
            (ParamRole::Interceptor, argument) => matches!(argument, Argument::Interceptor(_)),
            (ParamRole::QueryMap | ParamRole::FormMap, argument) => {
                matches!(argument, Argument::Params(_))
            }
            (_, Argument::HeaderSlot(_) | Argument::Interceptor(_)) => false,
            _ => true,
        };
        if !fits {
            return Err(format!(
                "argument {index} of '{}' cannot be bound as {role:?}: got {}",
                operation.name(),
                argument.variant_name()
            ));
        }
    }
    Ok(())
}
