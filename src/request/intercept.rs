use std::sync::Arc;

use super::RequestStage;
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::{Detachable, ParamRole};
use crate::error::RequestError;
use crate::execution::Interceptor;
use crate::types::{Argument, HttpRequest};

/// Runs endpoint, operation, then argument-supplied interceptors against
/// the finished request.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptorStage;

impl NamedStage for InterceptorStage {
    fn name(&self) -> &'static str {
        "interceptors"
    }
}

impl RequestStage for InterceptorStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        let endpoint: &[Arc<dyn Interceptor>] = if descriptor.is_detached(Detachable::Interceptors) {
            &[]
        } else {
            descriptor.endpoint().interceptors()
        };
        let supplied = descriptor
            .bindings()
            .filter_map(|(role, argument)| match (role, argument) {
                (ParamRole::Interceptor, Argument::Interceptor(hook)) => Some(hook),
                _ => None,
            });

        for hook in endpoint
            .iter()
            .chain(descriptor.operation().interceptors())
            .chain(supplied)
        {
            tracing::trace!(target: "wirelink::request", invocation = %descriptor.id(), interceptor = hook.name(), "running interceptor");
            hook.intercept(descriptor, request)?;
        }
        Ok(())
    }
}
