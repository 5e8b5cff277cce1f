//! Per-invocation record.

use std::sync::Arc;

use uuid::Uuid;

use crate::endpoint::{Detachable, EndpointDefinition, Operation, ParamRole};
use crate::types::{Argument, RequestMethod, ReturnType};

/// Immutable record of one proxy invocation: which operation of which
/// endpoint was called, and with what arguments.
#[derive(Debug)]
pub struct InvocationDescriptor {
    id: Uuid,
    endpoint: Arc<EndpointDefinition>,
    operation: Arc<Operation>,
    arguments: Vec<Argument>,
}

impl InvocationDescriptor {
    pub fn new(
        endpoint: Arc<EndpointDefinition>,
        operation: Arc<Operation>,
        arguments: Vec<Argument>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            operation,
            arguments,
        }
    }

    /// Identifier used to correlate log records of one invocation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &EndpointDefinition {
        &self.endpoint
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn method(&self) -> RequestMethod {
        self.operation.method()
    }

    pub fn subpath(&self) -> &str {
        self.operation.path()
    }

    pub fn return_type(&self) -> &ReturnType {
        self.operation.return_type()
    }

    /// Asynchronous when declared so on the operation or the endpoint.
    pub fn is_asynchronous(&self) -> bool {
        self.operation.is_asynchronous() || self.endpoint.is_asynchronous()
    }

    pub fn is_detached(&self, what: Detachable) -> bool {
        self.operation.is_detached(what)
    }

    /// Arguments paired with their declared roles, in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&ParamRole, &Argument)> {
        self.operation.params().iter().zip(self.arguments.iter())
    }
}
