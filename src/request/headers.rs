use super::RequestStage;
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::{Detachable, ParamRole};
use crate::error::RequestError;
use crate::types::{Argument, HttpRequest};

/// Appends endpoint constants, operation constants, then argument-bound
/// headers. Repeated names accumulate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStage;

impl NamedStage for HeaderStage {
    fn name(&self) -> &'static str {
        "headers"
    }
}

impl RequestStage for HeaderStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        if !descriptor.is_detached(Detachable::Headers) {
            for (name, value) in descriptor.endpoint().headers() {
                request.append_header(name, value)?;
            }
        }
        for (name, value) in descriptor.operation().headers() {
            request.append_header(name, value)?;
        }

        for (role, argument) in descriptor.bindings() {
            let ParamRole::Header(name) = role else {
                continue;
            };
            match argument {
                Argument::Absent => {}
                Argument::Text(value) => request.append_header(name, value)?,
                other => {
                    return Err(RequestError::ParamType {
                        role: "header",
                        name: name.clone(),
                        found: other.variant_name(),
                    });
                }
            }
        }
        Ok(())
    }
}
