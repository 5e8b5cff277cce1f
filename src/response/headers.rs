use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName};

use super::{ResponseContext, ResponseStage};
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::ParamRole;
use crate::error::ResponseError;
use crate::types::Argument;

/// Copies response headers into the bound header slots.
///
/// Each slot takes the first remaining value of its header and removes it,
/// so repeated headers spread over slots in declaration order. Slots with no
/// matching value keep what they held.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStage;

impl NamedStage for HeaderStage {
    fn name(&self) -> &'static str {
        "headers"
    }
}

#[async_trait]
impl ResponseStage for HeaderStage {
    async fn process(
        &self,
        context: &mut ResponseContext,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), ResponseError> {
        let response = context.response_mut()?;
        for (role, argument) in descriptor.bindings() {
            let (ParamRole::ResponseHeader(name), Argument::HeaderSlot(slot)) = (role, argument)
            else {
                continue;
            };
            if let Some(value) = take_first(&mut response.headers, name) {
                slot.set(value);
            }
        }
        Ok(())
    }
}

/// Removes and returns the first value of `name`, keeping the others.
fn take_first(headers: &mut HeaderMap, name: &str) -> Option<String> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    let mut values: Vec<_> = headers.get_all(&name).iter().cloned().collect();
    if values.is_empty() {
        return None;
    }
    headers.remove(&name);
    let first = values.remove(0);
    for rest in values {
        headers.append(name.clone(), rest);
    }
    Some(String::from_utf8_lossy(first.as_bytes()).into_owned())
}
