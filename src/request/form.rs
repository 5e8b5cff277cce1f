use super::RequestStage;
use super::query::collect_pairs;
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::ParamRole;
use crate::error::RequestError;
use crate::types::{HttpRequest, RequestBody};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Builds a url-encoded form body for POST, PUT and PATCH.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormStage;

impl NamedStage for FormStage {
    fn name(&self) -> &'static str {
        "form"
    }
}

impl RequestStage for FormStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        if !descriptor.method().encloses_entity() {
            return Ok(());
        }
        let pairs = collect_pairs(
            descriptor.operation().form_constants(),
            descriptor,
            |role| match role {
                ParamRole::Form(name) => Some(Some(name.as_str())),
                ParamRole::FormMap => Some(None),
                _ => None,
            },
            "form",
        )?;
        if pairs.is_empty() {
            return Ok(());
        }

        let encoded = pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        request.set_content_type_if_absent(FORM_URLENCODED)?;
        request.body = RequestBody::Text(encoded);
        Ok(())
    }
}
