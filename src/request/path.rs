use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{RequestStage, url_mut};
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::ParamRole;
use crate::error::RequestError;
use crate::types::{Argument, HttpRequest};

static PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").ok());

/// Substitutes `:name` placeholders in the composed path.
///
/// Every `Path(name)` argument must be text. Placeholders without a bound
/// argument are left as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathStage;

impl NamedStage for PathStage {
    fn name(&self) -> &'static str {
        "path"
    }
}

impl RequestStage for PathStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        let mut values: HashMap<&str, Cow<'_, str>> = HashMap::new();
        for (role, argument) in descriptor.bindings() {
            let ParamRole::Path(name) = role else {
                continue;
            };
            match argument {
                Argument::Text(value) => {
                    values.insert(name.as_str(), urlencoding::encode(value));
                }
                other => {
                    return Err(RequestError::ParamType {
                        role: "path",
                        name: name.clone(),
                        found: other.variant_name(),
                    });
                }
            }
        }
        if values.is_empty() {
            return Ok(());
        }

        let pattern = PLACEHOLDER
            .as_ref()
            .ok_or_else(|| RequestError::InvalidUri("path placeholder pattern".to_string()))?;
        let url = url_mut(request)?;
        let substituted = pattern
            .replace_all(url.path(), |caps: &Captures<'_>| match values.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned();
        url.set_path(&substituted);
        Ok(())
    }
}
