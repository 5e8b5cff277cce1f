use super::{RequestStage, url_mut};
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::endpoint::ParamRole;
use crate::error::RequestError;
use crate::types::{Argument, HttpRequest};

/// Appends constant then argument-bound query parameters, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStage;

impl NamedStage for QueryStage {
    fn name(&self) -> &'static str {
        "query"
    }
}

impl RequestStage for QueryStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        let pairs = collect_pairs(
            descriptor.operation().query_constants(),
            descriptor,
            |role| match role {
                ParamRole::Query(name) => Some(Some(name.as_str())),
                ParamRole::QueryMap => Some(None),
                _ => None,
            },
            "query",
        )?;
        if pairs.is_empty() {
            return Ok(());
        }

        let url = url_mut(request)?;
        let mut query = url.query_pairs_mut();
        for (name, value) in &pairs {
            query.append_pair(name, value);
        }
        drop(query);
        Ok(())
    }
}

/// Flattens constants and the arguments selected by `select` into ordered
/// name/value pairs.
///
/// `select` returns `Some(Some(name))` for a single named parameter and
/// `Some(None)` for a batch map. Absent arguments are skipped.
pub(super) fn collect_pairs(
    constants: &[(String, String)],
    descriptor: &InvocationDescriptor,
    select: impl Fn(&ParamRole) -> Option<Option<&str>>,
    role: &'static str,
) -> Result<Vec<(String, String)>, RequestError> {
    let mut pairs = constants.to_vec();
    for (param, argument) in descriptor.bindings() {
        let Some(name) = select(param) else {
            continue;
        };
        match (name, argument) {
            (_, Argument::Absent) => {}
            (None, Argument::Params(map)) => {
                for (key, values) in map {
                    pairs.extend(values.iter().map(|v| (key.clone(), v.clone())));
                }
            }
            (Some(name), other) => match other.scalar_text() {
                Some(value) => pairs.push((name.to_string(), value)),
                None => {
                    return Err(RequestError::ParamType {
                        role,
                        name: name.to_string(),
                        found: other.variant_name(),
                    });
                }
            },
            (None, other) => {
                return Err(RequestError::ParamType {
                    role,
                    name: format!("{role} map"),
                    found: other.variant_name(),
                });
            }
        }
    }
    Ok(pairs)
}
