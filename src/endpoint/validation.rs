//! Validation gate run before a proxy is created.

use std::collections::HashSet;

use reqwest::header::{HeaderName, HeaderValue};

use super::definition::EndpointDefinition;
use crate::error::ValidationError;

const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

pub(super) fn validate(endpoint: &EndpointDefinition) -> Result<(), ValidationError> {
    let name = endpoint.name();
    let host = endpoint.host().trim();

    let bare_host = match host.split_once("://") {
        Some((scheme, rest)) => {
            check_scheme(name, scheme)?;
            rest
        }
        None => host,
    };
    if bare_host.trim_matches('/').is_empty() {
        return Err(ValidationError::MissingHost {
            endpoint: name.to_string(),
        });
    }
    if let Some(scheme) = endpoint.scheme() {
        check_scheme(name, scheme)?;
    }

    let mut seen = HashSet::new();
    for operation in endpoint.operations() {
        if !seen.insert(operation.name()) {
            return Err(ValidationError::DuplicateOperation {
                endpoint: name.to_string(),
                operation: operation.name().to_string(),
            });
        }
        check_headers(name, operation.headers())?;
    }
    check_headers(name, endpoint.headers())
}

fn check_scheme(endpoint: &str, scheme: &str) -> Result<(), ValidationError> {
    if SUPPORTED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidScheme {
            endpoint: endpoint.to_string(),
            scheme: scheme.to_string(),
        })
    }
}

fn check_headers(endpoint: &str, headers: &[(String, String)]) -> Result<(), ValidationError> {
    for (header, value) in headers {
        let invalid = |reason: String| ValidationError::InvalidHeader {
            endpoint: endpoint.to_string(),
            name: header.clone(),
            reason,
        };
        HeaderName::from_bytes(header.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(())
}
