//! HTTP request methods.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The request method an operation is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Trace,
    Options,
    Patch,
}

impl RequestMethod {
    /// Methods that carry a request entity (form or body).
    pub fn encloses_entity(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Trace => "TRACE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Head => reqwest::Method::HEAD,
            RequestMethod::Trace => reqwest::Method::TRACE,
            RequestMethod::Options => reqwest::Method::OPTIONS,
            RequestMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_post_put_patch_enclose_entities() {
        let enclosing: Vec<_> = [
            RequestMethod::Get,
            RequestMethod::Post,
            RequestMethod::Put,
            RequestMethod::Delete,
            RequestMethod::Head,
            RequestMethod::Trace,
            RequestMethod::Options,
            RequestMethod::Patch,
        ]
        .into_iter()
        .filter(|m| m.encloses_entity())
        .collect();
        assert_eq!(
            enclosing,
            vec![RequestMethod::Post, RequestMethod::Put, RequestMethod::Patch]
        );
    }

    #[test]
    fn maps_to_reqwest_method() {
        assert_eq!(reqwest::Method::from(RequestMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(RequestMethod::Options.to_string(), "OPTIONS");
    }
}
