use reqwest::Url;

use super::RequestStage;
use crate::chain::NamedStage;
use crate::descriptor::InvocationDescriptor;
use crate::error::RequestError;
use crate::types::HttpRequest;

const DEFAULT_SCHEME: &str = "http";

/// Composes scheme, host, port, root path and subpath.
///
/// A host written as `scheme://host[:port]` is used as the base URL and an
/// explicit scheme or port overrides its parts. Otherwise the scheme
/// defaults to `http` and the port is omitted unless declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriStage;

impl NamedStage for UriStage {
    fn name(&self) -> &'static str {
        "uri"
    }
}

impl RequestStage for UriStage {
    fn process(
        &self,
        request: &mut HttpRequest,
        descriptor: &InvocationDescriptor,
    ) -> Result<(), RequestError> {
        let endpoint = descriptor.endpoint();
        let host = endpoint.host().trim();
        let invalid = |detail: String| RequestError::InvalidUri(format!("{host}: {detail}"));

        let mut url = if host.contains("://") {
            let mut url = Url::parse(host).map_err(|e| invalid(e.to_string()))?;
            if let Some(scheme) = endpoint.scheme() {
                url.set_scheme(scheme)
                    .map_err(|()| invalid(format!("cannot switch scheme to {scheme}")))?;
            }
            if let Some(port) = endpoint.port() {
                url.set_port(Some(port))
                    .map_err(|()| invalid(format!("cannot set port {port}")))?;
            }
            url
        } else {
            if host.is_empty() {
                return Err(RequestError::EmptyHost);
            }
            let scheme = endpoint.scheme().unwrap_or(DEFAULT_SCHEME);
            let base = match endpoint.port() {
                Some(port) => format!("{scheme}://{host}:{port}"),
                None => format!("{scheme}://{host}"),
            };
            Url::parse(&base).map_err(|e| invalid(e.to_string()))?
        };

        if url.host_str().is_none_or(str::is_empty) {
            return Err(RequestError::EmptyHost);
        }

        let path = join_path(&[url.path(), endpoint.path(), descriptor.subpath()]);
        url.set_path(&path);
        request.url = Some(url);
        Ok(())
    }
}

/// Joins path pieces with exactly one `/` between non-empty pieces, keeping
/// a trailing slash on the last piece.
fn join_path(pieces: &[&str]) -> String {
    let segments: Vec<&str> = pieces
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect();
    let mut path = format!("/{}", segments.join("/"));
    let trailing = pieces
        .iter()
        .rev()
        .find(|p| !p.trim_matches('/').is_empty())
        .is_some_and(|p| p.ends_with('/'));
    if trailing && path.len() > 1 {
        path.push('/');
    }
    path
}
