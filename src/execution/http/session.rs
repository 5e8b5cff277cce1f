//! Session state shared by the calls of a stateful endpoint.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::header::{COOKIE, HeaderValue, SET_COOKIE};

use crate::types::{HttpRequest, HttpResponse};

/// Cookie state of one stateful endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    cookies: BTreeMap<String, String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Merges every stored cookie into the request's single `Cookie` header.
    ///
    /// Cookies the request already declares keep their value and come first.
    pub fn apply(&self, request: &mut HttpRequest) {
        if self.cookies.is_empty() {
            return;
        }
        let mut pairs: Vec<String> = request
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(str::to_string)
            .collect();
        let declared: Vec<String> = pairs
            .iter()
            .map(|pair| {
                let name = pair.split_once('=').map_or(pair.as_str(), |(name, _)| name);
                name.trim().to_string()
            })
            .collect();
        pairs.extend(
            self.cookies
                .iter()
                .filter(|(name, _)| !declared.contains(name))
                .map(|(name, value)| format!("{name}={value}")),
        );
        match HeaderValue::from_str(&pairs.join("; ")) {
            Ok(value) => {
                request.headers.insert(COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(target: "wirelink::http", error = %e, "dropping unrepresentable session cookies")
            }
        }
    }

    /// Stores cookies from `Set-Cookie` headers; `Max-Age=0` removes one.
    pub fn absorb(&mut self, response: &HttpResponse) {
        for raw in response.headers.get_all(SET_COOKIE) {
            let Ok(raw) = raw.to_str() else { continue };
            let mut parts = raw.split(';');
            let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let expired = parts.any(|attr| {
                attr.trim()
                    .split_once('=')
                    .is_some_and(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0")
            });
            if expired {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
}

/// Per-endpoint session contexts.
///
/// Each context sits behind an async mutex that the executor holds for the
/// whole dispatch, so calls to one stateful endpoint never interleave their
/// session reads and writes.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<SessionContext>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session of `endpoint`, created empty on first use.
    pub fn session(&self, endpoint: &str) -> Arc<tokio::sync::Mutex<SessionContext>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(endpoint.to_string()).or_default())
    }

    /// A copy of the current state of `endpoint`'s session, if it has one.
    pub async fn snapshot(&self, endpoint: &str) -> Option<SessionContext> {
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned()?;
        let guard = session.lock().await;
        Some(guard.clone())
    }
}
