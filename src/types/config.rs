//! Configuration types.
//!
//! `HttpConfig` configures a [`ReqwestTransport`](crate::execution::http::transport::ReqwestTransport);
//! `ContextConfig` configures a [`ClientContext`](crate::context::ClientContext).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::defaults;

/// HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(with = "duration_option_serde")]
    pub timeout: Option<Duration>,
    /// Connection timeout
    #[serde(with = "duration_option_serde")]
    pub connect_timeout: Option<Duration>,
    /// Headers sent with every request
    pub headers: HashMap<String, String>,
    /// Proxy settings
    pub proxy: Option<String>,
    /// User agent
    pub user_agent: Option<String>,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

/// Builder for `HttpConfig`
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    headers: HashMap<String, String>,
    proxy: Option<String>,
    user_agent: Option<String>,
    pool_max_idle_per_host: Option<usize>,
}

impl HttpConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
    pub fn proxy<S: Into<String>>(mut self, proxy: S) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Build the configuration
    pub fn build(self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: self.timeout.or(defaults.timeout),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            headers: self.headers,
            proxy: self.proxy,
            user_agent: self.user_agent.or(defaults.user_agent),
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or(defaults.pool_max_idle_per_host),
        }
    }
}

impl HttpConfig {
    /// Returns a builder for constructing `HttpConfig`
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::new()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Some(defaults::http::REQUEST_TIMEOUT),
            connect_timeout: Some(defaults::http::CONNECT_TIMEOUT),
            headers: HashMap::new(),
            proxy: None,
            user_agent: Some(defaults::http::USER_AGENT.to_string()),
            pool_max_idle_per_host: defaults::http::POOL_MAX_IDLE_PER_HOST,
        }
    }
}

/// Configuration of a [`ClientContext`](crate::context::ClientContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Grace period given to in-flight asynchronous work at shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_grace: Duration,
    /// Maximum number of asynchronous invocations running at once
    pub async_workers: usize,
    /// Configuration of the shared default transport
    pub http: HttpConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: defaults::context::SHUTDOWN_GRACE,
            async_workers: defaults::context::ASYNC_WORKERS,
            http: HttpConfig::default(),
        }
    }
}

impl ContextConfig {
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::default()
    }

    /// Defaults overridden by `WIRELINK_SHUTDOWN_GRACE_SECS` and
    /// `WIRELINK_ASYNC_WORKERS`. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_number::<u64>(defaults::context::SHUTDOWN_GRACE_ENV) {
            config.shutdown_grace = Duration::from_secs(secs);
        }
        if let Some(workers) = env_number::<usize>(defaults::context::ASYNC_WORKERS_ENV) {
            config.async_workers = workers.max(1);
        }
        config
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(target: "wirelink::context", key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

/// Builder for `ContextConfig`
#[derive(Debug, Clone, Default)]
pub struct ContextConfigBuilder {
    shutdown_grace: Option<Duration>,
    async_workers: Option<usize>,
    http: Option<HttpConfig>,
}

impl ContextConfigBuilder {
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    pub fn async_workers(mut self, workers: usize) -> Self {
        self.async_workers = Some(workers.max(1));
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> ContextConfig {
        let defaults = ContextConfig::default();
        ContextConfig {
            shutdown_grace: self.shutdown_grace.unwrap_or(defaults.shutdown_grace),
            async_workers: self.async_workers.unwrap_or(defaults.async_workers),
            http: self.http.unwrap_or(defaults.http),
        }
    }
}

// Helper modules for Duration serialization
mod duration_option_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
