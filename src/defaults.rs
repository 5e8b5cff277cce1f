//! Default values shared across the crate.

/// Transport defaults.
pub mod http {
    use std::time::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const USER_AGENT: &str = concat!("wirelink/", env!("CARGO_PKG_VERSION"));
    /// Idle connections kept per host by the shared default transport.
    pub const POOL_MAX_IDLE_PER_HOST: usize = 4;
}

/// Client context defaults.
pub mod context {
    use std::time::Duration;

    /// How long shutdown waits for in-flight asynchronous work.
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);
    pub const ASYNC_WORKERS: usize = 64;

    pub const SHUTDOWN_GRACE_ENV: &str = "WIRELINK_SHUTDOWN_GRACE_SECS";
    pub const ASYNC_WORKERS_ENV: &str = "WIRELINK_ASYNC_WORKERS";
}
