//! HTTP plumbing: interceptors, transports, sessions and transport bindings.

pub mod interceptor;
pub mod registry;
pub mod session;
pub mod transport;
