//! Error Handling Module
//!
//! Every failure inside the invocation pipeline originates as one of the
//! stage-level enums (`RequestError`, `TransportError`, `ResponseError`,
//! `CodecError`, `ValidationError`) and reaches the caller wrapped in a single
//! [`InvocationError`] that carries the invocation context.
//!
//! # Example
//!
//! ```rust,ignore
//! match proxy.invoke("get_user", vec![Argument::text("42")]).await {
//!     Ok(reply) => { /* ... */ }
//!     Err(err) if err.is_transport_failure() => { /* retry on the caller side */ }
//!     Err(err) => eprintln!("{err} (response attached: {})", err.has_response()),
//! }
//! ```

mod conversions;
pub mod types;

pub use types::*;
