//! # Wirelink - Declarative HTTP Endpoint Clients
//!
//! Wirelink turns a declarative route table into a callable client. An
//! endpoint is described once (host, root path, headers, codecs and its
//! operations with their parameter roles) and every call runs through the
//! same fixed pipeline:
//!
//! 1. **Request chain**: URI, headers, path, query, form, entity, interceptors
//! 2. **Executor**: dispatch through the endpoint's transport, synchronously
//!    or on the asynchronous worker pool, with outcome callbacks
//! 3. **Response chain**: response-header slots, then status policy and
//!    deserialization into the declared return type
//!
//! Any failure surfaces as one [`InvocationError`] carrying the endpoint,
//! operation, arguments and, when available, the partial request or the raw
//! response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use wirelink::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct User {
//!     id: u64,
//!     first_name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = EndpointDefinition::builder("Users")
//!         .host("api.example.com")
//!         .scheme("https")
//!         .deserializer(DeserializerRef::json())
//!         .operation(
//!             Operation::get("get_user", "/users/:id")
//!                 .param(ParamRole::path("id"))
//!                 .returns(ReturnType::model::<User>()),
//!         )
//!         .build()?;
//!
//!     let context = ClientContext::init(ContextConfig::from_env())?;
//!     let users = context.proxy(endpoint)?;
//!     let user = users
//!         .invoke("get_user", vec![Argument::text("1")])
//!         .await?
//!         .into_model::<User>();
//!     println!("{user:?}");
//!
//!     context.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `xml` (default): XML serializer and deserializer backed by `quick-xml`
//! - `telemetry`: tracing subscriber helpers in [`telemetry`]

#![deny(unsafe_code)]

pub mod chain;
pub mod codec;
pub mod context;
pub mod defaults;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod execution;
pub mod proxy;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use context::{ClientContext, ClientContextBuilder};
pub use error::{ErrorCategory, ErrorKind, InvocationError};
pub use proxy::EndpointProxy;

/// Commonly used types
pub mod prelude {
    pub use crate::codec::{DeserializerRef, Lifecycle, SerializerRef};
    pub use crate::context::{ClientContext, ClientContextBuilder};
    pub use crate::endpoint::{Detachable, EndpointDefinition, Operation, ParamRole};
    pub use crate::error::{ErrorCategory, ErrorKind, InvocationError};
    pub use crate::execution::{
        ExecutionHandler, HeaderInterceptor, HttpTransport, HttpTransportConfiguration,
        Interceptor, LoggingInterceptor, ShutdownReport,
    };
    pub use crate::proxy::EndpointProxy;
    pub use crate::types::{
        Argument, ContextConfig, HeaderSlot, HttpConfig, HttpRequest, HttpResponse, Reply,
        RequestMethod, ReturnType,
    };
}
