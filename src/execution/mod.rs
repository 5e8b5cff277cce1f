//! Execution layer
//!
//! Dispatches built requests through transports (`http`), reports outcomes
//! to an [`ExecutionHandler`] (`executor`) and runs asynchronous invocations
//! on a bounded pool (`worker`).

pub mod executor;
pub mod http;
pub mod worker;

pub use executor::{ExecutionHandler, LoggingExecutionHandler, RequestExecutor};
pub use http::interceptor::{HeaderInterceptor, Interceptor, LoggingInterceptor};
pub use http::registry::{HttpTransportConfiguration, TransportConfiguration, TransportRegistry};
pub use http::session::{SessionContext, SessionStore};
pub use http::transport::{HttpTransport, ReqwestTransport};
pub use worker::{AsyncWorkerPool, ShutdownReport};
