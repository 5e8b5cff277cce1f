//! Core data types: request methods, request and response objects, argument
//! values, return types and configuration.

mod argument;
mod config;
mod http;
mod method;
mod reply;

pub use argument::{Argument, HeaderSlot, ModelEntity, StreamSource};
pub use config::{ContextConfig, ContextConfigBuilder, HttpConfig, HttpConfigBuilder};
pub use http::{HttpRequest, HttpResponse, RequestBody, ResponseBody};
pub use method::RequestMethod;
pub use reply::{ModelType, Reply, ReturnType};
