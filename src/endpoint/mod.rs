//! Declarative route table.
//!
//! An [`EndpointDefinition`] describes one remote API: where it lives, what
//! every request to it shares, and its closed set of [`Operation`]s. Each
//! operation maps its positional arguments to request parts through
//! [`ParamRole`]s.
//!
//! ```rust,ignore
//! let users = EndpointDefinition::builder("Users")
//!     .host("api.example.com")
//!     .scheme("https")
//!     .path("/v1")
//!     .header("Accept", "application/json")
//!     .deserializer(DeserializerRef::json())
//!     .operation(
//!         Operation::get("get_user", "/users/:id")
//!             .param(ParamRole::path("id"))
//!             .returns(ReturnType::model::<User>()),
//!     )
//!     .build()?;
//! ```

mod definition;
mod operation;
mod validation;

pub use definition::{EndpointBuilder, EndpointDefinition};
pub use operation::{Detachable, Operation, ParamRole};
