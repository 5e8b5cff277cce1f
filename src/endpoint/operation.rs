//! Operation declarations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::codec::{DeserializerRef, SerializerRef};
use crate::execution::http::interceptor::Interceptor;
use crate::types::{RequestMethod, ReturnType};

/// Role a positional argument plays in building the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// Substituted for `:name` in the path.
    Path(String),
    Query(String),
    /// Batch map of query parameters (`Argument::Params`).
    QueryMap,
    Form(String),
    /// Batch map of form parameters (`Argument::Params`).
    FormMap,
    /// Request header.
    Header(String),
    /// In-out parameter filled from a response header (`Argument::HeaderSlot`).
    ResponseHeader(String),
    Entity,
    /// Per-call request hook (`Argument::Interceptor`).
    Interceptor,
}

impl ParamRole {
    pub fn path(name: impl Into<String>) -> Self {
        Self::Path(name.into())
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::Query(name.into())
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::Form(name.into())
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::Header(name.into())
    }

    pub fn response_header(name: impl Into<String>) -> Self {
        Self::ResponseHeader(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Path(n)
            | Self::Query(n)
            | Self::Form(n)
            | Self::Header(n)
            | Self::ResponseHeader(n) => Some(n),
            Self::QueryMap | Self::FormMap | Self::Entity | Self::Interceptor => None,
        }
    }
}

/// Endpoint-level behavior an operation can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detachable {
    Serializer,
    Deserializer,
    Interceptors,
    /// Endpoint constant headers.
    Headers,
}

/// One declared operation of an endpoint.
///
/// Built with chained calls:
///
/// ```rust,ignore
/// let op = Operation::get("get_user", "/users/:id")
///     .param(ParamRole::path("id"))
///     .param(ParamRole::response_header("ETag"))
///     .returns(ReturnType::model::<User>());
/// ```
#[derive(Clone)]
pub struct Operation {
    name: String,
    method: RequestMethod,
    path: String,
    params: Vec<ParamRole>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    serializer: Option<SerializerRef>,
    deserializer: Option<DeserializerRef>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    detached: HashSet<Detachable>,
    asynchronous: bool,
    returns: ReturnType,
}

impl Operation {
    pub fn new(name: impl Into<String>, method: RequestMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            params: Vec::new(),
            headers: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            serializer: None,
            deserializer: None,
            interceptors: Vec::new(),
            detached: HashSet::new(),
            asynchronous: false,
            returns: ReturnType::Unit,
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Get, path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Post, path)
    }

    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Put, path)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Delete, path)
    }

    pub fn patch(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Patch, path)
    }

    pub fn head(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Head, path)
    }

    pub fn options(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Options, path)
    }

    pub fn trace(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, RequestMethod::Trace, path)
    }

    /// Declares the role of the next positional argument.
    pub fn param(mut self, role: ParamRole) -> Self {
        self.params.push(role);
        self
    }

    pub fn param_roles(mut self, roles: Vec<ParamRole>) -> Self {
        self.params.extend(roles);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_const(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn form_const(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn serializer(mut self, serializer: SerializerRef) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn deserializer(mut self, deserializer: DeserializerRef) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn detach(mut self, what: Detachable) -> Self {
        self.detached.insert(what);
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = returns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[ParamRole] {
        &self.params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_constants(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form_constants(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn serializer_ref(&self) -> Option<&SerializerRef> {
        self.serializer.as_ref()
    }

    pub fn deserializer_ref(&self) -> Option<&DeserializerRef> {
        self.deserializer.as_ref()
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn is_detached(&self, what: Detachable) -> bool {
        self.detached.contains(&what)
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.returns
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("serializer", &self.serializer)
            .field("deserializer", &self.deserializer)
            .field("interceptors", &self.interceptors.len())
            .field("detached", &self.detached)
            .field("asynchronous", &self.asynchronous)
            .field("returns", &self.returns)
            .finish()
    }
}
