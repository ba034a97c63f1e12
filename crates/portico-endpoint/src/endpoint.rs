//! The endpoint model and its builder.
//!
//! An [`Endpoint`] binds an HTTP method and path template to a handler and
//! to the reflected input and output ports of that handler. It is built once
//! at startup and shared read-only by every request afterward.
//!
//! # Example
//!
//! ```rust,ignore
//! let endpoint = Endpoint::builder(Method::GET, "/api/v1/devices/{deviceId}")
//!     .operation_id("getDevice")
//!     .summary("Retrieve a device")
//!     .permission_any_of(["VIEW_DEVICES"])
//!     .handler(get_device)
//!     .build()?;
//! ```

use crate::codes::{default_response_codes, ResponseCodes};
use crate::context::ExchangeContext;
use crate::convert::ErrorConverter;
use crate::errors::{ErrorBodyStrategy, ErrorPayload, ErrorV8};
use crate::filter::Filter;
use crate::handler::{ErasedHandler, Handler, HandlerService};
use crate::pipeline::PathTemplate;
use crate::request::{EndpointRequest, EndpointRequestParameter, PortValidator};
use crate::response::{EndpointResponse, EndpointResponseHeader};
use crate::EndpointError;
use http::Method;
use parking_lot::Mutex;
use portico_codec::{CodecResult, InputPort, OutputPort, RequestDecoder};
use portico_core::{Port, PortError};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Type-erased access to an [`InputPort`] implementation.
#[derive(Clone, Copy)]
pub struct InputBinding {
    type_id: TypeId,
    type_name: &'static str,
    port: fn() -> Result<Arc<Port>, PortError>,
    populate: fn(&Port, &RequestDecoder<'_>) -> CodecResult<Box<dyn Any + Send>>,
}

impl InputBinding {
    /// Binds `T`.
    #[must_use]
    pub fn of<T: InputPort>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            port: T::port,
            populate: populate_boxed::<T>,
        }
    }

    /// Returns the bound type id.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the bound type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Reflects the port of the bound type.
    pub fn port(&self) -> Result<Arc<Port>, PortError> {
        (self.port)()
    }

    /// Builds the bound type from request data.
    pub fn populate(
        &self,
        port: &Port,
        decoder: &RequestDecoder<'_>,
    ) -> CodecResult<Box<dyn Any + Send>> {
        (self.populate)(port, decoder)
    }
}

fn populate_boxed<T: InputPort>(
    port: &Port,
    decoder: &RequestDecoder<'_>,
) -> CodecResult<Box<dyn Any + Send>> {
    let inputs: Box<dyn Any + Send> = Box::new(T::populate(port, decoder)?);
    Ok(inputs)
}

impl fmt::Debug for InputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputBinding").field(&self.type_name).finish()
    }
}

/// Output ports usable as handler results.
///
/// `#[derive(Outputs)]` implements this, reporting the error payload
/// declared with `#[resp(error_payload = ...)]`.
pub trait ResponsePort: OutputPort + Sized {
    /// Error payload strategy declared by the port.
    fn error_payload() -> Option<ErrorBodyStrategy> {
        None
    }
}

impl ResponsePort for () {}

/// Type-erased access to a [`ResponsePort`] implementation.
#[derive(Clone, Copy)]
pub struct OutputBinding {
    type_name: &'static str,
    port: fn() -> Result<Arc<Port>, PortError>,
    error_payload: fn() -> Option<ErrorBodyStrategy>,
}

impl OutputBinding {
    /// Binds `O`.
    #[must_use]
    pub fn of<O: ResponsePort>() -> Self {
        Self {
            type_name: std::any::type_name::<O>(),
            port: O::port,
            error_payload: O::error_payload,
        }
    }

    /// Returns the bound type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Reflects the port of the bound type.
    pub fn port(&self) -> Result<Arc<Port>, PortError> {
        (self.port)()
    }

    /// Returns the declared error payload strategy.
    #[must_use]
    pub fn error_payload(&self) -> Option<ErrorBodyStrategy> {
        (self.error_payload)()
    }
}

impl fmt::Debug for OutputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OutputBinding").field(&self.type_name).finish()
    }
}

/// Runs against the exchange before middlewares, typically inserting
/// extensions.
pub type ContextInjector = Arc<dyn Fn(&mut ExchangeContext) + Send + Sync>;

/// Common endpoint shapes, each with a method and response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointArchetype {
    /// `GET` a collection.
    List,
    /// `GET` one resource.
    Retrieve,
    /// `POST` a new resource.
    Create,
    /// `PUT` a resource.
    Update,
    /// `DELETE` a resource, answering `204`.
    Delete,
    /// `POST` a synchronous command.
    Command,
    /// `POST` a command answered with `202`.
    AsyncCommand,
}

impl EndpointArchetype {
    /// Request method.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::List | Self::Retrieve => Method::GET,
            Self::Create | Self::Command | Self::AsyncCommand => Method::POST,
            Self::Update => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }

    /// Declared response codes.
    #[must_use]
    pub fn codes(self) -> ResponseCodes {
        match self {
            Self::List => ResponseCodes::LIST,
            Self::Retrieve | Self::Command => ResponseCodes::GET,
            Self::Create => ResponseCodes::CREATE,
            Self::Update => ResponseCodes::UPDATE,
            Self::Delete => ResponseCodes::NO_CONTENT,
            Self::AsyncCommand => ResponseCodes::ACCEPT,
        }
    }
}

/// A bound HTTP operation.
#[derive(Clone)]
pub struct Endpoint {
    /// Request method.
    pub method: Method,
    /// Path template, e.g. `/devices/{deviceId}`.
    pub path: String,
    /// Operation id.
    pub operation_id: String,
    /// Dedented description.
    pub description: String,
    /// One line summary.
    pub summary: String,
    /// Documentation tags.
    pub tags: Vec<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
    /// Permissions, any of which grants access.
    pub permissions: Vec<String>,
    /// Request description.
    pub request: EndpointRequest,
    /// Response description.
    pub response: EndpointResponse,
    /// How error bodies are rendered.
    pub error_body: ErrorBodyStrategy,
    handler: Arc<dyn ErasedHandler>,
    error_converter: Option<Arc<dyn ErrorConverter>>,
    middlewares: Vec<Arc<dyn Filter>>,
    context_injectors: Vec<ContextInjector>,
    template: PathTemplate,
}

impl Endpoint {
    /// Starts building an endpoint.
    pub fn builder(method: Method, path: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(method, path.into())
    }

    /// Starts building an endpoint of a common shape.
    pub fn archetype(archetype: EndpointArchetype, path: impl Into<String>) -> EndpointBuilder {
        Self::builder(archetype.method(), path).response_codes(archetype.codes())
    }

    /// Returns the compiled path template.
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Returns the user middlewares in order.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Filter>] {
        &self.middlewares
    }

    pub(crate) fn context_injectors(&self) -> &[ContextInjector] {
        &self.context_injectors
    }

    pub(crate) fn error_converter(&self) -> Option<&dyn ErrorConverter> {
        self.error_converter.as_deref()
    }

    pub(crate) fn handler(&self) -> &dyn ErasedHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_id", &self.operation_id)
            .field("permissions", &self.permissions)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("error_body", &self.error_body)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

struct BoundHandler {
    handler: Arc<dyn ErasedHandler>,
    inputs: Option<InputBinding>,
    outputs: OutputBinding,
}

/// Builder for [`Endpoint`].
pub struct EndpointBuilder {
    method: Method,
    path: String,
    operation_id: String,
    description: String,
    summary: String,
    tags: Vec<String>,
    deprecated: bool,
    permissions: Vec<String>,
    request: EndpointRequest,
    response: EndpointResponse,
    inputs: Option<InputBinding>,
    outputs: Option<OutputBinding>,
    validator_type: Option<(TypeId, &'static str)>,
    error_payload: Option<ErrorBodyStrategy>,
    error_converter: Option<Arc<dyn ErrorConverter>>,
    middlewares: Vec<Arc<dyn Filter>>,
    context_injectors: Vec<ContextInjector>,
    handler: Option<BoundHandler>,
}

impl EndpointBuilder {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            operation_id: String::new(),
            description: String::new(),
            summary: String::new(),
            tags: Vec::new(),
            deprecated: false,
            permissions: Vec::new(),
            request: EndpointRequest::new(),
            response: EndpointResponse::new(),
            inputs: None,
            outputs: None,
            validator_type: None,
            error_payload: None,
            error_converter: None,
            middlewares: Vec::new(),
            context_injectors: Vec::new(),
            handler: None,
        }
    }

    /// Sets the operation id.
    #[must_use]
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = operation_id.into();
        self
    }

    /// Sets the description, removing common leading indentation.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = dedent(description);
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Appends tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Marks the operation deprecated.
    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Replaces the required permissions; any one grants access.
    #[must_use]
    pub fn permission_any_of<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the request description.
    #[must_use]
    pub fn request(mut self, request: EndpointRequest) -> Self {
        self.request = request;
        self
    }

    /// Adds or replaces a request parameter.
    #[must_use]
    pub fn request_parameter(mut self, parameter: EndpointRequestParameter) -> Self {
        self.request = self.request.with_parameter(parameter);
        self
    }

    /// Installs a validator run against the populated inputs.
    #[must_use]
    pub fn validator<T, F>(mut self, validator: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let validator: PortValidator = Arc::new(move |inputs| match inputs.downcast_ref::<T>() {
            Some(inputs) => validator(inputs),
            None => Err(anyhow::anyhow!("validator for {type_name} received other inputs")),
        });
        self.request = self.request.with_validator(validator);
        self.validator_type = Some((TypeId::of::<T>(), type_name));
        self
    }

    /// Replaces the response description.
    #[must_use]
    pub fn response(mut self, response: EndpointResponse) -> Self {
        self.response = response;
        self
    }

    /// Sets the declared response codes.
    #[must_use]
    pub fn response_codes(mut self, codes: ResponseCodes) -> Self {
        self.response = self.response.with_response_codes(codes);
        self
    }

    /// Adds a success response header.
    #[must_use]
    pub fn response_success_header(
        mut self,
        name: impl Into<String>,
        header: EndpointResponseHeader,
    ) -> Self {
        self.response = self.response.with_success_header(name, header);
        self
    }

    /// Adds an error response header.
    #[must_use]
    pub fn response_error_header(
        mut self,
        name: impl Into<String>,
        header: EndpointResponseHeader,
    ) -> Self {
        self.response = self.response.with_error_header(name, header);
        self
    }

    /// Adds a header to success and error responses.
    #[must_use]
    pub fn response_header(mut self, name: impl Into<String>, header: EndpointResponseHeader) -> Self {
        self.response = self.response.with_header(name, header);
        self
    }

    /// Wraps success and error bodies in an envelope.
    #[must_use]
    pub fn envelope(mut self, envelope: bool) -> Self {
        self.response = self.response.with_envelope(envelope);
        self
    }

    /// Declares the error payload type.
    #[must_use]
    pub fn error_payload<T: ErrorPayload>(mut self) -> Self {
        self.error_payload = Some(T::error_strategy());
        self.response = self.response.with_error_payload::<T>();
        self
    }

    /// Declares the input port, overriding the one bound by the handler.
    #[must_use]
    pub fn inputs<I: InputPort>(mut self) -> Self {
        self.inputs = Some(InputBinding::of::<I>());
        self
    }

    /// Declares the output port, overriding the one returned by the handler.
    #[must_use]
    pub fn outputs<O: ResponsePort>(mut self) -> Self {
        self.outputs = Some(OutputBinding::of::<O>());
        self
    }

    /// Converts handler errors into status-bearing errors.
    #[must_use]
    pub fn error_converter(mut self, converter: impl ErrorConverter + 'static) -> Self {
        self.error_converter = Some(Arc::new(converter));
        self
    }

    /// Appends a middleware, run after metadata is applied and before the
    /// request is decoded.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Filter + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends a context injector.
    #[must_use]
    pub fn context_injector<F>(mut self, injector: F) -> Self
    where
        F: Fn(&mut ExchangeContext) + Send + Sync + 'static,
    {
        self.context_injectors.push(Arc::new(injector));
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler<H, Args>(mut self, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        self.handler = Some(BoundHandler {
            handler: Arc::new(HandlerService::new(handler)),
            inputs: H::input_binding(),
            outputs: OutputBinding::of::<H::Outputs>(),
        });
        self
    }

    /// Reflects the ports and builds the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::NoHandler`] without a handler,
    /// [`EndpointError::ValidatorMismatch`] when the validator does not take
    /// the bound inputs, and
    /// [`EndpointError::Port`] or [`EndpointError::InvalidPath`] when a port
    /// or the path template is invalid.
    pub fn build(self) -> Result<Endpoint, EndpointError> {
        let Some(bound) = self.handler else {
            return Err(EndpointError::NoHandler {
                operation: self.operation_id,
            });
        };

        let inputs = self.inputs.or(bound.inputs);
        if let Some((expected, validator)) = self
            .validator_type
            .filter(|_| self.request.validator.is_some())
        {
            if inputs.map(|binding| binding.type_id()) != Some(expected) {
                return Err(EndpointError::ValidatorMismatch {
                    operation: self.operation_id,
                    validator,
                    inputs: inputs.map(|binding| binding.type_name()),
                });
            }
        }

        let mut request = self.request;
        if let Some(inputs) = inputs {
            request = request.with_inputs(inputs)?;
        }

        let mut response = self
            .response
            .with_outputs(self.outputs.unwrap_or(bound.outputs))?;
        if response.codes.success.is_empty() && response.codes.error.is_empty() {
            response.codes = default_response_codes(&self.method);
        }

        let error_body = if response.envelope {
            ErrorBodyStrategy::Envelope
        } else {
            response
                .error_payload
                .or(self.error_payload)
                .unwrap_or_else(ErrorBodyStrategy::applier::<ErrorV8>)
        };

        let template = PathTemplate::parse(&self.path)?;

        Ok(Endpoint {
            method: self.method,
            path: self.path,
            operation_id: self.operation_id,
            description: self.description,
            summary: self.summary,
            tags: self.tags,
            deprecated: self.deprecated,
            permissions: self.permissions,
            request,
            response,
            error_body,
            handler: bound.handler,
            error_converter: self.error_converter,
            middlewares: self.middlewares,
            context_injectors: self.context_injectors,
            template,
        })
    }
}

impl fmt::Debug for EndpointBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_id", &self.operation_id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Removes the indentation shared by all non-blank lines and trims
/// surrounding blank lines.
pub(crate) fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

fn registry() -> &'static Mutex<Vec<Arc<Endpoint>>> {
    static REGISTRY: OnceLock<Mutex<Vec<Arc<Endpoint>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Records an endpoint for documentation generation.
pub fn register_endpoint(endpoint: &Arc<Endpoint>) {
    tracing::debug!(
        operation_id = %endpoint.operation_id,
        http.method = %endpoint.method,
        http.path = %endpoint.path,
        "Endpoint registered"
    );
    registry().lock().push(Arc::clone(endpoint));
}

/// Snapshot of every registered endpoint, in registration order.
#[must_use]
pub fn registered_endpoints() -> Vec<Arc<Endpoint>> {
    registry().lock().clone()
}
