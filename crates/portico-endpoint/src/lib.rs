//! # Portico Endpoint
//!
//! Binds handlers, port types and documentation metadata into an
//! [`Endpoint`], and runs each HTTP request through a fixed filter chain:
//!
//! ```text
//! InjectEndpoint → InjectContext → EndpointMetadata → middlewares
//!   → InjectDecoder → InjectEncoder → Response ⟲ → Request → Controller
//! ```
//!
//! The request side decodes and validates the input port before the handler
//! runs; the response side hands the handler outputs or error to the
//! [`OutputsPopulator`], which resolves the status code, wraps bodies in an
//! [`Envelope`] or [`PagingResponse`] when declared, and renders errors with
//! the endpoint's [`ErrorBodyStrategy`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use portico_endpoint::{Endpoint, EndpointPipeline, Inputs, PipelineConfig};
//!
//! async fn get_device(Inputs(inputs): Inputs<GetDeviceInputs>) -> anyhow::Result<GetDeviceOutputs> {
//!     Ok(GetDeviceOutputs { body: load(&inputs.device_id).await? })
//! }
//!
//! let endpoint = Endpoint::builder(http::Method::GET, "/devices/{deviceId}")
//!     .operation_id("getDevice")
//!     .handler(get_device)
//!     .build()?;
//! let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());
//! ```

#![doc(html_root_url = "https://docs.rs/portico-endpoint/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codes;
pub mod context;
pub mod convert;
pub mod describe;
pub mod endpoint;
pub mod envelope;
mod error;
pub mod errors;
pub mod filter;
pub mod handler;
pub mod paging;
pub mod pipeline;
pub mod populate;
pub mod request;
pub mod response;
pub mod status;

pub use codes::{default_response_codes, standard_error_codes, ResponseCodes};
pub use context::{ExchangeContext, RequestContext, RequiredPermissions, REQUEST_ID_HEADER};
pub use convert::{
    convert_error, DefaultErrorStatusCoder, ErrorConverter, ErrorStatusCoder,
    ErrorStatusCoderConverter,
};
pub use describe::RequestDescriber;
pub use endpoint::{
    register_endpoint, registered_endpoints, ContextInjector, Endpoint, EndpointArchetype,
    EndpointBuilder, InputBinding, OutputBinding, ResponsePort,
};
pub use envelope::{Envelope, Throwable};
pub use error::EndpointError;
pub use errors::{
    CodedError, ErrorApplier, ErrorBodyStrategy, ErrorCoder, ErrorDto, ErrorPayload, ErrorRaw,
    ErrorV8,
};
pub use filter::{BoxFuture, Filter, FnFilter, Next};
pub use handler::{
    Extension, FromExchange, Handler, HandlerResult, Inputs, IntoHandlerResult, RequestData,
};
pub use paging::{PagingResponse, SortDirection};
pub use pipeline::{EndpointPipeline, PathTemplate, PipelineConfig};
pub use populate::OutputsPopulator;
pub use request::{
    cookie_parameter, header_parameter, path_parameter, query_parameter, EndpointRequest,
    EndpointRequestBody, EndpointRequestBodyFormField, EndpointRequestParameter, PortValidator,
};
pub use response::{EndpointResponse, EndpointResponseContent, EndpointResponseHeader};
pub use status::{spring_status_code, spring_status_name};
