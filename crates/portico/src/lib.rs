//! # Portico
//!
//! **Typed HTTP endpoint ports with OpenAPI 3 parameter encoding**
//!
//! Portico binds plain Rust structs to HTTP requests and responses:
//!
//! - **Ports** – `#[derive(Inputs)]` and `#[derive(Outputs)]` describe where every
//!   field lives on the wire (path, query, header, cookie, form, body, status code)
//! - **OpenAPI 3 serialization** – style and explode rules for every parameter location
//! - **Validation** – per-field schema checks reported as a failure tree
//! - **Response shaping** – status code precedence, envelopes, paging wrappers and
//!   pluggable error payloads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portico::prelude::*;
//!
//! #[derive(Inputs)]
//! struct GetDeviceInputs {
//!     #[req("path=deviceId")]
//!     device_id: String,
//! }
//!
//! #[derive(Outputs)]
//! struct GetDeviceOutputs {
//!     #[resp("body")]
//!     body: Device,
//! }
//!
//! async fn get_device(Inputs(inputs): Inputs<GetDeviceInputs>) -> anyhow::Result<GetDeviceOutputs> {
//!     Ok(GetDeviceOutputs { body: load(&inputs.device_id).await? })
//! }
//!
//! let config = ConfigLoader::new().with_env_prefix("PORTICO").load()?;
//! let endpoint = Endpoint::builder(Method::GET, "/devices/{deviceId}")
//!     .operation_id("getDevice")
//!     .handler(get_device)
//!     .build()?;
//! let pipeline = EndpointPipeline::new(Arc::new(endpoint), portico::setup::init(&config)?);
//! let response = pipeline.handle(request, PathParams::new()).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → InjectEndpoint → InjectContext → EndpointMetadata → middlewares
//!         → InjectDecoder → InjectEncoder → Request (decode + validate) → Controller
//!                                                                            ↓
//! Response ← Response (OutputsPopulator) ←──────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Port model, reflector and status errors
pub use portico_core as core;

// Request decoding, response encoding and validation
pub use portico_codec as codec;

// Endpoints, filters and the pipeline
pub use portico_endpoint as endpoint;

// Logging and response observers
pub use portico_telemetry as telemetry;

// Typed configuration
pub use portico_config as config;

// Derive macros
pub use portico_macros::{Inputs, Outputs};

pub mod setup;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use portico::prelude::*;
/// ```
pub mod prelude {
    pub use portico_core::{
        ErrorList, PathParams, Pojo, StatusCodeProvider, StatusError, ValidationFailure,
    };

    pub use portico_codec::{Content, RawBody, UploadedFile};

    pub use portico_endpoint::{
        CodedError, Endpoint, EndpointPipeline, Envelope, ErrorDto, ErrorV8, ExchangeContext,
        Extension, Filter, FnFilter, Inputs, Next, PagingResponse, PipelineConfig,
        RequestContext, RequestData, RequestDescriber, SortDirection,
    };

    pub use portico_config::{ConfigLoader, PorticoConfig};

    // Derive macros share their names with the `Inputs` extractor; they
    // live in the macro namespace.
    pub use portico_macros::{Inputs, Outputs};
}
