//! # Portico Core
//!
//! Shared model for the Portico declarative HTTP binding engine.
//!
//! This crate owns the pieces every other Portico crate builds on:
//!
//! - [`PortField`] / [`Port`] - the reflected description of an operation's
//!   request or response struct
//! - [`PortReflector`] / [`HttpPortReflector`] - turns static field
//!   descriptors into validated ports
//! - [`Baggage`] - typed side table attached to each field
//! - [`StatusError`] / [`StatusCodeProvider`] - status-bearing errors
//! - [`ValidationFailure`] - per-field validation failure tree
//! - [`ErrorStatusRegistry`] - process-wide error to status code map
//! - [`ResponseObserver`] - completion hook fired once per response

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod baggage;
pub mod case;
mod error;
mod field;
mod observer;
mod params;
pub mod port;
pub mod reflect;
mod registry;

pub use baggage::Baggage;
pub use error::{ErrorList, PortError, StatusCodeProvider, StatusError, ValidationFailure};
pub use field::{FieldDescriptor, FieldGroup, FieldShape, FieldStyle, PortField};
pub use observer::{CompositeResponseObserver, ObservedExchange, ResponseObserver};
pub use params::PathParams;
pub use port::{Port, PortDescriptor, PortDirection};
pub use reflect::{
    register_field_post_processor, Cardinality, FieldGroupRule, HttpPortReflector, PortCache,
    PortReflector,
};
pub use registry::{register_error_status, ErrorStatusRegistry};

/// Plain JSON object used for object-shaped values and free-form payloads.
pub type Pojo = serde_json::Map<String, serde_json::Value>;
