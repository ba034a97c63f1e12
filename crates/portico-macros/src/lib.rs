//! Derive macros for Portico ports.
//!
//! `#[derive(Inputs)]` turns a request struct into an `InputPort` and
//! `#[derive(Outputs)]` turns a response struct into an `OutputPort` plus a
//! `ResponsePort`. Both emit a static field descriptor table which the port
//! reflector reads once per type.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico::prelude::*;
//!
//! #[derive(Inputs)]
//! struct ListDevicesInputs {
//!     #[req("path=tenantId")]
//!     tenant_id: String,
//!     #[req("query,style=deepObject", description = "Color filter")]
//!     color: Option<BTreeMap<String, String>>,
//!     #[req("header", required)]
//!     x_api_key: String,
//! }
//!
//! #[derive(Outputs)]
//! #[resp(error_payload = ErrorDto)]
//! struct ListDevicesOutputs {
//!     #[resp("code")]
//!     code: u16,
//!     #[resp("paging")]
//!     paging: PagingResponse,
//!     #[resp("body")]
//!     body: Vec<Device>,
//! }
//! ```
//!
//! Generated code refers to the `portico` facade crate by absolute path.

mod descriptor;
mod inputs;
mod outputs;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `InputPort` for a request struct.
///
/// Each field bound with `#[req("group[=peer][,option[=value]]*", key = value, ...)]`
/// is decoded from the request. `body` fields are deserialized with
/// `FromRequestBody`; every other group goes through `FromPortValue`.
/// Fields without `#[req]`, or tagged `#[req("-")]`, are filled with
/// `Default::default()`.
#[proc_macro_derive(Inputs, attributes(req))]
pub fn derive_inputs(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    inputs::expand_inputs(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `OutputPort` and `ResponsePort` for a response struct.
///
/// Fields are bound with `#[resp(...)]` using the `code`, `header`, `body`
/// and `paging` groups. `#[resp(error_payload = T)]` on the struct selects
/// the error body rendering of `T: ErrorPayload`.
#[proc_macro_derive(Outputs, attributes(resp))]
pub fn derive_outputs(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    outputs::expand_outputs(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
