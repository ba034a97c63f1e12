//! # Portico Codec
//!
//! Wire encoding for Portico ports: the OpenAPI 3 parameter serialization
//! matrix in both directions, body content handling and request validation.
//!
//! ## Overview
//!
//! | Component | Direction | Purpose |
//! |-----------|-----------|---------|
//! | [`HttpRequestDataSource`] | in | headers, cookies, query, path parameters, form, body |
//! | [`RequestDecoder`] | in | raw field values by group, style and explode |
//! | [`RequestValidator`] | in | per-field schema validation with a failure tree |
//! | [`ResponseEncoder`] | out | headers, status, media type and body |
//! | [`HttpResponseSink`] | out | builds the `http::Response` |
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{HeaderMap, Method, Uri};
//! use portico_codec::{HttpRequestDataSource, MultipartConfig, RequestDecoder};
//! use portico_core::{FieldGroup, FieldShape, PathParams, PortField};
//!
//! let source = HttpRequestDataSource::new(
//!     Method::GET,
//!     Uri::from_static("/devices?color[R]=100&color[G]=200"),
//!     HeaderMap::new(),
//!     Bytes::new(),
//!     PathParams::new(),
//!     MultipartConfig::default(),
//! );
//! let field = PortField::new("color", "color", FieldGroup::Query, FieldShape::Object, true)
//!     .with_option("style", "deepObject");
//!
//! let color = RequestDecoder::new(&source).decode_object(&field).unwrap().unwrap();
//! assert_eq!(color["R"], "100");
//! ```

#![doc(html_root_url = "https://docs.rs/portico-codec/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod content;
pub mod convert;
pub mod cookie;
pub mod decoder;
pub mod encoder;
mod error;
pub mod form;
pub mod port;
pub mod schema;
pub mod sink;
pub mod source;
pub mod validate;

pub use content::{
    Content, ContentEncoding, ContentOptions, MEDIA_TYPE_FORM_URLENCODED, MEDIA_TYPE_JSON,
    MEDIA_TYPE_MULTIPART_FORM, MEDIA_TYPE_OCTET_STREAM, MEDIA_TYPE_TEXT, MEDIA_TYPE_XML,
};
pub use convert::{
    FromPortValue, FromRequestBody, IntoPortValue, IntoResponseBody, PagingWrapper,
    PortFieldType, RawBody,
};
pub use cookie::Cookie;
pub use decoder::{DecodedValue, RequestDecoder};
pub use encoder::ResponseEncoder;
pub use error::{CodecError, CodecResult};
pub use form::{FormData, MultiValues, MultipartConfig, UploadedFile};
pub use port::{ExtractedValue, InputPort, OutputPort};
pub use schema::{JsonSchema, SchemaViolation, ValidationSchema};
pub use sink::{HttpResponseSink, ResponseBody, ResponseDataSink};
pub use source::{HttpRequestDataSource, RequestDataSource};
pub use validate::{
    ensure_schema_resolver, register_schema_resolver, registered_schema_resolver,
    BaggageSchemaResolver, FieldValidationSchema, RequestValidator, SchemaResolver,
};

/// Codec defaults applied per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// Body media type assumed when `Content-Type` is absent.
    pub default_content_type: String,
    /// Body encoding assumed when `Content-Encoding` is absent.
    pub default_content_encoding: String,
    /// Form parsing limits.
    pub multipart: MultipartConfig,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            default_content_type: MEDIA_TYPE_JSON.to_string(),
            default_content_encoding: String::new(),
            multipart: MultipartConfig::default(),
        }
    }
}
