//! Traits implemented by request and response port structs.
//!
//! `#[derive(Inputs)]` and `#[derive(Outputs)]` generate these impls. They
//! can also be written by hand:
//!
//! ```
//! use portico_codec::port::{ExtractedValue, OutputPort};
//! use portico_codec::{CodecResult, IntoPortValue};
//! use portico_core::{FieldDescriptor, FieldShape, PortDescriptor, PortField};
//!
//! struct Created {
//!     code: u16,
//! }
//!
//! static FIELDS: [FieldDescriptor; 1] =
//!     [FieldDescriptor::new("code", "code", FieldShape::Primitive, false)];
//! static DESCRIPTOR: PortDescriptor = PortDescriptor { type_name: "Created", fields: &FIELDS };
//!
//! impl OutputPort for Created {
//!     fn descriptor() -> &'static PortDescriptor {
//!         &DESCRIPTOR
//!     }
//!
//!     fn extract(&self, field: &PortField) -> CodecResult<ExtractedValue> {
//!         match field.name.as_str() {
//!             "code" => self.code.to_port_value(),
//!             _ => Ok(ExtractedValue::Absent),
//!         }
//!     }
//! }
//!
//! let port = Created::port().unwrap();
//! assert!(port.field("code").is_some());
//! ```

use crate::convert::{IntoResponseBody, PagingWrapper};
use crate::decoder::RequestDecoder;
use crate::sink::ResponseBody;
use crate::CodecResult;
use portico_core::{Pojo, Port, PortCache, PortDescriptor, PortDirection, PortError};
use serde_json::Value;
use std::any::TypeId;
use std::sync::Arc;

/// A request struct populated from a decoded request.
pub trait InputPort: Sized + Send + 'static {
    /// Static field descriptors.
    fn descriptor() -> &'static PortDescriptor;

    /// Reflected port, cached per type.
    fn port() -> Result<Arc<Port>, PortError> {
        PortCache::global().get_or_reflect::<Self>(PortDirection::In, Self::descriptor())
    }

    /// Builds the struct from request data.
    fn populate(port: &Port, decoder: &RequestDecoder<'_>) -> CodecResult<Self>;
}

/// A response struct read field by field by the outputs populator.
pub trait OutputPort: Send + 'static {
    /// Static field descriptors.
    fn descriptor() -> &'static PortDescriptor
    where
        Self: Sized;

    /// Reflected port, cached per type.
    fn port() -> Result<Arc<Port>, PortError>
    where
        Self: Sized,
    {
        PortCache::global().get_or_reflect::<Self>(PortDirection::Out, Self::descriptor())
    }

    /// Returns the wire value of one reflected field.
    fn extract(&self, field: &portico_core::PortField) -> CodecResult<ExtractedValue>;
}

/// `()` is the empty output: no headers, no body.
impl OutputPort for () {
    fn descriptor() -> &'static PortDescriptor {
        static EMPTY: PortDescriptor = PortDescriptor {
            type_name: "()",
            fields: &[],
        };
        &EMPTY
    }

    fn extract(&self, _field: &portico_core::PortField) -> CodecResult<ExtractedValue> {
        Ok(ExtractedValue::Absent)
    }
}

/// A value extracted from an output field.
#[derive(Debug)]
pub enum ExtractedValue {
    /// The field holds no value.
    Absent,
    /// A single value.
    Primitive(String),
    /// A list of values.
    Array(Vec<String>),
    /// A string keyed map.
    Object(Pojo),
    /// The response body and the Rust type it came from.
    Body {
        /// Serialized body.
        body: ResponseBody,
        /// Type of the body field.
        type_id: TypeId,
    },
    /// A paging wrapper with the member the body is injected into.
    Paging {
        /// Serialized wrapper.
        value: Value,
        /// Member receiving the body.
        content_field: &'static str,
    },
}

impl ExtractedValue {
    /// Extracts a body field.
    pub fn body<T: IntoResponseBody + 'static>(value: &T) -> CodecResult<Self> {
        Ok(Self::Body {
            body: value.to_response_body()?,
            type_id: TypeId::of::<T>(),
        })
    }

    /// Extracts a paging field.
    pub fn paging<P: PagingWrapper>(value: &P) -> CodecResult<Self> {
        if !value.is_present() {
            return Ok(Self::Absent);
        }
        Ok(Self::Paging {
            value: serde_json::to_value(value)?,
            content_field: P::content_field(),
        })
    }

    /// Returns true for [`ExtractedValue::Absent`].
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::IntoPortValue;
    use portico_core::{FieldDescriptor, FieldShape, PortField};
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Page {
        size: u32,
    }

    impl PagingWrapper for Page {
        fn content_field() -> &'static str {
            "content"
        }
    }

    #[test]
    fn test_paging_extraction() {
        let value = ExtractedValue::paging(&Page { size: 5 }).unwrap();
        assert!(matches!(
            value,
            ExtractedValue::Paging { value, content_field: "content" } if value == json!({"size": 5})
        ));
        assert!(ExtractedValue::paging(&Option::<Page>::None).unwrap().is_absent());
    }

    #[test]
    fn test_body_records_type() {
        let value = ExtractedValue::body(&vec![1, 2]).unwrap();
        assert!(matches!(
            value,
            ExtractedValue::Body { type_id, .. } if type_id == TypeId::of::<Vec<i32>>()
        ));
    }

    struct Headers {
        request_id: String,
    }

    static FIELDS: [FieldDescriptor; 1] = [FieldDescriptor::new(
        "request_id",
        "header",
        FieldShape::Primitive,
        false,
    )];
    static DESCRIPTOR: PortDescriptor = PortDescriptor {
        type_name: "Headers",
        fields: &FIELDS,
    };

    impl OutputPort for Headers {
        fn descriptor() -> &'static PortDescriptor {
            &DESCRIPTOR
        }

        fn extract(&self, field: &PortField) -> CodecResult<ExtractedValue> {
            match field.name.as_str() {
                "request_id" => self.request_id.to_port_value(),
                _ => Ok(ExtractedValue::Absent),
            }
        }
    }

    #[test]
    fn test_output_port_reflection_is_cached() {
        let first = Headers::port().unwrap();
        let second = Headers::port().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fields()[0].peer, "Request-Id");

        let headers = Headers {
            request_id: "abc".into(),
        };
        assert!(matches!(
            headers.extract(&first.fields()[0]).unwrap(),
            ExtractedValue::Primitive(text) if text == "abc"
        ));
        assert!(<() as OutputPort>::port().unwrap().fields().is_empty());
    }
}
