//! Response side of an endpoint: codes, content, headers and error payload.

use crate::codes::ResponseCodes;
use crate::endpoint::OutputBinding;
use crate::errors::{ErrorBodyStrategy, ErrorPayload};
use portico_codec::MEDIA_TYPE_JSON;
use portico_core::port::{is_code, is_header, is_paging};
use portico_core::{FieldGroup, Port, PortError, PortField};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Response description of an endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointResponse {
    /// Declared status codes.
    pub codes: ResponseCodes,
    /// Whether bodies are wrapped in an [`Envelope`](crate::Envelope).
    pub envelope: bool,
    /// Content of success responses.
    pub success: EndpointResponseContent,
    /// Content of error responses.
    pub error: EndpointResponseContent,
    /// Reflected output port.
    pub port: Option<Arc<Port>>,
    /// Declared error payload strategy.
    pub error_payload: Option<ErrorBodyStrategy>,
}

impl EndpointResponse {
    /// Creates an empty response description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the envelope flag. Enveloped errors render as the envelope, so
    /// any declared error payload is dropped.
    #[must_use]
    pub fn with_envelope(mut self, envelope: bool) -> Self {
        self.envelope = envelope;
        if envelope {
            self.error_payload = None;
        }
        self
    }

    /// Sets the declared codes.
    #[must_use]
    pub fn with_response_codes(mut self, codes: ResponseCodes) -> Self {
        self.codes = codes;
        self
    }

    /// Sets a success payload, defaulting both media types to JSON.
    #[must_use]
    pub fn with_success_payload(mut self, payload: Value) -> Self {
        if self.success.mime.is_empty() {
            self.success.mime = MEDIA_TYPE_JSON.to_string();
            self.error.mime = MEDIA_TYPE_JSON.to_string();
        }
        self.success.payload = Some(payload);
        self
    }

    /// Declares the error payload type.
    #[must_use]
    pub fn with_error_payload<T: ErrorPayload>(mut self) -> Self {
        self.error_payload = Some(T::error_strategy());
        if self.error.mime.is_empty() {
            self.error.mime = MEDIA_TYPE_JSON.to_string();
        }
        self
    }

    /// Sets both media types.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.success.mime = mime.clone();
        self.error.mime = mime;
        self
    }

    /// Adds a header to success responses.
    #[must_use]
    pub fn with_success_header(mut self, name: impl Into<String>, header: EndpointResponseHeader) -> Self {
        self.success.headers.insert(name.into(), header);
        self
    }

    /// Adds a header to error responses.
    #[must_use]
    pub fn with_error_header(mut self, name: impl Into<String>, header: EndpointResponseHeader) -> Self {
        self.error.headers.insert(name.into(), header);
        self
    }

    /// Adds a header to both success and error responses.
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, header: EndpointResponseHeader) -> Self {
        let name = name.into();
        self.with_success_header(name.clone(), header.clone())
            .with_error_header(name, header)
    }

    /// Reflects the output port and derives content, headers and codes from
    /// its fields.
    pub fn with_outputs(mut self, binding: OutputBinding) -> Result<Self, PortError> {
        let port = binding.port()?;
        if let Some(strategy) = binding.error_payload() {
            self.error_payload = Some(strategy);
        }
        for field in port.fields() {
            self = self.with_port_field(field);
        }
        self.port = Some(port);
        if self.envelope {
            self.error_payload = None;
        }
        Ok(self)
    }

    fn with_port_field(mut self, field: &PortField) -> Self {
        if field.group == FieldGroup::Body {
            if field.bool_option("envelope") == Some(true) {
                self = self.with_envelope(true);
            }
            if field.bool_option("error") == Some(true) {
                self.error = self.error.with_body_field(field);
            } else {
                self.success = self.success.with_body_field(field);
            }
        } else if is_code(field) {
            if let Some(values) = field.option("enum").filter(|values| !values.is_empty()) {
                self.codes = ResponseCodes::from_enum(values);
            }
        } else if is_header(field) {
            let header = EndpointResponseHeader::from_port_field(field);
            if field.bool_option("error") != Some(true) {
                self = self.with_success_header(field.peer.clone(), header.clone());
            }
            if field.bool_option("success") != Some(true) {
                self = self.with_error_header(field.peer.clone(), header);
            }
        } else if is_paging(field) {
            self.success = self.success.with_paging_field(field);
        }
        self
    }

    /// Returns true when either content declares a media type.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.success.mime.is_empty() || !self.error.mime.is_empty()
    }

    /// Distinct non-empty media types produced.
    #[must_use]
    pub fn produces(&self) -> Vec<String> {
        let mut mimes: Vec<String> = [&self.success.mime, &self.error.mime]
            .into_iter()
            .filter(|mime| !mime.is_empty())
            .cloned()
            .collect();
        mimes.sort();
        mimes.dedup();
        mimes
    }
}

/// Success or error content of a response.
#[derive(Debug, Clone, Default)]
pub struct EndpointResponseContent {
    /// Media type; empty when there is no body.
    pub mime: String,
    /// Headers keyed by wire name.
    pub headers: BTreeMap<String, EndpointResponseHeader>,
    /// Body field of the output port.
    pub body: Option<PortField>,
    /// Paging field of the output port.
    pub paging: Option<PortField>,
    /// Static payload written when there is no body field.
    pub payload: Option<Value>,
    /// Example body.
    pub example: Option<Value>,
}

impl EndpointResponseContent {
    /// Sets the media type.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// Sets the example.
    #[must_use]
    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    fn with_body_field(mut self, field: &PortField) -> Self {
        self.mime = field_mime(field);
        self.body = Some(field.clone());
        self
    }

    fn with_paging_field(mut self, field: &PortField) -> Self {
        self.mime = field_mime(field);
        self.paging = Some(field.clone());
        self
    }
}

fn field_mime(field: &PortField) -> String {
    field
        .option("mime")
        .filter(|mime| !mime.is_empty())
        .unwrap_or(MEDIA_TYPE_JSON)
        .to_string()
}

/// A response header.
#[derive(Debug, Clone, Default)]
pub struct EndpointResponseHeader {
    /// Free text description.
    pub description: Option<String>,
    /// Whether the header is always sent.
    pub required: Option<bool>,
    /// Whether the header is deprecated.
    pub deprecated: Option<bool>,
    /// Serialization explode flag.
    pub explode: Option<bool>,
    /// Example value.
    pub example: Option<String>,
    /// Field the header was reflected from.
    pub port_field: Option<PortField>,
}

impl EndpointResponseHeader {
    /// Derives a header from an output field.
    pub fn from_port_field(field: &PortField) -> Self {
        Self {
            description: field.option("description").map(str::to_string),
            required: Some(!field.optional),
            deprecated: field.bool_option("deprecated"),
            explode: Some(field.bool_option("explode").unwrap_or(false)),
            example: field.option("example").map(str::to_string),
            port_field: Some(field.clone()),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets `required`.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorDto, ErrorV8};
    use portico_core::FieldShape;

    fn field(name: &str, group: FieldGroup) -> PortField {
        PortField::new(name, name, group, FieldShape::Primitive, false)
    }

    #[test]
    fn test_success_payload_sets_json() {
        let response = EndpointResponse::new().with_success_payload(serde_json::json!([]));
        assert_eq!(response.success.mime, MEDIA_TYPE_JSON);
        assert_eq!(response.error.mime, MEDIA_TYPE_JSON);
        assert!(response.has_body());
        assert_eq!(response.produces(), vec![MEDIA_TYPE_JSON.to_string()]);
    }

    #[test]
    fn test_envelope_drops_error_payload() {
        let response = EndpointResponse::new()
            .with_error_payload::<ErrorDto>()
            .with_envelope(true);
        assert!(response.error_payload.is_none());
        assert!(EndpointResponse::new()
            .with_error_payload::<ErrorV8>()
            .error_payload
            .is_some());
    }

    #[test]
    fn test_port_fields_applied() {
        let body = PortField::new("body", "body", FieldGroup::Body, FieldShape::Content, false)
            .with_option("mime", "text/plain");
        let error_body =
            PortField::new("error", "error", FieldGroup::Body, FieldShape::Content, true)
                .with_option("error", "true");
        let code = field("code", FieldGroup::Code).with_option("enum", "201,409");
        let location = PortField::new("location", "Location", FieldGroup::Header, FieldShape::Primitive, true)
            .with_option("success", "true");
        let trace = PortField::new("trace", "Trace-Id", FieldGroup::Header, FieldShape::Primitive, false);

        let response = [body, error_body, code, location, trace]
            .iter()
            .fold(EndpointResponse::new(), |response, field| response.with_port_field(field));

        assert_eq!(response.success.mime, "text/plain");
        assert_eq!(response.error.mime, MEDIA_TYPE_JSON);
        assert_eq!(&*response.codes.success, &[201]);
        assert_eq!(&*response.codes.error, &[409]);
        assert!(response.success.headers.contains_key("Location"));
        assert!(!response.error.headers.contains_key("Location"));
        assert!(response.error.headers.contains_key("Trace-Id"));
        assert_eq!(
            response.success.headers["Trace-Id"].explode,
            Some(false)
        );
        assert_eq!(
            response.produces(),
            vec![MEDIA_TYPE_JSON.to_string(), "text/plain".to_string()]
        );
    }

    #[test]
    fn test_envelope_body_option() {
        let body = PortField::new("body", "body", FieldGroup::Body, FieldShape::Content, false)
            .with_option("envelope", "true");
        let response = EndpointResponse::new()
            .with_error_payload::<ErrorV8>()
            .with_port_field(&body);
        assert!(response.envelope);
        assert!(response.error_payload.is_none());
    }

    #[test]
    fn test_headers_on_both() {
        let response = EndpointResponse::new().with_header(
            "X-Rate-Limit",
            EndpointResponseHeader::default().with_description("Requests left"),
        );
        assert!(response.success.headers.contains_key("X-Rate-Limit"));
        assert!(response.error.headers.contains_key("X-Rate-Limit"));
        assert!(!response.has_body());
    }
}
