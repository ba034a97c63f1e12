//! Turning handler results into an encoded response.
//!
//! The [`OutputsPopulator`] runs once per request after the handler returns
//! or fails. In order it resolves the status code, encodes the code, writes
//! headers from the output port, sets the media type (skipped for 204) and
//! builds the success or error body. The response observer is notified last,
//! whether or not encoding succeeded.

use crate::describe::RequestDescriber;
use crate::endpoint::Endpoint;
use crate::envelope::{Envelope, Throwable};
use crate::errors::ErrorBodyStrategy;
use crate::status::spring_status_name;
use crate::EndpointError;
use anyhow::Context as _;
use http::StatusCode;
use portico_codec::{
    ExtractedValue, OutputPort, ResponseBody, ResponseDataSink, ResponseEncoder, MEDIA_TYPE_JSON,
};
use portico_core::port::{is_code, is_error_header, is_paging, is_success_body, is_success_header};
use portico_core::{
    ErrorList, FieldShape, ObservedExchange, PortField, ResponseObserver, StatusError,
    ValidationFailure,
};
use serde_json::Value;
use std::any::TypeId;

/// Builds the response for one exchange.
pub struct OutputsPopulator<'a> {
    endpoint: &'a Endpoint,
    exchange: ObservedExchange<'a>,
    outputs: Option<&'a dyn OutputPort>,
    error: Option<anyhow::Error>,
    observer: Option<&'a dyn ResponseObserver>,
    describer: Option<&'a RequestDescriber>,
    expose_error_details: bool,
}

impl<'a> OutputsPopulator<'a> {
    /// Creates a populator for `endpoint`.
    pub fn new(endpoint: &'a Endpoint, exchange: ObservedExchange<'a>) -> Self {
        Self {
            endpoint,
            exchange,
            outputs: None,
            error: None,
            observer: None,
            describer: None,
            expose_error_details: false,
        }
    }

    /// Sets the handler outputs.
    #[must_use]
    pub fn with_outputs(mut self, outputs: &'a dyn OutputPort) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Sets the handler error.
    #[must_use]
    pub fn with_error(mut self, err: anyhow::Error) -> Self {
        self.error = Some(err);
        self
    }

    /// Sets the observer notified once the response is written.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ResponseObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the request parameters echoed into envelopes.
    #[must_use]
    pub fn with_describer(mut self, describer: &'a RequestDescriber) -> Self {
        self.describer = Some(describer);
        self
    }

    /// Includes the error chain in enveloped error bodies.
    #[must_use]
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    /// Writes status, headers, media type and body into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] naming the step that failed. These are
    /// wiring problems and the caller answers 500.
    pub fn populate(mut self, sink: &mut dyn ResponseDataSink) -> Result<StatusCode, EndpointError> {
        let code = self.evaluate_code()?;
        let result = self.write(code, sink);
        self.notify(code);
        result.map(|()| code)
    }

    fn write(&self, code: StatusCode, sink: &mut dyn ResponseDataSink) -> Result<(), EndpointError> {
        let mut encoder = ResponseEncoder::new(sink);
        encoder.encode_code(code);

        self.populate_headers(&mut encoder)
            .map_err(|err| EndpointError::response("set response headers", err))?;

        if code != StatusCode::NO_CONTENT {
            if let Some(mime) = self.media_type(code) {
                encoder
                    .encode_mime(mime)
                    .map_err(|err| EndpointError::response("set media type", err))?;
            }
        }

        let body = match &self.error {
            Some(err) => self.error_body(code, err)?,
            None => self
                .success_body(code)
                .map_err(|err| EndpointError::response("generate response body", err))?,
        };
        let body = match body {
            ResponseBody::Entity(Value::Null) => ResponseBody::Empty,
            body => body,
        };

        encoder
            .encode_body(body)
            .map_err(|err| EndpointError::response("set response body", err))
    }

    fn notify(&self, code: StatusCode) {
        let Some(observer) = self.observer else {
            return;
        };
        match &self.error {
            Some(err) => observer.error(&self.exchange, code, err),
            None => observer.success(&self.exchange, code),
        }
    }

    /// Resolves the status code, unwrapping a [`StatusError`] to its cause.
    fn evaluate_code(&mut self) -> Result<StatusCode, EndpointError> {
        if let Some(err) = self.error.take() {
            let (code, err) = match err.downcast::<StatusError>() {
                Ok(status_error) => status_error.into_parts(),
                Err(err) => (StatusCode::BAD_REQUEST, err),
            };
            self.error = Some(err);
            return Ok(code);
        }

        let response = &self.endpoint.response;
        let mut code = response.codes.default_code();
        if !response.has_body() && !response.envelope {
            code = StatusCode::NO_CONTENT.as_u16();
        }

        if let Some(field) = self.port_field(is_code) {
            let specified = self
                .extract(field)
                .map_err(|err| EndpointError::response("evaluate response status code", err))?;
            if let ExtractedValue::Primitive(value) = specified {
                let value = value.trim().parse::<u16>().map_err(|err| {
                    EndpointError::response(
                        "evaluate response status code",
                        anyhow::anyhow!("Invalid status code {value:?}: {err}"),
                    )
                })?;
                if value != 0 {
                    code = value;
                }
            }
        }

        StatusCode::from_u16(code).map_err(|_| EndpointError::InvalidStatusCode(code))
    }

    fn port_field(&self, predicate: fn(&PortField) -> bool) -> Option<&'a PortField> {
        self.endpoint.response.port.as_deref()?.first(predicate)
    }

    fn extract(&self, field: &PortField) -> anyhow::Result<ExtractedValue> {
        match self.outputs {
            Some(outputs) => Ok(outputs.extract(field)?),
            None => Ok(ExtractedValue::Absent),
        }
    }

    fn populate_headers(&self, encoder: &mut ResponseEncoder<'_>) -> anyhow::Result<()> {
        let (Some(port), Some(_)) = (self.endpoint.response.port.as_deref(), self.outputs) else {
            return Ok(());
        };

        let predicate: fn(&PortField) -> bool = if self.error.is_some() {
            is_error_header
        } else {
            is_success_header
        };

        for field in port.all(predicate) {
            let value = self.extract(field)?;
            encode_header(encoder, field, value)
                .with_context(|| format!("Failed to encode header {:?}", field.name))?;
        }
        Ok(())
    }

    fn media_type(&self, code: StatusCode) -> Option<&str> {
        let response = &self.endpoint.response;
        if response.envelope {
            Some(MEDIA_TYPE_JSON)
        } else if code.as_u16() <= 399 {
            Some(response.success.mime.as_str()).filter(|mime| !mime.is_empty())
        } else {
            Some(response.error.mime.as_str())
                .filter(|mime| !mime.is_empty())
                .or(Some(MEDIA_TYPE_JSON))
        }
    }

    fn success_body(&self, code: StatusCode) -> anyhow::Result<ResponseBody> {
        let response = &self.endpoint.response;

        let mut body_type = None;
        let mut body = match self.port_field(is_success_body) {
            Some(field) => match self.extract(field)? {
                ExtractedValue::Body { body, type_id } => {
                    body_type = Some(type_id);
                    body
                }
                ExtractedValue::Absent => ResponseBody::Empty,
                other => anyhow::bail!("Body field {:?} produced {other:?}", field.name),
            },
            None => response
                .success
                .payload
                .clone()
                .map_or(ResponseBody::Empty, ResponseBody::Entity),
        };

        if let Some(field) = self.port_field(is_paging) {
            if let ExtractedValue::Paging {
                mut value,
                content_field,
            } = self.extract(field)?
            {
                if let Some(content) = body_value(body)? {
                    let Value::Object(members) = &mut value else {
                        anyhow::bail!("Paging field {:?} is not an object", field.name);
                    };
                    members.insert(content_field.to_string(), content);
                }
                body = ResponseBody::Entity(value);
                body_type = None;
            }
        }

        if !response.envelope {
            return Ok(body);
        }

        let is_envelope = body_type == Some(TypeId::of::<Envelope>())
            || body_type == Some(TypeId::of::<Option<Envelope>>());
        let payload = body_value(body)?;
        let mut envelope = match payload {
            Some(value) if is_envelope => serde_json::from_value::<Envelope>(value)
                .context("Failed to read envelope body")?,
            payload => {
                let mut envelope = Envelope::success(self.exchange.operation_id, payload);
                envelope.params = self.params();
                envelope
            }
        };
        if envelope.http_status.is_empty() {
            envelope.http_status = spring_status_name(code).to_string();
        }

        Ok(ResponseBody::Entity(serde_json::to_value(envelope)?))
    }

    fn error_body(&self, code: StatusCode, err: &anyhow::Error) -> Result<ResponseBody, EndpointError> {
        let generate = |err: serde_json::Error| EndpointError::response("generate response body", err);

        let value = match self.endpoint.error_body {
            ErrorBodyStrategy::Envelope => {
                serde_json::to_value(self.error_envelope(code, err)).map_err(generate)?
            }
            ErrorBodyStrategy::SelfApplying(build) => build(err).map_err(generate)?,
            ErrorBodyStrategy::Raw(build) => build(code, err, self.path()).map_err(generate)?,
            ErrorBodyStrategy::Unsupported(type_name) => {
                return Err(EndpointError::UnsupportedErrorPayload {
                    type_name,
                    message: err.to_string(),
                })
            }
        };
        Ok(ResponseBody::Entity(value))
    }

    fn error_envelope(&self, code: StatusCode, err: &anyhow::Error) -> Envelope {
        let errors = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ErrorList>())
            .map_or_else(|| vec![err.to_string()], |list| list.messages().to_vec());

        let debug = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ValidationFailure>())
            .and_then(ValidationFailure::to_pojo);

        Envelope {
            success: false,
            message: err.to_string(),
            command: self.exchange.operation_id.to_string(),
            params: self.params(),
            payload: None,
            errors,
            http_status: spring_status_name(code).to_string(),
            throwable: self
                .expose_error_details
                .then(|| Throwable::from_error(err)),
            debug,
        }
    }

    fn params(&self) -> indexmap::IndexMap<String, Value> {
        self.describer
            .map(|describer| describer.parameters().clone())
            .unwrap_or_default()
    }

    fn path(&self) -> &str {
        self.describer
            .map_or(self.exchange.path, RequestDescriber::path)
    }
}

fn encode_header(
    encoder: &mut ResponseEncoder<'_>,
    field: &PortField,
    value: ExtractedValue,
) -> anyhow::Result<()> {
    let name = field.peer.as_str();
    match (field.shape, value) {
        (FieldShape::Primitive, ExtractedValue::Primitive(value)) => {
            encoder.encode_header_primitive(name, Some(&value))?;
        }
        (FieldShape::Primitive, ExtractedValue::Absent) => {
            encoder.encode_header_primitive(name, None)?;
        }
        (FieldShape::Array, ExtractedValue::Array(values)) => {
            encoder.encode_header_array(name, &values)?;
        }
        (FieldShape::Array, ExtractedValue::Absent) => encoder.encode_header_array(name, &[])?,
        (FieldShape::Object, ExtractedValue::Object(value)) => {
            encoder.encode_header_object(name, Some(&value), field.explode())?;
        }
        (FieldShape::Object, ExtractedValue::Absent) => {
            encoder.encode_header_object(name, None, field.explode())?;
        }
        (shape, _) => anyhow::bail!("Unable to encode shape {shape} as header"),
    }
    Ok(())
}

/// The JSON value of a body about to be wrapped, `None` when empty.
fn body_value(body: ResponseBody) -> anyhow::Result<Option<Value>> {
    match body {
        ResponseBody::Empty | ResponseBody::Entity(Value::Null) => Ok(None),
        ResponseBody::Entity(value) => Ok(Some(value)),
        ResponseBody::Text(text) => Ok(Some(Value::String(text))),
        ResponseBody::Bytes(_) | ResponseBody::Stream(_) => {
            anyhow::bail!("Binary bodies cannot be wrapped")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ResponsePort;
    use crate::errors::{ErrorDto, ErrorPayload};
    use crate::paging::PagingResponse;
    use http::Method;
    use portico_codec::{CodecResult, HttpResponseSink, IntoPortValue};
    use portico_core::{FieldDescriptor, PortDescriptor};
    use serde::Serialize;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Device {
        id: u32,
        name: String,
    }

    struct DeviceOutputs {
        code: Option<u16>,
        location: Option<String>,
        x_trace: Vec<String>,
        body: Vec<Device>,
    }

    static DEVICE_FIELDS: [FieldDescriptor; 4] = [
        FieldDescriptor::new("code", "code", FieldShape::Primitive, true),
        FieldDescriptor::new("location", "header,success", FieldShape::Primitive, true),
        FieldDescriptor::new("x_trace", "header", FieldShape::Array, true),
        FieldDescriptor::new("body", "body", FieldShape::Content, false),
    ];

    static DEVICE_DESCRIPTOR: PortDescriptor = PortDescriptor {
        type_name: "DeviceOutputs",
        fields: &DEVICE_FIELDS,
    };

    impl OutputPort for DeviceOutputs {
        fn descriptor() -> &'static PortDescriptor {
            &DEVICE_DESCRIPTOR
        }

        fn extract(&self, field: &PortField) -> CodecResult<ExtractedValue> {
            match field.name.as_str() {
                "code" => self.code.to_port_value(),
                "location" => self.location.to_port_value(),
                "x_trace" => self.x_trace.to_port_value(),
                "body" => ExtractedValue::body(&self.body),
                _ => Ok(ExtractedValue::Absent),
            }
        }
    }

    impl ResponsePort for DeviceOutputs {}

    struct PagedOutputs {
        body: Vec<Device>,
        paging: PagingResponse,
    }

    static PAGED_FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor::new("body", "body", FieldShape::Content, false),
        FieldDescriptor::new("paging", "paging", FieldShape::Object, false),
    ];

    static PAGED_DESCRIPTOR: PortDescriptor = PortDescriptor {
        type_name: "PagedOutputs",
        fields: &PAGED_FIELDS,
    };

    impl OutputPort for PagedOutputs {
        fn descriptor() -> &'static PortDescriptor {
            &PAGED_DESCRIPTOR
        }

        fn extract(&self, field: &PortField) -> CodecResult<ExtractedValue> {
            match field.name.as_str() {
                "body" => ExtractedValue::body(&self.body),
                "paging" => ExtractedValue::paging(&self.paging),
                _ => Ok(ExtractedValue::Absent),
            }
        }
    }

    impl ResponsePort for PagedOutputs {}

    struct EnvelopeOutputs {
        body: Option<Envelope>,
    }

    static ENVELOPE_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor::new(
        "body",
        "body,envelope",
        FieldShape::Content,
        true,
    )];

    static ENVELOPE_DESCRIPTOR: PortDescriptor = PortDescriptor {
        type_name: "EnvelopeOutputs",
        fields: &ENVELOPE_FIELDS,
    };

    impl OutputPort for EnvelopeOutputs {
        fn descriptor() -> &'static PortDescriptor {
            &ENVELOPE_DESCRIPTOR
        }

        fn extract(&self, field: &PortField) -> CodecResult<ExtractedValue> {
            match field.name.as_str() {
                "body" => ExtractedValue::body(&self.body),
                _ => Ok(ExtractedValue::Absent),
            }
        }
    }

    impl ResponsePort for EnvelopeOutputs {}

    async fn noop() -> anyhow::Result<()> {
        Ok(())
    }

    fn devices() -> DeviceOutputs {
        DeviceOutputs {
            code: None,
            location: Some("/devices/7".into()),
            x_trace: vec!["a".into(), "b".into()],
            body: vec![Device {
                id: 7,
                name: "router".into(),
            }],
        }
    }

    fn exchange<'a>(operation_id: &'a str, method: &'a Method) -> ObservedExchange<'a> {
        ObservedExchange {
            operation_id,
            method,
            path: "/devices",
            request_id: "req-1",
        }
    }

    fn body_json(sink: &HttpResponseSink) -> Value {
        serde_json::from_slice(sink.body()).unwrap()
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<(u16, bool)>>);

    impl ResponseObserver for Recording {
        fn success(&self, _exchange: &ObservedExchange<'_>, code: StatusCode) {
            self.0.lock().unwrap().push((code.as_u16(), true));
        }

        fn error(&self, _exchange: &ObservedExchange<'_>, code: StatusCode, _err: &anyhow::Error) {
            self.0.lock().unwrap().push((code.as_u16(), false));
        }
    }

    #[test]
    fn test_success_headers_and_body() {
        let endpoint = Endpoint::builder(Method::POST, "/devices")
            .operation_id("createDevice")
            .outputs::<DeviceOutputs>()
            .handler(noop)
            .build()
            .unwrap();
        let outputs = devices();
        let observer = Recording::default();
        let mut sink = HttpResponseSink::new();

        let code = OutputsPopulator::new(&endpoint, exchange("createDevice", &Method::POST))
            .with_outputs(&outputs)
            .with_observer(&observer)
            .populate(&mut sink)
            .unwrap();

        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(sink.status(), StatusCode::CREATED);
        assert_eq!(sink.headers()["location"], "/devices/7");
        assert_eq!(sink.headers()["x-trace"], "a,b");
        assert_eq!(sink.headers()["content-type"], MEDIA_TYPE_JSON);
        assert_eq!(body_json(&sink), json!([{"id": 7, "name": "router"}]));
        assert_eq!(*observer.0.lock().unwrap(), vec![(201, true)]);
    }

    #[test]
    fn test_code_field_overrides_default() {
        let endpoint = Endpoint::builder(Method::POST, "/devices")
            .outputs::<DeviceOutputs>()
            .handler(noop)
            .build()
            .unwrap();
        let mut outputs = devices();
        outputs.code = Some(202);
        let mut sink = HttpResponseSink::new();
        let code = OutputsPopulator::new(&endpoint, exchange("", &Method::POST))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap();
        assert_eq!(code, StatusCode::ACCEPTED);

        outputs.code = Some(0);
        let mut sink = HttpResponseSink::new();
        let code = OutputsPopulator::new(&endpoint, exchange("", &Method::POST))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap();
        assert_eq!(code, StatusCode::CREATED);

        outputs.code = Some(1000);
        let mut sink = HttpResponseSink::new();
        let err = OutputsPopulator::new(&endpoint, exchange("", &Method::POST))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap_err();
        assert!(matches!(err, EndpointError::InvalidStatusCode(1000)));
    }

    #[test]
    fn test_no_body_is_no_content() {
        let endpoint = Endpoint::builder(Method::PUT, "/devices/{id}")
            .handler(noop)
            .build()
            .unwrap();
        let mut sink = HttpResponseSink::new();
        let code = OutputsPopulator::new(&endpoint, exchange("", &Method::PUT))
            .with_outputs(&())
            .populate(&mut sink)
            .unwrap();
        assert_eq!(code, StatusCode::NO_CONTENT);
        assert!(sink.headers().get("content-type").is_none());
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_status_error_unwrapped() {
        let endpoint = Endpoint::builder(Method::GET, "/devices/{id}")
            .outputs::<DeviceOutputs>()
            .handler(noop)
            .build()
            .unwrap();
        let observer = Recording::default();
        let mut sink = HttpResponseSink::new();
        let err = anyhow::Error::new(StatusError::not_found(crate::CodedError::new(
            "DEVICE_MISSING",
            anyhow::anyhow!("device 7 not found"),
        )));

        let code = OutputsPopulator::new(&endpoint, exchange("getDevice", &Method::GET))
            .with_error(err)
            .with_observer(&observer)
            .populate(&mut sink)
            .unwrap();

        assert_eq!(code, StatusCode::NOT_FOUND);
        assert!(sink.headers().get("location").is_none());
        assert_eq!(
            body_json(&sink),
            json!({"code": "DEVICE_MISSING", "message": "device 7 not found"})
        );
        assert_eq!(*observer.0.lock().unwrap(), vec![(404, false)]);
    }

    #[test]
    fn test_plain_error_is_bad_request() {
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .error_payload::<ErrorDto>()
            .handler(noop)
            .build()
            .unwrap();
        let mut sink = HttpResponseSink::new();
        let code = OutputsPopulator::new(&endpoint, exchange("", &Method::GET))
            .with_error(anyhow::anyhow!("bad filter"))
            .populate(&mut sink)
            .unwrap();
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(&sink),
            json!({
                "code": "400",
                "httpStatus": "BAD_REQUEST",
                "message": "bad filter",
                "path": "/devices"
            })
        );
    }

    #[test]
    fn test_paging_injects_content() {
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .outputs::<PagedOutputs>()
            .handler(noop)
            .build()
            .unwrap();
        let outputs = PagedOutputs {
            body: vec![Device {
                id: 1,
                name: "switch".into(),
            }],
            paging: PagingResponse::new(0, 10, 1, false),
        };
        let mut sink = HttpResponseSink::new();
        OutputsPopulator::new(&endpoint, exchange("", &Method::GET))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap();

        let body = body_json(&sink);
        assert_eq!(body["content"], json!([{"id": 1, "name": "switch"}]));
        assert_eq!(body["numberOfElements"], 1);
        assert_eq!(body["hasNext"], false);
    }

    #[test]
    fn test_envelope_success() {
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .operation_id("listDevices")
            .outputs::<DeviceOutputs>()
            .envelope(true)
            .handler(noop)
            .build()
            .unwrap();
        let outputs = devices();
        let mut sink = HttpResponseSink::new();
        OutputsPopulator::new(&endpoint, exchange("listDevices", &Method::GET))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap();

        assert_eq!(sink.headers()["content-type"], MEDIA_TYPE_JSON);
        assert_eq!(
            body_json(&sink),
            json!({
                "success": true,
                "message": "listDevices succeeded",
                "command": "listDevices",
                "payload": [{"id": 7, "name": "router"}],
                "httpStatus": "OK"
            })
        );
    }

    #[test]
    fn test_envelope_passthrough_backfills_status() {
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .outputs::<EnvelopeOutputs>()
            .handler(noop)
            .build()
            .unwrap();
        assert!(endpoint.response.envelope);

        let outputs = EnvelopeOutputs {
            body: Some(Envelope {
                success: true,
                message: "custom".into(),
                command: "custom".into(),
                ..Envelope::default()
            }),
        };
        let mut sink = HttpResponseSink::new();
        OutputsPopulator::new(&endpoint, exchange("listDevices", &Method::GET))
            .with_outputs(&outputs)
            .populate(&mut sink)
            .unwrap();

        let body = body_json(&sink);
        assert_eq!(body["message"], "custom");
        assert_eq!(body["command"], "custom");
        assert_eq!(body["httpStatus"], "OK");
    }

    #[test]
    fn test_envelope_error_lists_and_debug() {
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .operation_id("listDevices")
            .envelope(true)
            .handler(noop)
            .build()
            .unwrap();

        let mut failure = ValidationFailure::new("");
        failure.child_entry("limit").add_failure("must be at most 100");
        let err = anyhow::Error::new(StatusError::bad_request(failure));
        let mut sink = HttpResponseSink::new();
        OutputsPopulator::new(&endpoint, exchange("listDevices", &Method::GET))
            .with_error(err)
            .populate(&mut sink)
            .unwrap();
        let body = body_json(&sink);
        assert_eq!(body["success"], false);
        assert_eq!(body["command"], "listDevices");
        assert_eq!(body["httpStatus"], "BAD_REQUEST");
        assert!(body["debug"].is_object());
        assert!(body.get("throwable").is_none());

        let err = anyhow::Error::new(ErrorList(vec!["first".into(), "second".into()]));
        let mut sink = HttpResponseSink::new();
        OutputsPopulator::new(&endpoint, exchange("listDevices", &Method::GET))
            .with_error(err)
            .with_error_details(true)
            .populate(&mut sink)
            .unwrap();
        let body = body_json(&sink);
        assert_eq!(body["errors"], json!(["first", "second"]));
        assert_eq!(body["throwable"]["message"], "first; second");
    }

    #[test]
    fn test_unsupported_error_payload() {
        struct Opaque;
        impl ErrorPayload for Opaque {
            fn error_strategy() -> ErrorBodyStrategy {
                ErrorBodyStrategy::Unsupported("Opaque")
            }
        }

        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .error_payload::<Opaque>()
            .handler(noop)
            .build()
            .unwrap();
        let mut sink = HttpResponseSink::new();
        let err = OutputsPopulator::new(&endpoint, exchange("", &Method::GET))
            .with_error(anyhow::anyhow!("boom"))
            .populate(&mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            EndpointError::UnsupportedErrorPayload { type_name: "Opaque", .. }
        ));
    }
}
