//! Response output sink.
//!
//! The encoder writes through [`ResponseDataSink`]; [`HttpResponseSink`]
//! accumulates status, headers and body and finally yields an
//! `http::Response<Full<Bytes>>`.

use crate::content::{ContentOptions, MEDIA_TYPE_JSON};
use crate::{CodecError, CodecResult};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use serde_json::Value;
use std::fmt;
use std::io::Read;

/// Response data written by the encoder.
pub trait ResponseDataSink: Send {
    /// Replaces all values of a header.
    fn set_header(&mut self, name: &str, value: &str) -> CodecResult<()>;

    /// Appends a header value.
    fn add_header(&mut self, name: &str, value: &str) -> CodecResult<()>;

    /// Removes all values of a header.
    fn unset_header(&mut self, name: &str) -> CodecResult<()>;

    /// Sets the status code.
    fn set_status(&mut self, status: StatusCode);

    /// Writes raw body bytes; `None` leaves the body empty.
    fn write_body(&mut self, body: Option<Bytes>) -> CodecResult<()>;

    /// Serializes a structured entity using the response `Content-Type`.
    fn write_body_entity(&mut self, entity: &Value) -> CodecResult<()>;
}

/// A response body before serialization.
pub enum ResponseBody {
    /// No body.
    Empty,
    /// Bytes passed through untouched.
    Bytes(Bytes),
    /// Text passed through untouched.
    Text(String),
    /// A reader drained into the body.
    Stream(Box<dyn Read + Send>),
    /// A structured value serialized by media type.
    Entity(Value),
}

impl ResponseBody {
    /// Returns true for [`ResponseBody::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Entity(value) => f.debug_tuple("Entity").field(value).finish(),
        }
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        Self::Entity(value)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// [`ResponseDataSink`] building an `http::Response`.
#[derive(Debug, Clone)]
pub struct HttpResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for HttpResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseSink {
    /// Creates an empty `200 OK` sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the accumulated headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the accumulated body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Finishes the response.
    #[must_use]
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn entity_options(&self) -> ContentOptions {
        let header = |name: HeaderName| {
            self.headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let mime_type = header(CONTENT_TYPE).unwrap_or_else(|| MEDIA_TYPE_JSON.to_string());
        let encodings = header(CONTENT_ENCODING).unwrap_or_default();
        ContentOptions::new(mime_type).with_encodings(encodings.split(','))
    }
}

fn header_parts(name: &str, value: &str) -> CodecResult<(HeaderName, HeaderValue)> {
    let name =
        HeaderName::try_from(name).map_err(|_| CodecError::InvalidHeader(name.to_string()))?;
    let value =
        HeaderValue::try_from(value).map_err(|_| CodecError::InvalidHeader(value.to_string()))?;
    Ok((name, value))
}

impl ResponseDataSink for HttpResponseSink {
    fn set_header(&mut self, name: &str, value: &str) -> CodecResult<()> {
        let (name, value) = header_parts(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    fn add_header(&mut self, name: &str, value: &str) -> CodecResult<()> {
        let (name, value) = header_parts(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    fn unset_header(&mut self, name: &str) -> CodecResult<()> {
        let name =
            HeaderName::try_from(name).map_err(|_| CodecError::InvalidHeader(name.to_string()))?;
        self.headers.remove(name);
        Ok(())
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write_body(&mut self, body: Option<Bytes>) -> CodecResult<()> {
        self.body = body.unwrap_or_default();
        Ok(())
    }

    fn write_body_entity(&mut self, entity: &Value) -> CodecResult<()> {
        let data = self.entity_options().write_entity(entity)?;
        self.body = Bytes::from(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_set_add_unset() {
        let mut sink = HttpResponseSink::new();
        sink.set_header("X-Tag", "a").unwrap();
        sink.add_header("X-Tag", "b").unwrap();
        assert_eq!(sink.headers().get_all("x-tag").iter().count(), 2);

        sink.set_header("X-Tag", "c").unwrap();
        assert_eq!(sink.headers()["x-tag"], "c");

        sink.unset_header("X-Tag").unwrap();
        assert!(sink.headers().get("x-tag").is_none());
    }

    #[test]
    fn test_invalid_header_name() {
        let mut sink = HttpResponseSink::new();
        assert!(matches!(
            sink.set_header("bad header", "x"),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_entity_defaults_to_json() {
        let mut sink = HttpResponseSink::new();
        sink.write_body_entity(&json!({"id": 7})).unwrap();
        assert_eq!(sink.body().as_ref(), b"{\"id\":7}");
    }

    #[test]
    fn test_into_response() {
        let mut sink = HttpResponseSink::new();
        sink.set_status(StatusCode::CREATED);
        sink.set_header("content-type", "text/plain").unwrap();
        sink.write_body_entity(&json!("created")).unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }
}
