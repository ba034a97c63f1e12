//! Response encoding, the mirror of [`crate::decoder`].
//!
//! Header arrays always collapse to CSV on the wire. Header objects are
//! written with their keys sorted so the output is deterministic:
//!
//! ```
//! use portico_codec::encoder::ResponseEncoder;
//! use portico_codec::sink::HttpResponseSink;
//! use serde_json::json;
//!
//! let mut sink = HttpResponseSink::new();
//! let color = json!({"R": "100", "G": "200", "B": "150"});
//! ResponseEncoder::new(&mut sink)
//!     .encode_header_object("X-Color", color.as_object(), true)
//!     .unwrap();
//! assert_eq!(sink.headers()["x-color"], "B=150,G=200,R=100");
//! ```

use crate::content::{MEDIA_TYPE_JSON, MEDIA_TYPE_XML};
use crate::sink::{ResponseBody, ResponseDataSink};
use crate::CodecResult;
use bytes::Bytes;
use http::StatusCode;
use portico_core::Pojo;
use serde_json::Value;
use std::io::Read;

/// Writes typed response values through a [`ResponseDataSink`].
pub struct ResponseEncoder<'a> {
    sink: &'a mut dyn ResponseDataSink,
}

impl<'a> ResponseEncoder<'a> {
    /// Creates an encoder over `sink`.
    pub fn new(sink: &'a mut dyn ResponseDataSink) -> Self {
        Self { sink }
    }

    /// Replaces the header with a single value; `None` removes it.
    pub fn encode_header_primitive(&mut self, name: &str, value: Option<&str>) -> CodecResult<()> {
        self.sink.unset_header(name)?;
        if let Some(value) = value {
            self.sink.set_header(name, value)?;
        }
        Ok(())
    }

    /// Replaces the header with the CSV join of `values`; empty removes it.
    pub fn encode_header_array(&mut self, name: &str, values: &[String]) -> CodecResult<()> {
        self.sink.unset_header(name)?;
        if !values.is_empty() {
            self.sink.add_header(name, &values.join(","))?;
        }
        Ok(())
    }

    /// Replaces the header with `k=v,k=v` (explode) or `k,v,k,v`.
    pub fn encode_header_object(
        &mut self,
        name: &str,
        value: Option<&Pojo>,
        explode: bool,
    ) -> CodecResult<()> {
        self.sink.unset_header(name)?;
        let Some(value) = value else {
            return Ok(());
        };

        let mut keys: Vec<&String> = value.keys().collect();
        keys.sort();

        let parts: Vec<String> = keys
            .into_iter()
            .map(|key| {
                let item = scalar_text(&value[key.as_str()]);
                if explode {
                    format!("{key}={item}")
                } else {
                    format!("{key},{item}")
                }
            })
            .collect();

        if !parts.is_empty() {
            self.sink.add_header(name, &parts.join(","))?;
        }
        Ok(())
    }

    /// Sets the status code.
    pub fn encode_code(&mut self, status: StatusCode) {
        self.sink.set_status(status);
    }

    /// Sets `Content-Type`, expanding the `json` and `xml` short names.
    pub fn encode_mime(&mut self, mime: &str) -> CodecResult<()> {
        let mime = match mime {
            "json" => MEDIA_TYPE_JSON,
            "xml" => MEDIA_TYPE_XML,
            other => other,
        };
        self.sink.set_header(http::header::CONTENT_TYPE.as_str(), mime)
    }

    /// Writes the body: bytes, text and streams pass through untouched,
    /// entities are serialized by the response media type.
    pub fn encode_body(&mut self, body: ResponseBody) -> CodecResult<()> {
        match body {
            ResponseBody::Empty => self.sink.write_body(None),
            ResponseBody::Bytes(bytes) => self.sink.write_body(Some(bytes)),
            ResponseBody::Text(text) => self.sink.write_body(Some(Bytes::from(text))),
            ResponseBody::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                self.sink.write_body(Some(Bytes::from(data)))
            }
            ResponseBody::Entity(value) => self.sink.write_body_entity(&value),
        }
    }
}

/// Renders a JSON value for a header: strings unquoted, others as JSON.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
