//! Media-type and content-encoding aware payloads.
//!
//! [`ContentOptions`] pairs a media type with an ordered list of content
//! encodings. Reading undoes the encodings in list order, writing applies
//! them in reverse, so `gzip,base64` round-trips.
//!
//! | Media type | Marshaler |
//! |------------|-----------|
//! | `application/json` | `serde_json` |
//! | `application/octet-stream` | raw bytes / strings |
//! | `text/plain` | raw bytes / strings |

use crate::{CodecError, CodecResult};
use base64::Engine as _;
use bytes::Bytes;
use flate2::read::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;

/// `application/json`
pub const MEDIA_TYPE_JSON: &str = "application/json";
/// `application/xml`
pub const MEDIA_TYPE_XML: &str = "application/xml";
/// `application/octet-stream`
pub const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// `text/plain`
pub const MEDIA_TYPE_TEXT: &str = "text/plain";
/// `application/x-www-form-urlencoded`
pub const MEDIA_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MEDIA_TYPE_MULTIPART_FORM: &str = "multipart/form-data";

/// A content encoding applied to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// `gzip`
    Gzip,
    /// `deflate` (zlib wrapped)
    Deflate,
    /// `base64` (standard alphabet, padded)
    Base64,
}

impl ContentEncoding {
    /// Resolves an encoding name.
    pub fn from_name(name: &str) -> CodecResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            "base64" => Ok(Self::Base64),
            other => Err(CodecError::UnknownEncoding(other.to_string())),
        }
    }

    fn decode(self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => {
                GzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Deflate => {
                ZlibDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Base64 => {
                let trimmed: Vec<u8> = data
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                out = base64::engine::general_purpose::STANDARD
                    .decode(trimmed)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            }
        }
        Ok(out)
    }

    fn encode(self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => {
                GzEncoder::new(data, Compression::best()).read_to_end(&mut out)?;
            }
            Self::Deflate => {
                ZlibEncoder::new(data, Compression::best()).read_to_end(&mut out)?;
            }
            Self::Base64 => {
                out = base64::engine::general_purpose::STANDARD
                    .encode(data)
                    .into_bytes();
            }
        }
        Ok(out)
    }
}

/// Media type plus content encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOptions {
    /// Full media type, possibly with parameters.
    pub mime_type: String,
    /// Encoding names in header order.
    pub encodings: Vec<String>,
}

impl ContentOptions {
    /// Creates options with no encoding.
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encodings: Vec::new(),
        }
    }

    /// Appends encodings, skipping empty and `identity` entries.
    #[must_use]
    pub fn with_encodings<I, S>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.encodings.extend(
            encodings
                .into_iter()
                .map(|encoding| encoding.as_ref().trim().to_string())
                .filter(|encoding| !encoding.is_empty() && encoding != "identity"),
        );
        self
    }

    /// Returns the media type without parameters, lower-cased.
    pub fn base_media_type(&self) -> CodecResult<String> {
        self.mime_type
            .parse::<mime::Mime>()
            .map(|mime| mime.essence_str().to_ascii_lowercase())
            .map_err(|_| CodecError::InvalidMediaType(self.mime_type.clone()))
    }

    fn resolved_encodings(&self) -> CodecResult<Vec<ContentEncoding>> {
        self.encodings
            .iter()
            .map(|name| ContentEncoding::from_name(name))
            .collect()
    }

    /// Removes the content encodings from `data`.
    pub fn decode_bytes(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut current = data.to_vec();
        for encoding in self.resolved_encodings()? {
            current = encoding.decode(&current)?;
        }
        Ok(current)
    }

    /// Applies the content encodings to `data`.
    pub fn encode_bytes(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        let mut current = data.to_vec();
        for encoding in self.resolved_encodings()?.into_iter().rev() {
            current = encoding.encode(&current)?;
        }
        Ok(current)
    }

    /// Serializes `value` with the marshaler for the media type, then encodes.
    pub fn write_entity(&self, value: &Value) -> CodecResult<Vec<u8>> {
        let raw = match Marshaler::for_media_type(&self.base_media_type()?)? {
            Marshaler::Json => serde_json::to_vec(value)?,
            Marshaler::Binary => match value {
                Value::String(text) => text.clone().into_bytes(),
                Value::Null => Vec::new(),
                other => {
                    return Err(CodecError::Validation(format!(
                        "Could not encode {} to binary",
                        json_kind(other)
                    )))
                }
            },
        };
        self.encode_bytes(&raw)
    }

    /// Decodes `data` and deserializes it with the marshaler for the media type.
    pub fn read_entity<T: DeserializeOwned>(&self, data: &[u8]) -> CodecResult<T> {
        let decoded = self.decode_bytes(data)?;
        match Marshaler::for_media_type(&self.base_media_type()?)? {
            Marshaler::Json => Ok(serde_json::from_slice(&decoded)?),
            Marshaler::Binary => {
                let text = String::from_utf8(decoded)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                Ok(serde_json::from_value(Value::String(text))?)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marshaler {
    Json,
    Binary,
}

impl Marshaler {
    fn for_media_type(media_type: &str) -> CodecResult<Self> {
        match media_type {
            MEDIA_TYPE_JSON => Ok(Self::Json),
            MEDIA_TYPE_OCTET_STREAM | MEDIA_TYPE_TEXT => Ok(Self::Binary),
            other if other.ends_with("+json") => Ok(Self::Json),
            other => Err(CodecError::UnknownMarshaler(other.to_string())),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A request or response payload with its content options.
#[derive(Debug, Clone)]
pub struct Content {
    present: bool,
    options: ContentOptions,
    data: Bytes,
}

impl Content {
    /// Wraps raw (still encoded) bytes. `None` marks absent content.
    pub fn from_bytes(options: ContentOptions, data: Option<Bytes>) -> Self {
        Self {
            present: data.is_some(),
            options,
            data: data.unwrap_or_default(),
        }
    }

    /// Returns true if the request carried a body.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Returns the content options.
    #[must_use]
    pub fn options(&self) -> &ContentOptions {
        &self.options
    }

    /// Returns the full media type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.options.mime_type
    }

    /// Returns the media type without parameters.
    pub fn base_media_type(&self) -> CodecResult<String> {
        self.options.base_media_type()
    }

    /// Returns the raw, still encoded bytes.
    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.data
    }

    /// Returns the decoded bytes.
    pub fn read_bytes(&self) -> CodecResult<Bytes> {
        if self.options.encodings.is_empty() {
            return Ok(self.data.clone());
        }
        self.options.decode_bytes(&self.data).map(Bytes::from)
    }

    /// Returns the decoded bytes as UTF-8 text.
    pub fn read_text(&self) -> CodecResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            CodecError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Deserializes the payload with the marshaler for its media type.
    pub fn read_entity<T: DeserializeOwned>(&self) -> CodecResult<T> {
        if !self.present {
            return Err(CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Content source not present",
            )));
        }
        self.options.read_entity(&self.data)
    }

    /// Deserializes the payload into a JSON value.
    pub fn read_json_value(&self) -> CodecResult<Value> {
        self.read_entity()
    }
}
