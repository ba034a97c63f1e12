//! Conversions between Rust field types and decoded wire values.
//!
//! The derive macros lean on these traits: [`PortFieldType`] supplies the
//! static shape of a field type, [`FromPortValue`] materializes decoded
//! values into typed fields, [`IntoPortValue`] turns output fields back
//! into wire values.

use crate::content::Content;
use crate::decoder::DecodedValue;
use crate::encoder::scalar_text;
use crate::form::UploadedFile;
use crate::port::ExtractedValue;
use crate::sink::ResponseBody;
use crate::{CodecError, CodecResult};
use bytes::Bytes;
use http::StatusCode;
use portico_core::{FieldShape, Pojo, PortField};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Static shape information for a field type.
pub trait PortFieldType {
    /// Shape of the field.
    const SHAPE: FieldShape;

    /// Whether the type can represent absence.
    const OPTIONAL: bool = false;

    /// JSON schema type name, empty when unconstrained.
    const SCHEMA_TYPE: &'static str = "";

    /// JSON schema type of array items, empty for non-arrays.
    const ITEMS_SCHEMA_TYPE: &'static str = "";
}

/// Builds a typed field value from a decoded value.
pub trait FromPortValue: Sized {
    /// Converts `value` for `field`.
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self>;
}

/// Turns an output field into a wire value.
pub trait IntoPortValue {
    /// Converts the field value.
    fn to_port_value(&self) -> CodecResult<ExtractedValue>;
}

/// Deserializes a request body field.
pub trait FromRequestBody: Sized {
    /// Converts the request content for `field`.
    fn from_content(field: &PortField, content: Content) -> CodecResult<Self>;
}

/// Serializes a response body field.
pub trait IntoResponseBody {
    /// Converts the field value into a response body.
    fn to_response_body(&self) -> CodecResult<ResponseBody>;
}

/// A response paging wrapper whose content is injected from the body field.
pub trait PagingWrapper: Serialize {
    /// Name of the serialized member receiving the body.
    fn content_field() -> &'static str;

    /// Returns false when the wrapper should be ignored.
    fn is_present(&self) -> bool {
        true
    }
}

impl<P: PagingWrapper> PagingWrapper for Option<P> {
    fn content_field() -> &'static str {
        P::content_field()
    }

    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(PagingWrapper::is_present)
    }
}

/// Raw bytes passed through to the response untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBody(pub Bytes);

impl IntoResponseBody for RawBody {
    fn to_response_body(&self) -> CodecResult<ResponseBody> {
        Ok(ResponseBody::Bytes(self.0.clone()))
    }
}

impl<T: Serialize> IntoResponseBody for T {
    fn to_response_body(&self) -> CodecResult<ResponseBody> {
        Ok(ResponseBody::Entity(serde_json::to_value(self)?))
    }
}

impl<T: DeserializeOwned> FromRequestBody for T {
    fn from_content(field: &PortField, content: Content) -> CodecResult<Self> {
        if !content.is_present() {
            // Succeeds only for types that accept null, such as `Option<T>`.
            return serde_json::from_value(Value::Null)
                .map_err(|_| CodecError::conversion(&field.name, "missing request body"));
        }
        content.read_entity()
    }
}

impl FromRequestBody for Content {
    fn from_content(_field: &PortField, content: Content) -> CodecResult<Self> {
        Ok(content)
    }
}

fn parse_scalar<T>(field: &PortField, raw: &str) -> CodecResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| CodecError::conversion(&field.name, format!("invalid value {raw:?}: {e}")))
}

fn missing(field: &PortField) -> CodecError {
    CodecError::conversion(&field.name, "missing required value")
}

fn unexpected(field: &PortField, value: &DecodedValue) -> CodecError {
    CodecError::conversion(
        &field.name,
        format!("cannot convert {} value to {}", decoded_kind(value), field.shape),
    )
}

fn decoded_kind(value: &DecodedValue) -> &'static str {
    match value {
        DecodedValue::Primitive(_) => "primitive",
        DecodedValue::Array(_) => "array",
        DecodedValue::Object(_) => "object",
        DecodedValue::File(_) => "file",
        DecodedValue::FileArray(_) => "file-array",
        DecodedValue::Content(_) => "content",
        DecodedValue::Any(_) => "any",
    }
}

/// Returns the primitive text, falling back to the `default` option.
fn primitive_text(field: &PortField, value: DecodedValue) -> CodecResult<String> {
    match value {
        DecodedValue::Primitive(Some(text)) => Ok(text),
        DecodedValue::Primitive(None) => match field.default_value() {
            Some(Value::String(text)) => Ok(text),
            _ => Err(missing(field)),
        },
        other => Err(unexpected(field, &other)),
    }
}

macro_rules! primitive_port_type {
    ($schema:literal: $($ty:ty),* $(,)?) => {
        $(
            impl PortFieldType for $ty {
                const SHAPE: FieldShape = FieldShape::Primitive;
                const SCHEMA_TYPE: &'static str = $schema;
            }

            impl FromPortValue for $ty {
                fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
                    let text = primitive_text(field, value)?;
                    parse_scalar(field, &text)
                }
            }

            impl IntoPortValue for $ty {
                fn to_port_value(&self) -> CodecResult<ExtractedValue> {
                    Ok(ExtractedValue::Primitive(self.to_string()))
                }
            }
        )*
    };
}

primitive_port_type!("string": String, char);
primitive_port_type!("boolean": bool);
primitive_port_type!("integer": i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
primitive_port_type!("number": f32, f64);

impl PortFieldType for StatusCode {
    const SHAPE: FieldShape = FieldShape::Primitive;
    const SCHEMA_TYPE: &'static str = "integer";
}

impl IntoPortValue for StatusCode {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        Ok(ExtractedValue::Primitive(self.as_u16().to_string()))
    }
}

impl<T: PortFieldType> PortFieldType for Option<T> {
    const SHAPE: FieldShape = T::SHAPE;
    const OPTIONAL: bool = true;
    const SCHEMA_TYPE: &'static str = T::SCHEMA_TYPE;
    const ITEMS_SCHEMA_TYPE: &'static str = T::ITEMS_SCHEMA_TYPE;
}

impl<T: FromPortValue> FromPortValue for Option<T> {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        if value.is_absent() && field.default_value().is_none() {
            return Ok(None);
        }
        T::from_port_value(field, value).map(Some)
    }
}

impl<T: IntoPortValue> IntoPortValue for Option<T> {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        match self {
            Some(value) => value.to_port_value(),
            None => Ok(ExtractedValue::Absent),
        }
    }
}

impl<T: PortFieldType> PortFieldType for Vec<T> {
    const SHAPE: FieldShape = match T::SHAPE {
        FieldShape::File => FieldShape::FileArray,
        _ => FieldShape::Array,
    };
    const SCHEMA_TYPE: &'static str = "array";
    const ITEMS_SCHEMA_TYPE: &'static str = T::SCHEMA_TYPE;
}

impl<T: FromPortValue> FromPortValue for Vec<T> {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        match value {
            DecodedValue::Array(items) => items
                .into_iter()
                .map(|item| T::from_port_value(field, DecodedValue::Primitive(Some(item))))
                .collect(),
            DecodedValue::FileArray(files) => files
                .into_iter()
                .map(|file| T::from_port_value(field, DecodedValue::File(Some(file))))
                .collect(),
            other => Err(unexpected(field, &other)),
        }
    }
}

impl<T: IntoPortValue> IntoPortValue for Vec<T> {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        let mut items = Vec::with_capacity(self.len());
        for item in self {
            match item.to_port_value()? {
                ExtractedValue::Primitive(text) => items.push(text),
                ExtractedValue::Absent => {}
                _ => {
                    return Err(CodecError::conversion(
                        "array",
                        "array items must be primitive",
                    ))
                }
            }
        }
        Ok(ExtractedValue::Array(items))
    }
}

fn object_entries(field: &PortField, value: DecodedValue) -> CodecResult<Pojo> {
    match value {
        DecodedValue::Object(Some(pojo)) => Ok(pojo),
        DecodedValue::Object(None) => Ok(Pojo::new()),
        other => Err(unexpected(field, &other)),
    }
}

fn entry_value<V: FromPortValue>(field: &PortField, value: Value) -> CodecResult<V> {
    match value {
        Value::String(text) => V::from_port_value(field, DecodedValue::Primitive(Some(text))),
        other => V::from_port_value(field, DecodedValue::Any(Some(other))),
    }
}

fn object_value<'a, V: IntoPortValue + 'a>(
    entries: impl Iterator<Item = (&'a String, &'a V)>,
) -> CodecResult<ExtractedValue> {
    let mut pojo = Pojo::new();
    for (key, value) in entries {
        match value.to_port_value()? {
            ExtractedValue::Primitive(text) => {
                pojo.insert(key.clone(), Value::String(text));
            }
            ExtractedValue::Object(nested) => {
                pojo.insert(key.clone(), Value::Object(nested));
            }
            ExtractedValue::Absent => {}
            _ => {
                return Err(CodecError::conversion(
                    key.as_str(),
                    "object values must be primitive or object",
                ))
            }
        }
    }
    Ok(ExtractedValue::Object(pojo))
}

impl<V: PortFieldType> PortFieldType for BTreeMap<String, V> {
    const SHAPE: FieldShape = FieldShape::Object;
    const SCHEMA_TYPE: &'static str = "object";
}

impl<V: FromPortValue> FromPortValue for BTreeMap<String, V> {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        object_entries(field, value)?
            .into_iter()
            .map(|(key, value)| Ok((key, entry_value(field, value)?)))
            .collect()
    }
}

impl<V: IntoPortValue> IntoPortValue for BTreeMap<String, V> {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        object_value(self.iter())
    }
}

impl<V: PortFieldType, S> PortFieldType for HashMap<String, V, S> {
    const SHAPE: FieldShape = FieldShape::Object;
    const SCHEMA_TYPE: &'static str = "object";
}

impl<V: FromPortValue, S: std::hash::BuildHasher + Default> FromPortValue for HashMap<String, V, S> {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        object_entries(field, value)?
            .into_iter()
            .map(|(key, value)| Ok((key, entry_value(field, value)?)))
            .collect()
    }
}

impl<V: IntoPortValue, S> IntoPortValue for HashMap<String, V, S> {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        object_value(self.iter())
    }
}

impl PortFieldType for Pojo {
    const SHAPE: FieldShape = FieldShape::Object;
    const SCHEMA_TYPE: &'static str = "object";
}

impl FromPortValue for Pojo {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        object_entries(field, value)
    }
}

impl IntoPortValue for Pojo {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        Ok(ExtractedValue::Object(self.clone()))
    }
}

impl PortFieldType for Value {
    const SHAPE: FieldShape = FieldShape::Any;
}

impl FromPortValue for Value {
    fn from_port_value(_field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        Ok(match value {
            DecodedValue::Primitive(text) => text.map_or(Value::Null, Value::String),
            DecodedValue::Array(items) => {
                Value::Array(items.into_iter().map(Value::String).collect())
            }
            DecodedValue::Object(pojo) => pojo.map_or(Value::Null, Value::Object),
            DecodedValue::Any(value) => value.unwrap_or(Value::Null),
            DecodedValue::File(file) => file
                .and_then(|file| file.text().ok())
                .map_or(Value::Null, Value::String),
            DecodedValue::FileArray(files) => Value::Array(
                files
                    .iter()
                    .filter_map(|file| file.text().ok())
                    .map(Value::String)
                    .collect(),
            ),
            DecodedValue::Content(content) => {
                if content.is_present() {
                    content.read_json_value()?
                } else {
                    Value::Null
                }
            }
        })
    }
}

impl IntoPortValue for Value {
    fn to_port_value(&self) -> CodecResult<ExtractedValue> {
        Ok(match self {
            Value::Null => ExtractedValue::Absent,
            Value::Array(items) => ExtractedValue::Array(items.iter().map(scalar_text).collect()),
            Value::Object(pojo) => ExtractedValue::Object(pojo.clone()),
            other => ExtractedValue::Primitive(scalar_text(other)),
        })
    }
}

impl PortFieldType for UploadedFile {
    const SHAPE: FieldShape = FieldShape::File;
    const SCHEMA_TYPE: &'static str = "string";
}

impl FromPortValue for UploadedFile {
    fn from_port_value(field: &PortField, value: DecodedValue) -> CodecResult<Self> {
        match value {
            DecodedValue::File(Some(file)) => Ok(file),
            DecodedValue::File(None) => Err(CodecError::MissingRequiredFile(field.peer.clone())),
            other => Err(unexpected(field, &other)),
        }
    }
}

impl PortFieldType for Content {
    const SHAPE: FieldShape = FieldShape::Content;
}
