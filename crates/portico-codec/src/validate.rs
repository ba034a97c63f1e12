//! Request validation against per-field schemas.
//!
//! For every field of a request port the validator resolves a
//! [`ValidationSchema`], decodes the raw value, coerces strings to the
//! schema's primitive type and validates. Schema violations are collected
//! into one [`ValidationFailure`] tree; any other error aborts validation.

use crate::decoder::RequestDecoder;
use crate::schema::{JsonSchema, SchemaViolation, ValidationSchema};
use crate::{CodecError, CodecResult, MEDIA_TYPE_JSON};
use parking_lot::RwLock;
use portico_core::{FieldShape, Port, PortField, ValidationFailure};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Resolves the validation schema of a field.
pub trait SchemaResolver: Send + Sync {
    /// Returns the schema for `field`.
    fn resolve(&self, field: &PortField) -> CodecResult<Arc<dyn ValidationSchema>>;
}

impl<F> SchemaResolver for F
where
    F: Fn(&PortField) -> CodecResult<Arc<dyn ValidationSchema>> + Send + Sync,
{
    fn resolve(&self, field: &PortField) -> CodecResult<Arc<dyn ValidationSchema>> {
        self(field)
    }
}

fn resolver_slot() -> &'static RwLock<Option<Arc<dyn SchemaResolver>>> {
    static RESOLVER: OnceLock<RwLock<Option<Arc<dyn SchemaResolver>>>> = OnceLock::new();
    RESOLVER.get_or_init(|| RwLock::new(None))
}

/// Installs the process-wide schema resolver, replacing any previous one.
///
/// Call once at startup, before requests are served.
pub fn register_schema_resolver(resolver: impl SchemaResolver + 'static) {
    *resolver_slot().write() = Some(Arc::new(resolver));
}

/// Returns the process-wide schema resolver.
pub fn registered_schema_resolver() -> Option<Arc<dyn SchemaResolver>> {
    resolver_slot().read().clone()
}

/// Installs [`BaggageSchemaResolver`] unless a resolver is already registered.
pub fn ensure_schema_resolver() {
    let mut slot = resolver_slot().write();
    if slot.is_none() {
        *slot = Some(Arc::new(BaggageSchemaResolver));
    }
}

/// Schema attached to a field's baggage.
#[derive(Debug, Clone)]
pub struct FieldValidationSchema(pub Arc<dyn ValidationSchema>);

/// Reads [`FieldValidationSchema`] from the field baggage, deriving a
/// [`JsonSchema`] from the field tags when none is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaggageSchemaResolver;

impl SchemaResolver for BaggageSchemaResolver {
    fn resolve(&self, field: &PortField) -> CodecResult<Arc<dyn ValidationSchema>> {
        if let Some(attached) = field.baggage.get::<FieldValidationSchema>() {
            return Ok(Arc::clone(&attached.0));
        }
        Ok(Arc::new(JsonSchema::for_field(field)))
    }
}

/// Validates the fields of a request port.
pub struct RequestValidator<'a> {
    port: Option<&'a Port>,
    decoder: &'a RequestDecoder<'a>,
    resolver: Option<Arc<dyn SchemaResolver>>,
}

impl<'a> RequestValidator<'a> {
    /// Creates a validator using the registered resolver.
    pub fn new(port: Option<&'a Port>, decoder: &'a RequestDecoder<'a>) -> Self {
        Self {
            port,
            decoder,
            resolver: registered_schema_resolver(),
        }
    }

    /// Uses `resolver` instead of the registered one.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SchemaResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Validates every field not tagged `validate=false`.
    ///
    /// Schema violations come back as `Ok(Some(tree))`; decode and coercion
    /// errors abort with `Err`.
    pub fn validate_request(&self) -> CodecResult<Option<ValidationFailure>> {
        let Some(port) = self.port else {
            return Ok(None);
        };

        let mut failure = ValidationFailure::new("request");

        for field in port.fields() {
            if field.bool_option("validate") == Some(false) {
                continue;
            }

            if let Err(violations) = self.validate_field(field)? {
                let child = failure.child_entry(&field.name);
                for violation in violations {
                    record_violation(child, violation);
                }
            }
        }

        if failure.children().is_empty() {
            Ok(None)
        } else {
            tracing::debug!(
                port = port.type_name(),
                fields = failure.children().len(),
                "request validation failed"
            );
            Ok(Some(failure))
        }
    }

    /// Validates one field.
    ///
    /// The outer error aborts validation; the inner one carries schema
    /// violations.
    pub fn validate_field(
        &self,
        field: &PortField,
    ) -> CodecResult<Result<(), Vec<SchemaViolation>>> {
        let resolver = self.resolver.as_ref().ok_or(CodecError::NoSchemaResolver)?;
        let schema = resolver.resolve(field)?;

        let value = self.field_value(field, schema.as_ref())?;
        if value.is_none() && field.optional {
            return Ok(Ok(()));
        }

        Ok(schema.validate(&value.unwrap_or(Value::Null)))
    }

    fn field_value(
        &self,
        field: &PortField,
        schema: &dyn ValidationSchema,
    ) -> CodecResult<Option<Value>> {
        let decoder = self.decoder;
        Ok(match field.shape {
            FieldShape::Primitive => match decoder.decode_primitive(field)? {
                Some(raw) => Some(coerce(&raw, &schema.types())?),
                None => None,
            },
            FieldShape::Array => {
                let values = decoder.decode_array(field)?;
                if values.is_empty() {
                    None
                } else {
                    let types = schema
                        .items()
                        .map_or_else(|| JsonSchema::default().types(), |items| items.types());
                    let items = values
                        .iter()
                        .map(|raw| coerce(raw, &types))
                        .collect::<CodecResult<Vec<_>>>()?;
                    Some(Value::Array(items))
                }
            }
            FieldShape::Object => match decoder.decode_object(field)? {
                Some(values) if !values.is_empty() => {
                    let mut object = serde_json::Map::new();
                    for (key, raw) in values {
                        if !schema.is_property_allowed(&key) {
                            continue;
                        }
                        let types = schema
                            .property(&key)
                            .map_or_else(|| JsonSchema::default().types(), |ps| ps.types());
                        let value = match raw {
                            Value::String(text) => coerce(&text, &types)?,
                            other => other,
                        };
                        object.insert(key, value);
                    }
                    Some(Value::Object(object))
                }
                _ => None,
            },
            FieldShape::File => match decoder.decode_file(field)? {
                Some(file) => Some(Value::String(file.text()?)),
                None => None,
            },
            FieldShape::FileArray => {
                let files = decoder.decode_file_array(field)?;
                if files.is_empty() {
                    None
                } else {
                    let texts = files
                        .iter()
                        .map(|file| file.text().map(Value::String))
                        .collect::<CodecResult<Vec<_>>>()?;
                    Some(Value::Array(texts))
                }
            }
            FieldShape::Content => {
                let content = decoder.decode_content(field)?;
                let media_type = content.base_media_type()?;
                if media_type != MEDIA_TYPE_JSON {
                    return Err(CodecError::Validation(format!(
                        "Unsupported content format for JSON Schema validation: {media_type}"
                    )));
                }
                if content.is_present() {
                    Some(content.read_json_value()?)
                } else {
                    None
                }
            }
            FieldShape::Any => decoder.decode_any(field)?,
            FieldShape::Unknown => None,
        })
    }
}

/// Coerces a raw string to the first matching primitive type.
///
/// Types are tried in the order string, number, integer, boolean.
pub fn coerce(raw: &str, types: &[String]) -> CodecResult<Value> {
    let has = |name: &str| types.iter().any(|declared| declared == name);

    if has("string") {
        return Ok(Value::String(raw.to_string()));
    }
    if has("number") {
        let number = raw
            .parse::<f64>()
            .map_err(|e| CodecError::Validation(format!("invalid number {raw:?}: {e}")))?;
        return serde_json::Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| CodecError::Validation(format!("invalid number {raw:?}")));
    }
    if has("integer") {
        return raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| CodecError::Validation(format!("invalid integer {raw:?}: {e}")));
    }
    if has("boolean") {
        return parse_bool(raw)
            .map(Value::Bool)
            .ok_or_else(|| CodecError::Validation(format!("invalid boolean {raw:?}")));
    }
    if has("array") {
        return Err(CodecError::Validation(
            "Cannot convert string to non-primitive type 'array'".to_string(),
        ));
    }
    if has("object") {
        return Err(CodecError::Validation(
            "Cannot convert string to non-primitive type 'object'".to_string(),
        ));
    }

    Err(CodecError::Validation(format!(
        "Cannot determine target type of schema {types:?}"
    )))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Files a violation under the node addressed by its JSON pointer.
fn record_violation(root: &mut ValidationFailure, violation: SchemaViolation) {
    let mut node = root;
    for segment in violation.path.split('/').filter(|segment| !segment.is_empty()) {
        node = node.child_entry(segment);
    }
    node.add_failure(violation.message);
}
