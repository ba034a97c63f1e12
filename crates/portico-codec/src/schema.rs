//! Validation schemas consumed by the request validator.
//!
//! [`ValidationSchema`] is the capability the validator needs; schema
//! generation lives elsewhere. [`JsonSchema`] is a small built-in subset of
//! JSON Schema (types, items, properties, required, enum, const, bounds,
//! lengths, pattern) used when no richer schema is attached to a field.

use portico_core::{FieldShape, PortField};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// JSON types in coercion priority order.
pub const ALL_TYPES: [&str; 7] = [
    "null", "array", "object", "string", "integer", "number", "boolean",
];

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer of the offending value (`""` for the root).
    pub path: String,
    /// Human readable message.
    pub message: String,
}

impl SchemaViolation {
    /// Creates a violation.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A per-field schema.
pub trait ValidationSchema: Send + Sync + fmt::Debug {
    /// Admitted JSON types; every type when unconstrained.
    fn types(&self) -> Vec<String>;

    /// Schema of array items.
    fn items(&self) -> Option<Arc<dyn ValidationSchema>>;

    /// Schema of an object property.
    fn property(&self, name: &str) -> Option<Arc<dyn ValidationSchema>>;

    /// Whether an object may carry `name`.
    fn is_property_allowed(&self, name: &str) -> bool;

    /// Validates a value.
    fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>>;
}

/// `type` as a single name or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaTypes {
    /// One type.
    One(String),
    /// Several types.
    Many(Vec<String>),
}

impl SchemaTypes {
    fn names(&self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name.clone()],
            Self::Many(names) => names.clone(),
        }
    }
}

/// `additionalProperties` as a flag or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// Allowed or not.
    Allowed(bool),
    /// Allowed, validated by a schema.
    Schema(Box<JsonSchema>),
}

/// A JSON Schema subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonSchema {
    /// `type`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<SchemaTypes>,
    /// `items`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    /// `properties`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, JsonSchema>,
    /// `additionalProperties`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    /// `required`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// `enum`
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    /// `const`
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// `minimum`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// `maximum`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// `minLength`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// `maxLength`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// `minItems`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    /// `maxItems`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// `pattern`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl JsonSchema {
    /// Creates a schema admitting a single type.
    pub fn of_type(name: impl Into<String>) -> Self {
        Self {
            types: Some(SchemaTypes::One(name.into())),
            ..Self::default()
        }
    }

    /// Derives a schema from the field's shape and tag options
    /// (`type`, `items`, `enum`, `const`, `minimum`, `maximum`,
    /// `minLength`, `maxLength`, `pattern`).
    #[must_use]
    pub fn for_field(field: &PortField) -> Self {
        let declared = field.option("type").filter(|name| !name.is_empty());
        let item_type = field.option("items").filter(|name| !name.is_empty());

        let mut schema = match field.shape {
            FieldShape::Primitive | FieldShape::File => {
                JsonSchema::of_type(declared.unwrap_or("string"))
            }
            FieldShape::Array | FieldShape::FileArray => JsonSchema {
                items: Some(Box::new(JsonSchema::of_type(item_type.unwrap_or("string")))),
                ..JsonSchema::of_type("array")
            },
            FieldShape::Object => JsonSchema {
                additional_properties: Some(AdditionalProperties::Schema(Box::new(
                    JsonSchema::of_type(item_type.unwrap_or("string")),
                ))),
                ..JsonSchema::of_type("object")
            },
            FieldShape::Content | FieldShape::Any | FieldShape::Unknown => JsonSchema::default(),
        };

        if field.shape == FieldShape::Array {
            if let Some(items) = schema.items.as_deref_mut() {
                apply_constraints(items, field);
            }
        } else {
            apply_constraints(&mut schema, field);
        }

        schema.const_value = field.const_value();
        schema
    }

    fn type_names(&self) -> Option<Vec<String>> {
        self.types.as_ref().map(SchemaTypes::names)
    }

    fn check(&self, value: &Value, path: &str, violations: &mut Vec<SchemaViolation>) {
        if let Some(types) = self.type_names() {
            if !types.iter().any(|name| type_matches(name, value)) {
                violations.push(SchemaViolation::new(
                    path,
                    format!("expected {}, but got {}", types.join(" or "), json_type(value)),
                ));
                return;
            }
        }

        if !self.enum_values.is_empty() && !self.enum_values.contains(value) {
            let allowed: Vec<String> = self.enum_values.iter().map(Value::to_string).collect();
            violations.push(SchemaViolation::new(
                path,
                format!("value must be one of {}", allowed.join(", ")),
            ));
        }

        if let Some(expected) = &self.const_value {
            if expected != value && !const_matches_text(expected, value) {
                violations.push(SchemaViolation::new(path, format!("value must be {expected}")));
            }
        }

        match value {
            Value::Number(number) => self.check_number(number.as_f64(), path, violations),
            Value::String(text) => self.check_string(text, path, violations),
            Value::Array(items) => self.check_array(items, path, violations),
            Value::Object(object) => self.check_object(object, path, violations),
            Value::Null | Value::Bool(_) => {}
        }
    }

    fn check_number(&self, number: Option<f64>, path: &str, violations: &mut Vec<SchemaViolation>) {
        let Some(number) = number else {
            return;
        };
        if let Some(minimum) = self.minimum {
            if number < minimum {
                violations.push(SchemaViolation::new(path, format!("must be >= {minimum} but found {number}")));
            }
        }
        if let Some(maximum) = self.maximum {
            if number > maximum {
                violations.push(SchemaViolation::new(path, format!("must be <= {maximum} but found {number}")));
            }
        }
    }

    fn check_string(&self, text: &str, path: &str, violations: &mut Vec<SchemaViolation>) {
        let length = text.chars().count();
        if let Some(min) = self.min_length {
            if length < min {
                violations.push(SchemaViolation::new(path, format!("length must be >= {min}, but got {length}")));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                violations.push(SchemaViolation::new(path, format!("length must be <= {max}, but got {length}")));
            }
        }
        if let Some(pattern) = &self.pattern {
            match Regex::new(pattern) {
                Ok(regex) if !regex.is_match(text) => violations.push(SchemaViolation::new(
                    path,
                    format!("does not match pattern {pattern:?}"),
                )),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "invalid schema pattern");
                }
            }
        }
    }

    fn check_array(&self, items: &[Value], path: &str, violations: &mut Vec<SchemaViolation>) {
        if let Some(min) = self.min_items {
            if items.len() < min {
                violations.push(SchemaViolation::new(path, format!("minimum {min} items required, but found {}", items.len())));
            }
        }
        if let Some(max) = self.max_items {
            if items.len() > max {
                violations.push(SchemaViolation::new(path, format!("maximum {max} items allowed, but found {}", items.len())));
            }
        }
        if let Some(schema) = &self.items {
            for (index, item) in items.iter().enumerate() {
                schema.check(item, &format!("{path}/{index}"), violations);
            }
        }
    }

    fn check_object(
        &self,
        object: &serde_json::Map<String, Value>,
        path: &str,
        violations: &mut Vec<SchemaViolation>,
    ) {
        for name in &self.required {
            if !object.contains_key(name) {
                violations.push(SchemaViolation::new(
                    path,
                    format!("missing properties: {name:?}"),
                ));
            }
        }

        for (name, value) in object {
            let child = format!("{path}/{name}");
            match (self.properties.get(name), &self.additional_properties) {
                (Some(schema), _) => schema.check(value, &child, violations),
                (None, Some(AdditionalProperties::Schema(schema))) => {
                    schema.check(value, &child, violations);
                }
                (None, Some(AdditionalProperties::Allowed(false))) => {
                    violations.push(SchemaViolation::new(
                        path,
                        format!("additionalProperties {name:?} not allowed"),
                    ));
                }
                (None, _) => {}
            }
        }
    }
}

impl ValidationSchema for JsonSchema {
    fn types(&self) -> Vec<String> {
        match self.type_names() {
            Some(names) => ALL_TYPES
                .iter()
                .filter(|name| names.iter().any(|declared| declared == *name))
                .map(|name| (*name).to_string())
                .collect(),
            None => ALL_TYPES.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    fn items(&self) -> Option<Arc<dyn ValidationSchema>> {
        self.items
            .as_ref()
            .map(|items| Arc::new(items.as_ref().clone()) as Arc<dyn ValidationSchema>)
    }

    fn property(&self, name: &str) -> Option<Arc<dyn ValidationSchema>> {
        if let Some(schema) = self.properties.get(name) {
            return Some(Arc::new(schema.clone()));
        }
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(Arc::new(schema.as_ref().clone())),
            Some(AdditionalProperties::Allowed(true)) | None => Some(Arc::new(JsonSchema::default())),
            Some(AdditionalProperties::Allowed(false)) => None,
        }
    }

    fn is_property_allowed(&self, name: &str) -> bool {
        self.properties.contains_key(name)
            || matches!(
                self.additional_properties,
                Some(AdditionalProperties::Allowed(true) | AdditionalProperties::Schema(_))
            )
    }

    fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        self.check(value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn apply_constraints(target: &mut JsonSchema, field: &PortField) {
    let number = |name: &str| field.option(name).and_then(|raw| raw.parse::<f64>().ok());
    let size = |name: &str| field.option(name).and_then(|raw| raw.parse::<usize>().ok());

    target.enum_values = field
        .enum_values()
        .into_iter()
        .map(|value| typed_literal(value, target.types.as_ref()))
        .collect();
    target.minimum = number("minimum");
    target.maximum = number("maximum");
    target.min_length = size("minLength");
    target.max_length = size("maxLength");
    target.pattern = field.option("pattern").map(str::to_string);
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match (name, value) {
        ("null", Value::Null)
        | ("boolean", Value::Bool(_))
        | ("string", Value::String(_))
        | ("array", Value::Array(_))
        | ("object", Value::Object(_))
        | ("number", Value::Number(_)) => true,
        ("integer", Value::Number(number)) => {
            number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Converts an `enum` tag entry to the JSON type of the schema.
fn typed_literal(raw: &str, types: Option<&SchemaTypes>) -> Value {
    let names = types.map(SchemaTypes::names).unwrap_or_default();
    let wants = |name: &str| names.iter().any(|declared| declared == name);

    if wants("integer") {
        if let Ok(number) = raw.parse::<i64>() {
            return Value::from(number);
        }
    }
    if wants("number") {
        if let Some(number) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(number);
        }
    }
    if wants("boolean") {
        if let Ok(flag) = raw.parse::<bool>() {
            return Value::Bool(flag);
        }
    }
    Value::String(raw.to_string())
}

/// `const` tags arrive as text; accept a typed value with the same rendering.
fn const_matches_text(expected: &Value, value: &Value) -> bool {
    match (expected, value) {
        (Value::String(text), Value::Number(_) | Value::Bool(_)) => *text == value.to_string(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::FieldGroup;
    use serde_json::json;

    #[test]
    fn test_deserialize_subset() {
        let schema: JsonSchema = serde_json::from_value(json!({
            "type": "object",
            "properties": {"name": {"type": "string", "minLength": 2}},
            "required": ["name"],
        }))
        .unwrap();

        assert!(schema.validate(&json!({"name": "ok"})).is_ok());

        let violations = schema.validate(&json!({"name": "x"})).unwrap_err();
        assert_eq!(violations[0].path, "/name");

        let violations = schema.validate(&json!({})).unwrap_err();
        assert!(violations[0].message.contains("missing properties"));
    }

    #[test]
    fn test_types_are_filtered_and_ordered() {
        let schema: JsonSchema =
            serde_json::from_value(json!({"type": ["integer", "string"]})).unwrap();
        assert_eq!(schema.types(), vec!["string", "integer"]);
        assert_eq!(JsonSchema::default().types().len(), ALL_TYPES.len());
    }

    #[test]
    fn test_null_rejected_unless_declared() {
        let schema = JsonSchema::of_type("string");
        let violations = schema.validate(&Value::Null).unwrap_err();
        assert_eq!(violations[0].message, "expected string, but got null");
    }

    #[test]
    fn test_property_allowance() {
        let mut schema = JsonSchema::of_type("object");
        schema.properties.insert("known".into(), JsonSchema::of_type("integer"));
        assert!(schema.is_property_allowed("known"));
        assert!(!schema.is_property_allowed("other"));

        schema.additional_properties = Some(AdditionalProperties::Allowed(true));
        assert!(schema.is_property_allowed("other"));
        assert_eq!(schema.property("known").unwrap().types(), vec!["integer"]);
    }

    #[test]
    fn test_for_field_enum_and_bounds() {
        let field = PortField::new("limit", "limit", FieldGroup::Query, FieldShape::Primitive, true)
            .with_option("type", "integer")
            .with_option("minimum", "1")
            .with_option("maximum", "100")
            .with_option("enum", "10,50,100");
        let schema = JsonSchema::for_field(&field);

        assert!(schema.validate(&json!(50)).is_ok());
        assert!(schema.validate(&json!(0)).is_err());
        assert!(schema.validate(&json!(20)).is_err());
        assert!(schema.validate(&json!("50")).is_err());
    }

    #[test]
    fn test_for_field_array_items() {
        let field = PortField::new("tags", "tags", FieldGroup::Query, FieldShape::Array, true)
            .with_option("items", "integer")
            .with_option("enum", "1,2");
        let schema = JsonSchema::for_field(&field);
        assert_eq!(schema.items().unwrap().types(), vec!["integer"]);
        assert!(schema.validate(&json!([1, 2])).is_ok());

        let violations = schema.validate(&json!([1, 3])).unwrap_err();
        assert_eq!(violations[0].path, "/1");
    }

    #[test]
    fn test_pattern() {
        let field = PortField::new("id", "id", FieldGroup::Path, FieldShape::Primitive, false)
            .with_option("pattern", "^[a-f0-9]+$");
        let schema = JsonSchema::for_field(&field);
        assert!(schema.validate(&json!("abc123")).is_ok());
        assert!(schema.validate(&json!("xyz")).is_err());
    }
}
