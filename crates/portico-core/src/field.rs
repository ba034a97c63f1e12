//! Field groups, shapes, styles and the reflected [`PortField`].

use crate::Baggage;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The HTTP location a field binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldGroup {
    /// The request method.
    Method,
    /// A request or response header.
    Header,
    /// A request cookie.
    Cookie,
    /// A path template parameter.
    Path,
    /// A query string parameter.
    Query,
    /// A urlencoded or multipart form field.
    Form,
    /// The request or response body.
    Body,
    /// The paging wrapper around a response body.
    Paging,
    /// The response status code.
    Code,
}

impl FieldGroup {
    /// All groups, in declaration order.
    pub const ALL: [FieldGroup; 9] = [
        Self::Method,
        Self::Header,
        Self::Cookie,
        Self::Path,
        Self::Query,
        Self::Form,
        Self::Body,
        Self::Paging,
        Self::Code,
    ];

    /// Returns the tag name of this group.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Path => "path",
            Self::Query => "query",
            Self::Form => "form",
            Self::Body => "body",
            Self::Paging => "paging",
            Self::Code => "code",
        }
    }

    /// Returns the serialization style used when a field does not specify one.
    ///
    /// Groups without a serialization style return `None`.
    #[must_use]
    pub fn default_style(&self) -> Option<FieldStyle> {
        match self {
            Self::Header | Self::Path => Some(FieldStyle::Simple),
            Self::Query | Self::Cookie | Self::Form => Some(FieldStyle::Form),
            _ => None,
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|group| group.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// The structural kind of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    /// A single scalar value.
    Primitive,
    /// A list of scalar values.
    Array,
    /// A string-keyed map.
    Object,
    /// A single uploaded file.
    File,
    /// A list of uploaded files.
    FileArray,
    /// Content serialized according to the media type.
    Content,
    /// Any JSON value.
    Any,
    /// A type the reflector cannot classify.
    Unknown,
}

impl FieldShape {
    /// Returns the lower-case name of this shape.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Array => "array",
            Self::Object => "object",
            Self::File => "file",
            Self::FileArray => "file-array",
            Self::Content => "content",
            Self::Any => "any",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI 3 parameter serialization style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldStyle {
    /// `simple` (header, path).
    Simple,
    /// `form` (query, cookie).
    Form,
    /// `spaceDelimited` (query arrays and objects).
    SpaceDelimited,
    /// `pipeDelimited` (query arrays and objects).
    PipeDelimited,
    /// `deepObject` (query objects).
    DeepObject,
    /// `matrix` (path, never decoded).
    Matrix,
    /// `label` (path, never decoded).
    Label,
    /// Any other style name.
    Other(String),
}

impl FieldStyle {
    /// Parses a style name. Unrecognised names become [`FieldStyle::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "simple" => Self::Simple,
            "form" => Self::Form,
            "spaceDelimited" => Self::SpaceDelimited,
            "pipeDelimited" => Self::PipeDelimited,
            "deepObject" => Self::DeepObject,
            "matrix" => Self::Matrix,
            "label" => Self::Label,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the OpenAPI name of this style.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Simple => "simple",
            Self::Form => "form",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
            Self::DeepObject => "deepObject",
            Self::Matrix => "matrix",
            Self::Label => "label",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for FieldStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one struct field, emitted by the derive macros.
///
/// `tag` holds the primary binding in the form
/// `group[=peer][,option[=value]]*`; `tags` holds supplemental attributes
/// such as `description` or `required`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: &'static str,
    /// Primary binding tag.
    pub tag: &'static str,
    /// Supplemental `(key, value)` attributes.
    pub tags: &'static [(&'static str, &'static str)],
    /// Shape of the field type.
    pub shape: FieldShape,
    /// Whether the field type can be absent (`Option<T>`).
    pub optional: bool,
}

impl FieldDescriptor {
    /// Creates a descriptor with no supplemental tags.
    #[must_use]
    pub const fn new(
        name: &'static str,
        tag: &'static str,
        shape: FieldShape,
        optional: bool,
    ) -> Self {
        Self {
            name,
            tag,
            tags: &[],
            shape,
            optional,
        }
    }

    /// Sets the supplemental tags.
    #[must_use]
    pub const fn with_tags(self, tags: &'static [(&'static str, &'static str)]) -> Self {
        Self { tags, ..self }
    }
}

/// One bound field of a [`Port`](crate::Port).
///
/// Created by the reflector and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PortField {
    /// Rust field name.
    pub name: String,
    /// Wire name.
    pub peer: String,
    /// HTTP location.
    pub group: FieldGroup,
    /// Structural kind.
    pub shape: FieldShape,
    /// Whether absence is acceptable.
    pub optional: bool,
    /// Position of the field within its struct.
    pub index: usize,
    /// Tag-derived options (`style`, `explode`, `enum`, `mime`, ...).
    pub options: BTreeMap<String, String>,
    /// Externally attached artifacts.
    pub baggage: Baggage,
}

impl PortField {
    /// Creates a field with no options.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        peer: impl Into<String>,
        group: FieldGroup,
        shape: FieldShape,
        optional: bool,
    ) -> Self {
        Self {
            name: name.into(),
            peer: peer.into(),
            group,
            shape,
            optional,
            index: 0,
            options: BTreeMap::new(),
            baggage: Baggage::new(),
        }
    }

    /// Sets an option, replacing any previous value.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Returns an option value.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Returns a boolean option: `None` when unset, otherwise `value == "true"`.
    #[must_use]
    pub fn bool_option(&self, name: &str) -> Option<bool> {
        self.option(name).map(|value| value == "true")
    }

    /// Returns the explicitly specified style, if any.
    #[must_use]
    pub fn specified_style(&self) -> Option<FieldStyle> {
        self.option("style")
            .filter(|style| !style.is_empty())
            .map(FieldStyle::parse)
    }

    /// Returns the specified style or the group default.
    #[must_use]
    pub fn style(&self) -> Option<FieldStyle> {
        self.specified_style().or_else(|| self.group.default_style())
    }

    /// Returns the `explode` option, defaulting to `false`.
    #[must_use]
    pub fn explode(&self) -> bool {
        self.bool_option("explode").unwrap_or(false)
    }

    /// Returns true unless the field is optional.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional
    }

    /// Returns the comma separated `enum` option values.
    #[must_use]
    pub fn enum_values(&self) -> Vec<&str> {
        match self.option("enum") {
            Some(values) if !values.is_empty() => values.split(',').collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the `default` option shaped by the field shape.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        self.shaped_option("default")
    }

    /// Returns the `const` option shaped by the field shape.
    #[must_use]
    pub fn const_value(&self) -> Option<Value> {
        self.shaped_option("const")
    }

    fn shaped_option(&self, name: &str) -> Option<Value> {
        let raw = self.option(name)?;
        match self.shape {
            FieldShape::Primitive => Some(Value::String(raw.to_string())),
            FieldShape::Array => Some(Value::Array(
                raw.split(',')
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            FieldShape::Object | FieldShape::Any => serde_json::from_str(raw).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_round_trip() {
        for group in FieldGroup::ALL {
            assert_eq!(group.as_str().parse::<FieldGroup>(), Ok(group));
        }
        assert_eq!("nowhere".parse::<FieldGroup>(), Err("nowhere".to_string()));
    }

    #[test]
    fn test_default_styles() {
        assert_eq!(FieldGroup::Header.default_style(), Some(FieldStyle::Simple));
        assert_eq!(FieldGroup::Path.default_style(), Some(FieldStyle::Simple));
        assert_eq!(FieldGroup::Query.default_style(), Some(FieldStyle::Form));
        assert_eq!(FieldGroup::Cookie.default_style(), Some(FieldStyle::Form));
        assert_eq!(FieldGroup::Body.default_style(), None);
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(FieldStyle::parse("deepObject"), FieldStyle::DeepObject);
        assert_eq!(FieldStyle::parse("matrix").as_str(), "matrix");
        assert_eq!(
            FieldStyle::parse("tabDelimited"),
            FieldStyle::Other("tabDelimited".into())
        );
    }

    #[test]
    fn test_bool_option() {
        let field = PortField::new("x", "x", FieldGroup::Query, FieldShape::Array, true)
            .with_option("explode", "true")
            .with_option("validate", "no");

        assert_eq!(field.bool_option("explode"), Some(true));
        assert_eq!(field.bool_option("validate"), Some(false));
        assert_eq!(field.bool_option("missing"), None);
        assert!(field.explode());
    }

    #[test]
    fn test_style_defaults_to_group() {
        let field = PortField::new("color", "color", FieldGroup::Query, FieldShape::Array, true);
        assert_eq!(field.specified_style(), None);
        assert_eq!(field.style(), Some(FieldStyle::Form));
        assert!(!field.explode());
    }

    #[test]
    fn test_shaped_defaults() {
        let array = PortField::new("tags", "tags", FieldGroup::Query, FieldShape::Array, true)
            .with_option("default", "a,b");
        assert_eq!(array.default_value(), Some(serde_json::json!(["a", "b"])));

        let object = PortField::new("f", "f", FieldGroup::Query, FieldShape::Object, true)
            .with_option("const", r#"{"k":1}"#);
        assert_eq!(object.const_value(), Some(serde_json::json!({"k": 1})));

        let file = PortField::new("f", "f", FieldGroup::Form, FieldShape::File, true)
            .with_option("default", "x");
        assert_eq!(file.default_value(), None);
    }

    #[test]
    fn test_enum_values() {
        let field = PortField::new("code", "code", FieldGroup::Code, FieldShape::Primitive, true)
            .with_option("enum", "200,404");
        assert_eq!(field.enum_values(), vec!["200", "404"]);
    }
}
