//! Ports: the reflected description of an operation's inputs or outputs.

use crate::{FieldDescriptor, FieldGroup, PortField};
use std::fmt;

/// Which side of an operation a port describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Request (inputs), tag key `req`.
    In,
    /// Response (outputs), tag key `resp`.
    Out,
}

impl PortDirection {
    /// Returns the attribute key used for this direction.
    #[must_use]
    pub const fn tag_key(&self) -> &'static str {
        match self {
            Self::In => "req",
            Self::Out => "resp",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("request"),
            Self::Out => f.write_str("response"),
        }
    }
}

/// Static description of a port struct, emitted by the derive macros.
#[derive(Debug, Clone, Copy)]
pub struct PortDescriptor {
    /// Rust type name of the struct.
    pub type_name: &'static str,
    /// Field descriptors in declaration order.
    pub fields: &'static [FieldDescriptor],
}

/// An ordered, immutable list of [`PortField`]s.
#[derive(Debug, Clone)]
pub struct Port {
    direction: PortDirection,
    type_name: String,
    fields: Vec<PortField>,
}

impl Port {
    /// Creates a port from already reflected fields.
    #[must_use]
    pub fn new(direction: PortDirection, type_name: impl Into<String>, fields: Vec<PortField>) -> Self {
        Self {
            direction,
            type_name: type_name.into(),
            fields,
        }
    }

    /// Returns the port direction.
    #[must_use]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Returns the name of the reflected struct.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns all fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[PortField] {
        &self.fields
    }

    /// Returns the field with the given Rust name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PortField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns the first field matching `predicate`.
    pub fn first(&self, predicate: impl Fn(&PortField) -> bool) -> Option<&PortField> {
        self.fields.iter().find(|field| predicate(field))
    }

    /// Returns every field matching `predicate`.
    pub fn all(&self, predicate: impl Fn(&PortField) -> bool) -> Vec<&PortField> {
        self.fields.iter().filter(|field| predicate(field)).collect()
    }

    /// Returns every field in `group`.
    #[must_use]
    pub fn group(&self, group: FieldGroup) -> Vec<&PortField> {
        self.all(|field| field.group == group)
    }
}

/// Returns true for the status code field.
pub fn is_code(field: &PortField) -> bool {
    field.group == FieldGroup::Code
}

/// Returns true for a paging wrapper field.
pub fn is_paging(field: &PortField) -> bool {
    field.group == FieldGroup::Paging
}

/// Returns true for a body field not marked `error`.
pub fn is_success_body(field: &PortField) -> bool {
    field.group == FieldGroup::Body && field.bool_option("error") != Some(true)
}

/// Returns true for a body field marked `error`.
pub fn is_error_body(field: &PortField) -> bool {
    field.group == FieldGroup::Body && field.bool_option("error") == Some(true)
}

/// Returns true for a header field.
pub fn is_header(field: &PortField) -> bool {
    field.group == FieldGroup::Header
}

/// Returns true for a header written on success responses.
pub fn is_success_header(field: &PortField) -> bool {
    is_header(field) && field.bool_option("error") != Some(true)
}

/// Returns true for a header written on error responses.
pub fn is_error_header(field: &PortField) -> bool {
    is_header(field) && field.bool_option("success") != Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldShape;

    fn sample() -> Port {
        Port::new(
            PortDirection::Out,
            "Outputs",
            vec![
                PortField::new("code", "code", FieldGroup::Code, FieldShape::Primitive, true),
                PortField::new("body", "body", FieldGroup::Body, FieldShape::Content, false),
                PortField::new("problem", "problem", FieldGroup::Body, FieldShape::Content, true)
                    .with_option("error", "true"),
                PortField::new("etag", "Etag", FieldGroup::Header, FieldShape::Primitive, true)
                    .with_option("success", "true"),
                PortField::new("retry", "Retry", FieldGroup::Header, FieldShape::Primitive, true)
                    .with_option("error", "true"),
            ],
        )
    }

    #[test]
    fn test_body_predicates() {
        let port = sample();
        assert_eq!(port.first(is_success_body).map(|f| f.name.as_str()), Some("body"));
        assert_eq!(port.first(is_error_body).map(|f| f.name.as_str()), Some("problem"));
        assert_eq!(port.first(is_code).map(|f| f.name.as_str()), Some("code"));
        assert!(port.first(is_paging).is_none());
    }

    #[test]
    fn test_header_predicates() {
        let port = sample();
        let success: Vec<_> = port.all(is_success_header).iter().map(|f| f.name.clone()).collect();
        let error: Vec<_> = port.all(is_error_header).iter().map(|f| f.name.clone()).collect();
        assert_eq!(success, vec!["etag"]);
        assert_eq!(error, vec!["retry"]);
    }

    #[test]
    fn test_direction_tag_keys() {
        assert_eq!(PortDirection::In.tag_key(), "req");
        assert_eq!(PortDirection::Out.tag_key(), "resp");
        assert_eq!(sample().group(FieldGroup::Header).len(), 2);
    }
}
