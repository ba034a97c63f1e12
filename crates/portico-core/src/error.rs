//! Error types shared across Portico.
//!
//! - [`PortError`] - registration-time reflection failures
//! - [`StatusError`] - an error carrying the HTTP status it should produce
//! - [`ValidationFailure`] - a tree of per-field validation failures
//! - [`ErrorList`] - several independent errors reported together

use crate::{FieldGroup, FieldShape, Pojo};
use http::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Port reflection failed.
///
/// These are registration-time errors: they abort endpoint construction and
/// never reach a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The tag names a group the reflector does not accept.
    #[error("Invalid group {group:?} on field {field:?}, expected one of {allowed:?}")]
    UnknownGroup {
        /// Field name.
        field: String,
        /// Group named by the tag.
        group: String,
        /// Comma separated accepted groups.
        allowed: String,
    },

    /// The field shape is not accepted by its group.
    #[error("Field {field:?}: shape {shape} is not allowed in group {group}")]
    DisallowedShape {
        /// Field name.
        field: String,
        /// Field group.
        group: FieldGroup,
        /// Field shape.
        shape: FieldShape,
    },

    /// More fields target a group than its cardinality permits.
    #[error("Group {group} accepts at most {max} field(s), found {found}")]
    Cardinality {
        /// The overfull group.
        group: FieldGroup,
        /// Maximum accepted fields.
        max: usize,
        /// Fields found.
        found: usize,
    },

    /// The field carries a style but its group has none.
    #[error("Field {field:?}: group {group} does not accept a style")]
    StyleNotAllowed {
        /// Field name.
        field: String,
        /// Field group.
        group: FieldGroup,
    },
}

/// Types that know which HTTP status they should produce.
pub trait StatusCodeProvider {
    /// Returns the HTTP status code.
    fn status_code(&self) -> StatusCode;
}

/// An error paired with the HTTP status code it maps to.
///
/// Displays as its cause, so the status never leaks into messages.
///
/// # Example
///
/// ```
/// use portico_core::{StatusCodeProvider, StatusError};
/// use http::StatusCode;
///
/// let err = StatusError::not_found(anyhow::anyhow!("device 42 not found"));
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(err.to_string(), "device 42 not found");
/// ```
#[derive(Debug)]
pub struct StatusError {
    status: StatusCode,
    source: anyhow::Error,
}

impl StatusError {
    /// Pairs `source` with `status`.
    pub fn new(status: StatusCode, source: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, source)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, source)
    }

    /// 403 Forbidden.
    pub fn forbidden(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::FORBIDDEN, source)
    }

    /// 404 Not Found.
    pub fn not_found(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::NOT_FOUND, source)
    }

    /// 409 Conflict.
    pub fn conflict(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::CONFLICT, source)
    }

    /// 500 Internal Server Error.
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, source)
    }

    /// Returns the underlying error.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }

    /// Splits into status and underlying error.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, anyhow::Error) {
        (self.status, self.source)
    }
}

impl StatusCodeProvider for StatusError {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl std::error::Error for StatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + Send + Sync + 'static) = self.source.as_ref();
        Some(source)
    }
}

/// Several independent errors reported as one.
///
/// Envelope error bodies list each entry separately in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(pub Vec<String>);

impl ErrorList {
    /// Returns the individual messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ErrorList {}

/// Tree of validation failures keyed by field name.
///
/// The validator records every violated field rather than stopping at the
/// first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    path: String,
    failures: Vec<String>,
    children: BTreeMap<String, ValidationFailure>,
}

impl ValidationFailure {
    /// Creates an empty failure rooted at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Returns the path of this node.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the failures recorded directly on this node.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Returns the child nodes.
    #[must_use]
    pub fn children(&self) -> &BTreeMap<String, ValidationFailure> {
        &self.children
    }

    /// Returns the child node for `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ValidationFailure> {
        self.children.get(name)
    }

    /// Records a failure message on this node.
    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Attaches a child node.
    pub fn add_child(&mut self, name: impl Into<String>, child: ValidationFailure) {
        self.children.insert(name.into(), child);
    }

    /// Returns the child node for `name`, creating it at `<path>/<name>`.
    pub fn child_entry(&mut self, name: &str) -> &mut ValidationFailure {
        let path = format!("{}/{}", self.path, name);
        self.children
            .entry(name.to_string())
            .or_insert_with(|| ValidationFailure::new(path))
    }

    /// Returns true when neither this node nor any child holds a failure.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.children.values().all(ValidationFailure::is_empty)
    }

    /// Renders the tree as a JSON object.
    ///
    /// Direct failures appear under `.failures`; children under their name.
    #[must_use]
    pub fn to_pojo(&self) -> Option<Pojo> {
        if self.failures.is_empty() && self.children.is_empty() {
            return None;
        }

        let mut result = Pojo::new();
        if !self.failures.is_empty() {
            result.insert(
                ".failures".to_string(),
                Value::Array(self.failures.iter().cloned().map(Value::String).collect()),
            );
        }
        for (name, child) in &self.children {
            let value = child.to_pojo().map_or(Value::Null, Value::Object);
            result.insert(name.clone(), value);
        }
        Some(result)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation failed")
    }
}

impl std::error::Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_error_displays_cause() {
        let err = StatusError::conflict(anyhow::anyhow!("duplicate name"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "duplicate name");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_status_error_into_parts() {
        let (status, cause) = StatusError::forbidden(anyhow::anyhow!("nope")).into_parts();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(cause.to_string(), "nope");
    }

    #[test]
    fn test_status_error_helpers() {
        let cases = [
            (StatusError::bad_request(anyhow::anyhow!("x")), 400),
            (StatusError::unauthorized(anyhow::anyhow!("x")), 401),
            (StatusError::not_found(anyhow::anyhow!("x")), 404),
            (StatusError::internal(anyhow::anyhow!("x")), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code);
        }
    }

    #[test]
    fn test_validation_failure_tree() {
        let mut root = ValidationFailure::new("request");
        assert!(root.is_empty());
        assert!(root.to_pojo().is_none());

        let mut child = ValidationFailure::new("request/limit");
        child.add_failure("must be >= 1");
        root.add_child("limit", child);

        assert!(!root.is_empty());
        assert_eq!(root.to_string(), "Validation failed");
        let pojo = root.to_pojo().unwrap();
        assert_eq!(
            Value::Object(pojo),
            serde_json::json!({"limit": {".failures": ["must be >= 1"]}})
        );
    }

    #[test]
    fn test_port_error_messages() {
        let err = PortError::UnknownGroup {
            field: "Id".into(),
            group: "matrix".into(),
            allowed: "path,query".into(),
        };
        assert!(err.to_string().contains("matrix"));
        assert!(err.to_string().contains("path,query"));
    }

    #[test]
    fn test_error_list_display() {
        let list = ErrorList(vec!["a".into(), "b".into()]);
        assert_eq!(list.to_string(), "a; b");
        assert_eq!(list.messages().len(), 2);
    }
}
