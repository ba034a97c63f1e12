//! Codec error types.

use portico_core::{FieldGroup, FieldShape};
use thiserror::Error;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding requests, encoding responses or
/// validating decoded values.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The field group has no request data source.
    #[error("Unknown field source: {0}")]
    UnknownFieldSource(FieldGroup),

    /// The style (or style and explode combination) is not implemented for
    /// the field group.
    #[error("Unsupported style: {0}")]
    UnsupportedStyle(String),

    /// A required file field had no upload.
    #[error("Missing required file: {0}")]
    MissingRequiredFile(String),

    /// The shape cannot be decoded by this codec.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The shape cannot be read from the field group.
    #[error("Cannot retrieve \"{shape}\" value from field group \"{group}\"")]
    IncompatibleGroup {
        /// Requested shape.
        shape: FieldShape,
        /// Field group.
        group: FieldGroup,
    },

    /// No content encoder is registered under this name.
    #[error("Unknown encoder: {0}")]
    UnknownEncoding(String),

    /// No marshaler handles this media type.
    #[error("Unknown marshaler: {0}")]
    UnknownMarshaler(String),

    /// The media type could not be parsed.
    #[error("Invalid media type {0:?}")]
    InvalidMediaType(String),

    /// The form body could not be parsed.
    #[error("Failed to parse form: {0}")]
    Form(String),

    /// A value could not be converted to or from its wire form.
    #[error("Field {field:?}: {message}")]
    Conversion {
        /// Field name.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// No schema resolver has been registered.
    #[error("No port field validation schema resolver registered")]
    NoSchemaResolver,

    /// Schema based validation could not be carried out.
    #[error("{0}")]
    Validation(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header {0:?}")]
    InvalidHeader(String),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Reading or writing content failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Creates a conversion error.
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CodecError::UnsupportedStyle("matrix".into()).to_string(),
            "Unsupported style: matrix"
        );
        assert_eq!(
            CodecError::UnknownFieldSource(FieldGroup::Paging).to_string(),
            "Unknown field source: paging"
        );
        assert_eq!(
            CodecError::MissingRequiredFile("avatar".into()).to_string(),
            "Missing required file: avatar"
        );
    }

    #[test]
    fn test_conversion_helper() {
        let err = CodecError::conversion("limit", "invalid digit");
        assert_eq!(err.to_string(), "Field \"limit\": invalid digit");
    }
}
