//! Endpoint error types.

use portico_core::PortError;
use thiserror::Error;

/// Errors raised while building an endpoint or rendering its response.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// `build()` was called without a handler.
    #[error("No handler set for operation {operation:?}")]
    NoHandler {
        /// Operation id of the endpoint.
        operation: String,
    },

    /// An input or output port failed reflection.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The path template could not be compiled.
    #[error("Invalid path template {path:?}: {message}")]
    InvalidPath {
        /// The template.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// The validator takes a different type than the bound inputs.
    #[error("Validator for operation {operation:?} takes {validator}, but the inputs are {}", inputs.unwrap_or("not bound"))]
    ValidatorMismatch {
        /// Operation id of the endpoint.
        operation: String,
        /// Type the validator accepts.
        validator: &'static str,
        /// Bound input type, if any.
        inputs: Option<&'static str>,
    },

    /// One step of response population failed.
    #[error("Failed to {stage}")]
    Response {
        /// The failed step, e.g. "set response headers".
        stage: &'static str,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// The declared error payload cannot be built from an error.
    #[error("Response serialization failed - invalid error payload type {type_name}: {message}")]
    UnsupportedErrorPayload {
        /// Declared payload type.
        type_name: &'static str,
        /// The error being rendered.
        message: String,
    },

    /// A status code outside the valid range.
    #[error("Invalid status code {0}")]
    InvalidStatusCode(u16),
}

impl EndpointError {
    pub(crate) fn response(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Response {
            stage,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_response_error_keeps_source() {
        let err = EndpointError::response("set response headers", anyhow::anyhow!("bad header"));
        assert_eq!(err.to_string(), "Failed to set response headers");
        assert_eq!(err.source().unwrap().to_string(), "bad header");
    }

    #[test]
    fn test_no_handler_message() {
        let err = EndpointError::NoHandler {
            operation: "listDevices".into(),
        };
        assert_eq!(err.to_string(), "No handler set for operation \"listDevices\"");
    }

    #[test]
    fn test_validator_mismatch_message() {
        let err = EndpointError::ValidatorMismatch {
            operation: "search".into(),
            validator: "u32",
            inputs: None,
        };
        assert_eq!(
            err.to_string(),
            "Validator for operation \"search\" takes u32, but the inputs are not bound"
        );
    }
}
