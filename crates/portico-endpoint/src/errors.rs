//! Error body payloads.
//!
//! An endpoint renders errors through one of four strategies, chosen when the
//! endpoint is built from its declared error payload type:
//!
//! - [`ErrorBodyStrategy::Envelope`] - the [`Envelope`](crate::Envelope) shape
//! - [`ErrorBodyStrategy::SelfApplying`] - the payload fills itself in from
//!   the error ([`ErrorApplier`])
//! - [`ErrorBodyStrategy::Raw`] - the payload is handed status, error and
//!   path ([`ErrorRaw`])
//! - [`ErrorBodyStrategy::Unsupported`] - rendering fails

use crate::envelope::Envelope;
use crate::status::spring_status_name;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Errors exposing an application error code.
pub trait ErrorCoder {
    /// Returns the application error code.
    fn code(&self) -> &str;
}

/// Payloads that populate themselves from an error.
pub trait ErrorApplier {
    /// Fills the payload from `err`.
    fn apply_error(&mut self, err: &anyhow::Error);
}

/// Payloads populated from the status code, error and request path.
pub trait ErrorRaw {
    /// Fills the payload.
    fn set_error(&mut self, code: StatusCode, err: &anyhow::Error, path: &str);
}

/// An error tagged with an application error code.
///
/// Displays as its source.
#[derive(Debug)]
pub struct CodedError {
    code: String,
    source: anyhow::Error,
}

impl CodedError {
    /// Tags `source` with `code`.
    pub fn new(code: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            code: code.into(),
            source: source.into(),
        }
    }
}

impl ErrorCoder for CodedError {
    fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl std::error::Error for CodedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + Send + Sync + 'static) = self.source.as_ref();
        Some(source)
    }
}

/// Default error payload: `{"code": "...", "message": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorV8 {
    /// Application error code, `UNKNOWN` when the error carries none.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl ErrorApplier for ErrorV8 {
    fn apply_error(&mut self, err: &anyhow::Error) {
        self.code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<CodedError>())
            .map_or_else(|| "UNKNOWN".to_string(), |coded| coded.code().to_string());
        self.message = err.to_string();
    }
}

/// Status-oriented error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDto {
    /// Numeric status code as text, e.g. `"404"`.
    pub code: String,
    /// Spring status name, e.g. `NOT_FOUND`.
    pub http_status: String,
    /// Error message.
    pub message: String,
    /// Request path.
    pub path: String,
}

impl ErrorRaw for ErrorDto {
    fn set_error(&mut self, code: StatusCode, err: &anyhow::Error, path: &str) {
        self.code = code.as_u16().to_string();
        self.http_status = spring_status_name(code).to_string();
        self.message = err.to_string();
        self.path = path.to_string();
    }
}

/// Builds a self-applying error body.
pub type AppliedErrorBody = fn(&anyhow::Error) -> Result<Value, serde_json::Error>;

/// Builds a raw error body from status, error and path.
pub type RawErrorBody = fn(StatusCode, &anyhow::Error, &str) -> Result<Value, serde_json::Error>;

/// How an endpoint renders its error body.
#[derive(Clone, Copy)]
pub enum ErrorBodyStrategy {
    /// Render an [`Envelope`].
    Envelope,
    /// Hand status, error and path to the payload.
    Raw(RawErrorBody),
    /// Let the payload apply the error to itself.
    SelfApplying(AppliedErrorBody),
    /// The named payload type cannot render errors.
    Unsupported(&'static str),
}

impl ErrorBodyStrategy {
    /// Strategy for an [`ErrorApplier`] payload.
    #[must_use]
    pub fn applier<T>() -> Self
    where
        T: ErrorApplier + Default + Serialize,
    {
        Self::SelfApplying(applied_body::<T>)
    }

    /// Strategy for an [`ErrorRaw`] payload.
    #[must_use]
    pub fn raw<T>() -> Self
    where
        T: ErrorRaw + Default + Serialize,
    {
        Self::Raw(raw_body::<T>)
    }
}

fn applied_body<T>(err: &anyhow::Error) -> Result<Value, serde_json::Error>
where
    T: ErrorApplier + Default + Serialize,
{
    let mut payload = T::default();
    payload.apply_error(err);
    serde_json::to_value(payload)
}

fn raw_body<T>(code: StatusCode, err: &anyhow::Error, path: &str) -> Result<Value, serde_json::Error>
where
    T: ErrorRaw + Default + Serialize,
{
    let mut payload = T::default();
    payload.set_error(code, err, path);
    serde_json::to_value(payload)
}

impl fmt::Debug for ErrorBodyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => f.write_str("Envelope"),
            Self::Raw(_) => f.write_str("Raw"),
            Self::SelfApplying(_) => f.write_str("SelfApplying"),
            Self::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
        }
    }
}

/// Types usable as the declared error payload of an endpoint.
pub trait ErrorPayload {
    /// Returns how errors are rendered into this payload.
    fn error_strategy() -> ErrorBodyStrategy;
}

impl ErrorPayload for ErrorV8 {
    fn error_strategy() -> ErrorBodyStrategy {
        ErrorBodyStrategy::applier::<Self>()
    }
}

impl ErrorPayload for ErrorDto {
    fn error_strategy() -> ErrorBodyStrategy {
        ErrorBodyStrategy::raw::<Self>()
    }
}

impl ErrorPayload for Envelope {
    fn error_strategy() -> ErrorBodyStrategy {
        ErrorBodyStrategy::Envelope
    }
}

impl ErrorPayload for Value {
    fn error_strategy() -> ErrorBodyStrategy {
        ErrorBodyStrategy::Unsupported("serde_json::Value")
    }
}
