//! Converting handler errors into status-bearing errors.

use http::StatusCode;
use portico_core::{ErrorStatusRegistry, StatusError};

/// Turns an arbitrary error into a [`StatusError`].
pub trait ErrorConverter: Send + Sync {
    /// Converts `err`.
    fn convert(&self, err: anyhow::Error) -> StatusError;
}

impl<F> ErrorConverter for F
where
    F: Fn(anyhow::Error) -> StatusError + Send + Sync,
{
    fn convert(&self, err: anyhow::Error) -> StatusError {
        self(err)
    }
}

/// Picks the status code for an error.
pub trait ErrorStatusCoder: Send + Sync {
    /// Returns the status code for `err`.
    fn status_code(&self, err: &anyhow::Error) -> StatusCode;
}

impl<F> ErrorStatusCoder for F
where
    F: Fn(&anyhow::Error) -> StatusCode + Send + Sync,
{
    fn status_code(&self, err: &anyhow::Error) -> StatusCode {
        self(err)
    }
}

/// Looks errors up in the global [`ErrorStatusRegistry`], else 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorStatusCoder;

impl ErrorStatusCoder for DefaultErrorStatusCoder {
    fn status_code(&self, err: &anyhow::Error) -> StatusCode {
        ErrorStatusRegistry::global()
            .lookup(err)
            .unwrap_or(StatusCode::BAD_REQUEST)
    }
}

/// [`ErrorConverter`] pairing each error with the code from an
/// [`ErrorStatusCoder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorStatusCoderConverter<C> {
    coder: C,
}

impl<C: ErrorStatusCoder> ErrorStatusCoderConverter<C> {
    /// Wraps `coder`.
    pub const fn new(coder: C) -> Self {
        Self { coder }
    }
}

impl<C: ErrorStatusCoder> ErrorConverter for ErrorStatusCoderConverter<C> {
    fn convert(&self, err: anyhow::Error) -> StatusError {
        let status = self.coder.status_code(&err);
        StatusError::new(status, err)
    }
}

/// Converts `err` unless it already is a [`StatusError`].
///
/// Falls back to the registry-backed converter when `converter` is `None`.
pub fn convert_error(converter: Option<&dyn ErrorConverter>, err: anyhow::Error) -> anyhow::Error {
    if err.is::<StatusError>() {
        return err;
    }
    let converted = match converter {
        Some(converter) => converter.convert(err),
        None => ErrorStatusCoderConverter::new(DefaultErrorStatusCoder).convert(err),
    };
    anyhow::Error::new(converted)
}
