//! Declared response status codes.

use http::Method;
use std::borrow::Cow;

/// Success and error status codes an endpoint may produce.
///
/// The first success code is the default response status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseCodes {
    /// 1xx-3xx codes.
    pub success: Cow<'static, [u16]>,
    /// 4xx-5xx codes.
    pub error: Cow<'static, [u16]>,
}

const STANDARD_ERROR_CODES: &[u16] = &[400, 401, 403, 404, 409];

impl ResponseCodes {
    /// Collection retrieval.
    pub const LIST: Self = Self::preset(&[200], &[400, 403, 401]);
    /// Single resource retrieval.
    pub const GET: Self = Self::preset(&[200], &[400, 403, 401, 404]);
    /// Resource creation.
    pub const CREATE: Self = Self::preset(&[201], &[400, 403, 401, 409]);
    /// Resource replacement.
    pub const UPDATE: Self = Self::preset(&[200], &[400, 403, 401, 404]);
    /// Resource deletion.
    pub const DELETE: Self = Self::preset(&[200], STANDARD_ERROR_CODES);
    /// Asynchronous command accepted.
    pub const ACCEPT: Self = Self::preset(&[202], STANDARD_ERROR_CODES);
    /// Success without a body.
    pub const NO_CONTENT: Self = Self::preset(&[204], STANDARD_ERROR_CODES);
    /// Any other method.
    pub const UNKNOWN_VERB: Self = Self::preset(&[200], &[400, 401, 403]);

    const fn preset(success: &'static [u16], error: &'static [u16]) -> Self {
        Self {
            success: Cow::Borrowed(success),
            error: Cow::Borrowed(error),
        }
    }

    /// Creates a code set.
    pub fn new(success: Vec<u16>, error: Vec<u16>) -> Self {
        Self {
            success: Cow::Owned(success),
            error: Cow::Owned(error),
        }
    }

    /// Returns the first success code, or 200.
    #[must_use]
    pub fn default_code(&self) -> u16 {
        self.success.first().copied().unwrap_or(200)
    }

    /// Splits a comma separated `enum` list into success (≤399) and error
    /// codes. Entries that do not parse or fall outside 200-599 are logged
    /// and skipped.
    #[must_use]
    pub fn from_enum(values: &str) -> Self {
        let mut success = Vec::new();
        let mut error = Vec::new();
        for value in values.split(',') {
            let code = match value.trim().parse::<i64>() {
                Ok(code) => code,
                Err(err) => {
                    tracing::error!(code = %value, error = %err, "Invalid response code");
                    continue;
                }
            };
            if !(200..=599).contains(&code) {
                tracing::error!(code, "Invalid response code");
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let code = code as u16;
            if code <= 399 {
                success.push(code);
            } else {
                error.push(code);
            }
        }
        Self::new(success, error)
    }
}

/// The standard error codes: 400, 401, 403, 404, 409.
#[must_use]
pub fn standard_error_codes() -> &'static [u16] {
    STANDARD_ERROR_CODES
}

/// Codes assumed for `method` when an endpoint declares none.
#[must_use]
pub fn default_response_codes(method: &Method) -> ResponseCodes {
    if method == Method::GET {
        ResponseCodes::GET
    } else if method == Method::POST {
        ResponseCodes::CREATE
    } else if method == Method::PUT {
        ResponseCodes::UPDATE
    } else if method == Method::DELETE {
        ResponseCodes::DELETE
    } else {
        ResponseCodes::UNKNOWN_VERB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_code() {
        assert_eq!(ResponseCodes::CREATE.default_code(), 201);
        assert_eq!(ResponseCodes::NO_CONTENT.default_code(), 204);
        assert_eq!(ResponseCodes::default().default_code(), 200);
    }

    #[test]
    fn test_default_response_codes() {
        assert_eq!(default_response_codes(&Method::GET), ResponseCodes::GET);
        assert_eq!(default_response_codes(&Method::POST), ResponseCodes::CREATE);
        assert_eq!(default_response_codes(&Method::PUT), ResponseCodes::UPDATE);
        assert_eq!(default_response_codes(&Method::DELETE), ResponseCodes::DELETE);
        assert_eq!(
            default_response_codes(&Method::PATCH),
            ResponseCodes::UNKNOWN_VERB
        );
    }

    #[test]
    fn test_enum_codes_split_and_reject() {
        let codes = ResponseCodes::from_enum("201,abc,409,199,600,304");
        assert_eq!(&*codes.success, &[201, 304]);
        assert_eq!(&*codes.error, &[409]);
    }

    #[test]
    fn test_standard_error_codes() {
        assert_eq!(standard_error_codes(), &[400, 401, 403, 404, 409]);
        assert_eq!(&*ResponseCodes::DELETE.error, standard_error_codes());
    }
}
