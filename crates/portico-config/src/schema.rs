//! Configuration section types.

use portico_codec::form::{DEFAULT_MAX_FORM_BYTES, DEFAULT_MAX_FORM_FIELDS};
use portico_codec::{CodecOptions, MultipartConfig, MEDIA_TYPE_JSON};
use portico_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Request codec settings.
///
/// # Example
///
/// ```
/// use portico_config::CodecConfig;
///
/// let codec = CodecConfig::default();
/// assert_eq!(codec.default_content_type, "application/json");
/// assert_eq!(codec.to_codec_options().multipart.max_fields, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    /// Body media type assumed when the request has no `Content-Type`.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Body encoding assumed when the request has no `Content-Encoding`.
    #[serde(default)]
    pub default_content_encoding: String,

    /// Maximum form body size in bytes.
    #[serde(default = "default_max_form_bytes")]
    pub max_form_bytes: usize,

    /// Maximum number of multipart parts.
    #[serde(default = "default_max_form_fields")]
    pub max_form_fields: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_content_type: default_content_type(),
            default_content_encoding: String::new(),
            max_form_bytes: default_max_form_bytes(),
            max_form_fields: default_max_form_fields(),
        }
    }
}

impl CodecConfig {
    /// Converts the section into per-request codec options.
    #[must_use]
    pub fn to_codec_options(&self) -> CodecOptions {
        CodecOptions {
            default_content_type: self.default_content_type.clone(),
            default_content_encoding: self.default_content_encoding.clone(),
            multipart: MultipartConfig::new()
                .max_body_size(self.max_form_bytes)
                .max_field_size(self.max_form_bytes)
                .max_fields(self.max_form_fields),
        }
    }
}

fn default_content_type() -> String {
    MEDIA_TYPE_JSON.to_string()
}

fn default_max_form_bytes() -> usize {
    DEFAULT_MAX_FORM_BYTES
}

fn default_max_form_fields() -> usize {
    DEFAULT_MAX_FORM_FIELDS
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Converts the section into a telemetry [`LogConfig`].
    ///
    /// Pretty output also turns on span events and source locations, as the
    /// development preset does.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Pretty => LogConfig::development(),
            LogFormat::Json => LogConfig::production(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ..base
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Response rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    /// Carry the error source chain in envelope `debug` maps.
    #[serde(default)]
    pub expose_error_details: bool,
}
