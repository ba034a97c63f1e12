//! Root configuration type.

use portico_codec::ContentEncoding;
use portico_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{CodecConfig, ConfigError, LoggingConfig, ResponseConfig};

/// Complete Portico configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use portico_config::PorticoConfig;
///
/// let config = PorticoConfig::default();
/// assert_eq!(config.codec.max_form_fields, 100);
/// assert!(!config.response.expose_error_details);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PorticoConfig {
    /// Request codec settings.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Response rendering settings.
    #[serde(default)]
    pub response: ResponseConfig,
}

impl PorticoConfig {
    /// Validates value ranges and formats.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .codec
            .default_content_type
            .parse::<mime::Mime>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "codec.default_content_type",
                format!("invalid media type: {}", self.codec.default_content_type),
            ));
        }

        let encoding = self.codec.default_content_encoding.trim();
        if !encoding.is_empty() && ContentEncoding::from_name(encoding).is_err() {
            return Err(ConfigError::invalid_value(
                "codec.default_content_encoding",
                format!("unknown content encoding: {encoding}"),
            ));
        }

        if self.codec.max_form_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "codec.max_form_bytes",
                "must be greater than 0",
            ));
        }

        if self.codec.max_form_fields == 0 {
            return Err(ConfigError::invalid_value(
                "codec.max_form_fields",
                "must be greater than 0",
            ));
        }

        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty when logging is enabled",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs and error details in envelopes.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.response.expose_error_details = true;
        config
    }

    /// Production preset: JSON info logs, no error details.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.response.expose_error_details = false;
        config
    }
}
