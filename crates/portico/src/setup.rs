//! Wiring a loaded [`PorticoConfig`] into the pipeline and logging.

use portico_config::PorticoConfig;
use portico_endpoint::PipelineConfig;
use portico_telemetry::{init_logging, TelemetryError};

/// Builds the pipeline configuration from the loaded settings.
///
/// The observer keeps its default (logging and tracing).
///
/// ```
/// use portico::config::PorticoConfig;
///
/// let mut config = PorticoConfig::default();
/// config.codec.max_form_fields = 8;
/// config.response.expose_error_details = true;
///
/// let pipeline = portico::setup::pipeline_config(&config);
/// assert_eq!(pipeline.codec.multipart.max_fields, 8);
/// assert!(pipeline.expose_error_details);
/// ```
#[must_use]
pub fn pipeline_config(config: &PorticoConfig) -> PipelineConfig {
    let mut pipeline = PipelineConfig::default().with_codec(config.codec.to_codec_options());
    pipeline.expose_error_details = config.response.expose_error_details;
    pipeline
}

/// Installs the global log subscriber and returns the pipeline
/// configuration.
///
/// # Errors
///
/// Returns `TelemetryError` if the log filter is invalid or a subscriber is
/// already installed.
pub fn init(config: &PorticoConfig) -> Result<PipelineConfig, TelemetryError> {
    init_logging(&config.logging.to_log_config())?;
    Ok(pipeline_config(config))
}
