//! Observability for Portico endpoints.
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or pretty output
//! - **Observers**: [`ResponseObserver`](portico_core::ResponseObserver)
//!   implementations that log, annotate spans and count responses
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `portico_http_responses_total` | Counter | `operation`, `status`, `outcome` | Completed responses |
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod observer;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use observer::{
    describe_metrics, LoggingResponseObserver, MetricsResponseObserver, TracingResponseObserver,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Logs a request start event.
#[macro_export]
macro_rules! log_request_start {
    ($request_id:expr, $method:expr, $path:expr, $operation:expr) => {
        tracing::debug!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            operation_id = %$operation,
            "Request started"
        );
    };
}
