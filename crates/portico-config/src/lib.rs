//! Typed configuration for Portico.
//!
//! [`PorticoConfig`] groups the settings the endpoint pipeline reads:
//!
//! - [`CodecConfig`] - default body media type and encoding, form limits
//! - [`LoggingConfig`] - log filter and output format
//! - [`ResponseConfig`] - error detail exposure in envelopes
//!
//! # Example
//!
//! ```no_run
//! use portico_config::ConfigLoader;
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("portico.toml")?
//!     .with_env_prefix("PORTICO")
//!     .load()?;
//!
//! let options = config.codec.to_codec_options();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [codec]
//! default_content_type = "application/json"
//! default_content_encoding = ""
//! max_form_bytes = 10485760
//! max_form_fields = 100
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [response]
//! expose_error_details = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `PORTICO__CODEC__MAX_FORM_BYTES=1048576`
//! - `PORTICO__LOGGING__FORMAT=pretty`
//! - `PORTICO__RESPONSE__EXPOSE_ERROR_DETAILS=true`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::PorticoConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{CodecConfig, LoggingConfig, ResponseConfig};
