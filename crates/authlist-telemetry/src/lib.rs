//! Authlist Telemetry - Logging setup for the authlist broker.
//!
//! # Example
//!
//! ```rust,no_run
//! use authlist_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), authlist_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("authlist_broker=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("broker starting");
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, a [`LogConfig`] can be built from the
//! `[logging]` section of the broker configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
