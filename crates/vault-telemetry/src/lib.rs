//! # Vault Telemetry
//!
//! Structured logging for the epoch settlement engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vault_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_logging(&config).expect("Failed to init logging");
//!
//!     // Engine spans and events are now collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EV_SERVICE_NAME` | `epoch-vault` | Service name attached to the startup record |
//! | `EV_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `EV_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |
//! | `EV_CONSOLE_OUTPUT` | `true` | Write to stdout at all |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber was already installed.
    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}
