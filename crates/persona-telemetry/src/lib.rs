//! Persona Telemetry - logging setup and turn correlation.
//!
//! # Example
//!
//! ```rust,no_run
//! use persona_telemetry::{LogConfig, LogFormat, TurnContext, setup_logging};
//!
//! # fn main() -> Result<(), persona_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("persona_tools=trace");
//! setup_logging(&config)?;
//!
//! let turn = TurnContext::new("session-1", "process");
//! let _entered = turn.span().entered();
//! tracing::info!("Handling turn");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{TurnContext, TurnGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
