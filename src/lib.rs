//! # cmux Core Library
//!
//! Brings a GSM modem on a serial line into 3GPP TS 27.010 multiplexing mode:
//! - Probes the modem with `AT` until it answers
//! - Runs the bring-up commands of its device profile, ending in `AT+CMUX`
//! - Attaches the Linux n_gsm line discipline to the line
//! - Creates one tty node per mux channel and removes them on shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use cmux_core::{Config, ProcessLifecycle, SerialLine, Supervisor};
//!
//! fn main() -> Result<(), cmux_core::Error> {
//!     let config = Config::default();
//!     let line = SerialLine::open(config.serial_config())?;
//!
//!     let report = Supervisor::new(&config, line).run(&mut ProcessLifecycle::new())?;
//!     println!("mux was up with mtu {}", report.params.mtu);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{Config, ConfigError, Settings};
pub use crate::core::at::{BringUpError, Command, ExchangeOutcome, Probe};
pub use crate::core::nodes::{ClassRegistry, NodeFs, NodeManager, NodeSet, SystemFs};
pub use crate::core::profile::DeviceProfile;
pub use crate::core::supervisor::{Lifecycle, LifecycleError, ProcessLifecycle, RunReport, Supervisor};
pub use crate::core::transport::{LineSpeed, LineTransport, Multiplexer, MuxParams, SerialConfig, SerialLine};
pub use crate::error::Error;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
