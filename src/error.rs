//! Top level error of a run

use crate::cli::ExitCodes;
use crate::config::ConfigError;
use crate::core::at::{BringUpError, ExchangeOutcome};
use crate::core::nodes::ResourceError;
use crate::core::supervisor::LifecycleError;
use crate::core::transport::TransportError;
use thiserror::Error;

/// Anything that ends a run early
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, reported before any I/O
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Serial line or line discipline failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Modem did not answer or rejected a required command
    #[error(transparent)]
    BringUp(#[from] BringUpError),

    /// Driver lookup failed
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Signal handling or daemonizing failed
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl Error {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => ExitCodes::CONFIG_ERROR,
            Self::Transport(_) => ExitCodes::CONNECTION_FAILED,
            Self::BringUp(BringUpError::Unresponsive { .. }) => ExitCodes::TIMEOUT,
            Self::BringUp(BringUpError::Rejected { outcome, .. }) => match outcome {
                ExchangeOutcome::Timeout => ExitCodes::TIMEOUT,
                ExchangeOutcome::TransportError(_) => ExitCodes::CONNECTION_FAILED,
                _ => ExitCodes::PROTOCOL_ERROR,
            },
            Self::Resource(_) => ExitCodes::DEVICE_NOT_FOUND,
            Self::Lifecycle(_) => ExitCodes::ERROR,
        }
    }
}
