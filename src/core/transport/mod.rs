//! Transport layer for the modem line
//!
//! Provides:
//! - A deadline-bounded byte transport ([`LineTransport`])
//! - The mode switch into the kernel multiplexer ([`Multiplexer`])
//! - The serial tty implementation of both ([`SerialLine`])

mod mux;
mod serial;

pub use mux::{GsmConfig, MuxParams, MuxTimers, N_GSM0710};
pub use serial::{LineSpeed, SerialConfig, SerialFlowControl, SerialLine};

use std::time::Duration;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Opening the device failed
    #[error("Cannot open {path}: {reason}")]
    OpenFailed {
        /// Device path
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Line attributes could not be read or applied
    #[error("Cannot set line attributes: {0}")]
    LineAttributes(#[source] nix::Error),

    /// Response did not fit the reception buffer
    #[error("No terminator within {capacity} bytes of response")]
    BufferExhausted {
        /// Reception buffer capacity
        capacity: usize,
    },

    /// Attaching or configuring the multiplexer failed
    #[error("{context}: {source}")]
    ModeSwitch {
        /// Which step failed
        context: &'static str,
        /// OS error
        #[source]
        source: nix::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Byte transport with bounded reads
///
/// Implementations must never block in [`read_with_deadline`] for longer
/// than the given deadline. A zero deadline polls once.
///
/// [`read_with_deadline`]: LineTransport::read_with_deadline
#[cfg_attr(test, mockall::automock)]
pub trait LineTransport {
    /// Read up to `buf.len()` bytes, waiting at most `deadline`.
    ///
    /// Returns `Ok(0)` when nothing arrived in time or the remote hung up;
    /// the two are not told apart at this layer.
    fn read_with_deadline(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Wait until everything written has left the device
    fn flush(&mut self) -> Result<(), TransportError>;
}

/// One-way switch of a line into multiplexed mode
///
/// After a successful call the framing of the line belongs to the kernel
/// and the line must not be read or written by this process any more.
#[cfg_attr(test, mockall::automock)]
pub trait Multiplexer {
    /// Attach the mux line discipline and configure it with `params`
    fn enter_mux_mode(&mut self, params: &MuxParams) -> Result<(), TransportError>;
}
