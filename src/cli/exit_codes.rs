//! CLI Exit Codes
//!
//! Exit statuses of a run, for scripts and service managers.

use crate::error::Error;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments (reported by the argument parser)
    pub const INVALID_ARGS: u8 = 2;

    /// Serial line could not be used
    pub const CONNECTION_FAILED: u8 = 3;

    /// Modem did not answer
    pub const TIMEOUT: u8 = 4;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Modem rejected a required command
    pub const PROTOCOL_ERROR: u8 = 9;

    /// Mux driver not registered
    pub const DEVICE_NOT_FOUND: u8 = 12;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Failure with exit `code`
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            _ => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Error> for CliResult {
    fn from(err: Error) -> Self {
        Self::Error(err.exit_code(), err.to_string())
    }
}

impl From<Result<(), Error>> for CliResult {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => e.into(),
        }
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Serial line failure",
        4 => "Modem not responding",
        8 => "Configuration error",
        9 => "Command rejected by modem",
        12 => "Mux driver not found",
        _ => "Unknown error",
    }
}
