//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Argument parsing and settings layering
//! - Log output setup
//! - Exit codes for service managers and scripts

pub mod args;
pub mod exit_codes;
pub mod logging;

pub use args::Cli;
pub use exit_codes::{exit_code_description, CliResult, ExitCodes};
