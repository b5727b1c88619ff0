//! Core module containing the bring-up engine
//!
//! This module provides:
//! - Transport layer for the modem line and the n_gsm mode switch
//! - AT command exchange, response classification and liveness probe
//! - Device profiles and the bring-up sequencer
//! - Virtual tty node handling
//! - The run supervisor tying them together

pub mod at;
pub mod nodes;
pub mod profile;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
