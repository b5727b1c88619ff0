//! AT command engine
//!
//! Provides:
//! - Response accumulation and `OK`/`ERROR` classification
//! - Single command exchanges with stale input flushing
//! - The liveness probe run before any mode changing command

pub mod classifier;
pub mod exchange;
pub mod probe;

pub use classifier::{classify, Classified, Markers, ResponseBuffer, Terminator, RESPONSE_CAPACITY};
pub use exchange::{exchange, Command, ExchangeOutcome, ExchangeSettings, Importance};
pub use probe::{probe, Probe};

use thiserror::Error;

/// Bring-up failure
#[derive(Error, Debug)]
pub enum BringUpError {
    /// The modem never answered the liveness probe
    #[error("no response from modem after {attempts} attempts, abort")]
    Unresponsive {
        /// Tries made
        attempts: u32,
    },

    /// A required command did not return `OK`
    #[error("{command}: bad response ({outcome})")]
    Rejected {
        /// Command text
        command: String,
        /// What came back instead
        outcome: ExchangeOutcome,
    },
}

impl BringUpError {
    /// The exchange outcome behind the failure, if any
    pub fn outcome(&self) -> Option<&ExchangeOutcome> {
        match self {
            Self::Unresponsive { .. } => None,
            Self::Rejected { outcome, .. } => Some(outcome),
        }
    }
}
