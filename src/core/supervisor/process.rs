//! Process level lifecycle: signal mask, daemonizing, final wait

use super::{Lifecycle, LifecycleError};
use nix::sys::signal::{SigSet, Signal};

/// Real process lifecycle
///
/// SIGINT and SIGTERM are blocked once armed and collected synchronously by
/// [`Lifecycle::wait_for_shutdown`]; no other signal is touched.
#[derive(Debug)]
pub struct ProcessLifecycle {
    signals: SigSet,
    armed: bool,
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        let mut signals = SigSet::empty();
        signals.add(Signal::SIGINT);
        signals.add(Signal::SIGTERM);
        Self {
            signals,
            armed: false,
        }
    }
}

impl ProcessLifecycle {
    /// Lifecycle watching SIGINT and SIGTERM
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lifecycle for ProcessLifecycle {
    fn arm(&mut self) -> Result<(), LifecycleError> {
        self.signals.thread_block().map_err(LifecycleError::Signals)?;
        self.armed = true;
        Ok(())
    }

    fn detach(&mut self) -> Result<(), LifecycleError> {
        tracing::debug!("Going to background");
        nix::unistd::daemon(false, false).map_err(LifecycleError::Daemonize)
    }

    fn wait_for_shutdown(&mut self) -> Result<(), LifecycleError> {
        if !self.armed {
            self.arm()?;
        }
        let signal = self.signals.wait().map_err(LifecycleError::Wait)?;
        tracing::info!("Received {}, shutting down", signal);
        Ok(())
    }
}
