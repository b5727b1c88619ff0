//! Liveness probe

use super::exchange::{exchange, Command, ExchangeOutcome, ExchangeSettings};
use super::BringUpError;
use crate::core::transport::LineTransport;
use std::time::Duration;

/// Repeated `AT` until the modem answers `OK`
#[derive(Debug, Clone)]
pub struct Probe {
    /// Maximum number of tries
    pub attempts: u32,
    /// Pause after a failed try
    pub interval: Duration,
    /// Command expected to return `OK`
    pub command: Command,
    /// Written raw before every try; disables command echo
    pub preamble: Option<&'static str>,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(1),
            command: Command::required("AT"),
            preamble: Some("ATE0\r\n"),
        }
    }
}

impl Probe {
    /// Probe with `attempts` tries of `command` and default timing
    pub fn new(attempts: u32, command: Command) -> Self {
        Self {
            attempts,
            command,
            ..Self::default()
        }
    }

    /// Run the probe; returns the 1-based try that got `OK`.
    pub fn run<L>(&self, line: &mut L, settings: &ExchangeSettings) -> Result<u32, BringUpError>
    where
        L: LineTransport + ?Sized,
    {
        for attempt in 1..=self.attempts {
            tracing::debug!("Attempting to ping module ({}/{})", attempt, self.attempts);

            if let Some(preamble) = self.preamble {
                // The echo of this write is flushed by the exchange below
                let written = match line.write_all(preamble.as_bytes()) {
                    Ok(()) => line.flush(),
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    tracing::warn!("Could not write probe preamble: {}", e);
                }
            }

            match exchange(line, &self.command, settings) {
                ExchangeOutcome::Success(_) => {
                    tracing::debug!("Module answered on attempt {}", attempt);
                    return Ok(attempt);
                }
                ExchangeOutcome::TransportError(e) => {
                    tracing::warn!("Probe attempt {} failed: {}", attempt, e);
                }
                other => {
                    tracing::debug!("Probe attempt {}: {}", attempt, other);
                }
            }

            if attempt < self.attempts {
                tracing::debug!("Wait and retry...");
                std::thread::sleep(self.interval);
            }
        }

        Err(BringUpError::Unresponsive {
            attempts: self.attempts,
        })
    }
}

/// Probe `line` with up to `attempts` tries of `command`, one second apart.
pub fn probe<L>(line: &mut L, attempts: u32, command: Command) -> bool
where
    L: LineTransport + ?Sized,
{
    Probe::new(attempts, command)
        .run(line, &ExchangeSettings::default())
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::ScriptedLine;
    use crate::core::transport::{MockLineTransport, TransportError};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(attempts: u32) -> Probe {
        Probe {
            attempts,
            interval: Duration::ZERO,
            ..Probe::default()
        }
    }

    fn settings() -> ExchangeSettings {
        ExchangeSettings {
            read_deadline: Duration::from_millis(1),
            ..ExchangeSettings::default()
        }
    }

    #[test]
    fn test_probe_exhausts_all_attempts_on_silence() {
        let probes = Arc::new(AtomicU32::new(0));
        let counter = probes.clone();

        let mut line = MockLineTransport::new();
        line.expect_write_all().returning(move |data| {
            if data == b"AT\r" {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });
        line.expect_flush().returning(|| Ok(()));
        line.expect_read_with_deadline().returning(|_, _| Ok(0));

        let result = fast(5).run(&mut line, &settings());

        assert!(matches!(result, Err(BringUpError::Unresponsive { attempts: 5 })));
        assert_eq!(probes.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_probe_succeeds_on_first_ok() {
        let probes = Arc::new(AtomicU32::new(0));
        let answered = Arc::new(AtomicBool::new(false));
        let (writes, reads) = (probes.clone(), probes.clone());
        let done = answered.clone();

        let mut line = MockLineTransport::new();
        line.expect_write_all().returning(move |data| {
            if data == b"AT\r" {
                writes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        });
        line.expect_flush().returning(|| Ok(()));
        line.expect_read_with_deadline().returning(move |buf, deadline| {
            // Only the third AT gets an answer; drain reads use a zero deadline
            if deadline.is_zero() || reads.load(Ordering::SeqCst) != 3 || done.swap(true, Ordering::SeqCst) {
                return Ok(0);
            }
            let reply = b"\r\nOK\r\n";
            buf[..reply.len()].copy_from_slice(reply);
            Ok(reply.len())
        });

        let result = fast(5).run(&mut line, &settings());

        assert_eq!(result.unwrap(), 3);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_probe_error_answers_count_as_failed_tries() {
        let mut line = ScriptedLine::new()
            .on("ATE0", &["\r\nOK\r\n"])
            .on("AT", &["\r\nERROR\r\n"])
            .on("AT", &["\r\nOK\r\n"]);

        let result = fast(3).run(&mut line, &settings());

        assert_eq!(result.unwrap(), 2);
        assert_eq!(line.commands(), vec!["ATE0", "AT", "ATE0", "AT"]);
    }

    #[test]
    fn test_probe_without_preamble() {
        let mut line = ScriptedLine::new().respond(&["OK"]);
        let probe = Probe {
            preamble: None,
            ..fast(1)
        };

        assert_eq!(probe.run(&mut line, &settings()).unwrap(), 1);
        assert_eq!(line.commands(), vec!["AT"]);
    }

    #[test]
    fn test_probe_survives_write_errors() {
        let mut line = MockLineTransport::new();
        line.expect_write_all()
            .returning(|_| Err(TransportError::IoError(std::io::Error::other("unplugged"))));
        line.expect_flush().returning(|| Ok(()));
        line.expect_read_with_deadline().returning(|_, _| Ok(0));

        let result = fast(2).run(&mut line, &settings());
        assert!(matches!(result, Err(BringUpError::Unresponsive { attempts: 2 })));
    }
}
