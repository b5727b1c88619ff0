//! One AT command round trip

use super::classifier::{Exhausted, ResponseBuffer, Terminator, RESPONSE_CAPACITY};
use crate::core::transport::{LineTransport, TransportError};
use std::fmt;
use std::time::Duration;

/// Largest amount of stale input discarded before a command is sent
const MAX_DRAIN: usize = 64 * 1024;

/// How much a command matters to the bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    /// Anything but `OK` aborts the bring-up
    Required,
    /// Failures are logged and ignored
    BestEffort,
}

/// An AT command line and its importance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    importance: Importance,
}

impl Command {
    /// Command that must answer `OK`
    pub fn required(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            importance: Importance::Required,
        }
    }

    /// Command whose failure is only logged
    pub fn best_effort(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            importance: Importance::BestEffort,
        }
    }

    /// Command text without terminator
    pub fn text(&self) -> &str {
        &self.text
    }

    /// How a failure is treated
    pub fn importance(&self) -> Importance {
        self.importance
    }

    /// Whether a failure aborts the bring-up
    pub fn is_required(&self) -> bool {
        self.importance == Importance::Required
    }

    /// Bytes put on the wire: the text, terminated by exactly one `\r`
    /// unless it already ends with one.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut bytes = self.text.as_bytes().to_vec();
        if !self.text.ends_with('\r') {
            bytes.push(b'\r');
        }
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end_matches(['\r', '\n']))
    }
}

/// Result of one exchange
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// Modem answered `OK`
    Success(String),
    /// Modem answered `ERROR`
    Failure(String),
    /// Nothing classifiable arrived before a read came back empty
    Timeout,
    /// The line failed, or the response overflowed the buffer
    TransportError(TransportError),
}

impl ExchangeOutcome {
    /// `OK` was received
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(payload) if payload.is_empty() => write!(f, "OK"),
            Self::Success(payload) => write!(f, "OK ({})", payload),
            Self::Failure(payload) if payload.is_empty() => write!(f, "ERROR"),
            Self::Failure(payload) => write!(f, "ERROR ({})", payload),
            Self::Timeout => write!(f, "no response"),
            Self::TransportError(e) => write!(f, "{}", e),
        }
    }
}

/// Timing and sizing of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSettings {
    /// Wait per read while collecting the response
    pub read_deadline: Duration,
    /// Reception buffer size
    pub capacity: usize,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            read_deadline: Duration::from_millis(500),
            capacity: RESPONSE_CAPACITY,
        }
    }
}

/// Send `command` and collect the modem's answer.
///
/// Input already queued on the line is discarded first, so a late answer to
/// an earlier write (or boot chatter) is never taken for this response.
pub fn exchange<L>(line: &mut L, command: &Command, settings: &ExchangeSettings) -> ExchangeOutcome
where
    L: LineTransport + ?Sized,
{
    match drain(line) {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Discarded {} stale bytes before {}", n, command),
        Err(e) => return ExchangeOutcome::TransportError(e),
    }

    if let Err(e) = line.write_all(&command.wire_bytes()) {
        return ExchangeOutcome::TransportError(e);
    }
    if let Err(e) = line.flush() {
        return ExchangeOutcome::TransportError(e);
    }
    tracing::debug!("Wrote {}", command);

    let mut response = ResponseBuffer::new(settings.capacity);
    let mut chunk = vec![0u8; settings.capacity];

    loop {
        let want = response.remaining();
        let n = match line.read_with_deadline(&mut chunk[..want], settings.read_deadline) {
            Ok(0) => {
                tracing::debug!(
                    "{}: got 0 or timeout after {:?}",
                    command,
                    String::from_utf8_lossy(response.as_bytes())
                );
                return ExchangeOutcome::Timeout;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Could not read answer to {}: {}", command, e);
                return ExchangeOutcome::TransportError(e);
            }
        };

        match response.push(&chunk[..n]) {
            Ok(None) => {}
            Ok(Some(found)) => {
                return match found.terminator {
                    Terminator::Ok => {
                        tracing::debug!("{}: got OK", command);
                        ExchangeOutcome::Success(found.payload)
                    }
                    Terminator::Error => {
                        tracing::debug!(
                            "{}: got ERROR\n----\n{}\n----",
                            command,
                            String::from_utf8_lossy(response.as_bytes())
                        );
                        ExchangeOutcome::Failure(found.payload)
                    }
                };
            }
            Err(Exhausted { capacity }) => {
                tracing::debug!("{}: no terminator in {}", command, hex::encode(response.as_bytes()));
                return ExchangeOutcome::TransportError(TransportError::BufferExhausted { capacity });
            }
        }
    }
}

/// Read and drop whatever is already queued, without waiting
fn drain<L>(line: &mut L) -> Result<usize, TransportError>
where
    L: LineTransport + ?Sized,
{
    let mut scratch = [0u8; 64];
    let mut flushed = 0;
    while flushed < MAX_DRAIN {
        match line.read_with_deadline(&mut scratch, Duration::ZERO)? {
            0 => break,
            n => flushed += n,
        }
    }
    Ok(flushed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::ScriptedLine;

    fn quick() -> ExchangeSettings {
        ExchangeSettings {
            read_deadline: Duration::from_millis(1),
            ..ExchangeSettings::default()
        }
    }

    #[test]
    fn test_wire_bytes_appends_single_cr() {
        assert_eq!(Command::required("AT+GMM").wire_bytes(), b"AT+GMM\r");
        assert_eq!(Command::required("AT+GMM\r").wire_bytes(), b"AT+GMM\r");
        assert_eq!(Command::required("").wire_bytes(), b"\r");
        assert_eq!(Command::required("ATE0\r\n").wire_bytes(), b"ATE0\r\n\r");
    }

    #[test]
    fn test_exchange_success() {
        let mut line = ScriptedLine::new().respond(&["\r\nQuectel_M95\r\n", "\r\nOK\r\n"]);
        let outcome = exchange(&mut line, &Command::best_effort("AT+GMM"), &quick());

        assert!(matches!(outcome, ExchangeOutcome::Success(ref p) if p == "Quectel_M95"));
        assert_eq!(line.written_lines(), vec!["AT+GMM\r"]);
        assert_eq!(line.flushes(), 1);
    }

    #[test]
    fn test_exchange_failure() {
        let mut line = ScriptedLine::new().respond(&["\r\nERROR\r\n"]);
        let outcome = exchange(&mut line, &Command::required("AT#SELINT=2"), &quick());
        assert!(matches!(outcome, ExchangeOutcome::Failure(ref p) if p.is_empty()));
    }

    #[test]
    fn test_exchange_silence_is_timeout() {
        let mut line = ScriptedLine::new().respond(&[]);
        let outcome = exchange(&mut line, &Command::required("AT"), &quick());
        assert!(matches!(outcome, ExchangeOutcome::Timeout));
    }

    #[test]
    fn test_exchange_partial_then_silence_is_timeout() {
        let mut line = ScriptedLine::new().respond(&["\r\n+CME"]);
        let outcome = exchange(&mut line, &Command::required("AT"), &quick());
        assert!(matches!(outcome, ExchangeOutcome::Timeout));
    }

    #[test]
    fn test_exchange_discards_stale_input() {
        let mut line = ScriptedLine::new()
            .pending("RDY\r\n\r\nERROR\r\n")
            .respond(&["\r\nOK\r\n"]);
        let outcome = exchange(&mut line, &Command::required("AT"), &quick());

        assert!(outcome.is_success());
        assert_eq!(line.pending_len(), 0);
    }

    #[test]
    fn test_exchange_overflow_is_transport_error() {
        let noise = "x".repeat(40);
        let mut line = ScriptedLine::new().respond(&[noise.as_str(), noise.as_str()]);
        let settings = ExchangeSettings {
            capacity: 32,
            ..quick()
        };
        let outcome = exchange(&mut line, &Command::required("AT"), &settings);

        assert!(matches!(
            outcome,
            ExchangeOutcome::TransportError(TransportError::BufferExhausted { capacity: 32 })
        ));
    }

    #[test]
    fn test_exchange_read_error() {
        let mut line = ScriptedLine::new().fail_reads_after_write();
        let outcome = exchange(&mut line, &Command::required("AT"), &quick());
        assert!(matches!(outcome, ExchangeOutcome::TransportError(TransportError::IoError(_))));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ExchangeOutcome::Success(String::new()).to_string(), "OK");
        assert_eq!(ExchangeOutcome::Failure("+CME ERROR: 3".into()).to_string(), "ERROR (+CME ERROR: 3)");
        assert_eq!(ExchangeOutcome::Timeout.to_string(), "no response");
    }
}
