//! Serial port transport implementation

use super::{LineTransport, Multiplexer, MuxParams, TransportError};
use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices,
};
use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits, TTYPort};
use std::fmt;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest wait for room in the output queue
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Serial port flow control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialFlowControl {
    /// No flow control
    None,
    /// Hardware flow control (RTS/CTS)
    #[default]
    Hardware,
}

/// Standard line speeds accepted for the modem line, named by bps
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSpeed {
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
    B460800,
    B921600,
}

impl LineSpeed {
    /// All accepted speeds, slowest first
    pub const ALL: [LineSpeed; 10] = [
        Self::B2400,
        Self::B4800,
        Self::B9600,
        Self::B19200,
        Self::B38400,
        Self::B57600,
        Self::B115200,
        Self::B230400,
        Self::B460800,
        Self::B921600,
    ];

    /// Bits per second
    pub fn bps(self) -> u32 {
        match self {
            Self::B2400 => 2400,
            Self::B4800 => 4800,
            Self::B9600 => 9600,
            Self::B19200 => 19200,
            Self::B38400 => 38400,
            Self::B57600 => 57600,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
            Self::B460800 => 460_800,
            Self::B921600 => 921_600,
        }
    }

    /// Matching termios speed constant
    pub fn baud_rate(self) -> BaudRate {
        match self {
            Self::B2400 => BaudRate::B2400,
            Self::B4800 => BaudRate::B4800,
            Self::B9600 => BaudRate::B9600,
            Self::B19200 => BaudRate::B19200,
            Self::B38400 => BaudRate::B38400,
            Self::B57600 => BaudRate::B57600,
            Self::B115200 => BaudRate::B115200,
            Self::B230400 => BaudRate::B230400,
            Self::B460800 => BaudRate::B460800,
            Self::B921600 => BaudRate::B921600,
        }
    }
}

impl TryFrom<u32> for LineSpeed {
    type Error = u32;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|speed| speed.bps() == bps)
            .ok_or(bps)
    }
}

impl fmt::Display for LineSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// Serial port configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path (e.g. /dev/ttyUSB0)
    pub path: PathBuf,
    /// Line speed
    pub speed: LineSpeed,
    /// Flow control
    pub flow_control: SerialFlowControl,
}

impl SerialConfig {
    /// Create a new serial configuration with default settings
    pub fn new(path: impl Into<PathBuf>, speed: LineSpeed) -> Self {
        Self {
            path: path.into(),
            speed,
            flow_control: SerialFlowControl::Hardware,
        }
    }

    /// Set flow control
    #[must_use]
    pub fn flow_control(mut self, flow: SerialFlowControl) -> Self {
        self.flow_control = flow;
        self
    }
}

/// Exclusively owned serial line to the modem
///
/// The descriptor is closed when the value is dropped.
pub struct SerialLine {
    config: SerialConfig,
    port: TTYPort,
}

impl SerialLine {
    /// Open and configure the line in raw mode
    pub fn open(config: SerialConfig) -> Result<Self, TransportError> {
        let flow_control = match config.flow_control {
            SerialFlowControl::Hardware => FlowControl::Hardware,
            SerialFlowControl::None => FlowControl::None,
        };

        let path = config.path.to_string_lossy().into_owned();
        let port = serialport::new(path.as_str(), config.speed.bps())
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(flow_control)
            .timeout(Duration::ZERO)
            .open_native()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound(path.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    TransportError::PortNotFound(path.clone())
                }
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(path.clone())
                }
                _ => TransportError::OpenFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                },
            })?;

        let line = Self { config, port };
        line.apply_raw_attributes()?;
        tracing::debug!("Opened {}", line.connection_info());
        Ok(line)
    }

    /// Device path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get connection info string
    pub fn connection_info(&self) -> String {
        format!(
            "{} @ {} baud (8N1 {})",
            self.config.path.display(),
            self.config.speed,
            match self.config.flow_control {
                SerialFlowControl::None => "No FC",
                SerialFlowControl::Hardware => "HW FC",
            }
        )
    }

    // Raw fd for the ioctl wrappers
    pub(super) fn raw_fd(&self) -> std::os::fd::RawFd {
        self.port.as_raw_fd()
    }

    /// Force the exact attributes the multiplexer expects: no input or output
    /// processing, no echo or signals, 8 data bits, receiver on, modem status
    /// lines ignored, RTS/CTS, one byte minimum read, no inter-byte timer.
    fn apply_raw_attributes(&self) -> Result<(), TransportError> {
        // SAFETY: the descriptor is owned by `self.port` and outlives this call.
        let fd = unsafe { BorrowedFd::borrow_raw(self.raw_fd()) };

        let mut tio = termios::tcgetattr(fd).map_err(TransportError::LineAttributes)?;
        tio.input_flags = InputFlags::empty();
        tio.output_flags = OutputFlags::empty();
        tio.local_flags = LocalFlags::empty();

        let mut cflag = ControlFlags::CS8 | ControlFlags::CREAD | ControlFlags::CLOCAL;
        if self.config.flow_control == SerialFlowControl::Hardware {
            cflag |= ControlFlags::CRTSCTS;
        }
        tio.control_flags = cflag;
        tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::cfsetspeed(&mut tio, self.config.speed.baud_rate())
            .map_err(TransportError::LineAttributes)?;
        termios::tcsetattr(fd, SetArg::TCSANOW, &tio).map_err(TransportError::LineAttributes)
    }
}

impl LineTransport for SerialLine {
    fn read_with_deadline(&mut self, buf: &mut [u8], deadline: Duration) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.port
            .set_timeout(deadline)
            .map_err(|e| TransportError::IoError(e.into()))?;

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::BrokenPipe
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(TransportError::IoError(e)),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        // Reads leave a zero timeout behind, which would fail on a full queue
        self.port
            .set_timeout(WRITE_TIMEOUT)
            .map_err(|e| TransportError::IoError(e.into()))?;
        self.port.write_all(data).map_err(TransportError::IoError)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush().map_err(TransportError::IoError)
    }
}

impl Multiplexer for SerialLine {
    fn enter_mux_mode(&mut self, params: &MuxParams) -> Result<(), TransportError> {
        // Nothing read after this point goes through us again.
        if let Err(e) = self.port.clear(ClearBuffer::Input) {
            tracing::debug!("Could not clear input before mode switch: {}", e);
        }
        super::mux::attach(self.raw_fd(), params)
    }
}

impl fmt::Debug for SerialLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::pty::openpty;
    use std::fs::File;

    #[test]
    fn test_line_speed_from_bps() {
        assert_eq!(LineSpeed::try_from(115_200), Ok(LineSpeed::B115200));
        assert_eq!(LineSpeed::try_from(921_600), Ok(LineSpeed::B921600));
        assert_eq!(LineSpeed::try_from(1234), Err(1234));
        assert_eq!(LineSpeed::try_from(0), Err(0));
    }

    #[test]
    fn test_line_speed_display() {
        assert_eq!(LineSpeed::B2400.to_string(), "2400");
        assert_eq!(LineSpeed::B460800.to_string(), "460800");
    }

    #[test]
    fn test_serial_config_defaults_to_hardware_flow() {
        let config = SerialConfig::new("/dev/ttyUSB0", LineSpeed::B115200);
        assert_eq!(config.flow_control, SerialFlowControl::Hardware);

        let config = config.flow_control(SerialFlowControl::None);
        assert_eq!(config.flow_control, SerialFlowControl::None);
    }

    // Raw line on the slave side of a fresh pty; the master plays the modem
    fn pty_line() -> (File, SerialLine) {
        let pty = openpty(None, None).unwrap();
        let path = std::fs::read_link(format!("/proc/self/fd/{}", pty.slave.as_raw_fd())).unwrap();
        let line = SerialLine::open(SerialConfig::new(path, LineSpeed::B115200)).unwrap();
        (File::from(pty.master), line)
    }

    #[test]
    fn test_read_from_pty() {
        let (mut modem, mut line) = pty_line();
        modem.write_all(b"\r\nOK\r\n").unwrap();

        let mut buf = [0u8; 16];
        let n = line.read_with_deadline(&mut buf, Duration::from_millis(500)).unwrap();
        assert!(n > 0);
        assert!(b"\r\nOK\r\n".starts_with(&buf[..n]));
    }

    #[test]
    fn test_elapsed_deadline_reads_zero() {
        let (_modem, mut line) = pty_line();
        let mut buf = [0u8; 16];
        assert_eq!(line.read_with_deadline(&mut buf, Duration::from_millis(20)).unwrap(), 0);
        assert_eq!(line.read_with_deadline(&mut buf, Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_hangup_reads_zero() {
        let (modem, mut line) = pty_line();
        drop(modem);

        let mut buf = [0u8; 16];
        let n = line.read_with_deadline(&mut buf, Duration::from_millis(200)).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_write_waits_for_room_after_polling_read() {
        let (mut modem, mut line) = pty_line();
        let payload = vec![b'A'; 64 * 1024];

        let reader = std::thread::spawn(move || {
            let mut total = 0;
            let mut buf = [0u8; 1024];
            while total < 64 * 1024 {
                match modem.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => total += n,
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            total
        });

        // Leaves the port timeout at zero
        let mut buf = [0u8; 16];
        assert_eq!(line.read_with_deadline(&mut buf, Duration::ZERO).unwrap(), 0);

        line.write_all(&payload).unwrap();
        assert_eq!(reader.join().unwrap(), payload.len());
    }

    #[test]
    fn test_open_missing_device() {
        let config = SerialConfig::new("/dev/does-not-exist-cmux", LineSpeed::B115200);
        assert!(SerialLine::open(config).is_err());
    }
}
