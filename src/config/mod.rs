//! Configuration module
//!
//! Settings are layered (defaults, optional TOML file, command line) and then
//! validated once into an immutable [`Config`] that is passed by reference to
//! every component.

mod settings;

pub use settings::Settings;

use crate::core::profile::DeviceProfile;
use crate::core::transport::{LineSpeed, SerialConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Most nodes a modem can serve
pub const MAX_NODES: u8 = 4;

/// Frame sizes accepted by n_gsm
pub const MTU_RANGE: std::ops::RangeInclusive<u16> = 8..=1500;

/// Port speed classes of `AT+CMUX`
pub const MUX_BAUD_RANGE: std::ops::RangeInclusive<u8> = 1..=7;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Speed is not a standard line speed
    #[error("Invalid value for speed: {0}")]
    InvalidSpeed(u32),

    /// Unknown device type
    #[error("Invalid value for --type: {0}")]
    InvalidProfile(String),

    /// Too many nodes
    #[error("Invalid value for --nodes: {0}, must be < {max}", max = MAX_NODES + 1)]
    InvalidNodes(u8),

    /// Frame size out of range
    #[error("Invalid value for --mtu: {0}, must be within 8..=1500")]
    InvalidMtu(u16),

    /// `AT+CMUX` port speed class out of range
    #[error("Invalid value for --mux-baudrate: {0}, must be within 1..=7")]
    InvalidMuxBaud(u8),

    /// Required value left empty
    #[error("Argument missing for option {0}")]
    Empty(&'static str),

    /// Current directory unknown while anchoring `--base`
    #[error("Cannot resolve relative --base: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// Settings file could not be read
    #[error("Cannot read {path:?}: {source}")]
    Read {
        /// Offending file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML
    #[error("Cannot parse {path:?}: {source}")]
    Parse {
        /// Offending file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: toml::de::Error,
    },
}

/// Validated run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Serial device of the modem
    pub device: PathBuf,
    /// Line speed
    pub speed: LineSpeed,
    /// Device profile
    pub profile: DeviceProfile,
    /// Requested frame size; profiles may override it
    pub mtu: u16,
    /// Number of nodes to create, 0 disables node handling
    pub nodes: u8,
    /// Node path prefix, the minor number is appended
    pub base: String,
    /// Driver name in the kernel device registry
    pub driver: String,
    /// Fork into background once the mux is up
    pub daemonize: bool,
    /// Debug logging
    pub debug: bool,
    /// Remove leftover nodes before creating new ones
    pub remove_stale_nodes: bool,
    /// Port speed class sent with `AT+CMUX`
    pub mux_baud_class: u8,
    /// Log file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyUSB0"),
            speed: LineSpeed::B115200,
            profile: DeviceProfile::Default,
            mtu: 512,
            nodes: 1,
            base: "/dev/ttyGSM".to_string(),
            driver: "gsmtty".to_string(),
            daemonize: true,
            debug: true,
            remove_stale_nodes: false,
            mux_baud_class: 6,
            log_file: None,
        }
    }
}

impl Config {
    /// Serial line settings for the modem
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(&self.device, self.speed)
    }

    /// Frame size after the profile's override
    pub fn effective_mtu(&self) -> u16 {
        self.profile.effective_mtu(self.mtu)
    }
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let defaults = Config::default();

        let speed = match settings.speed {
            Some(bps) => LineSpeed::try_from(bps).map_err(ConfigError::InvalidSpeed)?,
            None => defaults.speed,
        };

        let profile = match settings.profile {
            Some(name) => name
                .parse::<DeviceProfile>()
                .map_err(|_| ConfigError::InvalidProfile(name))?,
            None => defaults.profile,
        };

        let nodes = settings.nodes.unwrap_or(defaults.nodes);
        if nodes > MAX_NODES {
            return Err(ConfigError::InvalidNodes(nodes));
        }

        let mtu = settings.mtu.unwrap_or(defaults.mtu);
        if !MTU_RANGE.contains(&mtu) {
            return Err(ConfigError::InvalidMtu(mtu));
        }

        let mux_baud_class = settings.mux_baudrate.unwrap_or(defaults.mux_baud_class);
        if !MUX_BAUD_RANGE.contains(&mux_baud_class) {
            return Err(ConfigError::InvalidMuxBaud(mux_baud_class));
        }

        let device = settings.device.unwrap_or(defaults.device);
        if device.as_os_str().is_empty() {
            return Err(ConfigError::Empty("--device"));
        }
        let mut base = settings.base.unwrap_or(defaults.base);
        if nodes > 0 && base.is_empty() {
            return Err(ConfigError::Empty("--base"));
        }
        // Daemonizing changes to /, teardown must still find the nodes
        if nodes > 0 && Path::new(&base).is_relative() {
            let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
            base = cwd.join(&base).to_string_lossy().into_owned();
        }
        let driver = settings.driver.unwrap_or(defaults.driver);
        if nodes > 0 && driver.is_empty() {
            return Err(ConfigError::Empty("--driver"));
        }

        Ok(Self {
            device,
            speed,
            profile,
            mtu,
            nodes,
            base,
            driver,
            daemonize: settings.daemon.unwrap_or(defaults.daemonize),
            debug: settings.debug.unwrap_or(defaults.debug),
            remove_stale_nodes: settings.remove_nodes.unwrap_or(defaults.remove_stale_nodes),
            mux_baud_class,
            log_file: settings.log_file.or(defaults.log_file),
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "type: {}", self.profile)?;
        writeln!(f, "device: {}", self.device.display())?;
        writeln!(f, "speed: {}", self.speed)?;
        writeln!(f, "mtu: {}", self.effective_mtu())?;
        writeln!(f, "debug: {}", u8::from(self.debug))?;
        writeln!(f, "daemon: {}", u8::from(self.daemonize))?;
        writeln!(f, "driver: {}", self.driver)?;
        writeln!(f, "base: {}", if self.nodes > 0 { self.base.as_str() } else { "disabled" })?;
        writeln!(f, "nodes: {}", self.nodes)?;
        write!(f, "remove nodes: {}", self.remove_stale_nodes)
    }
}
