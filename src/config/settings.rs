//! Raw settings as read from a file or the command line

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unvalidated settings layer
///
/// Every field is optional so layers can be stacked: built-in defaults,
/// then a TOML file, then command line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct Settings {
    /// Serial device of the modem
    pub device: Option<PathBuf>,
    /// Line speed in bits per second
    pub speed: Option<u32>,
    /// Device profile name
    #[serde(rename = "type")]
    pub profile: Option<String>,
    /// Maximum frame size
    pub mtu: Option<u16>,
    /// Number of tty nodes to create
    pub nodes: Option<u8>,
    /// Node path prefix
    pub base: Option<String>,
    /// Driver name in the kernel device registry
    pub driver: Option<String>,
    /// Fork into background
    pub daemon: Option<bool>,
    /// Debug logging
    pub debug: Option<bool>,
    /// Remove nodes left over by an earlier run before creating new ones
    pub remove_nodes: Option<bool>,
    /// Modem port speed class sent with `AT+CMUX`
    pub mux_baudrate: Option<u8>,
    /// Log to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Load a settings layer from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stack `upper` on top of `self`; values set in `upper` win
    #[must_use]
    pub fn merge(self, upper: Settings) -> Settings {
        Settings {
            device: upper.device.or(self.device),
            speed: upper.speed.or(self.speed),
            profile: upper.profile.or(self.profile),
            mtu: upper.mtu.or(self.mtu),
            nodes: upper.nodes.or(self.nodes),
            base: upper.base.or(self.base),
            driver: upper.driver.or(self.driver),
            daemon: upper.daemon.or(self.daemon),
            debug: upper.debug.or(self.debug),
            remove_nodes: upper.remove_nodes.or(self.remove_nodes),
            mux_baudrate: upper.mux_baudrate.or(self.mux_baudrate),
            log_file: upper.log_file.or(self.log_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_merge_upper_wins() {
        let file = Settings {
            speed: Some(9600),
            mtu: Some(128),
            driver: Some("gsmtty".into()),
            ..Settings::default()
        };
        let cli = Settings {
            speed: Some(115_200),
            nodes: Some(2),
            ..Settings::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.speed, Some(115_200));
        assert_eq!(merged.mtu, Some(128));
        assert_eq!(merged.nodes, Some(2));
        assert_eq!(merged.driver.as_deref(), Some("gsmtty"));
        assert_eq!(merged.device, None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
device = "/dev/ttyS1"
speed = 460800
type = "Telit"
nodes = 3
daemon = false
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.device, Some(PathBuf::from("/dev/ttyS1")));
        assert_eq!(settings.speed, Some(460_800));
        assert_eq!(settings.profile.as_deref(), Some("Telit"));
        assert_eq!(settings.nodes, Some(3));
        assert_eq!(settings.daemon, Some(false));
        assert_eq!(settings.mtu, None);
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud = 115200").unwrap();

        assert!(matches!(
            Settings::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            Settings::from_file(Path::new("/nonexistent/cmux.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
