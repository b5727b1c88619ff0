//! Command line arguments

use crate::config::{Config, ConfigError, Settings};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Attach a GSM modem to the kernel n_gsm multiplexer
#[derive(Parser, Debug, Default)]
#[command(name = "cmux", version, about, long_about = None)]
pub struct Cli {
    /// Serial device of the modem [default: /dev/ttyUSB0]
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Line speed in bps [default: 115200]
    #[arg(long, value_name = "BPS")]
    pub speed: Option<u32>,

    /// Modem type: default, sim900 or telit
    #[arg(long = "type", value_name = "TYPE")]
    pub profile: Option<String>,

    /// Maximum frame size [default: 512]
    #[arg(long)]
    pub mtu: Option<u16>,

    /// Number of nodes to create, 0 disables them [default: 1]
    #[arg(long)]
    pub nodes: Option<u8>,

    /// Node path prefix [default: /dev/ttyGSM]
    #[arg(long, value_name = "PREFIX")]
    pub base: Option<String>,

    /// Mux driver name in /proc/devices [default: gsmtty]
    #[arg(long, value_name = "NAME")]
    pub driver: Option<String>,

    /// Go to background once the mux is up [default: 1]
    #[arg(long, value_name = "1|0", value_parser = BoolishValueParser::new())]
    pub daemon: Option<bool>,

    /// Debug logging [default: 1]
    #[arg(long, value_name = "1|0", value_parser = BoolishValueParser::new())]
    pub debug: Option<bool>,

    /// Remove leftover nodes before creating new ones
    #[arg(long, alias = "remove_nodes")]
    pub remove_nodes: bool,

    /// Port speed class sent with AT+CMUX [default: 6]
    #[arg(long, value_name = "CLASS")]
    pub mux_baudrate: Option<u8>,

    /// Write the log to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Read settings from a TOML file; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Settings given on the command line
    pub fn settings(&self) -> Settings {
        Settings {
            device: self.device.clone(),
            speed: self.speed,
            profile: self.profile.clone(),
            mtu: self.mtu,
            nodes: self.nodes,
            base: self.base.clone(),
            driver: self.driver.clone(),
            daemon: self.daemon,
            debug: self.debug,
            remove_nodes: self.remove_nodes.then_some(true),
            mux_baudrate: self.mux_baudrate,
            log_file: self.log_file.clone(),
        }
    }

    /// Stack defaults, the optional file and the flags into a [`Config`]
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let file = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        Config::try_from(file.merge(self.settings()))
    }
}
