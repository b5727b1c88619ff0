//! Log output setup

use crate::config::Config;
use anyhow::Context;
use std::path::Path;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `--debug` selects the default level; `RUST_LOG` directives still apply on
/// top. With a log file the output is written there synchronously, so it
/// keeps working after the process detached from its terminal.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &config.log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(open_log_file(path)?)
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Cannot initialize logging: {e}"))
}

fn open_log_file(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("Log file {} has no file name", path.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Cannot open log file {}", path.display()))
}
