//! Kernel device registry lookup (`/proc/devices`)

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the registry
pub const PROC_DEVICES: &str = "/proc/devices";

/// Major number of a character device driver
pub type ClassId = u32;

/// Registry lookup failure
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The registry could not be read
    #[error("Cannot open {path:?}: {source}")]
    Unreadable {
        /// Offending file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// No registered driver matches
    #[error("Cannot get major number of driver '{0}'")]
    NotFound(String),
}

/// Name to major number table
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    path: PathBuf,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new(PROC_DEVICES)
    }
}

impl ClassRegistry {
    /// Registry read from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Major number of the first character driver whose line mentions `driver`
    pub fn resolve_class(&self, driver: &str) -> Result<ClassId, ResourceError> {
        let unreadable = |source| ResourceError::Unreadable {
            path: self.path.clone(),
            source,
        };
        let file = std::fs::File::open(&self.path).map_err(unreadable)?;

        for line in BufReader::new(file).lines() {
            let line = line.map_err(unreadable)?;
            if line.trim_start().starts_with("Block devices") {
                break;
            }
            if !line.contains(driver) {
                continue;
            }
            if let Some(major) = parse_entry(&line) {
                tracing::debug!("Driver {} has major {}", driver, major);
                return Ok(major);
            }
        }

        Err(ResourceError::NotFound(driver.to_string()))
    }
}

// "<major> <name>"
fn parse_entry(line: &str) -> Option<ClassId> {
    let mut fields = line.split_whitespace();
    let major = fields.next()?.parse().ok()?;
    fields.next()?;
    Some(major)
}
