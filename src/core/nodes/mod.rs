//! Virtual tty nodes for the mux channels
//!
//! After the mode switch the kernel exposes one tty per DLCI under the
//! `gsmtty` driver. This module finds the driver's major number and creates
//! `{base}1..={base}N` character nodes for it, and removes them again.

mod registry;

pub use registry::{ClassId, ClassRegistry, ResourceError, PROC_DEVICES};

use nix::sys::stat::{makedev, mknod, Mode, SFlag};
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Permission bits of every node
pub const NODE_MODE: u32 = 0o666;

/// Filesystem operations needed for nodes
#[cfg_attr(test, mockall::automock)]
pub trait NodeFs {
    /// Create a character special file with mode [`NODE_MODE`]
    fn make_char_device(&self, path: &Path, major: ClassId, minor: u32) -> io::Result<()>;

    /// Remove a node
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFs;

impl NodeFs for SystemFs {
    fn make_char_device(&self, path: &Path, major: ClassId, minor: u32) -> io::Result<()> {
        let device = makedev(u64::from(major), u64::from(minor));
        mknod(path, SFlag::S_IFCHR, Mode::from_bits_truncate(NODE_MODE), device)?;
        // mknod applies the umask; force the exact mode
        std::fs::set_permissions(path, Permissions::from_mode(NODE_MODE))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Path of node `minor` for `base`
pub fn node_path(base: &str, minor: u32) -> PathBuf {
    PathBuf::from(format!("{base}{minor}"))
}

/// Nodes created for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSet {
    base: String,
    major: ClassId,
    count: u32,
    created: Vec<u32>,
}

impl NodeSet {
    /// Node path prefix
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Driver major number
    pub fn major(&self) -> ClassId {
        self.major
    }

    /// Requested number of nodes
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Minors that were actually created
    pub fn created(&self) -> &[u32] {
        &self.created
    }

    /// Number of nodes created
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// Every requested node exists
    pub fn is_complete(&self) -> bool {
        self.created.len() == self.count as usize
    }
}

/// Creates and removes the mux nodes
#[derive(Debug, Clone, Default)]
pub struct NodeManager<F = SystemFs> {
    fs: F,
}

impl<F: NodeFs> NodeManager<F> {
    /// Manager working on `fs`
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Create `{base}1` through `{base}{count}` for driver `major`.
    ///
    /// A node that cannot be created is logged and skipped; the returned set
    /// tells how many succeeded.
    pub fn create_nodes(&self, major: ClassId, base: &str, count: u32) -> NodeSet {
        let mut created = Vec::with_capacity(count as usize);

        for minor in 1..=count {
            let path = node_path(base, minor);
            match self.fs.make_char_device(&path, major, minor) {
                Ok(()) => {
                    tracing::debug!("Created {}", path.display());
                    created.push(minor);
                }
                Err(e) => tracing::warn!("Cannot create {}: {}", path.display(), e),
            }
        }

        NodeSet {
            base: base.to_string(),
            major,
            count,
            created,
        }
    }

    /// Remove `{base}1` through `{base}{count}`.
    ///
    /// Never fails; nodes that are already gone are only logged.
    pub fn remove_nodes(&self, base: &str, count: u32) {
        for minor in 1..=count {
            let path = node_path(base, minor);
            tracing::debug!("Removing {}", path.display());
            match self.fs.remove(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("{} already gone", path.display());
                }
                Err(e) => tracing::warn!("Cannot remove {}: {}", path.display(), e),
            }
        }
    }

    /// Remove every node of `set`, created or not
    pub fn teardown(&self, set: &NodeSet) {
        self.remove_nodes(&set.base, set.count);
    }
}
