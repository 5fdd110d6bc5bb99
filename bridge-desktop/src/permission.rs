//! Permission probe for desktop platforms.
//!
//! Desktop OSes have no runtime media permission; the closest equivalent is
//! whether the process can list the user's music directory.

use bridge_traits::permission::{Permission, PermissionChecker};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Grants media permissions when `root` can be listed.
#[derive(Debug, Clone)]
pub struct DirectoryPermissionChecker {
    root: PathBuf,
}

impl DirectoryPermissionChecker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Checker for the platform audio directory (`~/Music` and friends).
    ///
    /// Returns `None` when the platform reports no such directory.
    pub fn for_audio_dir() -> Option<Self> {
        dirs::audio_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn can_list_root(&self) -> bool {
        match std::fs::read_dir(&self.root) {
            Ok(_) => true,
            Err(err) => {
                debug!(path = %self.root.display(), error = %err, "Audio directory not readable");
                false
            }
        }
    }
}

impl PermissionChecker for DirectoryPermissionChecker {
    fn has_permission(&self, permission: Permission) -> bool {
        match permission {
            Permission::ReadMediaAudio | Permission::ReadExternalStorage => self.can_list_root(),
            Permission::PostNotifications => true,
        }
    }
}
