//! Runtime Permission Queries
//!
//! Abstracts the host's permission subsystem. Only the query side lives here;
//! prompting the user is a UI concern the core never drives.

use serde::{Deserialize, Serialize};

/// First Android API level that splits storage access into per-media
/// permissions (Android 13, "Tiramisu").
pub const MEDIA_PERMISSION_API_LEVEL: u32 = 33;

/// Runtime permissions the playback service cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Read access to audio files (API 33+).
    ReadMediaAudio,
    /// Legacy read access to shared storage.
    ReadExternalStorage,
    /// Permission to post notifications (API 33+).
    PostNotifications,
}

impl Permission {
    /// Permission needed to read the user's audio library on the given
    /// platform API level.
    ///
    /// # Example
    ///
    /// ```
    /// use bridge_traits::permission::Permission;
    ///
    /// assert_eq!(Permission::for_media_access(34), Permission::ReadMediaAudio);
    /// assert_eq!(Permission::for_media_access(29), Permission::ReadExternalStorage);
    /// ```
    pub fn for_media_access(api_level: u32) -> Self {
        if api_level >= MEDIA_PERMISSION_API_LEVEL {
            Permission::ReadMediaAudio
        } else {
            Permission::ReadExternalStorage
        }
    }

    /// Platform identifier of the permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadMediaAudio => "android.permission.READ_MEDIA_AUDIO",
            Permission::ReadExternalStorage => "android.permission.READ_EXTERNAL_STORAGE",
            Permission::PostNotifications => "android.permission.POST_NOTIFICATIONS",
        }
    }
}

/// Permission checker trait
///
/// Side-effect-free query against the OS permission subsystem:
/// - **Android**: `ContextCompat.checkSelfPermission`
/// - **iOS**: `MPMediaLibrary.authorizationStatus`
/// - **Desktop**: usually a filesystem access probe
///
/// Implementations must not prompt the user.
pub trait PermissionChecker: Send + Sync {
    /// Returns `true` when `permission` is currently granted.
    fn has_permission(&self, permission: Permission) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_permission_by_api_level() {
        assert_eq!(Permission::for_media_access(33), Permission::ReadMediaAudio);
        assert_eq!(Permission::for_media_access(32), Permission::ReadExternalStorage);
        assert_eq!(Permission::for_media_access(0), Permission::ReadExternalStorage);
    }

    #[test]
    fn test_permission_identifiers() {
        assert!(Permission::ReadMediaAudio.as_str().ends_with("READ_MEDIA_AUDIO"));
        assert_ne!(
            Permission::ReadMediaAudio.as_str(),
            Permission::ReadExternalStorage.as_str()
        );
    }
}
