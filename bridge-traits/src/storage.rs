//! Settings Storage Abstraction
//!
//! Preferences the playback service reads at startup (e.g. gapless playback).

use async_trait::async_trait;

use crate::error::Result;

/// Settings key toggling silence skipping between tracks.
pub const GAPLESS_PLAYBACK_KEY: &str = "gapless_playback";

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - Android: SharedPreferences / DataStore
/// - iOS: UserDefaults
/// - Desktop: config file
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn enable_gapless(store: &dyn SettingsStore) -> Result<()> {
///     store.set_bool("gapless_playback", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some() || self.get_bool(key).await?.is_some())
    }
}
