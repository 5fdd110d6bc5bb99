//! Settings Storage using a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, error};

const SETTINGS_FILE_NAME: &str = "settings.json";
const APP_DIR_NAME: &str = "playback-host";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum SettingValue {
    String(String),
    Bool(bool),
}

impl SettingValue {
    fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Bool(_) => "bool",
        }
    }
}

/// JSON-file-backed settings store implementation
///
/// The whole map is held in memory and written back after every mutation.
/// A `path` of `None` keeps the store purely in memory.
pub struct JsonSettingsStore {
    path: Option<PathBuf>,
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl JsonSettingsStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values: BTreeMap<String, SettingValue> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(BridgeError::Io(err)),
        };

        debug!(path = ?path, keys = values.len(), "Initialized settings store");

        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    /// Open the store in the platform config directory.
    pub async fn open_default() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            BridgeError::NotAvailable("Platform config directory not found".to_string())
        })?;
        Self::open(dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME)).await
    }

    /// Create an in-memory settings store (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, values: &BTreeMap<String, SettingValue>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(values)?;
        tokio::fs::write(path, bytes).await.map_err(|err| {
            error!(path = ?path, error = %err, "Failed to write settings");
            BridgeError::Io(err)
        })
    }

    async fn set_value(&self, key: &str, value: SettingValue) -> Result<()> {
        let mut values = self.values.write().await;
        let value_type = value.type_name();
        values.insert(key.to_string(), value);
        self.persist(&values).await?;

        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Option<SettingValue> {
        self.values.read().await.get(key).cloned()
    }

    fn type_mismatch(key: &str, expected: &str, actual: &SettingValue) -> BridgeError {
        error!(
            key = key,
            expected = expected,
            actual = actual.type_name(),
            "Type mismatch"
        );
        BridgeError::OperationFailed(format!(
            "Type mismatch for `{}`: expected {}, got {}",
            key,
            expected,
            actual.type_name()
        ))
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, SettingValue::String(value.to_string()))
            .await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_value(key).await {
            Some(SettingValue::String(value)) => Ok(Some(value)),
            Some(other) => Err(Self::type_mismatch(key, "string", &other)),
            None => Ok(None),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, SettingValue::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_value(key).await {
            Some(SettingValue::Bool(value)) => Ok(Some(value)),
            Some(other) => Err(Self::type_mismatch(key, "bool", &other)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.persist(&values).await?;
            debug!(key = key, "Deleted setting");
        }
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().await.contains_key(key))
    }
}
