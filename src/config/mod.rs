//! Configuration management for shellkeep

pub mod schema;

pub use schema::{Config, GeneralConfig, NetworkConfig, StoreConfig, WorkerConfig};

use crate::error::{ShellkeepError, ShellkeepResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of the project-local config override
pub const LOCAL_CONFIG_FILE: &str = ".shellkeep.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellkeep")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellkeep")
    }

    /// Get the default cache store directory
    pub fn caches_dir() -> PathBuf {
        Self::state_dir().join("caches")
    }

    /// Get the journal path
    pub fn journal_path() -> PathBuf {
        Self::state_dir().join("journal.log")
    }

    /// Resolve the cache store directory for a loaded config
    pub fn store_dir(config: &Config) -> PathBuf {
        config.store.path.clone().unwrap_or_else(Self::caches_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellkeepResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellkeepResult<Config> {
        let value = read_toml_value(path).await?;
        into_config(value, path)
    }

    /// Load the global config with an optional project-local file merged on top
    pub async fn load_merged(&self, local: Option<&Path>) -> ShellkeepResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut base = if self.config_path.exists() {
            read_toml_value(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };
        let overlay = read_toml_value(local).await?;
        merge_toml(&mut base, overlay);

        debug!("Merged local config from {}", local.display());
        into_config(base, local)
    }

    /// Walk up from `start` looking for a project-local config file
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellkeepResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellkeepError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellkeepResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellkeepError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state and store directories exist
    pub async fn ensure_state_dirs(config: &Config) -> ShellkeepResult<()> {
        let dirs = [Self::state_dir(), Self::store_dir(config)];

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                ShellkeepError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_toml_value(path: &Path) -> ShellkeepResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ShellkeepError::io(format!("reading config from {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| ShellkeepError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn into_config(value: toml::Value, path: &Path) -> ShellkeepResult<Config> {
    value
        .try_into()
        .map_err(|e: toml::de::Error| ShellkeepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else replaces
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.worker.namespace, "opsiyon-cache-v2");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.worker.namespace = "calc-v9".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.worker.namespace, "calc-v9");
    }

    #[tokio::test]
    async fn invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[worker\nnamespace = 1").await.unwrap();

        let err = ConfigManager::with_path(path.clone())
            .load()
            .await
            .unwrap_err();
        match err {
            ShellkeepError::ConfigInvalid { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_config_overrides_single_keys() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        let local = temp.path().join(LOCAL_CONFIG_FILE);
        tokio::fs::write(
            &global,
            "[worker]\nnamespace = \"global-v1\"\norigin = \"https://calc.example\"\n",
        )
        .await
        .unwrap();
        tokio::fs::write(&local, "[worker]\nnamespace = \"local-v2\"\n")
            .await
            .unwrap();

        let config = ConfigManager::with_path(global)
            .load_merged(Some(&local))
            .await
            .unwrap();

        assert_eq!(config.worker.namespace, "local-v2");
        assert_eq!(config.worker.origin, "https://calc.example");
    }

    #[test]
    fn find_local_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join(LOCAL_CONFIG_FILE), "").unwrap();

        let found = ConfigManager::find_local_config(&nested).unwrap();
        assert_eq!(found, temp.path().join(LOCAL_CONFIG_FILE));
    }
}
