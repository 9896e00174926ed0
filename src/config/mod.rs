//! Configuration management

mod schema;

pub use schema::{Config, CustomCategory, FileRule, GeneralConfig, default_file_rules};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name written into exported settings
pub const APP_NAME: &str = "foldersort";

/// Portable settings file produced by [`Config::export`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigExport {
    pub version: String,
    pub app_name: String,
    pub export_date: DateTime<Utc>,
    pub config: Config,
}

/// Accepts either an export wrapper or a bare config object
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Wrapped(ConfigExport),
    Bare(Config),
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Config {
    /// Load configuration from a file or default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = if is_json(&config_path) {
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse config from {}", config_path.display())
                })?
            } else {
                toml::from_str(&content).with_context(|| {
                    format!("Failed to parse config from {}", config_path.display())
                })?
            };

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file (with advisory file locking)
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = if is_json(&config_path) {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };

        let mut lock_name = config_path.as_os_str().to_owned();
        lock_name.push(".lock");
        let lock_path = PathBuf::from(lock_name);
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        use fs2::FileExt;
        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config file lock")?;

        let result = std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {}", config_path.display()));

        let _ = lock_file.unlock();

        result
    }

    /// Get the default config file path
    /// Uses the platform config directory (via dirs::config_dir), falling back to ~/.config
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join(APP_NAME).join("config.toml"))
    }

    /// Wrap this config for export, scrubbing machine-specific folders
    pub fn to_export(&self) -> ConfigExport {
        let mut config = self.clone();
        config.source_folder = PathBuf::new();
        config.base_target_folder = PathBuf::new();

        ConfigExport {
            version: crate::VERSION.to_string(),
            app_name: APP_NAME.to_string(),
            export_date: Utc::now(),
            config,
        }
    }

    /// Write a portable JSON export to `path`
    pub fn export(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.to_export())
            .context("Failed to serialize exported config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write export to {}", path.display()))
    }

    /// Read an exported config and merge in this machine's folders.
    ///
    /// Everything except `sourceFolder` and `baseTargetFolder` comes from the
    /// imported file.
    pub fn import(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read import from {}", path.display()))?;
        let payload: ImportPayload = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse import from {}", path.display()))?;

        let mut imported = match payload {
            ImportPayload::Wrapped(export) => {
                tracing::debug!(
                    "Importing {} export v{} from {}",
                    export.app_name,
                    export.version,
                    export.export_date
                );
                export.config
            }
            ImportPayload::Bare(config) => config,
        };

        imported.source_folder = self.source_folder.clone();
        imported.base_target_folder = self.base_target_folder.clone();
        Ok(imported)
    }
}
