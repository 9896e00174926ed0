//! Configuration schema

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// This is the snapshot exchanged with whatever edits the settings. Empty
/// folder paths mean "unset".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Folder to watch for new files
    #[serde(default)]
    pub source_folder: PathBuf,

    /// Folder under which category folders are created
    #[serde(default)]
    pub base_target_folder: PathBuf,

    /// Sweep the source folder once whenever watching starts
    #[serde(default)]
    pub sort_existing_files: bool,

    /// UI theme name
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Launch on login (handled by the host application)
    #[serde(default)]
    pub auto_launch_enabled: bool,

    /// Built-in category rules, in priority order
    #[serde(default)]
    pub file_rules: Vec<FileRule>,

    /// User-defined categories, matched after `file_rules`
    #[serde(default)]
    pub custom_categories: Vec<CustomCategory>,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::new(),
            base_target_folder: PathBuf::new(),
            sort_existing_files: false,
            theme: default_theme(),
            auto_launch_enabled: false,
            file_rules: Vec::new(),
            custom_categories: Vec::new(),
            general: GeneralConfig::default(),
        }
    }
}

fn default_theme() -> String {
    "light".to_string()
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Milliseconds to wait after a file appears before sorting it
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Run moves one at a time instead of letting them interleave
    #[serde(default)]
    pub serialize_moves: bool,

    /// Enable desktop notifications for moved files and errors
    #[serde(default)]
    pub notifications_enabled: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            settle_delay_ms: default_settle_delay(),
            serialize_moves: false,
            notifications_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_settle_delay() -> u64 {
    1000
}

/// A built-in category rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRule {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Extensions such as `.jpg`; case and leading dot are normalized
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Folder name under the base target folder
    #[serde(default)]
    pub target_folder: String,
}

/// A user-defined category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCategory {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub folder_name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("Images", &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"]),
    ("Documents", &[".pdf", ".doc", ".docx", ".txt", ".rtf"]),
    ("Videos", &[".mp4", ".avi", ".mkv", ".mov", ".wmv"]),
    ("Music", &[".mp3", ".wav", ".flac", ".aac", ".ogg"]),
    ("Archives", &[".zip", ".rar", ".7z", ".tar", ".gz"]),
    ("Spreadsheets", &[".xls", ".xlsx", ".csv"]),
    ("Presentations", &[".ppt", ".pptx"]),
];

/// The stock categories, each sorted into a folder of the same name
pub fn default_file_rules() -> Vec<FileRule> {
    BUILTIN_CATEGORIES
        .iter()
        .map(|(folder, extensions)| FileRule {
            enabled: true,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            target_folder: folder.to_string(),
        })
        .collect()
}

impl Config {
    /// Default configuration with the stock categories filled in
    pub fn with_default_rules() -> Self {
        Self {
            file_rules: default_file_rules(),
            ..Self::default()
        }
    }

    /// Both the source and the base target folder are set
    pub fn is_configured(&self) -> bool {
        !self.source_folder.as_os_str().is_empty()
            && !self.base_target_folder.as_os_str().is_empty()
    }
}
