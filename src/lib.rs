//! foldersort - sorts files dropped into a folder by extension
//!
//! Built-in rules and custom categories map extensions to folders under a
//! base target folder. New files in the watched folder are moved once they
//! settle; existing files can be swept in one pass.

pub mod config;
pub mod mover;
pub mod notifications;
pub mod rules;
pub mod service;
pub mod sorter;
pub mod watcher;

pub use config::Config;
pub use rules::{Rule, RuleOrigin, RuleSet};
pub use service::{ServiceState, SortService};
pub use sorter::{ConfigHandle, MoveOutcome, SortListener, Sorter, SweepSummary};
pub use watcher::Watcher;

use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("invalid env regex")
});

/// Expand a leading `~` and `$VAR` / `${VAR}` references in a configured
/// folder. Unset variables are left as written.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let home_relative = match raw.as_ref() {
        "~" => Some(""),
        other => other.strip_prefix("~/"),
    };
    let with_home = match (home_relative, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home.to_string_lossy().into_owned(),
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => raw.to_string(),
    };

    let expanded = ENV_VAR.replace_all(&with_home, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });
    PathBuf::from(expanded.as_ref())
}
