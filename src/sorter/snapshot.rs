//! Immutable configuration snapshots and the handle that swaps them

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::Config;
use crate::rules::{Rule, RuleSet};

/// A configuration together with the rules derived from it.
///
/// Never mutated after construction; updates build a new one.
#[derive(Debug)]
pub struct Snapshot {
    config: Config,
    rules: RuleSet,
    source_folder: PathBuf,
    base_target_folder: PathBuf,
}

impl Snapshot {
    pub fn new(config: Config) -> Self {
        let rules = RuleSet::from_config(&config);
        let source_folder = expand_folder(&config.source_folder);
        let base_target_folder = expand_folder(&config.base_target_folder);
        Self {
            config,
            rules,
            source_folder,
            base_target_folder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Source folder with `~` and environment variables expanded
    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    /// Base target folder with `~` and environment variables expanded
    pub fn base_target_folder(&self) -> &Path {
        &self.base_target_folder
    }

    /// Both folders are set
    pub fn is_configured(&self) -> bool {
        !self.source_folder.as_os_str().is_empty()
            && !self.base_target_folder.as_os_str().is_empty()
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.config.general.settle_delay_ms)
    }

    /// Rule a file would be sorted by. `None` when nothing matches or there
    /// is nowhere to sort to.
    pub fn resolve(&self, path: &Path) -> Option<&Rule> {
        if self.base_target_folder.as_os_str().is_empty() {
            return None;
        }
        self.rules.match_path(path)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn expand_folder(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::new()
    } else {
        crate::expand_path(path)
    }
}

/// Shared, atomically replaceable reference to the active snapshot.
///
/// Readers get an `Arc` to a complete snapshot; a replacement never affects a
/// snapshot someone already holds.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(Snapshot::new(config)))),
        }
    }

    /// The snapshot active right now
    pub fn load(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the active snapshot wholesale, returning the new one
    pub fn replace(&self, config: Config) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new(config));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&snapshot);
        snapshot
    }
}
