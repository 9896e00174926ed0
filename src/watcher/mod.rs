//! File system watcher

mod handler;

pub use handler::{EventHandler, is_hidden};

use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Raw notify results, as delivered by the backend thread
pub type EventReceiver = mpsc::UnboundedReceiver<notify::Result<notify::Event>>;

/// Watches one folder (non-recursively) and forwards its events
pub struct Watcher {
    watcher: RecommendedWatcher,
    path: PathBuf,
}

impl Watcher {
    /// Start watching `path`. Events arrive on the returned receiver until
    /// the watcher is dropped.
    pub fn start(path: &Path) -> Result<(Self, EventReceiver)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Err(e) = tx.send(res) {
                    error!("Failed to send watch event: {}", e);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        info!("Watching for files in: {}", path.display());

        Ok((
            Self {
                watcher,
                path: path.to_path_buf(),
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching; dropping the watcher does the same
    pub fn stop(mut self) -> Result<()> {
        self.watcher
            .unwatch(&self.path)
            .with_context(|| format!("Failed to unwatch {}", self.path.display()))?;
        info!("Stopped watching: {}", self.path.display());
        Ok(())
    }
}

/// Notifies when a single file (the config file) changes on disk
pub struct FileChangeWatcher {
    _watcher: RecommendedWatcher,
}

impl FileChangeWatcher {
    /// Watch the folder containing `file` and send `()` for every event
    /// that touches `file`.
    pub fn start(file: &Path) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let parent = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let name = file
            .file_name()
            .map(|n| n.to_os_string())
            .context("Config path has no file name")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let touched = !event.kind.is_access()
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(name.as_os_str()));
                    if touched {
                        let _ = tx.send(());
                    }
                }
                Err(e) => error!("Config watch error: {}", e),
            },
            Config::default(),
        )
        .context("Failed to create config watcher")?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", parent.display()))?;

        Ok((Self { _watcher: watcher }, rx))
    }
}
