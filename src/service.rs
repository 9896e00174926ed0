//! Watch service - the Idle/Watching lifecycle around a [`Sorter`]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::sorter::{Sorter, SweepSummary};
use crate::watcher::{EventHandler, EventReceiver, Watcher};

/// Where the service is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Watching { source: PathBuf },
}

/// A running watch: the notify watcher plus the task dispatching its events
struct ActiveWatch {
    watcher: Watcher,
    dispatcher: JoinHandle<()>,
}

impl ActiveWatch {
    fn shutdown(self) {
        // Stop notifications before the dispatcher goes away
        if let Err(e) = self.watcher.stop() {
            error!("Error stopping file watcher: {:#}", e);
        }
        self.dispatcher.abort();
    }
}

/// Owns the watcher for the configured source folder and restarts it when
/// the configuration changes. Must be used inside a tokio runtime.
pub struct SortService {
    sorter: Arc<Sorter>,
    active: Option<ActiveWatch>,
}

impl SortService {
    pub fn new(sorter: Arc<Sorter>) -> Self {
        Self {
            sorter,
            active: None,
        }
    }

    pub fn sorter(&self) -> &Arc<Sorter> {
        &self.sorter
    }

    pub fn state(&self) -> ServiceState {
        match &self.active {
            Some(active) => ServiceState::Watching {
                source: active.watcher.path().to_path_buf(),
            },
            None => ServiceState::Idle,
        }
    }

    /// Start watching the configured source folder, replacing any current
    /// watch. Stays idle when the configuration is incomplete.
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        let snapshot = self.sorter.config().load();
        if !snapshot.is_configured() {
            info!("Cannot start file watcher: missing configuration");
            return Ok(());
        }

        let source = canonical(snapshot.source_folder());
        let (watcher, rx) = Watcher::start(&source)?;
        let handler = EventHandler::new(&source, snapshot.settle_delay());
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&self.sorter), handler, rx));

        self.active = Some(ActiveWatch {
            watcher,
            dispatcher,
        });

        if snapshot.config().sort_existing_files {
            let sorter = Arc::clone(&self.sorter);
            tokio::task::spawn_blocking(move || {
                if let Err(e) = sorter.sort_existing(&source) {
                    error!("Existing Files Sorting failed: {}", e);
                }
            });
        }

        Ok(())
    }

    /// Stop watching. Moves already dispatched run to completion.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.shutdown();
        }
    }

    /// Replace the active configuration and restart watching against it.
    ///
    /// Watch failures are logged and leave the service idle.
    pub fn apply_config(&mut self, config: Config) -> ServiceState {
        self.sorter.config().replace(config);
        if let Err(e) = self.start() {
            error!("Error starting file watcher: {:#}", e);
        }
        self.state()
    }

    /// Sweep the configured source folder now
    pub async fn sort_now(&self) -> Result<SweepSummary> {
        let snapshot = self.sorter.config().load();
        if !snapshot.is_configured() {
            info!("Cannot sort existing files: missing configuration");
            return Ok(SweepSummary::default());
        }

        let sorter = Arc::clone(&self.sorter);
        let source = snapshot.source_folder().to_path_buf();
        let summary = tokio::task::spawn_blocking(move || sorter.sort_existing(&source))
            .await
            .context("Sort task failed")??;
        Ok(summary)
    }
}

impl Drop for SortService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward each added file to the sorter as its own task
async fn dispatch(sorter: Arc<Sorter>, mut handler: EventHandler, mut rx: EventReceiver) {
    while let Some(result) = rx.recv().await {
        match result {
            Ok(event) => {
                for path in handler.file_added(&event) {
                    debug!("File added: {}", path.display());
                    tokio::spawn(sorter.handle_new_file(path));
                }
                handler.cleanup();
            }
            Err(e) => error!("File watcher error: {}", e),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
