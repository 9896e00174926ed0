//! Sort orchestrator - classifies files and moves them, one unit of work each

mod events;
mod snapshot;

pub use events::{ChannelListener, ErrorReport, FileSorted, Listeners, SortEvent, SortListener};
pub use snapshot::{ConfigHandle, Snapshot};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::mover::{self, FileSystem, MoveError, StdFs};

/// Failures of a whole sweep (individual files are reported, not returned)
#[derive(Error, Debug)]
pub enum SortError {
    #[error("Failed to read source folder {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one attempted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub file_name: String,
    pub source_dir: PathBuf,
    pub destination_folder: PathBuf,
    pub category_label: String,
    pub success: bool,
    pub error_detail: Option<String>,
}

/// Totals for a sweep of the source folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Non-directory entries looked at
    pub scanned: usize,
    pub moved: usize,
    pub failed: usize,
}

/// A move a sweep would perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub path: PathBuf,
    pub destination_folder: PathBuf,
    pub category_label: String,
}

/// Drives matching and moving against the active snapshot and reports
/// every attempted move to the listener.
pub struct Sorter {
    config: ConfigHandle,
    listener: Arc<dyn SortListener>,
    fs: Arc<dyn FileSystem>,
    /// Taken around each move while `general.serializeMoves` is set
    move_lock: Mutex<()>,
}

impl Sorter {
    pub fn new(config: ConfigHandle, listener: Arc<dyn SortListener>) -> Self {
        Self {
            config,
            listener,
            fs: Arc::new(StdFs),
            move_lock: Mutex::new(()),
        }
    }

    /// Use a different filesystem implementation
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Handle a file-added notification.
    ///
    /// The snapshot is captured when this is called, so a configuration
    /// replaced during the settle delay does not affect this file.
    pub fn handle_new_file(
        self: &Arc<Self>,
        path: PathBuf,
    ) -> impl Future<Output = Option<MoveOutcome>> + Send + 'static {
        let snapshot = self.config.load();
        let sorter = Arc::clone(self);

        async move {
            if !snapshot.is_configured() {
                debug!("Ignoring {}: sorting is not configured", path.display());
                return None;
            }

            let delay = snapshot.settle_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let task = tokio::task::spawn_blocking(move || sorter.sort_file_with(&snapshot, &path));
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Sort task failed: {}", e);
                    None
                }
            }
        }
    }

    /// Sort one file against the active snapshot
    pub fn sort_file(&self, path: &Path) -> Option<MoveOutcome> {
        let snapshot = self.config.load();
        self.sort_file_with(&snapshot, path)
    }

    /// Sort one file against a specific snapshot.
    ///
    /// Returns `None` when the file is left alone (not configured, or no
    /// rule matches). Failures are reported and returned, never raised.
    pub fn sort_file_with(&self, snapshot: &Snapshot, path: &Path) -> Option<MoveOutcome> {
        if !snapshot.is_configured() {
            return None;
        }

        let rule = snapshot.resolve(path)?;
        let base = snapshot.base_target_folder();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let label = rule.label();

        let result = {
            let _guard = snapshot
                .config()
                .general
                .serialize_moves
                .then(|| self.move_lock.lock().unwrap_or_else(PoisonError::into_inner));
            mover::move_file(self.fs.as_ref(), path, base, rule)
        };

        let mut outcome = MoveOutcome {
            file_name,
            source_dir,
            destination_folder: base.join(&rule.target_folder),
            category_label: label,
            success: false,
            error_detail: None,
        };

        match result {
            Ok(_) => {
                outcome.success = true;
                info!("Moved {} to {}", outcome.file_name, outcome.category_label);
                self.listener.on_move_result(&FileSorted {
                    file_name: outcome.file_name.clone(),
                    from: dir_name(&outcome.source_dir),
                    to: rule.target_folder.clone(),
                    category: rule.category_name().map(str::to_string),
                });
            }
            Err(MoveError::Rename { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound && !path.exists() =>
            {
                debug!("File disappeared before processing: {}", path.display());
                return None;
            }
            Err(e) => {
                self.report_move_error(&outcome.file_name, &e);
                outcome.error_detail = Some(e.to_string());
            }
        }

        Some(outcome)
    }

    /// Sort every file directly inside `source`, against one snapshot.
    ///
    /// A failure on one file never stops the sweep.
    pub fn sort_existing(&self, source: &Path) -> Result<SweepSummary, SortError> {
        let snapshot = self.config.load();
        let files = match list_files(source) {
            Ok(files) => files,
            Err(e) => {
                self.listener
                    .on_error(&ErrorReport::new("Existing Files Sorting", e.to_string()));
                return Err(e);
            }
        };

        let mut summary = SweepSummary::default();
        for path in files {
            summary.scanned += 1;
            match self.sort_file_with(&snapshot, &path) {
                Some(outcome) if outcome.success => summary.moved += 1,
                Some(_) => summary.failed += 1,
                None => {}
            }
        }

        info!(
            "Sorted existing files in {}: {} scanned, {} moved, {} failed",
            source.display(),
            summary.scanned,
            summary.moved,
            summary.failed
        );
        Ok(summary)
    }

    /// What `sort_existing` would do, without touching anything
    pub fn plan_existing(&self, source: &Path) -> Result<Vec<PlannedMove>, SortError> {
        let snapshot = self.config.load();
        let files = list_files(source)?;

        Ok(files
            .into_iter()
            .filter_map(|path| {
                let rule = snapshot.resolve(&path)?;
                Some(PlannedMove {
                    destination_folder: snapshot.base_target_folder().join(&rule.target_folder),
                    category_label: rule.label(),
                    path,
                })
            })
            .collect())
    }

    fn report_move_error(&self, file_name: &str, err: &MoveError) {
        if err.is_duplicated() {
            error!("Error moving file {} (left in both places): {}", file_name, err);
        } else {
            error!("Error moving file {}: {}", file_name, err);
        }
        self.listener
            .on_error(&ErrorReport::file_sorting(file_name, err.to_string()));
    }
}

/// Non-directory entries directly inside `dir`, in name order
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, SortError> {
    let read_err = |source| SortError::ReadSource {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            trace!("Skipping directory {}", path.display());
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CustomCategory, FileRule};
    use std::io;
    use std::sync::mpsc;
    use std::time::Duration;

    fn config(source: &Path, target: &Path) -> Config {
        Config {
            source_folder: source.to_path_buf(),
            base_target_folder: target.to_path_buf(),
            file_rules: vec![FileRule {
                enabled: true,
                extensions: vec![".txt".to_string()],
                target_folder: "Docs".to_string(),
            }],
            custom_categories: vec![CustomCategory {
                id: "c1".to_string(),
                name: "Code".to_string(),
                extensions: vec![".rs".to_string()],
                folder_name: "Source".to_string(),
                enabled: true,
            }],
            ..Config::default()
        }
    }

    fn sorter(config: Config) -> (Sorter, tokio::sync::mpsc::UnboundedReceiver<SortEvent>) {
        let (listener, rx) = ChannelListener::new();
        (Sorter::new(ConfigHandle::new(config), Arc::new(listener)), rx)
    }

    #[test]
    fn test_sort_file_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let (src, out) = (dir.path().join("Downloads"), dir.path().join("out"));
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("main.rs"), "fn main() {}").unwrap();

        let (sorter, mut rx) = sorter(config(&src, &out));
        let outcome = sorter.sort_file(&src.join("main.rs")).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.category_label, "Code (Source)");
        assert_eq!(outcome.destination_folder, out.join("Source"));
        assert!(out.join("Source").join("main.rs").exists());
        assert_eq!(
            rx.try_recv().unwrap(),
            SortEvent::FileSorted(FileSorted {
                file_name: "main.rs".to_string(),
                from: "Downloads".to_string(),
                to: "Source".to_string(),
                category: Some("Code".to_string()),
            })
        );
    }

    #[test]
    fn test_no_match_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        std::fs::write(&file, b"").unwrap();

        let (sorter, mut rx) = sorter(config(dir.path(), &dir.path().join("out")));
        assert!(sorter.sort_file(&file).is_none());
        assert!(file.exists());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unconfigured_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"").unwrap();

        let (sorter, mut rx) = sorter(config(dir.path(), Path::new("")));
        assert!(sorter.sort_file(&file).is_none());
        assert!(file.exists());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (sorter, mut rx) = sorter(config(dir.path(), &dir.path().join("out")));

        assert!(sorter.sort_file(&dir.path().join("gone.txt")).is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("Docs"), b"").unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();

        let (sorter, mut rx) = sorter(config(dir.path(), &out));
        let outcome = sorter.sort_file(&file).unwrap();

        assert!(!outcome.success);
        assert!(outcome.error_detail.is_some());
        assert!(file.exists());
        match rx.try_recv().unwrap() {
            SortEvent::Error(report) => assert_eq!(report.context, "File Sorting (a.txt)"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_sort_existing_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let (src, out) = (dir.path().join("in"), dir.path().join("out"));
        std::fs::create_dir_all(src.join("nested.txt")).unwrap();
        std::fs::write(src.join("a.txt"), b"").unwrap();
        std::fs::write(src.join("b.bin"), b"").unwrap();

        let (sorter, _rx) = sorter(config(&src, &out));
        let summary = sorter.sort_existing(&src).unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                scanned: 2,
                moved: 1,
                failed: 0
            }
        );
        assert!(src.join("nested.txt").is_dir());
        assert!(src.join("b.bin").exists());
    }

    #[test]
    fn test_sort_existing_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let (sorter, mut rx) = sorter(config(&missing, dir.path()));
        let err = sorter.sort_existing(&missing).unwrap_err();

        assert!(matches!(err, SortError::ReadSource { .. }));
        match rx.try_recv().unwrap() {
            SortEvent::Error(report) => assert_eq!(report.context, "Existing Files Sorting"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_plan_existing_moves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::write(dir.path().join("a.txt"), b"").unwrap();
        std::fs::write(dir.path().join("b.mkv"), b"").unwrap();

        let (sorter, _rx) = sorter(config(dir.path(), &out));
        let plan = sorter.plan_existing(dir.path()).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].destination_folder, out.join("Docs"));
        assert!(dir.path().join("a.txt").exists());
        assert!(!out.exists());
    }

    /// Blocks the first rename until the test lets it through
    struct GatedFs {
        started: Mutex<mpsc::Sender<()>>,
        go: Mutex<mpsc::Receiver<()>>,
    }

    impl FileSystem for GatedFs {
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            StdFs.create_dir_all(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.go.lock().unwrap().recv();
            StdFs.rename(from, to)
        }

        fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
            StdFs.copy(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            StdFs.remove_file(path)
        }
    }

    #[test]
    fn test_in_flight_move_keeps_its_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (out_a, out_b) = (dir.path().join("a"), dir.path().join("b"));
        let file = dir.path().join("report.txt");
        std::fs::write(&file, b"r").unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (go_tx, go_rx) = mpsc::channel();
        let fs = GatedFs {
            started: Mutex::new(started_tx),
            go: Mutex::new(go_rx),
        };

        let (sorter, _rx) = sorter(config(dir.path(), &out_a));
        let sorter = Arc::new(sorter.with_fs(Arc::new(fs)));

        let worker = {
            let sorter = Arc::clone(&sorter);
            let file = file.clone();
            std::thread::spawn(move || sorter.sort_file(&file))
        };

        started_rx.recv().unwrap();
        sorter.config().replace(config(dir.path(), &out_b));
        go_tx.send(()).unwrap();

        let outcome = worker.join().unwrap().unwrap();
        assert!(outcome.success);
        assert!(out_a.join("Docs").join("report.txt").exists());
        assert!(!out_b.exists());
    }

    #[test]
    fn test_serialized_moves_still_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut cfg = config(dir.path(), &out);
        cfg.general.serialize_moves = true;
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }

        let (sorter, _rx) = sorter(cfg);
        let summary = sorter.sort_existing(dir.path()).unwrap();
        assert_eq!(summary.moved, 3);
    }

    #[test]
    fn test_serialize_moves_follows_replaced_config() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let file = dir.path().join("late.txt");
        std::fs::write(&file, b"late").unwrap();

        let (sorter, _rx) = sorter(config(dir.path(), &out));
        let sorter = Arc::new(sorter);
        let mut serialized = config(dir.path(), &out);
        serialized.general.serialize_moves = true;
        sorter.config().replace(serialized);

        // Hold the move lock so a serialized move has to wait for it
        let guard = sorter.move_lock.lock().unwrap();
        let (done_tx, done_rx) = mpsc::channel();
        let worker = {
            let sorter = Arc::clone(&sorter);
            std::thread::spawn(move || {
                let outcome = sorter.sort_file(&file);
                done_tx.send(()).unwrap();
                outcome
            })
        };

        assert_eq!(
            done_rx.recv_timeout(Duration::from_millis(200)),
            Err(mpsc::RecvTimeoutError::Timeout)
        );
        drop(guard);

        assert!(worker.join().unwrap().unwrap().success);
        assert!(out.join("Docs").join("late.txt").exists());
    }
}
