//! Event handler for file system events

use indexmap::IndexMap;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Maximum number of entries in the debounce map before forcing a cleanup
const MAX_DEBOUNCE_ENTRIES: usize = 10_000;

/// Turns raw notify events into "file added" paths for one source folder.
///
/// Only direct, non-hidden children of the folder are reported, and repeated
/// events for the same path inside the debounce window are collapsed.
pub struct EventHandler {
    source: PathBuf,

    /// Recent events by path (IndexMap preserves insertion order for fair cleanup)
    recent: IndexMap<PathBuf, Instant>,

    /// Debounce duration
    debounce: Duration,
}

impl EventHandler {
    pub fn new(source: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            source: source.into(),
            recent: IndexMap::new(),
            debounce,
        }
    }

    /// Paths from `event` that count as newly added files
    pub fn file_added(&mut self, event: &Event) -> Vec<PathBuf> {
        if !is_add_event(&event.kind) {
            return Vec::new();
        }

        let now = Instant::now();
        let mut added = Vec::new();

        // A both-sides rename lists the old path first
        let paths = match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.last().map(std::slice::from_ref).unwrap_or_default()
            }
            _ => event.paths.as_slice(),
        };

        for path in paths {
            if !self.is_candidate(path) {
                continue;
            }

            let fresh = self
                .recent
                .get(path)
                .map(|&last| now.duration_since(last) > self.debounce)
                .unwrap_or(true);

            if fresh {
                self.recent.insert(path.clone(), now);
                added.push(path.clone());
            }
        }

        // If the map has grown too large, force a cleanup
        if self.recent.len() > MAX_DEBOUNCE_ENTRIES {
            self.cleanup();
        }

        added
    }

    /// Clean up old entries (call periodically)
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        let threshold = self.debounce * 10; // Keep entries for 10x debounce period

        self.recent
            .retain(|_, &mut last| now.duration_since(last) < threshold);
    }

    fn is_candidate(&self, path: &Path) -> bool {
        if path.parent() != Some(self.source.as_path()) {
            return false;
        }
        if is_hidden(path) {
            return false;
        }
        !path.is_dir()
    }
}

fn is_add_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    )
}

/// Dot-prefixed file name
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}
