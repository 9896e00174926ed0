//! Outbound events and the listeners that receive them

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A file was moved into its category folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSorted {
    pub file_name: String,
    /// Name of the folder the file came from
    pub from: String,
    /// Category folder it went to
    pub to: String,
    /// Custom category name, for custom rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Something failed and the user should hear about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub context: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Report for a single file that could not be moved
    pub fn file_sorting(file_name: &str, message: impl Into<String>) -> Self {
        Self::new(format!("File Sorting ({})", file_name), message)
    }
}

/// Receives sort results. Called from blocking worker threads.
pub trait SortListener: Send + Sync {
    fn on_move_result(&self, event: &FileSorted);
    fn on_error(&self, report: &ErrorReport);
}

/// Either kind of event, for channel consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SortEvent {
    FileSorted(FileSorted),
    Error(ErrorReport),
}

/// Forwards events into an unbounded channel.
///
/// If the receiver is dropped, events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SortEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SortEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SortListener for ChannelListener {
    fn on_move_result(&self, event: &FileSorted) {
        let _ = self.tx.send(SortEvent::FileSorted(event.clone()));
    }

    fn on_error(&self, report: &ErrorReport) {
        let _ = self.tx.send(SortEvent::Error(report.clone()));
    }
}

/// Fans events out to several listeners
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Vec<Arc<dyn SortListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: impl SortListener + 'static) -> Self {
        self.inner.push(Arc::new(listener));
        self
    }

    pub fn push(&mut self, listener: Arc<dyn SortListener>) {
        self.inner.push(listener);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SortListener for Listeners {
    fn on_move_result(&self, event: &FileSorted) {
        for listener in &self.inner {
            listener.on_move_result(event);
        }
    }

    fn on_error(&self, report: &ErrorReport) {
        for listener in &self.inner {
            listener.on_error(report);
        }
    }
}
