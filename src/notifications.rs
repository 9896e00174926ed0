//! Desktop notifications for moved files and errors

use notify_rust::{Notification, Timeout};
use tracing::warn;

use crate::sorter::{ConfigHandle, ErrorReport, FileSorted, SortListener};

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A file was sorted
    FileMoved,
    /// A move or sweep failed
    MoveError,
}

impl NotificationKind {
    fn icon(&self) -> &'static str {
        match self {
            NotificationKind::FileMoved => "dialog-information",
            NotificationKind::MoveError => "dialog-error",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            NotificationKind::FileMoved => "File Moved",
            NotificationKind::MoveError => "File Move Error",
        }
    }
}

/// Shows a desktop notification for every sort event while
/// `general.notificationsEnabled` is set in the active config
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    config: ConfigHandle,
}

impl DesktopNotifier {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.load().config().general.notifications_enabled
    }

    /// Send a notification if enabled
    ///
    /// This is fire-and-forget - errors are logged but don't propagate.
    pub fn notify(&self, kind: NotificationKind, message: &str) {
        if !self.is_enabled() {
            return;
        }

        let result = Notification::new()
            .appname(crate::config::APP_NAME)
            .summary(kind.summary())
            .body(message)
            .icon(kind.icon())
            .timeout(Timeout::Milliseconds(5000))
            .show();

        if let Err(e) = result {
            warn!("Failed to send notification: {}", e);
        }
    }
}

impl SortListener for DesktopNotifier {
    fn on_move_result(&self, event: &FileSorted) {
        self.notify(NotificationKind::FileMoved, &moved_message(event));
    }

    fn on_error(&self, report: &ErrorReport) {
        self.notify(
            NotificationKind::MoveError,
            &format!("{}: {}", report.context, report.message),
        );
    }
}

fn moved_message(event: &FileSorted) -> String {
    match &event.category {
        Some(category) => format!("Moved {} to {} ({})", event.file_name, category, event.to),
        None => format!("Moved {} to {}", event.file_name, event.to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_moved_message() {
        let mut event = FileSorted {
            file_name: "a.rs".to_string(),
            from: "Downloads".to_string(),
            to: "Source".to_string(),
            category: None,
        };
        assert_eq!(moved_message(&event), "Moved a.rs to Source");

        event.category = Some("Code".to_string());
        assert_eq!(moved_message(&event), "Moved a.rs to Code (Source)");
    }

    #[test]
    fn test_disabled_notifier_is_silent() {
        let notifier = DesktopNotifier::new(ConfigHandle::default());
        assert!(!notifier.is_enabled());
        notifier.on_error(&ErrorReport::file_sorting("a.txt", "denied"));
    }

    #[test]
    fn test_enabled_flag_follows_replaced_config() {
        let handle = ConfigHandle::default();
        let notifier = DesktopNotifier::new(handle.clone());

        let mut config = Config::default();
        config.general.notifications_enabled = true;
        handle.replace(config);
        assert!(notifier.is_enabled());

        handle.replace(Config::default());
        assert!(!notifier.is_enabled());
    }
}
