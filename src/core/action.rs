//! Actions produced by key handling and user-visible notices

use tokio::sync::mpsc;

use crate::domain::ActionKind;

/// What the UI loop should do after handling input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action needed
    None,

    /// Forward a request to the sync worker
    Dispatch(Request),

    /// Show notification in status bar
    Notify(String, NotifyLevel),

    /// Open the command line
    OpenCommand,

    /// Close current overlay/popup
    CloseOverlay,

    /// Request quit
    Quit,
}

/// User-triggered requests against the sync client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Connect,
    Disconnect,
    Refresh,
    Submit(ActionKind),
}

/// Notification levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
}

/// A message surfaced to the user at the point of success or failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NotifyLevel,
    pub text: String,
}

/// Sending half for notices; dropped receivers are ignored
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, level: NotifyLevel, text: impl Into<String>) {
        let _ = self.tx.send(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.notify(NotifyLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.notify(NotifyLevel::Warn, text);
    }
}
