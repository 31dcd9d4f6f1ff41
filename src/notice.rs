//! User-facing notices and confirmation prompts.
//!
//! Presentation (toasts, dialogs) lives outside this crate. Operation
//! handlers report through a [`Notifier`] and ask a [`Confirmer`] before
//! anything irreversible.

use std::future::Future;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the log. Default when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(level = ?notice.level, "{}", notice.message)
            }
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}

/// Keeps every notice in memory, for tests and headless callers.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().ok().and_then(|n| n.last().cloned())
    }

    pub fn contains(&self, level: NoticeLevel, fragment: &str) -> bool {
        self.notices()
            .iter()
            .any(|n| n.level == level && n.message.contains(fragment))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

/// "Are you sure?" dialog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub text: String,
    pub confirm_label: String,
}

impl ConfirmPrompt {
    pub fn new(text: impl Into<String>, confirm_label: impl Into<String>) -> Self {
        Self {
            title: "Are you sure?".into(),
            text: text.into(),
            confirm_label: confirm_label.into(),
        }
    }
}

pub trait Confirmer: Send + Sync {
    /// Resolves to `true` only on explicit confirmation.
    fn confirm(&self, prompt: &ConfirmPrompt) -> impl Future<Output = bool> + Send;
}

/// Fixed answer, for headless callers and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        tracing::debug!(prompt = %prompt.text, answer = self.0, "Auto-answered confirmation");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::info("loading"));
        notifier.notify(Notice::error("failed"));
        assert_eq!(notifier.notices().len(), 2);
        assert_eq!(notifier.last(), Some(Notice::error("failed")));
        assert!(notifier.contains(NoticeLevel::Info, "load"));
        assert!(!notifier.contains(NoticeLevel::Success, "load"));
    }

    #[tokio::test]
    async fn auto_confirm_returns_fixed_answer() {
        let prompt = ConfirmPrompt::new("Delete appointment?", "Delete");
        assert!(AutoConfirm(true).confirm(&prompt).await);
        assert!(!AutoConfirm(false).confirm(&prompt).await);
    }
}
