use crate::error::AppError;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// Non-blocking message for the user, rendered by the host as a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn success<T: Into<String>>(title: T) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn info<T: Into<String>>(title: T) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            description: None,
        }
    }

    pub fn error<T: Into<String>>(title: T) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> Result<(), AppError>;
}

/// Writes notices to the tracing pipeline.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        let description = notice.description.as_deref().unwrap_or("");
        match notice.kind {
            NoticeKind::Error => tracing::warn!(title = %notice.title, description, "notice"),
            NoticeKind::Success | NoticeKind::Info => {
                tracing::info!(title = %notice.title, description, "notice")
            }
        }
        Ok(())
    }
}

/// Keeps every notice in memory; hosts poll it, tests assert on it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        self.notices.lock().push(notice.clone());
        Ok(())
    }
}

/// Delivers a notice; a failing notifier is logged, never propagated.
pub fn deliver(notifier: &dyn Notifier, notice: &Notice) {
    if let Err(err) = notifier.notify(notice) {
        tracing::warn!(error = %err, title = %notice.title, "failed to deliver notice");
    }
}
