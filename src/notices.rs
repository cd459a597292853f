use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Operator notices queued by background work and drained by the admin UI.
#[derive(Clone, Default)]
pub struct AdminNotices {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl AdminNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    /// Returns queued notices and empties the queue.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.lock())
    }

    fn push(&self, level: NoticeLevel, message: String) {
        let mut notices = self.lock();
        // the same failure is usually reported once per course in a batch
        if notices.iter().any(|n| n.level == level && n.message == message) {
            return;
        }
        notices.push(Notice { level, message });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
