//! In-memory notification queue

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::Notifier;

/// Notification severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    /// Infer the level from an alert title
    pub fn from_title(title: &str) -> Self {
        match title.to_ascii_lowercase().as_str() {
            "error" => NoticeLevel::Error,
            "success" => NoticeLevel::Success,
            _ => NoticeLevel::Info,
        }
    }

    /// Get icon for level
    pub fn icon(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "ℹ",
            NoticeLevel::Success => "✓",
            NoticeLevel::Error => "✗",
        }
    }
}

/// A message shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub level: NoticeLevel,
    pub shown_at: DateTime<Utc>,
}

impl Notice {
    /// Create a notice, inferring its level from the title
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            level: NoticeLevel::from_title(&title),
            title,
            message: message.into(),
            shown_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.level.icon(), self.title, self.message)
    }
}

/// Notification center keeping the most recent notices
#[derive(Debug)]
pub struct NotificationCenter {
    notices: Mutex<Vec<Notice>>,
    /// Maximum notices retained
    capacity: usize,
}

impl NotificationCenter {
    /// Create a center retaining up to 32 notices
    pub fn new() -> Self {
        Self::with_capacity(32)
    }

    /// Create a center retaining up to `capacity` notices
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Add a notice, dropping the oldest past capacity
    pub fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
            while notices.len() > self.capacity {
                notices.remove(0);
            }
        }
    }

    /// Most recent notice
    pub fn latest(&self) -> Option<Notice> {
        self.notices.lock().ok().and_then(|n| n.last().cloned())
    }

    /// All retained notices, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Take all retained notices
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationCenter {
    fn show(&self, title: &str, message: &str) {
        let notice = Notice::new(title, message);
        match notice.level {
            NoticeLevel::Error => tracing::warn!("NOTICE | {}", notice),
            _ => tracing::info!("NOTICE | {}", notice),
        }
        self.push(notice);
    }
}
