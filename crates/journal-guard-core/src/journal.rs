//! Journal content guarded by the lock
//!
//! Entries live in memory for the lifetime of the view. Writing requires the
//! lock to be open, as reported by the running controller.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::controller::LockHandle;
use crate::error::{GuardError, Result};

/// Encouragements shown on the back page of the journal
const DAILY_THOUGHTS: [&str; 4] = [
    "Believe in yourself.",
    "Every day is a new opportunity.",
    "Be kind to yourself.",
    "You are stronger than you think.",
];

/// A saved journal entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: Uuid,
    pub text: String,
    pub written_at: DateTime<Utc>,
}

/// In-memory journal
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save an entry while the lock is open
    ///
    /// Surrounding whitespace is trimmed; blank text is rejected.
    pub fn save_entry(&mut self, lock: &LockHandle, text: &str) -> Result<&JournalEntry> {
        if !lock.state().is_unlocked() {
            return Err(GuardError::JournalLocked);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(GuardError::EmptyEntry);
        }

        self.entries.push(JournalEntry {
            id: Uuid::new_v4(),
            text: text.to_string(),
            written_at: Utc::now(),
        });
        tracing::info!("Journal entry saved ({} total)", self.entries.len());

        // Just pushed
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thoughts of the day for the journal's back page
pub fn daily_thoughts() -> &'static [&'static str] {
    &DAILY_THOUGHTS
}
