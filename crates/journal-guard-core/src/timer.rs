//! Cancellable one-shot deadlines owned by the controller

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Which controller deadline a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimerKind {
    /// Returns the view to locked after the dwell time
    ReLock,
    /// Moves to the journal body shortly after unlock
    Navigation,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::ReLock => write!(f, "relock"),
            TimerKind::Navigation => write!(f, "navigation"),
        }
    }
}

/// A deadline that fires at most once per arming
///
/// Arming replaces any outstanding deadline, so there is never more than one.
/// Dropping the timer cancels it.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    deadline: Option<Pin<Box<Sleep>>>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer `delay` from now
    pub fn arm(&mut self, delay: Duration) {
        self.deadline = Some(Box::pin(tokio::time::sleep(delay)));
    }

    /// Cancel the outstanding deadline, returning whether one existed
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the outstanding deadline elapses
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.as_ref().map(|sleep| sleep.deadline())
    }

    /// Wait for the deadline, disarming the timer when it fires
    ///
    /// Never completes while disarmed. Cancel-safe: dropping the returned
    /// future leaves the deadline in place.
    pub async fn fired(&mut self) {
        match &mut self.deadline {
            Some(sleep) => {
                sleep.as_mut().await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
