//! Lock lifecycle events
//!
//! Every transition, timer change, navigation and failure is broadcast so
//! front ends and tests can follow the controller without polling it.

use chrono::{DateTime, Utc};

use crate::error::AuthFailure;
use crate::services::Route;
use crate::state::{LockState, TransitionReason};
use crate::timer::TimerKind;

/// Events emitted by the lock controller
#[derive(Debug, Clone, PartialEq)]
pub enum LockEvent {
    /// Lock state changed
    StateChanged {
        from: LockState,
        to: LockState,
        reason: TransitionReason,
        timestamp: DateTime<Utc>,
    },
    /// A deadline was scheduled
    TimerArmed {
        timer: TimerKind,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A pending deadline was cancelled before firing
    TimerCancelled {
        timer: TimerKind,
        timestamp: DateTime<Utc>,
    },
    /// An unlock attempt was refused
    UnlockFailed {
        failure: AuthFailure,
        timestamp: DateTime<Utc>,
    },
    /// The post-unlock navigation ran
    Navigated {
        route: Route,
        timestamp: DateTime<Utc>,
    },
    /// The controller stopped
    TornDown { timestamp: DateTime<Utc> },
}

impl LockEvent {
    /// The `(from, to)` pair if this is a state change
    pub fn transition(&self) -> Option<(LockState, LockState)> {
        match self {
            LockEvent::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }

    /// When the event was recorded
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LockEvent::StateChanged { timestamp, .. }
            | LockEvent::TimerArmed { timestamp, .. }
            | LockEvent::TimerCancelled { timestamp, .. }
            | LockEvent::UnlockFailed { timestamp, .. }
            | LockEvent::Navigated { timestamp, .. }
            | LockEvent::TornDown { timestamp } => *timestamp,
        }
    }

    /// Format event as a single log line
    pub fn to_audit_string(&self) -> String {
        let timestamp = self.timestamp().format("%Y-%m-%d %H:%M:%S%.3f UTC");
        match self {
            LockEvent::StateChanged {
                from, to, reason, ..
            } => {
                format!(
                    "{} | LOCK_STATE | {} -> {} reason={}",
                    timestamp, from, to, reason
                )
            }
            LockEvent::TimerArmed {
                timer, delay_ms, ..
            } => {
                format!("{} | TIMER_ARMED | timer={} delay={}ms", timestamp, timer, delay_ms)
            }
            LockEvent::TimerCancelled { timer, .. } => {
                format!("{} | TIMER_CANCELLED | timer={}", timestamp, timer)
            }
            LockEvent::UnlockFailed { failure, .. } => {
                format!("{} | UNLOCK_FAILED | {}", timestamp, failure)
            }
            LockEvent::Navigated { route, .. } => {
                format!("{} | NAVIGATED | route={}", timestamp, route)
            }
            LockEvent::TornDown { .. } => format!("{} | TORN_DOWN", timestamp),
        }
    }
}
