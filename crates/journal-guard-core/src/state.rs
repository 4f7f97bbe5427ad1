//! Lock state and the transitions allowed between states

use serde::{Deserialize, Serialize};

/// Access-gating phase of the protected view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LockState {
    /// Content hidden, waiting for the user to request an unlock
    #[default]
    Locked,
    /// Device authentication in progress
    Unlocking,
    /// Content visible until the re-lock timer fires
    Unlocked,
}

impl LockState {
    /// Returns true if the protected content may be shown
    pub fn is_unlocked(&self) -> bool {
        matches!(self, LockState::Unlocked)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: LockState) -> bool {
        matches!(
            (self, next),
            (LockState::Locked, LockState::Unlocking)
                | (LockState::Unlocking, LockState::Unlocked)
                | (LockState::Unlocking, LockState::Locked)
                | (LockState::Unlocked, LockState::Locked)
        )
    }
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockState::Locked => write!(f, "LOCKED"),
            LockState::Unlocking => write!(f, "UNLOCKING"),
            LockState::Unlocked => write!(f, "UNLOCKED"),
        }
    }
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    /// User asked to unlock
    UnlockRequested,
    /// Device authentication succeeded
    Authenticated,
    /// Device authentication failed, was cancelled, or errored
    AuthFailed,
    /// Dwell time elapsed
    ReLockTimer,
    /// User left the protected view
    NavigatedAway,
    /// Controller was torn down
    Teardown,
}

impl std::fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransitionReason::UnlockRequested => "unlock_requested",
            TransitionReason::Authenticated => "authenticated",
            TransitionReason::AuthFailed => "auth_failed",
            TransitionReason::ReLockTimer => "relock_timer",
            TransitionReason::NavigatedAway => "navigated_away",
            TransitionReason::Teardown => "teardown",
        };
        f.write_str(s)
    }
}
