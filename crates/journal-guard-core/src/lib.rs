//! Journal Guard Core - Biometric lock for the protected journal view
//!
//! This crate provides:
//! - The lock session controller and its cloneable handle
//! - The device authentication trait plus a scripted implementation
//! - Navigation and notification collaborators with in-memory implementations
//! - Lock configuration, lifecycle events and the guarded journal content

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod journal;
pub mod services;
pub mod state;
pub mod timer;

pub use config::LockConfig;
pub use controller::{LockHandle, LockSessionController, Snapshot, UnlockOutcome};
pub use device::{
    verify_user, AuthResult, DeviceAuthenticator, SimulatedAuthenticator, SimulatedOutcome,
};
pub use error::{AuthFailure, GuardError, Result};
pub use events::LockEvent;
pub use journal::{daily_thoughts, Journal, JournalEntry};
pub use services::{
    NavigationAction, Navigator, Notice, NoticeLevel, NotificationCenter, Notifier, Route,
    RouteParams, Router,
};
pub use state::{LockState, TransitionReason};
pub use timer::{OneShotTimer, TimerKind};
