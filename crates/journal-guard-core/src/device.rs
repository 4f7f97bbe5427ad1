//! Device authentication abstraction
//!
//! The controller never talks to biometric hardware directly. It drives a
//! [`DeviceAuthenticator`] through three steps: hardware check, enrollment
//! check, then the interactive prompt. Any negative answer or error ends the
//! attempt with an [`AuthFailure`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuthFailure, GuardError, Result};

/// Result of an interactive authentication prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether the user was authenticated
    pub success: bool,
    /// Platform error code when unsuccessful (e.g. "user_cancel")
    pub error: Option<String>,
}

impl AuthResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Trait for device-provided authentication (fingerprint, face, passcode)
#[async_trait]
pub trait DeviceAuthenticator: Send + Sync {
    /// Whether the device has authentication hardware
    async fn has_hardware(&self) -> Result<bool>;

    /// Whether a biometric is enrolled on the device
    async fn is_enrolled(&self) -> Result<bool>;

    /// Prompt the user to authenticate
    async fn authenticate(&self, prompt: &str) -> Result<AuthResult>;

    /// Get a human-readable name for the authentication method
    fn method_name(&self) -> &'static str;
}

/// Run the full check sequence against a device
pub async fn verify_user(
    device: &dyn DeviceAuthenticator,
    prompt: &str,
) -> std::result::Result<(), AuthFailure> {
    let unexpected = |e: GuardError| AuthFailure::AuthenticationError(e.to_string());

    if !device.has_hardware().await.map_err(unexpected)? {
        return Err(AuthFailure::HardwareUnavailable);
    }

    if !device.is_enrolled().await.map_err(unexpected)? {
        return Err(AuthFailure::NotEnrolled);
    }

    let result = device.authenticate(prompt).await.map_err(unexpected)?;
    if result.success {
        Ok(())
    } else {
        tracing::debug!(
            "{} rejected: {}",
            device.method_name(),
            result.error.as_deref().unwrap_or("no reason given")
        );
        Err(AuthFailure::AuthenticationFailed)
    }
}

/// Scripted outcome for [`SimulatedAuthenticator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulatedOutcome {
    /// User authenticates
    Success,
    /// User dismisses the prompt
    Cancel,
    /// Device reports no hardware
    NoHardware,
    /// Device reports nothing enrolled
    NotEnrolled,
    /// Device raises an error mid-prompt
    Error,
}

impl std::str::FromStr for SimulatedOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(SimulatedOutcome::Success),
            "cancel" => Ok(SimulatedOutcome::Cancel),
            "no-hardware" => Ok(SimulatedOutcome::NoHardware),
            "not-enrolled" => Ok(SimulatedOutcome::NotEnrolled),
            "error" => Ok(SimulatedOutcome::Error),
            other => Err(format!("unknown outcome: {}", other)),
        }
    }
}

/// Authenticator that plays back a script of outcomes
///
/// Each prompt consumes one outcome. The last outcome repeats once the
/// script runs out.
pub struct SimulatedAuthenticator {
    script: Mutex<VecDeque<SimulatedOutcome>>,
    last: Mutex<SimulatedOutcome>,
    latency: Duration,
    prompts: AtomicUsize,
}

impl SimulatedAuthenticator {
    /// Always produce `outcome`
    pub fn new(outcome: SimulatedOutcome) -> Self {
        Self::scripted(vec![outcome])
    }

    /// Play `outcomes` in order, repeating the last one
    pub fn scripted(outcomes: Vec<SimulatedOutcome>) -> Self {
        let last = outcomes.last().copied().unwrap_or(SimulatedOutcome::Success);
        Self {
            script: Mutex::new(outcomes.into()),
            last: Mutex::new(last),
            latency: Duration::ZERO,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Delay every prompt by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of unlock attempts that reached the device
    pub fn attempts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    fn peek(&self) -> SimulatedOutcome {
        let next = self.script.lock().ok().and_then(|s| s.front().copied());
        match next {
            Some(outcome) => outcome,
            None => self.last.lock().map(|l| *l).unwrap_or(SimulatedOutcome::Success),
        }
    }

    fn advance(&self) -> SimulatedOutcome {
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(outcome) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = outcome;
                }
                outcome
            }
            None => self.last.lock().map(|l| *l).unwrap_or(SimulatedOutcome::Success),
        }
    }
}

#[async_trait]
impl DeviceAuthenticator for SimulatedAuthenticator {
    async fn has_hardware(&self) -> Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.peek() == SimulatedOutcome::NoHardware {
            self.advance();
            return Ok(false);
        }
        Ok(true)
    }

    async fn is_enrolled(&self) -> Result<bool> {
        if self.peek() == SimulatedOutcome::NotEnrolled {
            self.advance();
            return Ok(false);
        }
        Ok(true)
    }

    async fn authenticate(&self, _prompt: &str) -> Result<AuthResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.advance() {
            SimulatedOutcome::Success => Ok(AuthResult::success()),
            SimulatedOutcome::Cancel => Ok(AuthResult::failure("user_cancel")),
            SimulatedOutcome::Error => Err(GuardError::Device("sensor read failed".to_string())),
            // Consumed by the earlier checks
            SimulatedOutcome::NoHardware | SimulatedOutcome::NotEnrolled => {
                Ok(AuthResult::failure("not_available"))
            }
        }
    }

    fn method_name(&self) -> &'static str {
        "Simulated Biometric"
    }
}
