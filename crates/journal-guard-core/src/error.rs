//! Error types for the journal guard

use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Reasons an unlock attempt can end without access being granted
///
/// Every variant is handled the same way by the controller: the state reverts
/// to locked and the user sees a notice. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The device has no biometric hardware
    #[error("Biometric hardware unavailable")]
    HardwareUnavailable,

    /// Hardware exists but no biometric or face is enrolled
    #[error("No biometric enrolled")]
    NotEnrolled,

    /// The check ran and was rejected or cancelled by the user
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The authenticator itself raised an unexpected error
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl AuthFailure {
    /// Message shown to the user in the failure notice
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthFailure::HardwareUnavailable => {
                "This device does not support biometric authentication."
            }
            AuthFailure::NotEnrolled => "No biometric or face is enrolled on this device.",
            AuthFailure::AuthenticationFailed => "Authentication failed.",
            AuthFailure::AuthenticationError(_) => {
                "Authentication could not be completed. Please try again."
            }
        }
    }
}

/// Errors that can occur in the journal guard
#[derive(Debug, Error)]
pub enum GuardError {
    /// Unlock attempt was refused
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    /// The controller task has been torn down
    #[error("Lock controller is no longer running")]
    ControllerClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device authenticator error
    #[error("Device error: {0}")]
    Device(String),

    /// Journal entry had no content
    #[error("Journal entry cannot be empty")]
    EmptyEntry,

    /// Journal write attempted while the lock is engaged
    #[error("Journal is locked")]
    JournalLocked,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GuardError {
    fn from(e: serde_json::Error) -> Self {
        GuardError::Serialization(e.to_string())
    }
}
