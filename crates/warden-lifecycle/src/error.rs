//! Error types for lifecycle operations

use thiserror::Error;
use warden_events::EventBusError;
use warden_store::StoreError;

use crate::state::StateKind;

/// Lifecycle error types.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The operation's arguments are not acceptable in this state
    #[error("Invalid transition: {operation} from {state}: {reason}")]
    InvalidTransition {
        /// State the operation was invoked on
        state: StateKind,
        /// Operation name
        operation: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Store failure (conflict, not found, backend)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event could not be submitted
    #[error(transparent)]
    Event(#[from] EventBusError),
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl LifecycleError {
    /// Check if the caller may recover by reloading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::Store(e) if e.is_retryable())
    }

    /// Check if the target user was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::Store(StoreError::ResourceNotFound(_)))
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::Store(e) => e.error_code(),
            LifecycleError::Event(_) => "EVENT_PUBLISH_FAILED",
        }
    }
}
