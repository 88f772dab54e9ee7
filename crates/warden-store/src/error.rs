//! Error types for store operations
//!
//! Both conflict kinds are local to a single `save` call and never leave
//! the store in a modified state.

use thiserror::Error;

use crate::resource::{ResourceIdentity, ResourceKey};

/// Store error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The stored generation differs from the generation the writer read.
    ///
    /// Recoverable by the caller: reload, reapply intent, save again.
    #[error("Optimistic lock conflict: stored generation {stored_generation}, attempted generation {attempted_generation}")]
    OptimisticLockConflict {
        /// Generation currently held by the store
        stored_generation: u64,
        /// Generation declared by the rejected write
        attempted_generation: u64,
    },

    /// The key (or uid) already belongs to a different logical resource.
    #[error("Duplicate resource: {incoming} conflicts with stored {stored}")]
    DuplicateResourceConflict {
        /// Identity of the resource already stored
        stored: ResourceIdentity,
        /// Identity of the rejected write
        incoming: ResourceIdentity,
    },

    /// A lookup that requires presence found nothing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Failure of a durable backing store (timeout, I/O)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Not-found error for a uid lookup.
    pub fn uid_not_found(uid: uuid::Uuid) -> Self {
        StoreError::ResourceNotFound(format!("uid {}", uid))
    }

    /// Not-found error for a key lookup.
    pub fn key_not_found(key: &ResourceKey) -> Self {
        StoreError::ResourceNotFound(key.to_string())
    }

    /// Check if the caller may recover by reloading and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::OptimisticLockConflict { .. })
    }

    /// Check if this is one of the two write conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::OptimisticLockConflict { .. } | StoreError::DuplicateResourceConflict { .. }
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::OptimisticLockConflict { .. } => "OPTIMISTIC_LOCK_CONFLICT",
            StoreError::DuplicateResourceConflict { .. } => "DUPLICATE_RESOURCE",
            StoreError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            StoreError::Backend(_) => "STORAGE_BACKEND_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_conflict_classification() {
        let lock = StoreError::OptimisticLockConflict {
            stored_generation: 1,
            attempted_generation: 0,
        };
        assert!(lock.is_retryable());
        assert!(lock.is_conflict());
        assert_eq!(lock.error_code(), "OPTIMISTIC_LOCK_CONFLICT");

        let key = ResourceKey::new("ns", "bob");
        let dup = StoreError::DuplicateResourceConflict {
            stored: ResourceIdentity { key: key.clone(), uid: Uuid::now_v7() },
            incoming: ResourceIdentity { key, uid: Uuid::now_v7() },
        };
        assert!(!dup.is_retryable());
        assert!(dup.is_conflict());

        let missing = StoreError::key_not_found(&ResourceKey::new("ns", "ghost"));
        assert!(!missing.is_conflict());
        assert_eq!(missing.to_string(), "Resource not found: ns/ghost");
    }

    #[test]
    fn test_lock_conflict_message() {
        let err = StoreError::OptimisticLockConflict {
            stored_generation: 1,
            attempted_generation: 0,
        };
        assert_eq!(
            err.to_string(),
            "Optimistic lock conflict: stored generation 1, attempted generation 0"
        );
    }
}
