//! Error types for policy construction
//!
//! Evaluation itself never fails: a denial is a plain `false`.

use thiserror::Error;

/// Policy error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// Owner selector is not `*`, `self`, `owned` or `owned:<relation>`
    #[error("Invalid owner selector: {0:?}")]
    InvalidSelector(String),

    /// A tuple field that must not be empty was empty
    #[error("Invalid policy tuple: {0}")]
    InvalidTuple(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
