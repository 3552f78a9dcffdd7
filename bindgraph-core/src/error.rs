//! Error types for the key and binding model

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building keys and bindings
#[derive(Error, Debug)]
pub enum CoreError {
    /// A type did not have the shape an operation required
    #[error("Malformed type {ty}: {reason}")]
    MalformedType {
        /// The offending type, rendered
        ty: String,
        /// What was expected
        reason: String,
    },

    /// A class referenced by a declaration is unknown
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// An internal consistency check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
