//! Error types for graph resolution
//!
//! User mistakes in a graph (missing bindings, cycles, scope mismatches) are
//! not errors in this sense; they go to the diagnostics sink and resolution
//! keeps enumerating. The variants here either abort a graph or indicate a
//! defect in whatever produced the declarations.

use bindgraph_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for resolution
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that stop resolution of a graph
#[derive(Error, Debug)]
pub enum ResolveError {
    /// An internal invariant did not hold
    #[error("Internal invariant violated (this is a bug): {message}")]
    CompilerBug {
        /// What was found instead
        message: String,
    },

    /// The configured error limit was reached
    #[error("Too many errors in graph {graph}: stopped after {limit}")]
    TooManyErrors {
        /// Graph being resolved
        graph: String,
        /// The configured limit
        limit: usize,
    },

    /// The graph was fully enumerated and had at least one user error
    #[error("Graph {graph} failed to resolve with {error_count} error(s)")]
    ResolutionFailed {
        /// Graph being resolved
        graph: String,
        /// Number of error diagnostics reported
        error_count: usize,
    },

    /// An alias chain loops back on itself
    #[error("Alias cycle: {chain}")]
    AliasCycle {
        /// The looping chain, rendered
        chain: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Reading or writing a file failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding failed
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A key or binding could not be built
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ResolveError {
    /// Shorthand for [`ResolveError::CompilerBug`]
    pub fn compiler_bug(message: impl Into<String>) -> Self {
        ResolveError::CompilerBug {
            message: message.into(),
        }
    }

    /// Shorthand for [`ResolveError::Config`]
    pub fn config(message: impl Into<String>) -> Self {
        ResolveError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolveError::Io {
            path: path.into(),
            source,
        }
    }
}
