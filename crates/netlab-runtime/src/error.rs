//! Error types for netlab-runtime

use thiserror::Error;

/// Errors surfaced by the container runtime and the grading stores
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Container failed to start
    #[error("container {name} failed to start: {reason}")]
    StartFailed { name: String, reason: String },

    /// Waiting on a container exceeded its deadline
    #[error("container {name} did not finish within {timeout_ms}ms")]
    WaitTimeout { name: String, timeout_ms: u64 },

    /// Requested path does not exist inside the container
    #[error("path not found in container {name}: {path}")]
    PathNotFound { name: String, path: String },

    /// Container was already removed
    #[error("container already deleted: {0}")]
    ContainerGone(String),

    /// Generic runtime API failure
    #[error("container runtime error: {0}")]
    Api(String),

    /// Persistence failure in a grading store
    #[error("storage error: {0}")]
    Storage(String),
}
