//! Contracts for the services around the variant generator
//!
//! - `ContainerRuntime` / `ContainerHandle`: launching lab deployments and
//!   one-shot checker containers
//! - `LabLocks`: at most one deployment/check in flight per (user, topic)
//! - `AttemptLedger`: append-only grading attempts
//! - `CheckLogStore`: joined reports of check executions
//!
//! In-memory implementations live in the `fakes` module.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::schema::{
    AttemptRecord, CheckLog, ContainerSpec, Deployment, FileArchive, LabOwner, NewAttempt,
};

/// Result type for runtime and store operations
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// A running (or finished) container.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Container name as given in its spec.
    fn name(&self) -> &str;

    /// Wait for the container to exit. Returns `RuntimeError::WaitTimeout`
    /// when `timeout` elapses first.
    async fn wait(&self, timeout: Duration) -> RuntimeResult<()>;

    /// Extract the file or directory at `path` as an archive.
    async fn get_archive(&self, path: &str) -> RuntimeResult<FileArchive>;

    /// Remove the container. With `force` a still-running container is killed.
    async fn delete(&self, force: bool) -> RuntimeResult<()>;
}

/// Container runtime that materialises deployments.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// (Re)create the whole lab environment for an owner.
    async fn launch(&self, owner: &LabOwner, deployment: &Deployment) -> RuntimeResult<()>;

    /// Start a single container attached to the owner's lab networks.
    async fn run_container(
        &self,
        owner: &LabOwner,
        spec: &ContainerSpec,
    ) -> RuntimeResult<Arc<dyn ContainerHandle>>;
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

/// Advisory per-(user, topic) lock.
///
/// `try_acquire` never blocks: it returns `false` when another operation
/// already holds the lock.
#[async_trait]
pub trait LabLocks: Send + Sync {
    async fn try_acquire(&self, owner: &LabOwner) -> RuntimeResult<bool>;

    /// Release a held lock. No-op if not held.
    async fn release(&self, owner: &LabOwner) -> RuntimeResult<()>;
}

// ---------------------------------------------------------------------------
// Grading stores
// ---------------------------------------------------------------------------

/// Append-only attempt ledger.
///
/// The only mutation besides appending is `reset_correct`, the explicit
/// "clear progress" action.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    async fn record_attempt(&self, attempt: NewAttempt) -> RuntimeResult<AttemptRecord>;

    /// All attempts of an owner, newest first.
    async fn attempts(&self, owner: &LabOwner) -> RuntimeResult<Vec<AttemptRecord>>;

    /// Mark every correct attempt of the owner incorrect. Returns how many
    /// attempts changed.
    async fn reset_correct(&self, owner: &LabOwner) -> RuntimeResult<usize>;
}

/// Store for joined check reports.
#[async_trait]
pub trait CheckLogStore: Send + Sync {
    async fn append_log(&self, log: CheckLog) -> RuntimeResult<()>;

    /// Newest log per check name for an owner.
    async fn latest_logs(&self, owner: &LabOwner) -> RuntimeResult<BTreeMap<String, CheckLog>>;
}
