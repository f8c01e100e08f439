//! In-memory fakes for the runtime contracts (testing only)
//!
//! Provides `MemoryContainerRuntime`, `MemoryLabLocks`, `MemoryAttemptLedger`
//! and `MemoryCheckLogStore` that satisfy the trait contracts without a
//! container engine or a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::contracts::*;
use crate::error::RuntimeError;
use crate::schema::{
    AttemptRecord, CheckLog, ContainerSpec, Deployment, FileArchive, LabOwner, NewAttempt,
};

// ---------------------------------------------------------------------------
// MemoryContainerRuntime
// ---------------------------------------------------------------------------

/// Scripted behaviour for every container started under a given name.
#[derive(Debug, Clone, Default)]
pub struct ContainerScript {
    /// How long the container "runs" before exiting.
    pub run_for: Duration,
    /// Archives returned by `get_archive`, keyed by in-container path.
    pub files: HashMap<String, FileArchive>,
    /// Make `run_container` fail for this name.
    pub fail_start: bool,
    /// Make `wait` never return, ignoring its timeout.
    pub hang_wait: bool,
}

impl ContainerScript {
    pub fn with_file(mut self, path: impl Into<String>, archive: FileArchive) -> Self {
        self.files.insert(path.into(), archive);
        self
    }

    pub fn running_for(mut self, duration: Duration) -> Self {
        self.run_for = duration;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// A runtime that never honours the wait timeout.
    pub fn hanging_wait(mut self) -> Self {
        self.hang_wait = true;
        self
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    scripts: HashMap<String, ContainerScript>,
    started: Vec<String>,
    deleted: Vec<String>,
    launched: Vec<(LabOwner, Deployment)>,
}

/// In-memory container runtime driven by per-name scripts.
#[derive(Debug, Default, Clone)]
pub struct MemoryContainerRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl MemoryContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the behaviour of containers named `name`.
    pub fn script(&self, name: impl Into<String>, script: ContainerScript) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(name.into(), script);
    }

    /// Names of started containers, in start order.
    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    /// Names of deleted containers, in deletion order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Deployments passed to `launch`.
    pub fn launched(&self) -> Vec<(LabOwner, Deployment)> {
        self.state.lock().unwrap().launched.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MemoryContainerRuntime {
    async fn launch(&self, owner: &LabOwner, deployment: &Deployment) -> RuntimeResult<()> {
        debug!(owner = %owner, containers = deployment.containers.len(), "fake launch");
        let mut state = self.state.lock().unwrap();
        state.launched.push((owner.clone(), deployment.clone()));
        Ok(())
    }

    async fn run_container(
        &self,
        _owner: &LabOwner,
        spec: &ContainerSpec,
    ) -> RuntimeResult<Arc<dyn ContainerHandle>> {
        let mut state = self.state.lock().unwrap();
        let script = state.scripts.get(&spec.name).cloned().unwrap_or_default();
        if script.fail_start {
            debug!(container = %spec.name, "fake start failure");
            return Err(RuntimeError::StartFailed {
                name: spec.name.clone(),
                reason: "scripted failure".into(),
            });
        }
        state.started.push(spec.name.clone());
        debug!(container = %spec.name, "fake container started");

        Ok(Arc::new(MemoryContainer {
            id: Uuid::new_v4(),
            name: spec.name.clone(),
            script,
            deleted: AtomicBool::new(false),
            runtime: self.state.clone(),
        }))
    }
}

/// Handle returned by `MemoryContainerRuntime`.
#[derive(Debug)]
pub struct MemoryContainer {
    id: Uuid,
    name: String,
    script: ContainerScript,
    deleted: AtomicBool,
    runtime: Arc<Mutex<RuntimeState>>,
}

impl MemoryContainer {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait]
impl ContainerHandle for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn wait(&self, timeout: Duration) -> RuntimeResult<()> {
        if self.script.hang_wait {
            debug!(container = %self.name, "fake wait hangs");
            std::future::pending::<()>().await;
        }
        tokio::time::timeout(timeout, tokio::time::sleep(self.script.run_for))
            .await
            .map_err(|_| RuntimeError::WaitTimeout {
                name: self.name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    async fn get_archive(&self, path: &str) -> RuntimeResult<FileArchive> {
        if self.deleted.load(Ordering::SeqCst) {
            return Err(RuntimeError::ContainerGone(self.name.clone()));
        }
        self.script
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::PathNotFound {
                name: self.name.clone(),
                path: path.to_string(),
            })
    }

    async fn delete(&self, _force: bool) -> RuntimeResult<()> {
        if self.deleted.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::ContainerGone(self.name.clone()));
        }
        debug!(container = %self.name, "fake container deleted");
        self.runtime.lock().unwrap().deleted.push(self.name.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryLabLocks
// ---------------------------------------------------------------------------

/// Lock table backed by a `HashSet<LabOwner>`.
#[derive(Debug, Default)]
pub struct MemoryLabLocks {
    held: Mutex<HashSet<LabOwner>>,
}

impl MemoryLabLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, owner: &LabOwner) -> bool {
        self.held.lock().unwrap().contains(owner)
    }
}

#[async_trait]
impl LabLocks for MemoryLabLocks {
    async fn try_acquire(&self, owner: &LabOwner) -> RuntimeResult<bool> {
        Ok(self.held.lock().unwrap().insert(owner.clone()))
    }

    async fn release(&self, owner: &LabOwner) -> RuntimeResult<()> {
        self.held.lock().unwrap().remove(owner);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryAttemptLedger
// ---------------------------------------------------------------------------

/// Attempt ledger backed by a `Vec<AttemptRecord>` in insertion order.
#[derive(Debug, Default)]
pub struct MemoryAttemptLedger {
    rows: Mutex<Vec<AttemptRecord>>,
}

impl MemoryAttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptLedger for MemoryAttemptLedger {
    async fn record_attempt(&self, attempt: NewAttempt) -> RuntimeResult<AttemptRecord> {
        let mut rows = self.rows.lock().unwrap();
        let record = AttemptRecord {
            id: rows.len() as u64 + 1,
            subject_id: attempt.subject_id,
            topic: attempt.topic,
            task: attempt.task,
            payload: attempt.payload,
            is_correct: attempt.is_correct,
            points: attempt.points,
            submitted_at: Utc::now(),
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn attempts(&self, owner: &LabOwner) -> RuntimeResult<Vec<AttemptRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|r| r.subject_id == owner.subject_id && r.topic == owner.topic)
            .cloned()
            .collect())
    }

    async fn reset_correct(&self, owner: &LabOwner) -> RuntimeResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.subject_id == owner.subject_id && r.topic == owner.topic)
        {
            if row.is_correct {
                row.is_correct = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// MemoryCheckLogStore
// ---------------------------------------------------------------------------

/// Check log store backed by a `Vec<CheckLog>` in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCheckLogStore {
    logs: Mutex<Vec<CheckLog>>,
}

impl MemoryCheckLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<CheckLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckLogStore for MemoryCheckLogStore {
    async fn append_log(&self, log: CheckLog) -> RuntimeResult<()> {
        self.logs.lock().unwrap().push(log);
        Ok(())
    }

    async fn latest_logs(&self, owner: &LabOwner) -> RuntimeResult<BTreeMap<String, CheckLog>> {
        let logs = self.logs.lock().unwrap();
        let mut latest = BTreeMap::new();
        for log in logs
            .iter()
            .filter(|l| l.subject_id == owner.subject_id && l.topic == owner.topic)
        {
            latest.insert(log.check.clone(), log.clone());
        }
        Ok(latest)
    }
}
