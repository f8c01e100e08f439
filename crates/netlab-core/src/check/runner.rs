//! Executes a [`CheckDefinition`] against a container runtime.
//!
//! Order of operations for one check:
//! 1. start every container (a start failure deletes the ones already up)
//! 2. wait for all of them, bounded by the configured timeout even if the
//!    runtime ignores it
//! 3. collect and decode the requested log files, join them, store the report
//! 4. run the predicate once
//! 5. force-delete every container, whatever happened in steps 2 to 4

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use netlab_runtime::contracts::{
    AttemptLedger, CheckLogStore, ContainerHandle, ContainerRuntime, RuntimeResult,
};
use netlab_runtime::{CheckLog, FileArchive, LabOwner, RuntimeError};
use tracing::Instrument;

use super::definition::CheckDefinition;
use super::predicates::CheckContext;
use crate::domain::Result;
use crate::obs;

/// Decode every regular file of an archive, in archive order.
///
/// Each member contributes its UTF-8 text followed by a blank line, or a
/// `File <name> cannot be decoded` marker. The result is trimmed.
pub fn decode_archive(archive: &FileArchive) -> String {
    let mut text = String::new();
    for entry in &archive.entries {
        let Some(data) = &entry.data else {
            continue;
        };
        match std::str::from_utf8(data) {
            Ok(decoded) => text.push_str(decoded),
            Err(_) => text.push_str(&format!("File {} cannot be decoded", entry.name)),
        }
        text.push_str("\n\n");
    }
    text.trim().to_string()
}

/// Summary of one check execution.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub log: CheckLog,
    /// Containers that had not exited when the wait timed out.
    pub timed_out: Vec<String>,
    /// Set when the predicate failed or panicked.
    pub predicate_error: Option<String>,
}

/// Runs checks with shared collaborators.
#[derive(Clone)]
pub struct CheckRunner {
    runtime: Arc<dyn ContainerRuntime>,
    ledger: Arc<dyn AttemptLedger>,
    logs: Arc<dyn CheckLogStore>,
    timeout: Duration,
}

impl CheckRunner {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        ledger: Arc<dyn AttemptLedger>,
        logs: Arc<dyn CheckLogStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            ledger,
            logs,
            timeout,
        }
    }

    /// Run `definition` for `owner` and return the stored report.
    ///
    /// Only a container start failure or a failure to store the report is
    /// returned as an error; timeouts, unreadable logs and predicate
    /// failures are logged and tolerated.
    pub async fn run(
        &self,
        owner: &LabOwner,
        check: &str,
        definition: &CheckDefinition,
    ) -> Result<CheckReport> {
        self.run_inner(owner, check, definition)
            .instrument(obs::check_span(owner, check))
            .await
    }

    async fn run_inner(
        &self,
        owner: &LabOwner,
        check: &str,
        definition: &CheckDefinition,
    ) -> Result<CheckReport> {
        let started = Instant::now();
        obs::emit_check_started(owner, check, definition.containers.len());

        let containers = self.start_all(owner, definition).await?;

        let timed_out = self.wait_all(owner, &containers).await;
        let texts = self.capture_logs(owner, &containers, &definition.logs).await;
        let log = CheckLog {
            subject_id: owner.subject_id,
            topic: owner.topic.clone(),
            check: check.to_string(),
            text: (definition.joiner)(&texts),
            created_at: Utc::now(),
        };
        let stored = self.logs.append_log(log.clone()).await;

        let predicate_error = match &definition.predicate {
            Some(predicate) => {
                let ctx = CheckContext {
                    owner,
                    containers: &containers,
                    ledger: self.ledger.as_ref(),
                };
                match AssertUnwindSafe(predicate.evaluate(&ctx)).catch_unwind().await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        tracing::warn!(predicate = predicate.name(), error = %e, "predicate failed");
                        Some(e.to_string())
                    }
                    Err(_) => {
                        tracing::error!(predicate = predicate.name(), "predicate panicked");
                        Some(format!("predicate {} panicked", predicate.name()))
                    }
                }
            }
            None => None,
        };

        teardown(&containers).await;
        obs::emit_check_finished(
            owner,
            check,
            started.elapsed().as_millis() as u64,
            log.text.len(),
        );

        stored?;
        Ok(CheckReport {
            log,
            timed_out,
            predicate_error,
        })
    }

    async fn start_all(
        &self,
        owner: &LabOwner,
        definition: &CheckDefinition,
    ) -> Result<Vec<Arc<dyn ContainerHandle>>> {
        let mut containers = Vec::with_capacity(definition.containers.len());
        for spec in &definition.containers {
            match self.runtime.run_container(owner, spec).await {
                Ok(handle) => containers.push(handle),
                Err(e) => {
                    tracing::warn!(container = %spec.name, error = %e, "checker container failed to start");
                    teardown(&containers).await;
                    return Err(e.into());
                }
            }
        }
        Ok(containers)
    }

    async fn wait_all(
        &self,
        owner: &LabOwner,
        containers: &[Arc<dyn ContainerHandle>],
    ) -> Vec<String> {
        let timeout = self.timeout;
        let waits = containers
            .iter()
            .map(|c| bounded_wait(c.as_ref(), timeout));
        let mut timed_out = Vec::new();
        for (container, result) in containers.iter().zip(join_all(waits).await) {
            match result {
                Ok(()) => {}
                Err(RuntimeError::WaitTimeout { timeout_ms, .. }) => {
                    obs::emit_check_wait_timeout(owner, container.name(), timeout_ms);
                    timed_out.push(container.name().to_string());
                }
                Err(e) => {
                    tracing::warn!(container = container.name(), error = %e, "wait failed");
                }
            }
        }
        timed_out
    }

    async fn capture_logs(
        &self,
        owner: &LabOwner,
        containers: &[Arc<dyn ContainerHandle>],
        paths: &BTreeMap<usize, String>,
    ) -> BTreeMap<usize, String> {
        let mut texts = BTreeMap::new();
        for (&index, path) in paths {
            let text = match containers.get(index) {
                Some(container) => match container.get_archive(path).await {
                    Ok(archive) => decode_archive(&archive),
                    Err(e) => {
                        obs::emit_log_capture_failed(owner, path, &e);
                        String::new()
                    }
                },
                None => String::new(),
            };
            texts.insert(index, text);
        }
        texts
    }
}

/// Wait for `container`, never longer than `timeout` even when the runtime
/// does not enforce it.
async fn bounded_wait(container: &dyn ContainerHandle, timeout: Duration) -> RuntimeResult<()> {
    tokio::time::timeout(timeout, container.wait(timeout))
        .await
        .unwrap_or_else(|_| {
            Err(RuntimeError::WaitTimeout {
                name: container.name().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        })
}

async fn teardown(containers: &[Arc<dyn ContainerHandle>]) {
    for container in containers {
        if let Err(e) = container.delete(true).await {
            tracing::warn!(container = container.name(), error = %e, "failed to delete checker container");
        }
    }
}
