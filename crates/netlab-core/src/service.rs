//! Service layer tying topics to the runtime and the grading stores.
//!
//! Launches and checks run in a background tokio task; the calling request
//! only learns whether work was started. At most one of them is in flight
//! per (student, topic): the lock is taken before spawning and released when
//! the task ends, whatever the outcome.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use netlab_runtime::contracts::{AttemptLedger, CheckLogStore, ContainerRuntime, LabLocks};
use netlab_runtime::{AttemptRecord, CheckLog, Deployment, LabOwner, NewAttempt};
use tokio::task::JoinHandle;

use crate::check::{CheckDefinition, CheckRunner};
use crate::config::LabConfig;
use crate::domain::{NetlabError, Result};
use crate::obs;
use crate::topics::{Capability, LabTopic, TopicRegistry, Variant};

/// Outcome of asking for background work.
#[derive(Debug)]
pub enum Dispatch {
    /// Work was spawned; the handle resolves when it is done.
    Started(JoinHandle<()>),
    /// Another launch or check of the same lab is still running.
    Busy,
    /// Nothing to do (e.g. an unknown check name).
    Ignored,
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Dispatch::Started(_))
    }

    /// Wait for spawned work, if any.
    pub async fn join(self) {
        if let Dispatch::Started(handle) = self {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "background lab task failed");
            }
        }
    }
}

/// A "task done" report sent by a bot container over the callback socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReport {
    pub subject_id: i64,
    pub topic: String,
    pub task: String,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl BotReport {
    /// Validate raw callback parameters: a numeric user id and
    /// identifier-like topic and task names.
    pub fn parse(user_id: &str, chapter: &str, task: &str) -> Result<Self> {
        if user_id.is_empty() || !user_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NetlabError::InvalidBotReport(format!(
                "user id is not a number: {user_id:?}"
            )));
        }
        let subject_id = user_id.parse().map_err(|_| {
            NetlabError::InvalidBotReport(format!("user id out of range: {user_id}"))
        })?;
        if !is_identifier(chapter) {
            return Err(NetlabError::InvalidBotReport(format!(
                "bad topic name: {chapter:?}"
            )));
        }
        if !is_identifier(task) {
            return Err(NetlabError::InvalidBotReport(format!(
                "bad task name: {task:?}"
            )));
        }
        Ok(Self {
            subject_id,
            topic: chapter.to_string(),
            task: task.to_string(),
        })
    }
}

/// Entry point for the web layer.
#[derive(Clone)]
pub struct LabService {
    config: Arc<LabConfig>,
    registry: TopicRegistry,
    runtime: Arc<dyn ContainerRuntime>,
    locks: Arc<dyn LabLocks>,
    ledger: Arc<dyn AttemptLedger>,
    logs: Arc<dyn CheckLogStore>,
}

impl LabService {
    pub fn new(
        config: LabConfig,
        runtime: Arc<dyn ContainerRuntime>,
        locks: Arc<dyn LabLocks>,
        ledger: Arc<dyn AttemptLedger>,
        logs: Arc<dyn CheckLogStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: TopicRegistry::standard(),
            runtime,
            locks,
            ledger,
            logs,
        }
    }

    pub fn with_registry(mut self, registry: TopicRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn variant(&self, subject_id: i64, topic: &str) -> Result<Variant> {
        self.registry.build_variant(topic, &self.config, subject_id)
    }

    fn topic_with(&self, topic: &str, capability: Capability) -> Result<Arc<dyn LabTopic>> {
        let found = self.registry.get(topic)?;
        if !found.supports(capability) {
            return Err(NetlabError::CapabilityMissing {
                topic: topic.to_string(),
                capability: capability.to_string(),
            });
        }
        Ok(found)
    }

    /// (Re)deploy the student's lab in the background.
    pub async fn launch(&self, subject_id: i64, topic: &str) -> Result<Dispatch> {
        self.topic_with(topic, Capability::Deployable)?;
        let Some(deployment) = self.variant(subject_id, topic)?.deployment else {
            return Ok(Dispatch::Ignored);
        };

        let owner = LabOwner::new(subject_id, topic);
        if !self.locks.try_acquire(&owner).await? {
            obs::emit_dispatch_busy(&owner, "launch");
            return Ok(Dispatch::Busy);
        }

        let runtime = self.runtime.clone();
        let locks = self.locks.clone();
        let handle = tokio::spawn(async move {
            run_launch(runtime.as_ref(), &owner, &deployment).await;
            release(locks.as_ref(), &owner).await;
        });
        Ok(Dispatch::Started(handle))
    }

    /// Run the named check in the background. Unknown check names are ignored.
    pub async fn check(&self, subject_id: i64, topic: &str, check: &str) -> Result<Dispatch> {
        self.topic_with(topic, Capability::ContainerCheckable)?;
        let mut variant = self.variant(subject_id, topic)?;
        let Some(definition) = variant.checks.remove(check) else {
            tracing::debug!(topic, check, "ignoring unknown check");
            return Ok(Dispatch::Ignored);
        };

        let owner = LabOwner::new(subject_id, topic);
        if !self.locks.try_acquire(&owner).await? {
            obs::emit_dispatch_busy(&owner, "check");
            return Ok(Dispatch::Busy);
        }

        let runner = CheckRunner::new(
            self.runtime.clone(),
            self.ledger.clone(),
            self.logs.clone(),
            self.config.check_timeout,
        );
        let locks = self.locks.clone();
        let check = check.to_string();
        let handle = tokio::spawn(async move {
            run_check(&runner, &owner, &check, &definition).await;
            release(locks.as_ref(), &owner).await;
        });
        Ok(Dispatch::Started(handle))
    }

    /// Grade a free-text answer and record the attempt. Returns whether it
    /// was correct.
    pub async fn submit_answer(
        &self,
        subject_id: i64,
        topic: &str,
        task: &str,
        answer: &str,
    ) -> Result<bool> {
        let found = self.topic_with(topic, Capability::AnswerCheckable)?;
        let unknown = || NetlabError::UnknownTask {
            topic: topic.to_string(),
            task: task.to_string(),
        };
        found.task(task).ok_or_else(unknown)?;

        let variant = self.variant(subject_id, topic)?;
        let matcher = variant.matcher(task).ok_or_else(unknown)?;
        let is_correct = matcher.matches(answer);

        self.ledger
            .record_attempt(NewAttempt {
                subject_id,
                topic: topic.to_string(),
                task: task.to_string(),
                payload: serde_json::json!({ "answer": answer }),
                is_correct,
                points: None,
            })
            .await?;
        tracing::info!(subject_id, topic, task, is_correct, "answer graded");
        Ok(is_correct)
    }

    /// Record a bot's "task done" report as a correct attempt.
    pub async fn record_bot_report(&self, report: &BotReport) -> Result<AttemptRecord> {
        let topic = self.registry.get(&report.topic)?;
        if topic.task(&report.task).is_none() {
            return Err(NetlabError::UnknownTask {
                topic: report.topic.clone(),
                task: report.task.clone(),
            });
        }
        let owner = LabOwner::new(report.subject_id, report.topic.as_str());
        let record = self
            .ledger
            .record_attempt(NewAttempt::correct(&owner, report.task.as_str()))
            .await?;
        tracing::info!(owner = %owner, task = %report.task, "bot reported task done");
        Ok(record)
    }

    /// Mark every correct attempt of the student in `topic` incorrect.
    pub async fn clear_progress(&self, subject_id: i64, topic: &str) -> Result<usize> {
        self.registry.get(topic)?;
        let cleared = self
            .ledger
            .reset_correct(&LabOwner::new(subject_id, topic))
            .await?;
        tracing::info!(subject_id, topic, cleared, "progress cleared");
        Ok(cleared)
    }

    /// Newest report per check.
    pub async fn latest_logs(
        &self,
        subject_id: i64,
        topic: &str,
    ) -> Result<BTreeMap<String, CheckLog>> {
        self.registry.get(topic)?;
        Ok(self
            .logs
            .latest_logs(&LabOwner::new(subject_id, topic))
            .await?)
    }

    pub async fn attempts(&self, subject_id: i64, topic: &str) -> Result<Vec<AttemptRecord>> {
        Ok(self
            .ledger
            .attempts(&LabOwner::new(subject_id, topic))
            .await?)
    }
}

impl std::fmt::Debug for LabService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabService")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

async fn run_launch(runtime: &dyn ContainerRuntime, owner: &LabOwner, deployment: &Deployment) {
    let started = Instant::now();
    let result = AssertUnwindSafe(runtime.launch(owner, deployment))
        .catch_unwind()
        .await;
    let success = matches!(result, Ok(Ok(())));
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(owner = %owner, error = %e, "launch failed"),
        Err(_) => tracing::error!(owner = %owner, "launch panicked"),
    }
    obs::emit_launch_finished(owner, started.elapsed().as_millis() as u64, success);
}

async fn run_check(runner: &CheckRunner, owner: &LabOwner, check: &str, definition: &CheckDefinition) {
    match AssertUnwindSafe(runner.run(owner, check, definition))
        .catch_unwind()
        .await
    {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(owner = %owner, check, error = %e, "check failed"),
        Err(_) => tracing::error!(owner = %owner, check, "check panicked"),
    }
}

async fn release(locks: &dyn LabLocks, owner: &LabOwner) {
    if let Err(e) = locks.release(owner).await {
        tracing::error!(owner = %owner, error = %e, "failed to release lab lock");
    }
}
