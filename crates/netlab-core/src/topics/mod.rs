//! Lab topics and the variants they generate.
//!
//! Each topic derives everything from `(secret, subject_id[, suffix])`
//! through a [`SeededRng`](crate::rng::SeededRng), drawing in a fixed order.
//! Changing that order changes every student's variant, so the draw order
//! of each topic is part of its contract.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use netlab_runtime::Deployment;
use serde::Serialize;

use crate::check::CheckDefinition;
use crate::config::LabConfig;
use crate::domain::{NetlabError, Result};
use crate::matcher::AnswerMatcher;
use crate::obs;

pub mod dhcp;
pub mod dhcpd;
pub mod dns;
pub mod firewall;
pub mod ip;
pub mod practice;
pub mod words;

pub use dhcp::{DhcpParams, DhcpTopic};
pub use dhcpd::{DhcpdParams, DhcpdTopic};
pub use dns::{DnsParams, DnsTopic};
pub use firewall::{FirewallParams, FirewallTopic};
pub use ip::{IpParams, IpTopic};
pub use practice::PracticeTopic;

/// What the service layer may do with a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Has a deployment that can be launched.
    Deployable,
    /// Has free-text answers checked by matchers.
    AnswerCheckable,
    /// Has checker containers.
    ContainerCheckable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Deployable => "deployment",
            Capability::AnswerCheckable => "answer checking",
            Capability::ContainerCheckable => "container checks",
        };
        f.write_str(name)
    }
}

/// A gradable task of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopicTask {
    pub slug: &'static str,
    pub title: &'static str,
    pub points: f64,
}

impl TopicTask {
    pub const fn new(slug: &'static str, title: &'static str, points: f64) -> Self {
        Self {
            slug,
            title,
            points,
        }
    }
}

/// Deadline at `hour:00` UTC.
pub(crate) fn deadline_at(year: i32, month: u32, day: u32, hour: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single()
}

/// A lab topic.
pub trait LabTopic: Send + Sync {
    fn slug(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn deadline(&self) -> Option<DateTime<Utc>>;

    fn tasks(&self) -> &'static [TopicTask];

    fn capabilities(&self) -> &'static [Capability];

    /// Namespace appended to the seed key, if the topic has its own.
    fn seed_suffix(&self) -> Option<&'static str> {
        None
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    fn task(&self, slug: &str) -> Option<&'static TopicTask> {
        self.tasks().iter().find(|t| t.slug == slug)
    }

    /// Build the variant of `subject_id`. Pure: identical inputs give
    /// identical variants.
    fn build_variant(&self, config: &LabConfig, subject_id: i64) -> Result<Variant>;
}

/// Everything generated for one student in one topic.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub topic: String,
    pub subject_id: i64,
    /// Values shown to the student on the lab page.
    pub facts: BTreeMap<String, String>,
    pub deployment: Option<Deployment>,
    pub matchers: Vec<AnswerMatcher>,
    pub checks: BTreeMap<String, CheckDefinition>,
}

impl Variant {
    pub fn new(topic: impl Into<String>, subject_id: i64) -> Self {
        Self {
            topic: topic.into(),
            subject_id,
            facts: BTreeMap::new(),
            deployment: None,
            matchers: Vec::new(),
            checks: BTreeMap::new(),
        }
    }

    pub fn fact(mut self, name: &str, value: impl ToString) -> Self {
        self.facts.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    pub fn with_matchers(mut self, matchers: Vec<AnswerMatcher>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_check(mut self, name: &str, definition: CheckDefinition) -> Self {
        self.checks.insert(name.to_string(), definition);
        self
    }

    pub fn matcher(&self, slug: &str) -> Option<&AnswerMatcher> {
        self.matchers.iter().find(|m| m.slug == slug)
    }

    pub fn check(&self, name: &str) -> Option<&CheckDefinition> {
        self.checks.get(name)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The set of topics a deployment of the platform offers.
#[derive(Clone)]
pub struct TopicRegistry {
    topics: Vec<Arc<dyn LabTopic>>,
}

impl TopicRegistry {
    pub fn new(topics: Vec<Arc<dyn LabTopic>>) -> Self {
        Self { topics }
    }

    /// IP basics, DHCP client, DHCP server, DNS, firewall and practice.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(IpTopic),
            Arc::new(DhcpTopic),
            Arc::new(DhcpdTopic),
            Arc::new(DnsTopic),
            Arc::new(FirewallTopic),
            Arc::new(PracticeTopic),
        ])
    }

    pub fn get(&self, slug: &str) -> Result<Arc<dyn LabTopic>> {
        self.topics
            .iter()
            .find(|t| t.slug() == slug)
            .cloned()
            .ok_or_else(|| NetlabError::UnknownTopic(slug.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LabTopic>> {
        self.topics.iter()
    }

    /// Build a variant and log its assembly.
    pub fn build_variant(
        &self,
        slug: &str,
        config: &LabConfig,
        subject_id: i64,
    ) -> Result<Variant> {
        let topic = self.get(slug)?;
        let variant = topic.build_variant(config, subject_id)?;
        let containers = variant
            .deployment
            .as_ref()
            .map_or(0, |d| d.containers.len());
        let key = config.seed_key(subject_id, topic.seed_suffix());
        obs::emit_variant_built(slug, subject_id, &key.fingerprint(), containers);
        Ok(variant)
    }
}

impl fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.topics.iter().map(|t| t.slug()))
            .finish()
    }
}

/// Per-request memo of built variants. Variants are never persisted.
#[derive(Debug, Default)]
pub struct VariantCache {
    built: HashMap<(String, i64), Arc<Variant>>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        registry: &TopicRegistry,
        slug: &str,
        config: &LabConfig,
        subject_id: i64,
    ) -> Result<Arc<Variant>> {
        let key = (slug.to_string(), subject_id);
        if let Some(variant) = self.built.get(&key) {
            return Ok(variant.clone());
        }
        let variant = Arc::new(registry.build_variant(slug, config, subject_id)?);
        self.built.insert(key, variant.clone());
        Ok(variant)
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}
