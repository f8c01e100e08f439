//! Declarative description of a check.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use netlab_runtime::ContainerSpec;
use serde::Serialize;

use super::predicates::CheckPredicate;

/// Joins per-container log texts, keyed by container index, into one report.
pub type LogJoiner = fn(&BTreeMap<usize, String>) -> String;

/// Texts in ascending index order, separated by a single newline.
pub fn default_joiner(logs: &BTreeMap<usize, String>) -> String {
    logs.values().map(String::as_str).collect::<Vec<_>>().join("\n")
}

/// Containers to start, files to collect from them and the optional
/// predicate that turns their output into recorded attempts.
#[derive(Clone, Serialize)]
pub struct CheckDefinition {
    pub containers: Vec<ContainerSpec>,
    /// Container index → in-container path of its log file.
    pub logs: BTreeMap<usize, String>,
    #[serde(skip)]
    pub joiner: LogJoiner,
    #[serde(skip)]
    pub predicate: Option<Arc<dyn CheckPredicate>>,
}

impl CheckDefinition {
    pub fn new(containers: Vec<ContainerSpec>) -> Self {
        Self {
            containers,
            logs: BTreeMap::new(),
            joiner: default_joiner,
            predicate: None,
        }
    }

    /// Collect `path` from the container at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` does not name a container of this check.
    pub fn log(mut self, index: usize, path: impl Into<String>) -> Self {
        assert!(
            index < self.containers.len(),
            "log index {index} out of {} containers",
            self.containers.len()
        );
        self.logs.insert(index, path.into());
        self
    }

    pub fn joiner(mut self, joiner: LogJoiner) -> Self {
        self.joiner = joiner;
        self
    }

    pub fn predicate(mut self, predicate: impl CheckPredicate + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("containers", &self.containers)
            .field("logs", &self.logs)
            .field("predicate", &self.predicate.as_ref().map(|p| p.name()))
            .finish()
    }
}
