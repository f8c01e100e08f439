//! Records exchanged with the container runtime and the grading stores.
//!
//! Everything here is plain data: the generator produces `Deployment` and
//! `ContainerSpec` values, the runtime interprets them, and the checker layer
//! hands `AttemptRecord` / `CheckLog` rows to persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a deployment or check belongs to: one student working on one lab topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabOwner {
    pub subject_id: i64,
    pub topic: String,
}

impl LabOwner {
    pub fn new(subject_id: i64, topic: impl Into<String>) -> Self {
        Self {
            subject_id,
            topic: topic.into(),
        }
    }
}

impl std::fmt::Display for LabOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject_id, self.topic)
    }
}

// ---------------------------------------------------------------------------
// Deployment description
// ---------------------------------------------------------------------------

/// One container of a lab deployment or of a check.
///
/// `networks` maps a virtual network name to the MAC address the container
/// must use on it (`None` lets the runtime pick one). Maps are ordered so that
/// two identical variants serialize byte-for-byte identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub networks: BTreeMap<String, Option<String>>,
    pub environment: BTreeMap<String, String>,
    /// Memory limit in bytes.
    pub mem_limit: Option<u64>,
    pub ipv6_forwarding: bool,
    /// Host path → container path.
    pub volumes: BTreeMap<String, String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            networks: BTreeMap::new(),
            environment: BTreeMap::new(),
            mem_limit: None,
            ipv6_forwarding: true,
            volumes: BTreeMap::new(),
        }
    }

    /// Attach to a network with a fixed MAC address.
    pub fn network(mut self, name: impl Into<String>, mac: impl ToString) -> Self {
        self.networks.insert(name.into(), Some(mac.to_string()));
        self
    }

    /// Attach to a network and let the runtime assign the MAC.
    pub fn network_any(mut self, name: impl Into<String>) -> Self {
        self.networks.insert(name.into(), None);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.environment.insert(key.into(), value.to_string());
        self
    }

    pub fn mem_limit(mut self, bytes: u64) -> Self {
        self.mem_limit = Some(bytes);
        self
    }

    pub fn without_ipv6_forwarding(mut self) -> Self {
        self.ipv6_forwarding = false;
        self
    }

    pub fn volume(mut self, host: impl Into<String>, container: impl Into<String>) -> Self {
        self.volumes.insert(host.into(), container.into());
        self
    }
}

/// A named virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Complete description of a lab environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub containers: Vec<ContainerSpec>,
    pub networks: Vec<NetworkSpec>,
}

impl Deployment {
    /// Find a container by name.
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

// ---------------------------------------------------------------------------
// Archives pulled out of containers
// ---------------------------------------------------------------------------

/// One member of an extracted archive. `data` is `None` for members that are
/// not regular files (directories, links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Option<Vec<u8>>,
}

/// Files extracted from a container path, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArchive {
    pub entries: Vec<ArchiveEntry>,
}

impl FileArchive {
    /// Archive holding a single regular file.
    pub fn single(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            entries: vec![ArchiveEntry {
                name: name.into(),
                data: Some(data.into()),
            }],
        }
    }

    /// Contents of the regular file called `name`, if present.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.data.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Grading records
// ---------------------------------------------------------------------------

/// An attempt about to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub subject_id: i64,
    pub topic: String,
    pub task: String,
    pub payload: serde_json::Value,
    pub is_correct: bool,
    pub points: Option<f64>,
}

impl NewAttempt {
    /// A correct attempt with an empty payload, as recorded by checkers.
    pub fn correct(owner: &LabOwner, task: impl Into<String>) -> Self {
        Self {
            subject_id: owner.subject_id,
            topic: owner.topic.clone(),
            task: task.into(),
            payload: serde_json::json!({}),
            is_correct: true,
            points: None,
        }
    }
}

/// A persisted attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: u64,
    pub subject_id: i64,
    pub topic: String,
    pub task: String,
    pub payload: serde_json::Value,
    pub is_correct: bool,
    pub points: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

/// The joined report of one check execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckLog {
    pub subject_id: i64,
    pub topic: String,
    pub check: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_builder_sets_fields() {
        let spec = ContainerSpec::new("nsd", "labs/nsd")
            .network_any("internal")
            .env("DOMAIN", "example")
            .mem_limit(200 * 1024 * 1024)
            .without_ipv6_forwarding();

        assert_eq!(spec.networks.get("internal"), Some(&None));
        assert_eq!(spec.environment["DOMAIN"], "example");
        assert_eq!(spec.mem_limit, Some(209_715_200));
        assert!(!spec.ipv6_forwarding);
        assert!(spec.volumes.is_empty());
    }

    #[test]
    fn test_archive_file_skips_non_regular_members() {
        let archive = FileArchive {
            entries: vec![
                ArchiveEntry {
                    name: "out".into(),
                    data: None,
                },
                ArchiveEntry {
                    name: "result".into(),
                    data: Some(b"OK\n".to_vec()),
                },
            ],
        };
        assert_eq!(archive.file("result"), Some(&b"OK\n"[..]));
        assert_eq!(archive.file("out"), None);
        assert_eq!(archive.file("missing"), None);
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(LabOwner::new(7, "dns").to_string(), "7/dns");
    }
}
