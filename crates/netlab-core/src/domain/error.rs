//! Domain-level error taxonomy for NETLAB.

use netlab_runtime::RuntimeError;

/// NETLAB domain errors.
///
/// Address arithmetic invariants are not represented here: a subnet smaller
/// than its parent or an out-of-range offset is a programming error and
/// panics instead of producing a wrong variant.
#[derive(Debug, thiserror::Error)]
pub enum NetlabError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported IP version: {0}")]
    UnsupportedIpVersion(u8),

    #[error("invalid address block: {0}")]
    InvalidAddress(String),

    #[error("invalid answer pattern for {slug}: {source}")]
    InvalidPattern {
        slug: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown lab topic: {0}")]
    UnknownTopic(String),

    #[error("unknown task {task} in topic {topic}")]
    UnknownTask { topic: String, task: String },

    #[error("topic {topic} does not support {capability}")]
    CapabilityMissing { topic: String, capability: String },

    #[error("invalid bot report: {0}")]
    InvalidBotReport(String),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Result type for NETLAB domain operations.
pub type Result<T> = std::result::Result<T, NetlabError>;
