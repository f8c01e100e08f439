//! NETLAB Core Library
//!
//! Deterministic per-student network variants for the lab topics, the check
//! runner that interprets checker container output, and the service layer
//! that dispatches launches and checks.

pub mod check;
pub mod config;
pub mod deploy;
pub mod domain;
pub mod matcher;
pub mod obs;
pub mod rng;
pub mod sampler;
pub mod service;
pub mod telemetry;
pub mod topics;

pub use check::{
    default_joiner, CheckDefinition, CheckPredicate, CheckReport, CheckRunner, LogJoiner,
};
pub use config::{LabConfig, SecretSeed};
pub use domain::{NetlabError, Result};
pub use matcher::AnswerMatcher;
pub use rng::{RandomSource, SeedKey, SeededRng};
pub use sampler::{
    sample_distinct, sample_host, sample_identifier, sample_subnet, AddressSpace, IpVersion,
    MacAddress,
};
pub use service::{BotReport, Dispatch, LabService};
pub use telemetry::init_tracing;
pub use topics::{Capability, LabTopic, TopicRegistry, TopicTask, Variant, VariantCache};

pub use netlab_runtime::{ContainerSpec, Deployment, LabOwner};
