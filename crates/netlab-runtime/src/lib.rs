//! netlab-runtime: contracts for the services around the variant generator
//!
//! The generator itself is pure. Everything it talks to (the container
//! engine, the per-lab lock table, the attempt ledger and the check-log
//! store) is described here as an async trait, implemented by a real backend
//! in production and by the in-memory `fakes` in tests.
//!
//! ## Key Components
//!
//! - `ContainerSpec` / `Deployment`: declarative lab description
//! - `ContainerRuntime` / `ContainerHandle`: start, wait, extract, delete
//! - `LabLocks`: one in-flight operation per (user, topic)
//! - `AttemptLedger` / `CheckLogStore`: grading persistence

pub mod contracts;
mod error;
pub mod fakes;
pub mod schema;

pub use contracts::{
    AttemptLedger, CheckLogStore, ContainerHandle, ContainerRuntime, LabLocks, RuntimeResult,
};
pub use error::RuntimeError;
pub use schema::{
    ArchiveEntry, AttemptRecord, CheckLog, ContainerSpec, Deployment, FileArchive, LabOwner,
    NetworkSpec, NewAttempt,
};
