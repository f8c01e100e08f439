//! Checker containers: what to run, how to read their output and how to
//! turn it into attempts.

pub mod definition;
pub mod predicates;
pub mod runner;

pub use definition::{default_joiner, CheckDefinition, LogJoiner};
pub use predicates::{
    CheckContext, CheckPredicate, DhcpdLeasePredicate, ResultFilePredicate, UdpPortsPredicate,
};
pub use runner::{decode_archive, CheckReport, CheckRunner};
