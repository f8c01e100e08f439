//! Predicates that read checker output and record correct attempts.
//!
//! Predicates never fail a check: unreadable output simply records nothing.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use netlab_runtime::contracts::{AttemptLedger, ContainerHandle};
use netlab_runtime::{LabOwner, NewAttempt};
use regex::Regex;

use crate::domain::Result;
use crate::sampler::AddressSpace;

/// What a predicate may look at and touch.
pub struct CheckContext<'a> {
    pub owner: &'a LabOwner,
    /// Started containers, in definition order.
    pub containers: &'a [Arc<dyn ContainerHandle>],
    pub ledger: &'a dyn AttemptLedger,
}

impl<'a> CheckContext<'a> {
    /// UTF-8 contents of `member` inside the archive of `path` from the
    /// container at `index`. Any failure yields `None`.
    pub async fn read_text(&self, index: usize, path: &str, member: &str) -> Option<String> {
        let container = self.containers.get(index)?;
        let archive = match container.get_archive(path).await {
            Ok(archive) => archive,
            Err(e) => {
                tracing::debug!(container = container.name(), path, error = %e, "archive unavailable");
                return None;
            }
        };
        let data = archive.file(member)?;
        String::from_utf8(data.to_vec()).ok()
    }

    /// Whether the container at `index` wrote `OK` to `/out/result`.
    pub async fn result_ok(&self, index: usize) -> bool {
        self.read_text(index, "/out/result", "result")
            .await
            .is_some_and(|text| text.trim() == "OK")
    }

    /// Append a correct attempt for `task`.
    pub async fn record_correct(&self, task: &str) -> Result<()> {
        self.ledger
            .record_attempt(NewAttempt::correct(self.owner, task))
            .await?;
        Ok(())
    }
}

/// Turns the output of finished checker containers into attempts.
#[async_trait]
pub trait CheckPredicate: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// DHCP server leases
// ---------------------------------------------------------------------------

/// Reads the addresses a DHCP client bot obtained and credits the IPv4 and
/// IPv6 tasks when they fall in the expected networks.
#[derive(Debug, Clone)]
pub struct DhcpdLeasePredicate {
    pub ip4_net: AddressSpace,
    pub ip6_net: AddressSpace,
}

#[async_trait]
impl CheckPredicate for DhcpdLeasePredicate {
    fn name(&self) -> &'static str {
        "dhcpd_leases"
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<()> {
        let Some(text) = ctx.read_text(0, "/out/addresses", "addresses").await else {
            return Ok(());
        };

        let mut solved = BTreeSet::new();
        for token in text.split_whitespace() {
            let Ok(net) = AddressSpace::parse(token) else {
                continue;
            };
            if net == self.ip4_net {
                solved.insert("ip4");
            }
            if net == self.ip6_net {
                solved.insert("ip6");
            }
        }

        for task in solved {
            ctx.record_correct(task).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Result-file verdicts
// ---------------------------------------------------------------------------

/// Credits `task` when every container of the check reported `OK`.
#[derive(Debug, Clone)]
pub struct ResultFilePredicate {
    pub task: String,
}

impl ResultFilePredicate {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }
}

#[async_trait]
impl CheckPredicate for ResultFilePredicate {
    fn name(&self) -> &'static str {
        "result_file"
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<()> {
        for index in 0..ctx.containers.len() {
            if !ctx.result_ok(index).await {
                return Ok(());
            }
        }
        ctx.record_correct(&self.task).await
    }
}

// ---------------------------------------------------------------------------
// UDP port audit
// ---------------------------------------------------------------------------

const UDP_TASK: &str = "udp_ports";

fn udp_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\[UDP\s[\d\.]+:(\d+)\].*$").unwrap_or_else(|e| panic!("udp line regex: {e}"))
    })
}

/// Credits `udp_ports` when both checkers (containers 0 and 1) passed and the
/// listening client (container 2) saw traffic only on allowed ports.
#[derive(Debug, Clone)]
pub struct UdpPortsPredicate {
    pub allowed: Vec<u64>,
}

impl UdpPortsPredicate {
    pub fn new(allowed: impl IntoIterator<Item = u64>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Whether every `[UDP host:port]` line of `log` names an allowed port.
    pub fn log_is_clean(&self, log: &str) -> bool {
        log.split('\n').all(|line| match udp_line().captures(line) {
            Some(caps) => caps[1]
                .parse::<u64>()
                .is_ok_and(|port| self.allowed.contains(&port)),
            None => true,
        })
    }
}

#[async_trait]
impl CheckPredicate for UdpPortsPredicate {
    fn name(&self) -> &'static str {
        "udp_ports"
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<()> {
        if !(ctx.result_ok(0).await && ctx.result_ok(1).await) {
            return Ok(());
        }
        let Some(log) = ctx.read_text(2, "/out/check.log", "check.log").await else {
            return Ok(());
        };
        if self.log_is_clean(&log) {
            ctx.record_correct(UDP_TASK).await?;
        }
        Ok(())
    }
}
