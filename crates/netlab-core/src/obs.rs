//! Structured observability hooks for lab lifecycle events.
//!
//! This module provides:
//! - A check-scoped tracing span via `check_span`
//! - Emission functions for variant assembly, check execution and dispatch
//!
//! Events are emitted at `info!` level unless noted (filter with `NETLAB_LOG`).

use netlab_runtime::LabOwner;
use tracing::{info, warn};

/// Span tagging every event of one check execution.
///
/// Attach it with `tracing::Instrument` so it survives `.await` points:
///
/// ```ignore
/// run_check().instrument(check_span(&owner, "udp_ports")).await;
/// // every event inside carries owner = "42/firewall", check = "udp_ports"
/// ```
pub fn check_span(owner: &LabOwner, check: &str) -> tracing::Span {
    tracing::info_span!("netlab.check", owner = %owner, check = %check)
}

/// Emit event: a variant was assembled.
///
/// Only the seed fingerprint is logged, never the secret.
pub fn emit_variant_built(topic: &str, subject_id: i64, fingerprint: &str, containers: usize) {
    info!(
        event = "variant.built",
        topic = %topic,
        subject_id = subject_id,
        seed = %fingerprint,
        containers = containers,
    );
}

/// Emit event: checker containers are being started.
pub fn emit_check_started(owner: &LabOwner, check: &str, containers: usize) {
    info!(event = "check.started", owner = %owner, check = %check, containers = containers);
}

/// Emit event: a checker container did not exit in time (warning level).
pub fn emit_check_wait_timeout(owner: &LabOwner, container: &str, timeout_ms: u64) {
    warn!(
        event = "check.wait_timeout",
        owner = %owner,
        container = %container,
        timeout_ms = timeout_ms,
    );
}

/// Emit event: a log file could not be extracted (warning level).
pub fn emit_log_capture_failed(owner: &LabOwner, path: &str, error: &dyn std::fmt::Display) {
    warn!(event = "check.log_capture_failed", owner = %owner, path = %path, error = %error);
}

/// Emit event: check finished, with the report size and predicate outcome.
pub fn emit_check_finished(owner: &LabOwner, check: &str, duration_ms: u64, log_bytes: usize) {
    info!(
        event = "check.finished",
        owner = %owner,
        check = %check,
        duration_ms = duration_ms,
        log_bytes = log_bytes,
    );
}

/// Emit event: a deployment or check was dropped because one is in flight.
pub fn emit_dispatch_busy(owner: &LabOwner, action: &str) {
    info!(event = "lab.dispatch_busy", owner = %owner, action = %action);
}

/// Emit event: a deployment launch completed.
pub fn emit_launch_finished(owner: &LabOwner, duration_ms: u64, success: bool) {
    info!(
        event = "lab.launch_finished",
        owner = %owner,
        duration_ms = duration_ms,
        success = success,
    );
}
