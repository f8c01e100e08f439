//! Trait contract tests for ContainerRuntime, LabLocks, AttemptLedger and
//! CheckLogStore.
//!
//! These tests verify the behavioral contracts of the runtime traits using the
//! in-memory fakes. Any conforming implementation must pass these.

use std::time::Duration;

use chrono::Utc;
use netlab_runtime::contracts::*;
use netlab_runtime::fakes::{
    ContainerScript, MemoryAttemptLedger, MemoryCheckLogStore, MemoryContainerRuntime,
    MemoryLabLocks,
};
use netlab_runtime::{
    CheckLog, ContainerSpec, Deployment, FileArchive, LabOwner, NetworkSpec, NewAttempt,
    RuntimeError,
};

fn owner() -> LabOwner {
    LabOwner::new(42, "firewall")
}

// ===========================================================================
// ContainerRuntime contract tests
// ===========================================================================

#[tokio::test]
async fn runtime_launch_records_deployment() {
    let runtime = MemoryContainerRuntime::new();
    let deployment = Deployment {
        containers: vec![ContainerSpec::new("vpn", "labs/vpn").network_any("internal")],
        networks: vec![NetworkSpec::new("internal")],
    };

    runtime.launch(&owner(), &deployment).await.unwrap();

    let launched = runtime.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].0, owner());
    assert_eq!(launched[0].1, deployment);
}

#[tokio::test]
async fn runtime_archive_round_trip() {
    let runtime = MemoryContainerRuntime::new();
    runtime.script(
        "bot",
        ContainerScript::default().with_file("/out/result", FileArchive::single("result", "OK")),
    );

    let handle = runtime
        .run_container(&owner(), &ContainerSpec::new("bot", "labs/bot"))
        .await
        .unwrap();
    let archive = handle.get_archive("/out/result").await.unwrap();

    assert_eq!(archive.file("result"), Some(&b"OK"[..]));
}

#[tokio::test]
async fn runtime_missing_path_is_not_found() {
    let runtime = MemoryContainerRuntime::new();
    let handle = runtime
        .run_container(&owner(), &ContainerSpec::new("bot", "labs/bot"))
        .await
        .unwrap();

    let err = handle.get_archive("/out/nothing").await.unwrap_err();
    assert!(matches!(err, RuntimeError::PathNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn runtime_wait_times_out_for_long_runner() {
    let runtime = MemoryContainerRuntime::new();
    runtime.script(
        "slow",
        ContainerScript::default().running_for(Duration::from_secs(120)),
    );
    let handle = runtime
        .run_container(&owner(), &ContainerSpec::new("slow", "labs/bot"))
        .await
        .unwrap();

    let err = handle.wait(Duration::from_secs(25)).await.unwrap_err();
    assert!(matches!(err, RuntimeError::WaitTimeout { timeout_ms: 25_000, .. }));
}

#[tokio::test(start_paused = true)]
async fn runtime_hanging_wait_ignores_its_timeout() {
    let runtime = MemoryContainerRuntime::new();
    runtime.script("stuck", ContainerScript::default().hanging_wait());
    let handle = runtime
        .run_container(&owner(), &ContainerSpec::new("stuck", "labs/bot"))
        .await
        .unwrap();

    let outer = tokio::time::timeout(
        Duration::from_secs(600),
        handle.wait(Duration::from_secs(1)),
    )
    .await;
    assert!(outer.is_err());
}

#[tokio::test]
async fn runtime_scripted_start_failure() {
    let runtime = MemoryContainerRuntime::new();
    runtime.script("broken", ContainerScript::default().failing_start());

    let result = runtime
        .run_container(&owner(), &ContainerSpec::new("broken", "labs/bot"))
        .await;

    assert!(matches!(result, Err(RuntimeError::StartFailed { .. })));
    assert!(runtime.started().is_empty());
}

#[tokio::test]
async fn runtime_delete_is_tracked_once() {
    let runtime = MemoryContainerRuntime::new();
    let handle = runtime
        .run_container(&owner(), &ContainerSpec::new("bot", "labs/bot"))
        .await
        .unwrap();

    handle.delete(true).await.unwrap();
    let second = handle.delete(true).await;

    assert!(matches!(second, Err(RuntimeError::ContainerGone(_))));
    assert_eq!(runtime.deleted(), vec!["bot".to_string()]);
}

// ===========================================================================
// LabLocks contract tests
// ===========================================================================

#[tokio::test]
async fn locks_second_acquire_fails_until_release() {
    let locks = MemoryLabLocks::new();

    assert!(locks.try_acquire(&owner()).await.unwrap());
    assert!(!locks.try_acquire(&owner()).await.unwrap());

    locks.release(&owner()).await.unwrap();
    assert!(locks.try_acquire(&owner()).await.unwrap());
}

#[tokio::test]
async fn locks_are_scoped_per_topic() {
    let locks = MemoryLabLocks::new();

    assert!(locks.try_acquire(&LabOwner::new(1, "dns")).await.unwrap());
    assert!(locks.try_acquire(&LabOwner::new(1, "dhcp")).await.unwrap());
    assert!(locks.try_acquire(&LabOwner::new(2, "dns")).await.unwrap());
}

// ===========================================================================
// AttemptLedger contract tests
// ===========================================================================

#[tokio::test]
async fn ledger_attempts_newest_first_and_scoped() {
    let ledger = MemoryAttemptLedger::new();
    ledger
        .record_attempt(NewAttempt::correct(&owner(), "setup"))
        .await
        .unwrap();
    ledger
        .record_attempt(NewAttempt::correct(&LabOwner::new(42, "dns"), "ip"))
        .await
        .unwrap();
    ledger
        .record_attempt(NewAttempt::correct(&owner(), "udp_ports"))
        .await
        .unwrap();

    let attempts = ledger.attempts(&owner()).await.unwrap();
    let tasks: Vec<_> = attempts.iter().map(|a| a.task.as_str()).collect();
    assert_eq!(tasks, vec!["udp_ports", "setup"]);
}

#[tokio::test]
async fn ledger_reset_only_touches_correct_attempts_of_owner() {
    let ledger = MemoryAttemptLedger::new();
    ledger
        .record_attempt(NewAttempt::correct(&owner(), "setup"))
        .await
        .unwrap();
    ledger
        .record_attempt(NewAttempt {
            is_correct: false,
            ..NewAttempt::correct(&owner(), "mtu")
        })
        .await
        .unwrap();
    ledger
        .record_attempt(NewAttempt::correct(&LabOwner::new(42, "dns"), "ip"))
        .await
        .unwrap();

    assert_eq!(ledger.reset_correct(&owner()).await.unwrap(), 1);
    assert!(ledger
        .attempts(&owner())
        .await
        .unwrap()
        .iter()
        .all(|a| !a.is_correct));
    assert!(ledger.attempts(&LabOwner::new(42, "dns")).await.unwrap()[0].is_correct);
}

// ===========================================================================
// CheckLogStore contract tests
// ===========================================================================

#[tokio::test]
async fn logs_latest_keeps_newest_per_check() {
    let store = MemoryCheckLogStore::new();
    for (check, text) in [("setup", "first"), ("udp_ports", "udp"), ("setup", "second")] {
        store
            .append_log(CheckLog {
                subject_id: 42,
                topic: "firewall".into(),
                check: check.into(),
                text: text.into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let latest = store.latest_logs(&owner()).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest["setup"].text, "second");
    assert_eq!(latest["udp_ports"].text, "udp");
}
