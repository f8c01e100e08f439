//! Check execution against the in-memory container runtime.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netlab_core::check::{
    CheckContext, CheckDefinition, CheckPredicate, CheckRunner, DhcpdLeasePredicate,
    ResultFilePredicate, UdpPortsPredicate,
};
use netlab_core::sampler::AddressSpace;
use netlab_core::{NetlabError, Result};
use netlab_runtime::contracts::AttemptLedger;
use netlab_runtime::fakes::{
    ContainerScript, MemoryAttemptLedger, MemoryCheckLogStore, MemoryContainerRuntime,
};
use netlab_runtime::{ArchiveEntry, ContainerSpec, FileArchive, LabOwner};

struct Harness {
    runtime: MemoryContainerRuntime,
    ledger: Arc<MemoryAttemptLedger>,
    logs: Arc<MemoryCheckLogStore>,
    runner: CheckRunner,
}

fn harness() -> Harness {
    let runtime = MemoryContainerRuntime::new();
    let ledger = Arc::new(MemoryAttemptLedger::new());
    let logs = Arc::new(MemoryCheckLogStore::new());
    let runner = CheckRunner::new(
        Arc::new(runtime.clone()),
        ledger.clone(),
        logs.clone(),
        Duration::from_secs(25),
    );
    Harness {
        runtime,
        ledger,
        logs,
        runner,
    }
}

fn owner() -> LabOwner {
    LabOwner::new(42, "firewall")
}

fn spec(name: &str) -> ContainerSpec {
    ContainerSpec::new(name, "labs/checker")
}

fn ok_result() -> FileArchive {
    FileArchive::single("result", "OK\n")
}

async fn correct_tasks(ledger: &MemoryAttemptLedger) -> Vec<String> {
    let mut tasks: Vec<_> = ledger
        .attempts(&owner())
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.is_correct)
        .map(|a| a.task)
        .collect();
    tasks.sort();
    tasks
}

// ===========================================================================
// Logs
// ===========================================================================

#[tokio::test]
async fn logs_are_joined_in_index_order_and_stored() {
    let h = harness();
    h.runtime.script(
        "a",
        ContainerScript::default().with_file("/out/a.log", FileArchive::single("a.log", "alpha\n")),
    );
    h.runtime.script(
        "b",
        ContainerScript::default().with_file("/out/b.log", FileArchive::single("b.log", "beta")),
    );
    let definition = CheckDefinition::new(vec![spec("a"), spec("b")])
        .log(1, "/out/b.log")
        .log(0, "/out/a.log");

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert_eq!(report.log.text, "alpha\nbeta");
    assert!(report.timed_out.is_empty());
    let stored = h.logs.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].check, "setup");
    assert_eq!(stored[0].text, "alpha\nbeta");
}

fn bracketed(logs: &BTreeMap<usize, String>) -> String {
    logs.iter().map(|(i, text)| format!("[{i}] {text}")).collect::<Vec<_>>().join(" | ")
}

#[tokio::test]
async fn custom_joiner_sees_every_requested_index() {
    let h = harness();
    h.runtime.script(
        "a",
        ContainerScript::default().with_file("/out/a.log", FileArchive::single("a.log", "up")),
    );
    // "b" has no log file: its slot is still passed to the joiner, empty.
    let definition = CheckDefinition::new(vec![spec("a"), spec("b")])
        .log(0, "/out/a.log")
        .log(1, "/out/missing.log")
        .joiner(bracketed);

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert_eq!(report.log.text, "[0] up | [1] ");
}

#[tokio::test]
async fn undecodable_members_are_marked() {
    let h = harness();
    let archive = FileArchive {
        entries: vec![
            ArchiveEntry {
                name: "good.txt".into(),
                data: Some(b"fine".to_vec()),
            },
            ArchiveEntry {
                name: "blob.bin".into(),
                data: Some(vec![0xff, 0xfe, 0x00]),
            },
        ],
    };
    h.runtime
        .script("a", ContainerScript::default().with_file("/out", archive));
    let definition = CheckDefinition::new(vec![spec("a")]).log(0, "/out");

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert_eq!(report.log.text, "fine\n\nFile blob.bin cannot be decoded");
}

// ===========================================================================
// Lifecycle
// ===========================================================================

#[tokio::test(start_paused = true)]
async fn wait_timeout_does_not_abort_the_check() {
    let h = harness();
    h.runtime.script(
        "slow",
        ContainerScript::default()
            .running_for(Duration::from_secs(300))
            .with_file("/out/result", ok_result()),
    );
    h.runtime.script(
        "fast",
        ContainerScript::default().with_file("/out/result", ok_result()),
    );
    let definition = CheckDefinition::new(vec![spec("fast"), spec("slow")])
        .predicate(ResultFilePredicate::new("setup"));

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert_eq!(report.timed_out, vec!["slow".to_string()]);
    assert_eq!(correct_tasks(&h.ledger).await, vec!["setup"]);
    assert_eq!(h.runtime.deleted(), vec!["fast".to_string(), "slow".to_string()]);
    assert_eq!(h.logs.all().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn runner_bounds_waits_the_runtime_never_ends() {
    let h = harness();
    h.runtime.script(
        "stuck",
        ContainerScript::default()
            .hanging_wait()
            .with_file("/out/check.log", FileArchive::single("check.log", "partial")),
    );
    let definition =
        CheckDefinition::new(vec![spec("fast"), spec("stuck")]).log(1, "/out/check.log");

    let report = tokio::time::timeout(
        Duration::from_secs(3600),
        h.runner.run(&owner(), "setup", &definition),
    )
    .await
    .expect("check must finish once its own timeout elapses")
    .unwrap();

    assert_eq!(report.timed_out, vec!["stuck".to_string()]);
    assert_eq!(report.log.text, "partial");
    assert_eq!(h.runtime.deleted(), vec!["fast".to_string(), "stuck".to_string()]);
}

#[tokio::test]
async fn start_failure_deletes_started_containers() {
    let h = harness();
    h.runtime.script("broken", ContainerScript::default().failing_start());
    let definition = CheckDefinition::new(vec![spec("first"), spec("broken"), spec("never")]);

    let err = h.runner.run(&owner(), "setup", &definition).await.unwrap_err();

    assert!(matches!(err, NetlabError::Runtime(_)));
    assert_eq!(h.runtime.started(), vec!["first".to_string()]);
    assert_eq!(h.runtime.deleted(), vec!["first".to_string()]);
    assert!(h.logs.all().is_empty());
}

struct Failing;

#[async_trait]
impl CheckPredicate for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn evaluate(&self, _ctx: &CheckContext<'_>) -> Result<()> {
        Err(NetlabError::Config("checker output malformed".into()))
    }
}

struct Panicking;

#[async_trait]
impl CheckPredicate for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn evaluate(&self, _ctx: &CheckContext<'_>) -> Result<()> {
        panic!("boom");
    }
}

#[tokio::test]
async fn predicate_error_still_tears_down() {
    let h = harness();
    let definition = CheckDefinition::new(vec![spec("a"), spec("b")]).predicate(Failing);

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert!(report
        .predicate_error
        .as_deref()
        .is_some_and(|e| e.contains("malformed")));
    assert_eq!(h.runtime.deleted().len(), 2);
    assert_eq!(h.logs.all().len(), 1);
}

#[tokio::test]
async fn predicate_panic_still_tears_down() {
    let h = harness();
    let definition = CheckDefinition::new(vec![spec("a")]).predicate(Panicking);

    let report = h.runner.run(&owner(), "setup", &definition).await.unwrap();

    assert!(report.predicate_error.is_some());
    assert_eq!(h.runtime.deleted(), vec!["a".to_string()]);
}

// ===========================================================================
// Predicates
// ===========================================================================

#[tokio::test]
async fn dhcpd_leases_credit_each_family_once() {
    let h = harness();
    h.runtime.script(
        "bot",
        ContainerScript::default().with_file(
            "/out/addresses",
            FileArchive::single(
                "addresses",
                "10.20.30.5/24\n10.20.30.6/24\nfd12:3456::9/64\ngarbage 192.168.0.1/24\n",
            ),
        ),
    );
    let definition = CheckDefinition::new(vec![spec("bot")]).predicate(DhcpdLeasePredicate {
        ip4_net: AddressSpace::parse("10.20.30.0/24").unwrap(),
        ip6_net: AddressSpace::parse("fd12:3456::/64").unwrap(),
    });

    h.runner.run(&owner(), "dhcpd", &definition).await.unwrap();

    assert_eq!(correct_tasks(&h.ledger).await, vec!["ip4", "ip6"]);
}

#[tokio::test]
async fn dhcpd_leases_ignore_wrong_networks() {
    let h = harness();
    h.runtime.script(
        "bot",
        ContainerScript::default().with_file(
            "/out/addresses",
            FileArchive::single("addresses", "10.20.31.5/24\nfd12:3456:0:1::9/64"),
        ),
    );
    let definition = CheckDefinition::new(vec![spec("bot")]).predicate(DhcpdLeasePredicate {
        ip4_net: AddressSpace::parse("10.20.30.0/24").unwrap(),
        ip6_net: AddressSpace::parse("fd12:3456::/64").unwrap(),
    });

    h.runner.run(&owner(), "dhcpd", &definition).await.unwrap();

    assert!(correct_tasks(&h.ledger).await.is_empty());
}

#[tokio::test]
async fn result_file_needs_every_container_ok() {
    let h = harness();
    h.runtime
        .script("a", ContainerScript::default().with_file("/out/result", ok_result()));
    h.runtime.script(
        "b",
        ContainerScript::default().with_file("/out/result", FileArchive::single("result", "FAIL")),
    );
    h.runtime
        .script("c", ContainerScript::default().with_file("/out/result", ok_result()));

    let failing = CheckDefinition::new(vec![spec("a"), spec("b")])
        .predicate(ResultFilePredicate::new("forward_a_to_b"));
    h.runner.run(&owner(), "forward_a_to_b", &failing).await.unwrap();
    assert!(correct_tasks(&h.ledger).await.is_empty());

    let passing = CheckDefinition::new(vec![spec("a"), spec("c")])
        .predicate(ResultFilePredicate::new("forward_a_to_b"));
    h.runner.run(&owner(), "forward_a_to_b", &passing).await.unwrap();
    assert_eq!(correct_tasks(&h.ledger).await, vec!["forward_a_to_b"]);
}

fn udp_harness(client_log: &str) -> Harness {
    let h = harness();
    for name in ["check-a", "check-b"] {
        h.runtime
            .script(name, ContainerScript::default().with_file("/out/result", ok_result()));
    }
    h.runtime.script(
        "client",
        ContainerScript::default()
            .with_file("/out/check.log", FileArchive::single("check.log", client_log)),
    );
    h
}

fn udp_definition() -> CheckDefinition {
    CheckDefinition::new(vec![spec("check-a"), spec("check-b"), spec("client")])
        .predicate(UdpPortsPredicate::new([3001, 40123]))
}

#[tokio::test]
async fn udp_ports_clean_log_is_credited() {
    let h = udp_harness("listening\n[UDP 10.0.2.7:40123] hello\n[UDP 10.0.1.3:3001] hi\n");

    h.runner.run(&owner(), "udp_ports", &udp_definition()).await.unwrap();

    assert_eq!(correct_tasks(&h.ledger).await, vec!["udp_ports"]);
}

#[tokio::test]
async fn udp_ports_leak_is_not_credited() {
    let h = udp_harness("[UDP 10.0.2.7:40123] hello\n[UDP 10.0.2.7:50000] leaked\n");

    h.runner.run(&owner(), "udp_ports", &udp_definition()).await.unwrap();

    assert!(correct_tasks(&h.ledger).await.is_empty());
}

#[tokio::test]
async fn udp_ports_needs_both_checkers() {
    let h = udp_harness("[UDP 10.0.2.7:40123] hello\n");
    h.runtime.script(
        "check-b",
        ContainerScript::default().with_file("/out/result", FileArchive::single("result", "FAIL")),
    );

    h.runner.run(&owner(), "udp_ports", &udp_definition()).await.unwrap();

    assert!(correct_tasks(&h.ledger).await.is_empty());
}
