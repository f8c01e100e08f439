//! Firewall: the student's box routes and filters between networks A and B.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use netlab_runtime::ContainerSpec;

use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::check::{CheckDefinition, ResultFilePredicate, UdpPortsPredicate};
use crate::config::LabConfig;
use crate::deploy::{lab_deployment, with_socket};
use crate::domain::Result;
use crate::matcher::AnswerMatcher;
use crate::rng::{RandomSource, SeededRng};
use crate::sampler::{
    sample_distinct, sample_host, sample_identifier, sample_subnet, AddressSpace, MacAddress,
};

const TASKS: &[TopicTask] = &[
    TopicTask::new("setup", "A device in two networks", 1.0),
    TopicTask::new("forward_a_to_b", "Forwarding from A to B", 1.0),
    TopicTask::new("forward_b_to_a", "Forwarding from B to A", 1.0),
    TopicTask::new("tcp_unidirectional", "TCP from A to B only", 1.0),
    TopicTask::new("udp_ports", "Restricting UDP", 1.0),
    TopicTask::new("tcp_body_filter", "Content filter", 1.0),
    TopicTask::new("forward_nat", "Forwarding with NAT", 1.0),
    TopicTask::new("mac4", "MAC address", 2.0),
    TopicTask::new("ping_ll", "Link-local", 2.0),
    TopicTask::new("ping6", "IPv6 ping", 1.0),
    TopicTask::new("mac6", "MAC address (v6)", 1.0),
    TopicTask::new("mtu", "MTU", 3.0),
];

const CAPABILITIES: &[Capability] = &[
    Capability::Deployable,
    Capability::AnswerCheckable,
    Capability::ContainerCheckable,
];

/// Words the body filter must block one of.
pub const BAD_WORD_NOUNS: &[&str] = &[
    "solutions", "task", "solver", "results", "scores", "author", "checker",
];

const CLIENT_IMAGE: &str = "ct-itmo/labs-networking-firewall-client";
const CHECKER_IMAGE: &str = "ct-itmo/labs-networking-firewall-checker";
const SLEEPING_CHECKER_IMAGE: &str = "ct-itmo/labs-networking-firewall-checker-sleep";
const CHECK_LOG: &str = "/out/check.log";

/// UDP port every client listens on and that is always allowed.
pub const UDP_PORT: u64 = 3001;
/// TCP port of the clients.
pub const TCP_PORT: u64 = 3002;

/// `ip:port` pairs joined with commas.
pub fn addresses_list(addresses: &[(IpAddr, u64)]) -> String {
    addresses
        .iter()
        .map(|(ip, port)| format!("{ip}:{port}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Sampled values of the firewall topic, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallParams {
    pub a_net: AddressSpace,
    pub b_net: AddressSpace,
    pub a_firewall: IpAddr,
    pub a_client: IpAddr,
    pub a_free: IpAddr,
    pub a_checker: IpAddr,
    pub b_firewall: IpAddr,
    pub b_client: IpAddr,
    pub b_free: IpAddr,
    pub b_checker: IpAddr,
    pub b_client2: IpAddr,
    /// Ten distinct ports; the first is allowed, the other nine denied.
    pub udp_ports: [u64; 10],
    pub mtu: i64,
    pub mac_a_client: MacAddress,
    pub mac_b_client: MacAddress,
    pub mac_a_checker: MacAddress,
    pub mac_b_checker: MacAddress,
    pub mac_b_client2: MacAddress,
    pub ll_mac: MacAddress,
    pub mac4: MacAddress,
    pub mac6: MacAddress,
    pub tcp_bad_word: String,
}

impl FirewallParams {
    pub fn generate(config: &LabConfig, subject_id: i64) -> Self {
        Self::draw(&mut SeededRng::new(&config.seed_key(subject_id, None)))
    }

    pub fn draw<R: RandomSource>(rng: &mut R) -> Self {
        let a_net = sample_subnet(rng, &AddressSpace::v4([10, 0, 0, 0].into(), 9), 24);
        let b_net = sample_subnet(rng, &AddressSpace::v4([10, 128, 0, 0].into(), 9), 24);

        let a_firewall = a_net.gateway();
        let [a_client, a_free, a_checker] = sample_distinct(|| sample_host(rng, &a_net, true));

        let b_firewall = b_net.gateway();
        let [b_client, b_free, b_checker, b_client2] =
            sample_distinct(|| sample_host(rng, &b_net, true));

        let udp_ports = sample_distinct(|| rng.randint(2001, 3000) as u64);

        let mtu = rng.randint(1000, 1100);

        let [mac_a_client, mac_b_client, mac_a_checker, mac_b_checker, mac_b_client2] =
            sample_distinct(|| sample_identifier(rng));
        let ll_mac = sample_identifier(rng);
        let mac4 = sample_identifier(rng);
        let mac6 = sample_identifier(rng);

        let noun = *rng.choose(BAD_WORD_NOUNS);
        let tcp_bad_word = format!("{noun}-{}", rng.randint(1, 100));

        Self {
            a_net,
            b_net,
            a_firewall,
            a_client,
            a_free,
            a_checker,
            b_firewall,
            b_client,
            b_free,
            b_checker,
            b_client2,
            udp_ports,
            mtu,
            mac_a_client,
            mac_b_client,
            mac_a_checker,
            mac_b_checker,
            mac_b_client2,
            ll_mac,
            mac4,
            mac6,
            tcp_bad_word,
        }
    }

    /// The randomly chosen second UDP port that must stay open.
    pub fn allowed_udp_port(&self) -> u64 {
        self.udp_ports[0]
    }
}

fn checker(name: &str, network: &str, mac: MacAddress) -> ContainerSpec {
    ContainerSpec::new(name, CHECKER_IMAGE)
        .network(network, mac)
        .without_ipv6_forwarding()
}

fn pair(first: IpAddr, second: IpAddr) -> String {
    format!("{first},{second}")
}

fn deployment_containers(config: &LabConfig, p: &FirewallParams) -> Vec<ContainerSpec> {
    let client_a = ContainerSpec::new("client-a", CLIENT_IMAGE)
        .network("internalA", p.mac_a_client)
        .env("BOX_IP", p.a_client)
        .env("BOX_GATEWAY", p.a_firewall);
    let client_b = ContainerSpec::new("client-b", CLIENT_IMAGE)
        .network("internalB", p.mac_b_client)
        .env("BOX_IP", p.b_client)
        .env("BOX_GATEWAY", p.b_firewall);
    let test_a = ContainerSpec::new("test-a", SLEEPING_CHECKER_IMAGE)
        .network("internalA", p.mac4)
        .env("BOX_IP", p.a_free)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("PING_VALID_IPS", pair(p.b_firewall, p.b_client))
        .env("CLIENT_CONNECTION_IP", p.b_client)
        .env("STUDENT_IP", "any")
        .env("CHAPTER", "firewall")
        .env("TASK", "forward_a_to_b")
        .env("CHECK_MODE", "forwarding");

    vec![
        with_socket(config, client_a),
        with_socket(config, client_b),
        with_socket(config, test_a),
    ]
}

fn setup_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let ping = checker("check-ping", "internalB", p.mac_b_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_IP2", p.b_checker)
        .env("BOX_NETWORK_NAME", "internalB")
        .env("PING_VALID_IPS", pair(p.b_firewall, p.b_client))
        .env("PING_INVALID_IPS", pair(p.a_firewall, p.a_client))
        .env("CHAPTER", "firewall")
        .env("TASK", "setup")
        .env("CHECK_MODE", "setup");
    CheckDefinition::new(vec![with_socket(config, ping)]).log(0, CHECK_LOG)
}

fn forward_a_to_b_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let forward = checker("check-forward-a-to-b", "internalA", p.mac_a_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("PING_VALID_IPS", pair(p.b_firewall, p.b_client))
        .env("UDP_VALID_ADDRESSES", addresses_list(&[(p.b_client, UDP_PORT)]))
        .env("TCP_VALID_ADDRESSES", addresses_list(&[(p.b_client, TCP_PORT)]))
        .env("CHAPTER", "firewall")
        .env("TASK", "forward_a_to_b")
        .env("CHECK_MODE", "forwarding");
    CheckDefinition::new(vec![with_socket(config, forward)]).log(0, CHECK_LOG)
}

fn forward_b_to_a_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let forward = checker("check-forward-b-to-a", "internalB", p.mac_b_checker)
        .env("BOX_IP", p.b_checker)
        .env("BOX_GATEWAY", p.b_firewall)
        .env("BOX_NETWORK_NAME", "internalB")
        .env("PING_VALID_IPS", pair(p.a_firewall, p.a_client))
        .env("UDP_VALID_ADDRESSES", addresses_list(&[(p.a_client, UDP_PORT)]))
        .env("CHAPTER", "firewall")
        .env("TASK", "forward_b_to_a")
        .env("CHECK_MODE", "forwarding");
    CheckDefinition::new(vec![with_socket(config, forward)]).log(0, CHECK_LOG)
}

fn tcp_unidirectional_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let both_udp = addresses_list(&[(p.a_client, UDP_PORT), (p.b_client, UDP_PORT)]);
    let a = checker("check-tcp-unidirectional-a", "internalA", p.mac_a_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("PING_VALID_IPS", pair(p.a_client, p.b_client))
        .env("UDP_VALID_ADDRESSES", &both_udp)
        .env(
            "TCP_VALID_ADDRESSES",
            addresses_list(&[(p.a_client, TCP_PORT), (p.b_client, TCP_PORT)]),
        )
        .env("CHECK_MODE", "tcp_unidirectional");
    let b = checker("check-tcp-unidirectional-b", "internalB", p.mac_b_checker)
        .env("BOX_IP", p.b_checker)
        .env("BOX_GATEWAY", p.b_firewall)
        .env("BOX_NETWORK_NAME", "internalB")
        .env("PING_VALID_IPS", pair(p.a_client, p.b_client))
        .env("UDP_VALID_ADDRESSES", &both_udp)
        .env("TCP_VALID_ADDRESSES", addresses_list(&[(p.b_client, TCP_PORT)]))
        .env("TCP_INVALID_ADDRESSES", addresses_list(&[(p.a_client, TCP_PORT)]))
        .env("CHECK_MODE", "tcp_unidirectional");
    CheckDefinition::new(vec![with_socket(config, a), with_socket(config, b)])
        .log(0, CHECK_LOG)
        .log(1, CHECK_LOG)
        .predicate(ResultFilePredicate::new("tcp_unidirectional"))
}

fn udp_ports_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let allowed = p.allowed_udp_port();
    let denied: Vec<_> = p.udp_ports[1..].iter().map(|&port| (p.b_client2, port)).collect();
    let listening: Vec<_> = p.udp_ports.iter().map(|&port| (p.b_client2, port)).collect();

    let a = checker("check-udp-ports-a", "internalA", p.mac_a_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("PING_VALID_IPS", p.b_client2)
        .env(
            "UDP_VALID_ADDRESSES",
            addresses_list(&[
                (p.b_client, UDP_PORT),
                (p.b_client2, UDP_PORT),
                (p.b_client2, allowed),
            ]),
        )
        .env("UDP_INVALID_ADDRESSES", addresses_list(&denied))
        .env("CHECK_MODE", "tcp_unidirectional")
        .env("STARTUP_TIMEOUT", "2");
    let b = checker("check-udp-ports-b", "internalB", p.mac_b_checker)
        .env("BOX_IP", p.b_checker)
        .env("BOX_GATEWAY", p.b_firewall)
        .env("BOX_NETWORK_NAME", "internalB")
        .env(
            "UDP_VALID_ADDRESSES",
            addresses_list(&[(p.a_client, UDP_PORT), (p.b_client, UDP_PORT)]),
        )
        .env("CHECK_MODE", "tcp_unidirectional");
    let client = ContainerSpec::new("check-udp-ports-b-client", CLIENT_IMAGE)
        .network("internalB", p.mac_b_client2)
        .without_ipv6_forwarding()
        .env("BOX_IP", p.b_client2)
        .env("BOX_GATEWAY", p.b_firewall)
        .env("TIMEOUT", "10s")
        .env("OTHER_UDP_SERVER", addresses_list(&listening))
        .env("HIDE_REQUEST_SOURCE", "true");

    CheckDefinition::new(vec![
        with_socket(config, a),
        with_socket(config, b),
        with_socket(config, client),
    ])
    .log(0, CHECK_LOG)
    .log(1, CHECK_LOG)
    .log(2, CHECK_LOG)
    .predicate(UdpPortsPredicate::new([UDP_PORT, allowed]))
}

fn tcp_body_filter_check(config: &LabConfig, p: &FirewallParams) -> CheckDefinition {
    let filter = checker("check-udp-ports-a", "internalA", p.mac_a_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("TCP_VALID_ADDRESSES", addresses_list(&[(p.b_client, TCP_PORT)]))
        .env("CHECK_MODE", "tcp_body_filter")
        .env("CHAPTER", "firewall")
        .env("TASK", "tcp_body_filter")
        .env("BAD_WORD", &p.tcp_bad_word);
    CheckDefinition::new(vec![with_socket(config, filter)]).log(0, CHECK_LOG)
}

fn forward_nat_check(p: &FirewallParams) -> CheckDefinition {
    let a = checker("check-forward-a-to-b", "internalA", p.mac_a_checker)
        .env("BOX_IP", p.a_checker)
        .env("BOX_GATEWAY", p.a_firewall)
        .env("BOX_NETWORK_NAME", "internalA")
        .env("NAT_IP", p.b_firewall)
        .env("UDP_VALID_ADDRESSES", addresses_list(&[(p.b_client, UDP_PORT)]))
        .env("TCP_VALID_ADDRESSES", addresses_list(&[(p.b_client, TCP_PORT)]))
        .env("CHECK_MODE", "forwarding_nat");
    let b = checker("check-forward-b-to-a", "internalB", p.mac_b_checker)
        .env("BOX_IP", p.b_checker)
        .env("BOX_GATEWAY", p.b_firewall)
        .env("BOX_NETWORK_NAME", "internalB")
        .env("NAT_IP", p.a_firewall)
        .env("UDP_VALID_ADDRESSES", addresses_list(&[(p.a_client, UDP_PORT)]))
        .env("CHECK_MODE", "forwarding_nat");
    CheckDefinition::new(vec![a, b])
        .log(0, CHECK_LOG)
        .log(1, CHECK_LOG)
        .predicate(ResultFilePredicate::new("forward_nat"))
}

/// The "Firewall" topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallTopic;

impl LabTopic for FirewallTopic {
    fn slug(&self) -> &'static str {
        "firewall"
    }

    fn title(&self) -> &'static str {
        "Firewall"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2023, 6, 5, 21)
    }

    fn tasks(&self) -> &'static [TopicTask] {
        TASKS
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn build_variant(&self, config: &LabConfig, subject_id: i64) -> Result<Variant> {
        let p = FirewallParams::generate(config, subject_id);

        Ok(Variant::new(self.slug(), subject_id)
            .fact("a_net", p.a_net)
            .fact("b_net", p.b_net)
            .fact("a_firewall", p.a_firewall)
            .fact("b_firewall", p.b_firewall)
            .fact("a_client", p.a_client)
            .fact("b_client", p.b_client)
            .fact("b_client2", p.b_client2)
            .fact("allowed_udp_port", p.allowed_udp_port())
            .fact("ll_mac", p.ll_mac)
            .fact("tcp_bad_word", &p.tcp_bad_word)
            .with_deployment(lab_deployment(
                config,
                subject_id,
                &["internalA", "internalB"],
                deployment_containers(config, &p),
            ))
            .with_matchers(vec![
                AnswerMatcher::mac("mac4", &p.mac4),
                AnswerMatcher::mac("mac6", &p.mac6),
                AnswerMatcher::exact("mtu", p.mtu),
            ])
            .with_check("setup", setup_check(config, &p))
            .with_check("forward_a_to_b", forward_a_to_b_check(config, &p))
            .with_check("forward_b_to_a", forward_b_to_a_check(config, &p))
            .with_check("tcp_unidirectional", tcp_unidirectional_check(config, &p))
            .with_check("udp_ports", udp_ports_check(config, &p))
            .with_check("tcp_body_filter", tcp_body_filter_check(config, &p))
            .with_check("forward_nat", forward_nat_check(&p)))
    }
}
