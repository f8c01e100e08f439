//! IP basics: static addressing, link-local and IPv6 pings, MTU discovery.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use netlab_runtime::ContainerSpec;

use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::config::LabConfig;
use crate::deploy::{lab_deployment, with_socket};
use crate::domain::Result;
use crate::matcher::AnswerMatcher;
use crate::rng::{RandomSource, SeededRng};
use crate::sampler::{
    sample_distinct, sample_host, sample_identifier, sample_subnet, AddressSpace, MacAddress,
};

pub const PING_IMAGE: &str = "ct-itmo/labs-networking-ping";

const TASKS: &[TopicTask] = &[
    TopicTask::new("netcalc", "Local networks", 1.0),
    TopicTask::new("ping4", "Ping!", 1.0),
    TopicTask::new("mac4", "MAC address", 2.0),
    TopicTask::new("ping_ll", "Link-local", 2.0),
    TopicTask::new("ping6", "IPv6 ping", 1.0),
    TopicTask::new("mac6", "MAC address (v6)", 1.0),
    TopicTask::new("mtu", "MTU", 3.0),
];

/// `192.168.77.5/24` and `192.168.77.6/29` share a network;
/// `172.19.21.5/23` and `172.19.20.199/24` do not.
const NETCALC_ANSWERS: [bool; 2] = [true, false];

const CAPABILITIES: &[Capability] = &[Capability::Deployable, Capability::AnswerCheckable];

/// Sampled values of the IP topic, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpParams {
    pub ll_mac: MacAddress,
    pub ip4_net: AddressSpace,
    pub ip4_client: IpAddr,
    pub ip4_server: IpAddr,
    pub ip6_net: AddressSpace,
    pub ip6_client: IpAddr,
    pub ip6_server: IpAddr,
    pub mtu: i64,
    pub mac4: MacAddress,
    pub mac6: MacAddress,
}

impl IpParams {
    pub fn generate(config: &LabConfig, subject_id: i64) -> Self {
        Self::draw(&mut SeededRng::new(&config.seed_key(subject_id, None)))
    }

    pub fn draw<R: RandomSource>(rng: &mut R) -> Self {
        let ll_mac = sample_identifier(rng);

        let ip4_net = sample_subnet(rng, &AddressSpace::v4([10, 0, 0, 0].into(), 8), 24);
        let [ip4_client, ip4_server] = sample_distinct(|| sample_host(rng, &ip4_net, false));

        let ip6_net = sample_subnet(rng, &AddressSpace::v6((0xfd33u128 << 112).into(), 16), 64);
        let [ip6_client, ip6_server] = sample_distinct(|| sample_host(rng, &ip6_net, false));

        let mtu = rng.randint(1000, 1100);
        let mac4 = sample_identifier(rng);
        let mac6 = sample_identifier(rng);

        Self {
            ll_mac,
            ip4_net,
            ip4_client,
            ip4_server,
            ip6_net,
            ip6_client,
            ip6_server,
            mtu,
            mac4,
            mac6,
        }
    }
}

/// The "IP basics" topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpTopic;

impl LabTopic for IpTopic {
    fn slug(&self) -> &'static str {
        "ip"
    }

    fn title(&self) -> &'static str {
        "The IP protocol"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2024, 4, 5, 21)
    }

    fn tasks(&self) -> &'static [TopicTask] {
        TASKS
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn build_variant(&self, config: &LabConfig, subject_id: i64) -> Result<Variant> {
        let p = IpParams::generate(config, subject_id);

        let ping4 = ContainerSpec::new("ping4", PING_IMAGE)
            .network("internal", p.mac4)
            .env("BOX_IP", p.ip4_server)
            .env("STUDENT_IP", p.ip4_client)
            .env("CHAPTER", "ip")
            .env("TASK", "ping4");
        let ping_ll = ContainerSpec::new("ping-ll", PING_IMAGE)
            .network("internal", p.ll_mac)
            .env("STUDENT_IP", "any")
            .env("CHAPTER", "ip")
            .env("TASK", "ping_ll");
        let ping6 = ContainerSpec::new("ping6", PING_IMAGE)
            .network("internal", p.mac6)
            .env("BOX_IP", p.ip6_server)
            .env("STUDENT_IP", p.ip6_client)
            .env("MTU", p.mtu)
            .env("CHAPTER", "ip")
            .env("TASK", "ping6");

        let deployment = lab_deployment(
            config,
            subject_id,
            &["internal"],
            vec![
                with_socket(config, ping4),
                with_socket(config, ping_ll),
                with_socket(config, ping6),
            ],
        );

        Ok(Variant::new(self.slug(), subject_id)
            .fact("ll_mac", p.ll_mac)
            .fact("ip4_client", p.ip4_client)
            .fact("ip4_server", p.ip4_server)
            .fact("ip6_client", p.ip6_client)
            .fact("ip6_server", p.ip6_server)
            .with_deployment(deployment)
            .with_matchers(vec![
                AnswerMatcher::booleans("netcalc", &NETCALC_ANSWERS),
                AnswerMatcher::mac("mac4", &p.mac4),
                AnswerMatcher::mac("mac6", &p.mac6),
                AnswerMatcher::exact("mtu", p.mtu),
            ]))
    }
}
