//! DHCP client: DHCPv4, SLAAC, DHCPv6 and DNS discovery against a dnsmasq
//! server.

use std::net::{IpAddr, Ipv6Addr};

use chrono::{DateTime, Utc};
use netlab_runtime::ContainerSpec;

use super::words::{ADJECTIVES, NOUNS, ZONES};
use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::config::LabConfig;
use crate::deploy::{lab_deployment, with_socket};
use crate::domain::Result;
use crate::matcher::AnswerMatcher;
use crate::rng::{RandomSource, SeededRng};
use crate::sampler::{
    sample_host, sample_identifier, sample_subnet, sample_token, sample_word_domain,
    AddressSpace, MacAddress, LOWER_ALNUM,
};
use crate::topics::ip::PING_IMAGE;

const TASKS: &[TopicTask] = &[
    TopicTask::new("ip4", "Obtain an IPv4 address", 1.0),
    TopicTask::new("net", "Network address and mask", 1.0),
    TopicTask::new("domain", "Network domain", 2.0),
    TopicTask::new("slaac", "Obtain a SLAAC address", 1.0),
    TopicTask::new("ip6", "Obtain an address over DHCPv6", 1.0),
    TopicTask::new("dns", "Site address", 1.0),
    TopicTask::new("web", "The button", 2.0),
];

const CAPABILITIES: &[Capability] = &[Capability::Deployable, Capability::AnswerCheckable];

const HTTP_PORT: u16 = 9229;

/// Sampled values of the DHCP topic, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpParams {
    pub ip4_net: AddressSpace,
    pub slaac_net: AddressSpace,
    pub dhcp6_net: AddressSpace,
    pub dnsmasq_mac: MacAddress,
    pub ping_mac: MacAddress,
    pub http_mac: MacAddress,
    pub dns_ip: IpAddr,
    /// SLAAC address of the HTTP server.
    pub http_ip: Ipv6Addr,
    /// Lease handed out over DHCPv4, inside the lower half of `ip4_net`.
    pub client_ip4: IpAddr,
    /// Interface identifier the student's SLAAC address must end with.
    pub slaac_suffix: Ipv6Addr,
    pub http_domain: String,
    /// Search domain announced by dnsmasq.
    pub random_domain: String,
    /// Lease handed out over DHCPv6.
    pub dhcp6_ip: IpAddr,
}

impl DhcpParams {
    pub fn generate(config: &LabConfig, subject_id: i64) -> Self {
        Self::draw(&mut SeededRng::new(&config.seed_key(subject_id, None)))
    }

    pub fn draw<R: RandomSource>(rng: &mut R) -> Self {
        let ip4_net = sample_subnet(rng, &AddressSpace::v4([10, 0, 0, 0].into(), 8), 24);
        let slaac_net = sample_subnet(rng, &AddressSpace::v6((0xfdcau128 << 112).into(), 16), 64);
        let dhcp6_net = sample_subnet(rng, &AddressSpace::v6((0xfdcdu128 << 112).into(), 16), 64);

        let dnsmasq_mac = sample_identifier(rng);
        let ping_mac = sample_identifier(rng);
        let http_mac = sample_identifier(rng);

        let dns_ip = sample_host(rng, &dhcp6_net, false);
        let http_ip = http_mac.eui64_ipv6(slaac_net.first());
        let client_ip4 = sample_host(rng, &ip4_net.first_subnet(25), false);

        let slaac_suffix = ping_mac.eui64_ipv6(0);
        let http_domain = sample_token(rng, LOWER_ALNUM, 24);
        let random_domain = sample_word_domain(rng, ADJECTIVES, NOUNS, ZONES);

        let dhcp6_ip = sample_host(rng, &dhcp6_net, false);

        Self {
            ip4_net,
            slaac_net,
            dhcp6_net,
            dnsmasq_mac,
            ping_mac,
            http_mac,
            dns_ip,
            http_ip,
            client_ip4,
            slaac_suffix,
            http_domain,
            random_domain,
            dhcp6_ip,
        }
    }
}

/// The "DHCP client" topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct DhcpTopic;

impl LabTopic for DhcpTopic {
    fn slug(&self) -> &'static str {
        "dhcp"
    }

    fn title(&self) -> &'static str {
        "DHCP client"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2025, 4, 30, 21)
    }

    fn tasks(&self) -> &'static [TopicTask] {
        TASKS
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn build_variant(&self, config: &LabConfig, subject_id: i64) -> Result<Variant> {
        let p = DhcpParams::generate(config, subject_id);

        let dnsmasq = ContainerSpec::new("dnsmasq", "ct-itmo/labs-networking-dhcp-dnsmasq")
            .network("internal", p.dnsmasq_mac)
            .env("ADDRESS4", p.ip4_net.offset(254))
            .env("ADDRESS6_1", p.dnsmasq_mac.eui64_ipv6(p.slaac_net.first()))
            .env("ADDRESS6_2", p.dhcp6_net.offset(0xffff))
            .env("DHCP4", p.client_ip4)
            .env("DHCP6", p.dhcp6_ip)
            .env("DNS6", p.dns_ip)
            .env("DOMAIN", &p.random_domain)
            .env("SLAAC", p.slaac_net.network());
        let nsd = ContainerSpec::new("nsd", "ct-itmo/labs-networking-dhcp-nsd")
            .network_any("internal")
            .env("HOSTIP", p.dns_ip)
            .env("DOMAIN", &p.http_domain)
            .env("AAAAIP", p.http_ip)
            .mem_limit(200 * 1024 * 1024)
            .without_ipv6_forwarding();
        let ping = ContainerSpec::new("ping", PING_IMAGE)
            .network("internal", p.ping_mac)
            .env("STUDENT_IP", "any")
            .env("CHAPTER", "dhcp")
            .env("TASK", "slaac")
            .without_ipv6_forwarding();
        let http = ContainerSpec::new("http", "ct-itmo/labs-networking-dhcp-http")
            .network("internal", p.http_mac)
            .env("BIND", format!("[{}]:{HTTP_PORT}", p.http_ip))
            .env("HOST", format!("{}.localnetwork:{HTTP_PORT}", p.http_domain))
            .without_ipv6_forwarding();

        let deployment = lab_deployment(
            config,
            subject_id,
            &["internal"],
            vec![
                with_socket(config, dnsmasq),
                nsd,
                with_socket(config, ping),
                with_socket(config, http),
            ],
        );

        Ok(Variant::new(self.slug(), subject_id)
            .fact("slaac_suffix", p.slaac_suffix)
            .fact("http_domain", &p.http_domain)
            .with_deployment(deployment)
            .with_matchers(vec![
                AnswerMatcher::exact("net", format!("{}/24", p.client_ip4)),
                AnswerMatcher::exact("dns", p.http_ip),
                AnswerMatcher::domain("domain", &p.random_domain),
            ]))
    }
}
