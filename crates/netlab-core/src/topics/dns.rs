//! DNS: the student serves a zone delegating to two generated web servers.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use netlab_runtime::ContainerSpec;

use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::check::CheckDefinition;
use crate::config::LabConfig;
use crate::deploy::{lab_deployment, with_socket};
use crate::domain::Result;
use crate::matcher::AnswerMatcher;
use crate::rng::{RandomSource, SeededRng};
use crate::sampler::{sample_distinct, sample_host, sample_token, AddressSpace, LOWER_ALNUM};

const TASKS: &[TopicTask] = &[
    TopicTask::new("ip", "IP address", 1.0),
    TopicTask::new("servers", "List of servers", 2.0),
    TopicTask::new("recursive", "Recursive server", 2.0),
    TopicTask::new("authoritative", "Authoritative server", 2.0),
    TopicTask::new("mail", "Mail", 1.0),
    TopicTask::new("subdomain", "Subdomain", 2.0),
    TopicTask::new("transfer", "Zone transfer", 2.0),
];

const CAPABILITIES: &[Capability] = &[
    Capability::Deployable,
    Capability::AnswerCheckable,
    Capability::ContainerCheckable,
];

pub const SEED_SUFFIX: &str = "dns";

const NGINX_IMAGE: &str = "ct-itmo/labs-networking-nginx";
const BOT_BOX_IP: &str = "10.52.1.2";

/// Sampled values of the DNS topic, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsParams {
    /// `<token>.localnetwork`.
    pub domain: String,
    /// Label of the subdomain, without the parent domain.
    pub subdomain: String,
    pub ip4: IpAddr,
    pub ip6: IpAddr,
    pub subip6: IpAddr,
}

impl DnsParams {
    pub fn generate(config: &LabConfig, subject_id: i64) -> Self {
        Self::draw(&mut SeededRng::new(
            &config.seed_key(subject_id, Some(SEED_SUFFIX)),
        ))
    }

    pub fn draw<R: RandomSource>(rng: &mut R) -> Self {
        let domain = format!("{}.localnetwork", sample_token(rng, LOWER_ALNUM, 10));
        let subdomain = sample_token(rng, LOWER_ALNUM, 5);
        let ip4 = sample_host(rng, &AddressSpace::v4([10, 52, 1, 128].into(), 25), false);
        let v6_net = AddressSpace::v6((0xfd44_1337u128 << 96).into(), 64);
        let [ip6, subip6] = sample_distinct(|| sample_host(rng, &v6_net, false));
        Self {
            domain,
            subdomain,
            ip4,
            ip6,
            subip6,
        }
    }

    pub fn full_subdomain(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }
}

/// The "DNS" topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsTopic;

impl LabTopic for DnsTopic {
    fn slug(&self) -> &'static str {
        "dns"
    }

    fn title(&self) -> &'static str {
        "The DNS protocol"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2024, 4, 26, 21)
    }

    fn tasks(&self) -> &'static [TopicTask] {
        TASKS
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn seed_suffix(&self) -> Option<&'static str> {
        Some(SEED_SUFFIX)
    }

    fn build_variant(&self, config: &LabConfig, subject_id: i64) -> Result<Variant> {
        let p = DnsParams::generate(config, subject_id);
        let subdomain = p.full_subdomain();

        let domain_server = ContainerSpec::new("domain", NGINX_IMAGE)
            .network_any("internal")
            .mem_limit(16 * 1024 * 1024)
            .env("DOMAIN", &p.domain)
            .env("IP4", p.ip4)
            .env("IP6", p.ip6);
        let subdomain_server = ContainerSpec::new("subdomain", NGINX_IMAGE)
            .network_any("internal")
            .mem_limit(16 * 1024 * 1024)
            .env("DOMAIN", &subdomain)
            .env("IP6", p.subip6);

        // Points are reported by the bot over the callback socket.
        let bot = ContainerSpec::new("bot", "ct-itmo/labs-networking-dns-bot")
            .network_any("internal")
            .without_ipv6_forwarding()
            .env("DOMAIN", &p.domain)
            .env("SUBDOMAIN", &subdomain)
            .env("IP4", p.ip4)
            .env("IP6", p.ip6)
            .env("SUBIP6", p.subip6)
            .env("BOX_IP", BOT_BOX_IP);
        let check = CheckDefinition::new(vec![with_socket(config, bot)]).log(0, "/out/dns.log");

        Ok(Variant::new(self.slug(), subject_id)
            .fact("domain", &p.domain)
            .fact("subdomain", &subdomain)
            .fact("ip4", p.ip4)
            .fact("ip6", p.ip6)
            .fact("subip6", p.subip6)
            .with_deployment(lab_deployment(
                config,
                subject_id,
                &["internal"],
                vec![domain_server, subdomain_server],
            ))
            .with_matchers(vec![
                AnswerMatcher::from_pattern("ip", &config.dns_ip_pattern)?,
                AnswerMatcher::from_pattern("servers", &config.dns_servers_pattern)?,
            ])
            .with_check("dns", check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NetlabError;

    #[test]
    fn test_params_shape() {
        let p = DnsParams::generate(&LabConfig::new("dns-tests"), 8);
        assert!(p.domain.ends_with(".localnetwork"));
        assert_eq!(p.domain.len(), 10 + ".localnetwork".len());
        assert_eq!(p.subdomain.len(), 5);
        assert!(AddressSpace::parse("10.52.1.128/25").unwrap().contains(p.ip4));
        assert_ne!(p.ip6, p.subip6);
        assert!(p.ip6.to_string().starts_with("fd44:1337::"));
    }

    #[test]
    fn test_matchers_come_from_config() {
        let config = LabConfig::new("dns-tests").with_dns_patterns(r"^10\.52\.1\.2$", "^ns[12]$");
        let variant = DnsTopic.build_variant(&config, 8).unwrap();
        assert!(variant.matcher("ip").unwrap().matches("10.52.1.2"));
        assert!(variant.matcher("servers").unwrap().matches("NS2"));
        assert!(!variant.matcher("servers").unwrap().matches("ns3"));
    }

    #[test]
    fn test_bad_config_pattern_is_error() {
        let config = LabConfig::new("dns-tests").with_dns_patterns("(", "^$");
        assert!(matches!(
            DnsTopic.build_variant(&config, 8),
            Err(NetlabError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_check_bot_environment() {
        let config = LabConfig::new("dns-tests");
        let p = DnsParams::generate(&config, 8);
        let variant = DnsTopic.build_variant(&config, 8).unwrap();
        let check = variant.check("dns").unwrap();
        let env = &check.containers[0].environment;
        assert_eq!(env["SUBDOMAIN"], p.full_subdomain());
        assert_eq!(env["BOX_IP"], "10.52.1.2");
        assert!(!check.has_predicate());
        assert_eq!(check.containers[0].volumes.len(), 1);
    }
}
