//! DHCP server: the student runs a DHCP/RA server; a bot requests leases.

use chrono::{DateTime, Utc};
use netlab_runtime::ContainerSpec;

use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::check::{CheckDefinition, DhcpdLeasePredicate};
use crate::config::LabConfig;
use crate::deploy::lab_deployment;
use crate::domain::Result;
use crate::matcher::AnswerMatcher;
use crate::rng::{RandomSource, SeededRng};
use crate::sampler::{sample_identifier, sample_subnet, AddressSpace, MacAddress};

const TASKS: &[TopicTask] = &[
    TopicTask::new("ip4", "Hand out an IPv4 address", 6.0),
    TopicTask::new("ip6", "Configure SLAAC", 6.0),
    TopicTask::new("mac", "MAC address", 1.5),
];

const CAPABILITIES: &[Capability] = &[
    Capability::Deployable,
    Capability::AnswerCheckable,
    Capability::ContainerCheckable,
];

pub const SEED_SUFFIX: &str = "dhcpd";

/// Sampled values of the DHCP server topic, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpdParams {
    pub ip4_net: AddressSpace,
    pub ip6_net: AddressSpace,
    /// MAC of the bot requesting leases.
    pub host_mac: MacAddress,
}

impl DhcpdParams {
    pub fn generate(config: &LabConfig, subject_id: i64) -> Self {
        Self::draw(&mut SeededRng::new(
            &config.seed_key(subject_id, Some(SEED_SUFFIX)),
        ))
    }

    pub fn draw<R: RandomSource>(rng: &mut R) -> Self {
        let ip4_net = sample_subnet(rng, &AddressSpace::v4([10, 0, 0, 0].into(), 8), 24);
        let ip6_net = sample_subnet(rng, &AddressSpace::v6((0xfdb0u128 << 112).into(), 16), 64);
        let host_mac = sample_identifier(rng);
        Self {
            ip4_net,
            ip6_net,
            host_mac,
        }
    }
}

/// The "DHCP server" topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct DhcpdTopic;

impl LabTopic for DhcpdTopic {
    fn slug(&self) -> &'static str {
        "dhcpd"
    }

    fn title(&self) -> &'static str {
        "DHCP server"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2023, 5, 24, 21)
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
        let p = DhcpdParams::generate(config, subject_id);

        let bot = ContainerSpec::new("bot", "ct-itmo/labs-networking-dhcpd-bot")
            .network("internal", p.host_mac)
            .without_ipv6_forwarding();
        let check = CheckDefinition::new(vec![bot])
            .log(0, "/out/dhcpcd.log")
            .predicate(DhcpdLeasePredicate {
                ip4_net: p.ip4_net,
                ip6_net: p.ip6_net,
            });

        Ok(Variant::new(self.slug(), subject_id)
            .fact("ip4_net", p.ip4_net)
            .fact("ip6_net", p.ip6_net)
            .with_deployment(lab_deployment(config, subject_id, &["internal"], vec![]))
            .with_matchers(vec![AnswerMatcher::mac("mac", &p.host_mac)])
            .with_check("dhcpd", check))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::IpParams;

    #[test]
    fn test_uses_own_namespace() {
        let config = LabConfig::new("dhcpd-tests");
        let dhcpd = DhcpdParams::generate(&config, 5);
        let ip = IpParams::generate(&config, 5);
        assert_ne!(dhcpd.host_mac, ip.ll_mac);
        assert_eq!(DhcpdTopic.seed_suffix(), Some("dhcpd"));
    }

    #[test]
    fn test_check_definition() {
        let config = LabConfig::new("dhcpd-tests");
        let variant = DhcpdTopic.build_variant(&config, 5).unwrap();
        let check = variant.check("dhcpd").unwrap();
        assert_eq!(check.containers.len(), 1);
        assert_eq!(check.logs[&0], "/out/dhcpcd.log");
        assert!(check.has_predicate());
        assert_eq!(variant.deployment.unwrap().containers.len(), 1);
    }
}
