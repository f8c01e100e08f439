//! Building blocks shared by topic deployments.

use netlab_runtime::{ContainerSpec, Deployment, NetworkSpec};

use crate::config::{LabConfig, CONTAINER_SOCKET_PATH};

/// Name of the VPN container every deployment carries.
pub const VPN_CONTAINER: &str = "vpn";

/// The student's VPN entry point, attached to every lab network.
pub fn vpn_container(config: &LabConfig, subject_id: i64, networks: &[&str]) -> ContainerSpec {
    networks.iter().fold(
        ContainerSpec::new(VPN_CONTAINER, &config.vpn_image).env("USER_ID", subject_id),
        |spec, network| spec.network_any(*network),
    )
}

/// Mount the bot callback socket into `spec`.
pub fn with_socket(config: &LabConfig, spec: ContainerSpec) -> ContainerSpec {
    spec.volume(&config.socket_path, CONTAINER_SOCKET_PATH)
}

/// A deployment with the VPN container first, followed by `containers`.
pub fn lab_deployment(
    config: &LabConfig,
    subject_id: i64,
    networks: &[&str],
    containers: Vec<ContainerSpec>,
) -> Deployment {
    let mut all = Vec::with_capacity(containers.len() + 1);
    all.push(vpn_container(config, subject_id, networks));
    all.extend(containers);
    Deployment {
        containers: all,
        networks: networks.iter().map(|n| NetworkSpec::new(*n)).collect(),
    }
}
