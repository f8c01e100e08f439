//! Lab configuration.
//!
//! Everything a variant depends on besides the subject id travels in an
//! explicit [`LabConfig`]; nothing is read from globals at generation time.

use std::time::Duration;

use crate::domain::{NetlabError, Result};
use crate::rng::SeedKey;

/// Default host path of the bot callback socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/netlab.sock";
/// Path the callback socket is mounted at inside bot containers.
pub const CONTAINER_SOCKET_PATH: &str = "/var/run/quirck.sock";
pub const DEFAULT_VPN_IMAGE: &str = "ct-itmo/labs-vpn";
/// Matches only an empty answer.
pub const DEFAULT_DNS_PATTERN: &str = "^$";
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(25);

/// The secret every variant is derived from. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSeed(String);

impl SecretSeed {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretSeed(<redacted>)")
    }
}

/// Configuration shared by all topics.
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub secret: SecretSeed,
    /// Host path of the socket bots report completed tasks to.
    pub socket_path: String,
    pub vpn_image: String,
    /// Answer pattern for the DNS `ip` task.
    pub dns_ip_pattern: String,
    /// Answer pattern for the DNS `servers` task.
    pub dns_servers_pattern: String,
    /// Upper bound on waiting for checker containers.
    pub check_timeout: Duration,
}

impl LabConfig {
    /// Configuration with defaults for everything but the secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretSeed::new(secret),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            vpn_image: DEFAULT_VPN_IMAGE.to_string(),
            dns_ip_pattern: DEFAULT_DNS_PATTERN.to_string(),
            dns_servers_pattern: DEFAULT_DNS_PATTERN.to_string(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }

    pub fn with_vpn_image(mut self, image: impl Into<String>) -> Self {
        self.vpn_image = image.into();
        self
    }

    pub fn with_dns_patterns(mut self, ip: impl Into<String>, servers: impl Into<String>) -> Self {
        self.dns_ip_pattern = ip.into();
        self.dns_servers_pattern = servers.into();
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SECRET_SEED (required)
    /// - SOCKET_PATH (optional, default: "/var/run/netlab.sock")
    /// - VPN_IMAGE (optional, default: "ct-itmo/labs-vpn")
    /// - DNS_REGEXP_IP, DNS_REGEXP_SERVERS (optional, default: "^$")
    /// - CHECK_TIMEOUT_SECS (optional, default: 25)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LabConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("SECRET_SEED")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NetlabError::Config("SECRET_SEED not set".into()))?;

        let mut config = Self::new(secret);
        if let Some(path) = lookup("SOCKET_PATH") {
            config.socket_path = path;
        }
        if let Some(image) = lookup("VPN_IMAGE") {
            config.vpn_image = image;
        }
        if let Some(pattern) = lookup("DNS_REGEXP_IP") {
            config.dns_ip_pattern = pattern;
        }
        if let Some(pattern) = lookup("DNS_REGEXP_SERVERS") {
            config.dns_servers_pattern = pattern;
        }
        if let Some(secs) = lookup("CHECK_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                NetlabError::Config(format!("CHECK_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.check_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Seed key for a subject, optionally scoped to a topic namespace.
    pub fn seed_key(&self, subject_id: i64, suffix: Option<&str>) -> SeedKey {
        let key = SeedKey::new(self.secret.expose(), subject_id);
        match suffix {
            Some(suffix) => key.with_suffix(suffix),
            None => key,
        }
    }
}
