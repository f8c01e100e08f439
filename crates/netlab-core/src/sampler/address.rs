//! CIDR blocks and random subnet/host selection inside them.
//!
//! All arithmetic is done on `u128` with the width of the block's address
//! family (32 bits for IPv4, 128 for IPv6).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::domain::{NetlabError, Result};
use crate::rng::RandomSource;

/// IP address family of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Number of bits in an address of this family.
    pub fn address_bits(self) -> u32 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }

    /// # Panics
    ///
    /// Panics when `value` does not fit in an address of this family.
    fn address(self, value: u128) -> IpAddr {
        match self {
            IpVersion::V4 => {
                let value = u32::try_from(value)
                    .unwrap_or_else(|_| panic!("{value:#x} is not an IPv4 address value"));
                IpAddr::V4(Ipv4Addr::from(value))
            }
            IpVersion::V6 => IpAddr::V6(Ipv6Addr::from(value)),
        }
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = NetlabError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(NetlabError::UnsupportedIpVersion(other)),
        }
    }
}

fn address_value(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// An immutable CIDR block, always stored with its host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressSpace {
    net: IpNetwork,
}

impl AddressSpace {
    /// Build a block from a raw network value. Host bits are cleared.
    ///
    /// # Panics
    ///
    /// Panics when `prefix_len` exceeds the address width or `network` does
    /// not fit in an address of `version`.
    pub fn new(version: IpVersion, network: u128, prefix_len: u8) -> Self {
        let bits = version.address_bits();
        assert!(
            u32::from(prefix_len) <= bits,
            "prefix /{prefix_len} is longer than {bits} bits"
        );
        let net = IpNetwork::new(version.address(network), prefix_len)
            .unwrap_or_else(|e| panic!("invalid network /{prefix_len}: {e}"));
        Self::from_network(net)
    }

    pub fn v4(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self::new(IpVersion::V4, u32::from(addr) as u128, prefix_len)
    }

    pub fn v6(addr: Ipv6Addr, prefix_len: u8) -> Self {
        Self::new(IpVersion::V6, u128::from(addr), prefix_len)
    }

    /// Parse `a.b.c.d/n` or `x::/n`. Host bits are cleared.
    pub fn parse(cidr: &str) -> Result<Self> {
        cidr.parse()
    }

    fn from_network(net: IpNetwork) -> Self {
        let normalized = IpNetwork::new(net.network(), net.prefix())
            .unwrap_or_else(|e| panic!("network of {net} is not a network: {e}"));
        Self { net: normalized }
    }

    pub fn version(&self) -> IpVersion {
        match self.net {
            IpNetwork::V4(_) => IpVersion::V4,
            IpNetwork::V6(_) => IpVersion::V6,
        }
    }

    pub fn address_bits(&self) -> u32 {
        self.version().address_bits()
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix()
    }

    /// Number of host bits below the prefix.
    pub fn host_bits(&self) -> u32 {
        self.address_bits() - u32::from(self.prefix_len())
    }

    /// Numeric value of the network address.
    pub fn first(&self) -> u128 {
        address_value(self.net.network())
    }

    pub fn network(&self) -> IpAddr {
        self.net.network()
    }

    /// Address with numeric value `value` in this block's family.
    ///
    /// # Panics
    ///
    /// Panics when `value` is wider than the family's addresses.
    pub fn address(&self, value: u128) -> IpAddr {
        self.version().address(value)
    }

    /// `network + n`.
    ///
    /// # Panics
    ///
    /// Panics when the result would leave the block.
    pub fn offset(&self, n: u128) -> IpAddr {
        let host_bits = self.host_bits();
        assert!(
            host_bits == 128 || n < (1u128 << host_bits),
            "offset {n} outside {self}"
        );
        self.address(self.first() + n)
    }

    /// The conventional gateway: the first address after the network address.
    pub fn gateway(&self) -> IpAddr {
        self.offset(1)
    }

    /// The lowest sub-block with prefix `prefix_len`.
    pub fn first_subnet(&self, prefix_len: u8) -> AddressSpace {
        assert!(
            prefix_len >= self.prefix_len(),
            "/{prefix_len} is wider than {self}"
        );
        AddressSpace::new(self.version(), self.first(), prefix_len)
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.net.contains(addr)
    }
}

impl FromStr for AddressSpace {
    type Err = NetlabError;

    fn from_str(s: &str) -> Result<Self> {
        let net: IpNetwork = s
            .trim()
            .parse()
            .map_err(|e| NetlabError::InvalidAddress(format!("{s}: {e}")))?;
        Ok(Self::from_network(net))
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.net.network(), self.net.prefix())
    }
}

/// Pick a random sub-block of `parent` with prefix `new_prefix_len`.
///
/// Draws `new_prefix_len - parent.prefix_len()` bits and places them directly
/// under the new prefix. Equal prefixes return `parent` without drawing.
///
/// # Panics
///
/// Panics when the new prefix is shorter than the parent's or longer than
/// the address width.
pub fn sample_subnet<R: RandomSource>(
    rng: &mut R,
    parent: &AddressSpace,
    new_prefix_len: u8,
) -> AddressSpace {
    assert!(
        new_prefix_len >= parent.prefix_len(),
        "cannot sample /{new_prefix_len} from {parent}"
    );
    let bits = u32::from(new_prefix_len - parent.prefix_len());
    if bits == 0 {
        return *parent;
    }

    let address_bits = parent.address_bits();
    assert!(
        u32::from(new_prefix_len) <= address_bits,
        "prefix /{new_prefix_len} is longer than {address_bits} bits"
    );
    let shift = address_bits - u32::from(new_prefix_len);
    let network = parent.first() | (rng.random_bits(bits) << shift);
    AddressSpace::new(parent.version(), network, new_prefix_len)
}

/// Pick a random host address inside `subnet`.
///
/// The all-zero and all-one host parts are never returned; with
/// `exclude_gateway` the first usable address is skipped as well. Subnets
/// with at most one host bit yield their network address without drawing.
pub fn sample_host<R: RandomSource>(
    rng: &mut R,
    subnet: &AddressSpace,
    exclude_gateway: bool,
) -> IpAddr {
    let bits = subnet.host_bits();
    if bits <= 1 {
        return subnet.network();
    }

    let all_ones = if bits == 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    };
    loop {
        let host = rng.random_bits(bits);
        if host == 0 || host == all_ones || (exclude_gateway && host == 1) {
            continue;
        }
        return subnet.address(subnet.first() | host);
    }
}
