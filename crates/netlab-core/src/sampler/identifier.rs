//! Locally administered MAC addresses.

use std::fmt;
use std::net::Ipv6Addr;

use crate::rng::RandomSource;

/// A 48-bit EUI-48 identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Lower 48 bits of `value`, big-endian.
    pub fn from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bytes[2..]);
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Bit 1 of the first octet.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Bit 0 of the first octet is clear.
    pub fn is_unicast(&self) -> bool {
        self.0[0] & 0x01 == 0
    }

    /// Modified EUI-64 interface identifier: `FF:FE` inserted in the middle
    /// and the universal/local bit inverted.
    pub fn interface_id(&self) -> u64 {
        let o = self.0;
        u64::from_be_bytes([o[0] ^ 0x02, o[1], o[2], 0xff, 0xfe, o[3], o[4], o[5]])
    }

    /// SLAAC address of this interface under a /64 `prefix` value.
    pub fn eui64_ipv6(&self, prefix: u128) -> Ipv6Addr {
        Ipv6Addr::from(prefix | u128::from(self.interface_id()))
    }

    /// Case-insensitive pattern body accepting `-`, `:` or no separator
    /// between octets.
    pub fn answer_pattern(&self) -> String {
        self.to_string().replace('-', "[-:]?")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02X}-{:02X}-{:02X}-{:02X}-{:02X}-{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Random locally administered unicast MAC: fixed `0x02` first octet and
/// 40 random bits.
pub fn sample_identifier<R: RandomSource>(rng: &mut R) -> MacAddress {
    let bits = rng.random_bits(40) as u64;
    MacAddress::from_u64((0x02 << 40) | bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uppercase_dashes() {
        let mac = MacAddress::new([0x02, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        assert_eq!(mac.to_string(), "02-1A-2B-3C-4D-5E");
    }

    #[test]
    fn test_from_u64_drops_high_bits() {
        let mac = MacAddress::from_u64(0xffff_0200_0000_0001);
        assert_eq!(mac.octets(), [0x02, 0, 0, 0, 0, 0x01]);
    }

    #[test]
    fn test_eui64_derivation() {
        let mac = MacAddress::new([0x02, 0x00, 0x5e, 0x10, 0x00, 0x01]);
        assert_eq!(mac.eui64_ipv6(0).to_string(), "::5eff:fe10:1");

        let prefix = u128::from("fdca:1:2:3::".parse::<Ipv6Addr>().unwrap());
        assert_eq!(mac.eui64_ipv6(prefix).to_string(), "fdca:1:2:3:0:5eff:fe10:1");
    }

    #[test]
    fn test_answer_pattern() {
        let mac = MacAddress::new([0x02, 0xab, 0, 0, 0, 0x10]);
        assert_eq!(mac.answer_pattern(), "02[-:]?AB[-:]?00[-:]?00[-:]?00[-:]?10");
    }
}
