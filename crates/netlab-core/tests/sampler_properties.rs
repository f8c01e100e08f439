//! Statistical and draw-accounting properties of the samplers.

use std::collections::VecDeque;

use netlab_core::rng::{RandomSource, SeedKey, SeededRng};
use netlab_core::sampler::{
    sample_distinct, sample_host, sample_identifier, sample_subnet, AddressSpace,
};

/// Replays scripted values and counts how many draws were requested.
#[derive(Default)]
struct ScriptedSource {
    values: VecDeque<u128>,
    draws: usize,
}

impl ScriptedSource {
    fn new(values: impl IntoIterator<Item = u128>) -> Self {
        Self {
            values: values.into_iter().collect(),
            draws: 0,
        }
    }
}

impl RandomSource for ScriptedSource {
    fn random_bits(&mut self, bits: u32) -> u128 {
        self.draws += 1;
        let value = self.values.pop_front().expect("script exhausted");
        assert!(bits == 128 || value < (1u128 << bits), "scripted value too wide");
        value
    }
}

#[test]
fn subnet_with_equal_prefix_consumes_no_draws() {
    let parent = AddressSpace::parse("10.52.0.0/16").unwrap();
    let mut rng = ScriptedSource::default();

    let subnet = sample_subnet(&mut rng, &parent, 16);

    assert_eq!(subnet, parent);
    assert_eq!(rng.draws, 0);
}

#[test]
fn subnet_places_bits_under_new_prefix() {
    let parent = AddressSpace::parse("10.0.0.0/8").unwrap();
    let mut rng = ScriptedSource::new([0x0102]);

    let subnet = sample_subnet(&mut rng, &parent, 24);

    assert_eq!(subnet.to_string(), "10.1.2.0/24");
    assert_eq!(rng.draws, 1);
}

#[test]
fn host_rejects_edges_and_redraws() {
    let subnet = AddressSpace::parse("192.168.1.0/24").unwrap();
    let mut rng = ScriptedSource::new([0, 255, 1, 77]);

    // 0 and 255 are rejected; 1 is fine without gateway exclusion.
    assert_eq!(sample_host(&mut rng, &subnet, false).to_string(), "192.168.1.1");
    assert_eq!(rng.draws, 3);

    // With gateway exclusion 1 is rejected too.
    let mut rng = ScriptedSource::new([1, 0, 77]);
    assert_eq!(sample_host(&mut rng, &subnet, true).to_string(), "192.168.1.77");
    assert_eq!(rng.draws, 3);
}

#[test]
fn host_in_tiny_subnet_consumes_no_draws() {
    let mut rng = ScriptedSource::default();
    let subnet = AddressSpace::parse("fd00::10/127").unwrap();

    assert_eq!(sample_host(&mut rng, &subnet, false).to_string(), "fd00::10");
    assert_eq!(rng.draws, 0);
}

#[test]
fn host_never_hits_network_or_broadcast_across_seeds() {
    let subnet = AddressSpace::parse("10.9.8.0/30").unwrap();
    for subject in 0..5_000 {
        let mut rng = SeededRng::new(&SeedKey::new("host-exclusion", subject));
        let host = sample_host(&mut rng, &subnet, false);
        let s = host.to_string();
        assert!(s == "10.9.8.1" || s == "10.9.8.2", "got {s}");
    }
}

#[test]
fn distinct_batches_from_small_space() {
    // Six usable hosts, four drawn per batch: collisions are frequent.
    let subnet = AddressSpace::parse("172.16.0.0/29").unwrap();
    let mut rng = SeededRng::new(&SeedKey::new("distinct", 0));
    for _ in 0..10_000 {
        let batch: [_; 4] = sample_distinct(|| sample_host(&mut rng, &subnet, false));
        for i in 0..4 {
            assert!(subnet.contains(batch[i]));
            for j in i + 1..4 {
                assert_ne!(batch[i], batch[j]);
            }
        }
    }
}

#[test]
fn identifiers_are_locally_administered_unicast() {
    let mut rng = SeededRng::new(&SeedKey::new("mac", 3));
    for _ in 0..2_000 {
        let mac = sample_identifier(&mut rng);
        assert_eq!(mac.octets()[0] & 0b11, 0b10);
        assert_eq!(mac.octets()[0], 0x02);
        assert!(mac.is_locally_administered());
        assert!(mac.is_unicast());
    }
}

#[test]
fn identifier_uses_forty_bits() {
    let mut rng = ScriptedSource::new([0xab_cdef_0123]);
    let mac = sample_identifier(&mut rng);
    assert_eq!(mac.to_string(), "02-AB-CD-EF-01-23");
    assert_eq!(rng.draws, 1);
}

#[test]
fn randint_rejection_is_exact() {
    // Range of 101 values needs 7 bits; 127 and 101 are out of range.
    let mut rng = ScriptedSource::new([127, 101, 100]);
    assert_eq!(rng.randint(1000, 1100), 1100);
    assert_eq!(rng.draws, 3);
}
