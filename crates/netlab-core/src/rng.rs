//! Seeded randomness for variant generation.
//!
//! A [`SeedKey`] (secret, subject id, optional topic suffix) is hashed with
//! SHA-256 into the 32-byte seed of a ChaCha20 stream. ChaCha20 output is
//! value-stable, and every bounded draw below is built on [`RandomSource::random_bits`]
//! with our own rejection sampling, so a given key yields the same values on
//! every platform and across dependency upgrades.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

/// Key from which a per-student stream is derived. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedKey {
    secret: Vec<u8>,
    subject_id: i64,
    suffix: Option<String>,
}

impl SeedKey {
    pub fn new(secret: impl AsRef<[u8]>, subject_id: i64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            subject_id,
            suffix: None,
        }
    }

    /// Scope the stream to a topic-specific namespace.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    /// The non-secret part of the key, e.g. `42-dns`.
    pub fn namespace(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}-{}", self.subject_id, suffix),
            None => self.subject_id.to_string(),
        }
    }

    fn seed_bytes(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(b"-");
        hasher.update(self.namespace().as_bytes());
        hasher.finalize().into()
    }

    /// Short hex fingerprint of the derived seed, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.seed_bytes()[..6])
    }
}

impl std::fmt::Debug for SeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedKey")
            .field("secret", &"<redacted>")
            .field("namespace", &self.namespace())
            .finish()
    }
}

/// Source of uniformly distributed bits plus the bounded draws built on it.
///
/// Only `random_bits` touches the underlying generator; every other method is
/// defined in terms of it so substitutes (scripted sources in tests) observe
/// exactly which draws happen.
pub trait RandomSource {
    /// Uniform value in `[0, 2^bits)`. `bits == 0` returns 0 without a draw.
    fn random_bits(&mut self, bits: u32) -> u128;

    /// Uniform value in `[0, n)` by rejection over `bit_length(n - 1)` bits.
    fn below(&mut self, n: u128) -> u128 {
        assert!(n > 0, "cannot draw below zero");
        let bits = u128::BITS - (n - 1).leading_zeros();
        loop {
            let value = self.random_bits(bits);
            if value < n {
                return value;
            }
        }
    }

    /// Uniform integer in the inclusive range `[lo, hi]`.
    fn randint(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        let span = (hi as i128 - lo as i128) as u128 + 1;
        (lo as i128 + self.below(span) as i128) as i64
    }

    /// Uniformly chosen element of a non-empty slice.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T
    where
        Self: Sized,
    {
        assert!(!items.is_empty(), "cannot choose from an empty slice");
        &items[self.below(items.len() as u128) as usize]
    }
}

/// Deterministic stream for one [`SeedKey`].
pub struct SeededRng {
    inner: ChaCha20Rng,
    namespace: String,
}

impl SeededRng {
    pub fn new(key: &SeedKey) -> Self {
        Self {
            inner: ChaCha20Rng::from_seed(key.seed_bytes()),
            namespace: key.namespace(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RandomSource for SeededRng {
    fn random_bits(&mut self, bits: u32) -> u128 {
        assert!(bits <= u128::BITS, "cannot draw {bits} bits");
        if bits == 0 {
            return 0;
        }
        let low = self.inner.next_u64() as u128;
        let value = if bits > 64 {
            ((self.inner.next_u64() as u128) << 64) | low
        } else {
            low
        };
        if bits == u128::BITS {
            value
        } else {
            value & ((1u128 << bits) - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_stream() {
        let key = SeedKey::new("test-seed", 42);
        let mut a = SeededRng::new(&key);
        let mut b = SeededRng::new(&key);
        for bits in [1, 7, 32, 40, 64, 65, 128] {
            assert_eq!(a.random_bits(bits), b.random_bits(bits));
        }
    }

    #[test]
    fn test_suffix_changes_stream() {
        let mut plain = SeededRng::new(&SeedKey::new("test-seed", 42));
        let mut scoped = SeededRng::new(&SeedKey::new("test-seed", 42).with_suffix("dns"));
        let left: Vec<_> = (0..4).map(|_| plain.random_bits(64)).collect();
        let right: Vec<_> = (0..4).map(|_| scoped.random_bits(64)).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn test_subject_changes_stream() {
        let mut a = SeededRng::new(&SeedKey::new("test-seed", 1));
        let mut b = SeededRng::new(&SeedKey::new("test-seed", 2));
        assert_ne!(a.random_bits(128), b.random_bits(128));
    }

    #[test]
    fn test_random_bits_respects_width() {
        let mut rng = SeededRng::new(&SeedKey::new("width", 0));
        for bits in 1..=127u32 {
            assert!(rng.random_bits(bits) < (1u128 << bits));
        }
        assert_eq!(rng.random_bits(0), 0);
    }

    #[test]
    fn test_randint_inclusive_bounds() {
        let mut rng = SeededRng::new(&SeedKey::new("bounds", 3));
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..2_000 {
            let v = rng.randint(1, 4);
            assert!((1..=4).contains(&v));
            seen_lo |= v == 1;
            seen_hi |= v == 4;
        }
        assert!(seen_lo && seen_hi);
        assert_eq!(rng.randint(9, 9), 9);
    }

    #[test]
    fn test_choose_covers_slice() {
        let mut rng = SeededRng::new(&SeedKey::new("choose", 5));
        let items = ["com", "net", "biz"];
        let mut hits = [0usize; 3];
        for _ in 0..600 {
            let picked = rng.choose(&items);
            let idx = items.iter().position(|i| i == picked).unwrap();
            hits[idx] += 1;
        }
        assert!(hits.iter().all(|&h| h > 100));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = SeedKey::new("super-secret", 42).with_suffix("dhcpd");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("42-dhcpd"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let key = SeedKey::new("test-seed", 42);
        assert_eq!(key.fingerprint(), key.fingerprint());
        assert_eq!(key.fingerprint().len(), 12);
    }
}
