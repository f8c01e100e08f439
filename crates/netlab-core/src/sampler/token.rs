//! Random strings: alphanumeric tokens and word-pair domain names.

use crate::rng::RandomSource;

/// Lowercase letters followed by digits.
pub const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// `len` characters drawn independently from `alphabet`.
pub fn sample_token<R: RandomSource>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len).map(|_| *rng.choose(alphabet) as char).collect()
}

/// `{adjective}-{noun}.{zone}`, drawn in that order.
pub fn sample_word_domain<R: RandomSource>(
    rng: &mut R,
    adjectives: &[&str],
    nouns: &[&str],
    zones: &[&str],
) -> String {
    let adjective = *rng.choose(adjectives);
    let noun = *rng.choose(nouns);
    let zone = *rng.choose(zones);
    format!("{adjective}-{noun}.{zone}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{SeedKey, SeededRng};

    #[test]
    fn test_token_alphabet_and_length() {
        let mut rng = SeededRng::new(&SeedKey::new("token", 1));
        let token = sample_token(&mut rng, LOWER_ALNUM, 24);
        assert_eq!(token.len(), 24);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_word_domain_shape() {
        let mut rng = SeededRng::new(&SeedKey::new("token", 2));
        let domain = sample_word_domain(&mut rng, &["bold"], &["apple", "wood"], &["com"]);
        assert!(domain == "bold-apple.com" || domain == "bold-wood.com");
    }
}
