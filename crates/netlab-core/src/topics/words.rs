//! Word lists for generated domain names.
//!
//! The adjectives are the part of Moby owned by Docker Inc., licensed under
//! the Apache License 2.0 (https://www.apache.org/licenses/LICENSE-2.0.txt).

/// First half of a word-pair domain.
pub const ADJECTIVES: &[&str] = &[
    "admiring", "adoring", "affectionate", "agitated", "amazing", "angry", "awesome", "beautiful",
    "blissful", "bold", "boring", "brave", "busy", "charming", "clever", "compassionate",
    "competent", "condescending", "confident", "cool", "cranky", "crazy", "dazzling", "determined",
    "distracted", "dreamy", "eager", "ecstatic", "elastic", "elated", "elegant", "eloquent",
    "epic", "exciting", "fervent", "festive", "flamboyant", "focused", "friendly", "frosty",
    "funny", "gallant", "gifted", "goofy", "gracious", "great", "happy", "hardcore", "heuristic",
    "hopeful", "hungry", "infallible", "inspiring", "intelligent", "interesting", "jolly",
    "jovial", "keen", "kind", "laughing", "loving", "lucid", "magical", "modest", "musing",
    "mystifying", "naughty", "nervous", "nice", "nifty", "nostalgic", "objective", "optimistic",
    "peaceful", "pedantic", "pensive", "practical", "priceless", "quirky", "quizzical",
    "recursing", "relaxed", "reverent", "romantic", "sad", "serene", "sharp", "silly", "sleepy",
    "stoic", "strange", "stupefied", "suspicious", "sweet", "tender", "thirsty", "trusting",
    "unruffled", "upbeat", "vibrant", "vigilant", "vigorous", "wizardly", "wonderful",
    "xenodochial", "youthful", "zealous", "zen",
];

/// Second half of a word-pair domain.
pub const NOUNS: &[&str] = &[
    "affair", "agency", "airport", "analysis", "apple", "article", "assumption", "audience",
    "bird", "boyfriend", "chapter", "cheek", "client", "collection", "dad", "data", "death",
    "device", "direction", "disease", "effort", "exam", "excitement", "expression", "friendship",
    "gene", "goal", "guidance", "inspector", "insurance", "language", "law", "loss", "manager",
    "medicine", "mud", "owner", "patience", "property", "recording", "relationship", "sample",
    "statement", "thanks", "thought", "union", "university", "warning", "winner", "wood",
];

/// Top-level zones, `xn--p1ai` being the punycode of `рф`.
pub const ZONES: &[&str] = &[
    "com", "net", "biz", "xn--p1ai",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_dns_labels() {
        for word in ADJECTIVES.iter().chain(NOUNS).chain(ZONES) {
            assert!(word
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
        assert_eq!(ZONES.len(), 4);
    }
}
