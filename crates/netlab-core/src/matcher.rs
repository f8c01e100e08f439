//! Answer matchers for free-text tasks.

use regex::{Regex, RegexBuilder};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::domain::{NetlabError, Result};
use crate::sampler::MacAddress;

/// A task slug plus the case-insensitive pattern its answer must match.
#[derive(Debug, Clone)]
pub struct AnswerMatcher {
    pub slug: String,
    pub pattern: Regex,
}

impl AnswerMatcher {
    /// Compile `pattern` case-insensitively.
    pub fn from_pattern(slug: impl Into<String>, pattern: &str) -> Result<Self> {
        let slug = slug.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| NetlabError::InvalidPattern {
                slug: slug.clone(),
                source,
            })?;
        Ok(Self { slug, pattern })
    }

    /// Exactly `value`, with regex metacharacters escaped.
    pub fn exact(slug: impl Into<String>, value: impl std::fmt::Display) -> Self {
        let pattern = format!("^{}$", regex::escape(&value.to_string()));
        Self::compiled(slug, &pattern)
    }

    /// A MAC address with `-`, `:` or no separators.
    pub fn mac(slug: impl Into<String>, mac: &MacAddress) -> Self {
        Self::compiled(slug, &format!("^{}$", mac.answer_pattern()))
    }

    /// A domain name, the trailing root dot optional.
    pub fn domain(slug: impl Into<String>, domain: &str) -> Self {
        Self::compiled(slug, &format!("^{}\\.?$", regex::escape(domain)))
    }

    /// A fixed sequence of yes/no verdicts, e.g. `true, false`.
    ///
    /// Each verdict may be written as `true`/`false`, `yes`/`no`, `on`/`off`
    /// or `1`/`0`, separated by commas, semicolons or whitespace.
    pub fn booleans(slug: impl Into<String>, expected: &[bool]) -> Self {
        let verdicts: Vec<_> = expected
            .iter()
            .map(|&v| if v { "(?:true|yes|on|1)" } else { "(?:false|no|off|0)" })
            .collect();
        Self::compiled(slug, &format!("^{}$", verdicts.join(r"\s*[,;\s]\s*")))
    }

    // Only for patterns built from escaped values.
    fn compiled(slug: impl Into<String>, pattern: &str) -> Self {
        let slug = slug.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| panic!("generated pattern for {slug} does not compile: {e}"));
        Self { slug, pattern }
    }

    /// Whether `answer` (surrounding whitespace ignored) is accepted.
    pub fn matches(&self, answer: &str) -> bool {
        self.pattern.is_match(answer.trim())
    }
}

impl PartialEq for AnswerMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug && self.pattern.as_str() == other.pattern.as_str()
    }
}

impl Eq for AnswerMatcher {}

impl Serialize for AnswerMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnswerMatcher", 2)?;
        state.serialize_field("slug", &self.slug)?;
        state.serialize_field("pattern", self.pattern.as_str())?;
        state.end()
    }
}
