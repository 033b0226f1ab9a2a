//! Phrases a model uses in place of omitting a field.
//!
//! Models asked for a value they cannot find often answer with a placeholder
//! such as "N/A" or "not specified". Any value containing one of these
//! phrases is treated as absent.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("Invalid regex");
}

/// Phrases filtered when no custom list is configured.
pub const DEFAULT_UNSPECIFIED_PHRASES: &[&str] = &[
    "non specificato",
    "not specified",
    "unspecified",
    "n/a",
    "none",
];

/// Normalize a phrase or value for comparison: trimmed, lowercased, inner
/// whitespace collapsed to single spaces.
pub fn normalize(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").to_lowercase()
}

/// Normalized "unspecified" phrases, matched as substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    phrases: Vec<String>,
}

impl Denylist {
    /// Build a denylist from arbitrary phrases. Blank phrases are dropped and
    /// duplicates (after normalization) collapse.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::empty();
        list.extend(phrases);
        list
    }

    /// A denylist that matches nothing.
    pub fn empty() -> Self {
        Self {
            phrases: Vec::new(),
        }
    }

    pub fn with_phrase(mut self, phrase: impl AsRef<str>) -> Self {
        self.push(phrase.as_ref());
        self
    }

    pub fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            self.push(phrase.as_ref());
        }
    }

    fn push(&mut self, phrase: &str) {
        let phrase = normalize(phrase);
        if !phrase.is_empty() && !self.phrases.contains(&phrase) {
            self.phrases.push(phrase);
        }
    }

    /// Normalized phrases, in insertion order.
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Whether `value` contains any phrase, ignoring case and whitespace runs.
    pub fn matches(&self, value: &str) -> bool {
        let value = normalize(value);
        self.phrases.iter().any(|p| value.contains(p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_UNSPECIFIED_PHRASES)
    }
}
