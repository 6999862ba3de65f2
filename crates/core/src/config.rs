//! Engine configuration
//!
//! `Config` is an explicit value: it is built once and handed to the engine,
//! which threads it through index registration and query evaluation. There is
//! no global instance. Tests that mutate a config can call [`Config::reset`]
//! to get back to the defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Default namespace prefix for every key the engine writes
pub const DEFAULT_NAMESPACE: &str = "quarry";

/// Default time-to-live of ephemeral result keys
pub const DEFAULT_EPHEMERAL_TTL: Duration = Duration::from_secs(30);

/// Standard English stopwords (Lucene's default set).
static DEFAULT_STOPWORDS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
});

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tokens dropped from Text/Phonetic tokenization (lower-case)
    stopwords: BTreeSet<String>,
    /// Extension options, keyed by name
    options: BTreeMap<String, serde_json::Value>,
    /// Time-to-live of ephemeral result keys
    ephemeral_ttl: Duration,
    /// Prefix of every key the engine writes
    namespace: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.clone(),
            options: BTreeMap::new(),
            ephemeral_ttl: DEFAULT_EPHEMERAL_TTL,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Config {
    /// Create a builder starting from the defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The stopword set
    pub fn stopwords(&self) -> &BTreeSet<String> {
        &self.stopwords
    }

    /// Whether `token` (already lower-cased) is a stopword
    #[inline]
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Whether the option was ever set, regardless of its value
    ///
    /// An option explicitly set to `false` or `null` is still present.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Value of an option, if set
    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        self.options.get(name)
    }

    /// Set an option after construction
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.options.insert(name.into(), value.into());
    }

    /// Replace the stopword set
    pub fn set_stopwords<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords = normalize_words(words);
    }

    /// Time-to-live of ephemeral result keys
    pub fn ephemeral_ttl(&self) -> Duration {
        self.ephemeral_ttl
    }

    /// Prefix of every key the engine writes
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Restore every setting to its default
    pub fn reset(&mut self) {
        *self = Config::default();
    }
}

/// Builder for [`Config`]
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Replace the stopword set
    pub fn stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.set_stopwords(words);
        self
    }

    /// Disable stopword filtering
    pub fn no_stopwords(mut self) -> Self {
        self.config.stopwords.clear();
        self
    }

    /// Set an extension option
    pub fn option(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.set_option(name, value);
        self
    }

    /// Set the ephemeral key time-to-live
    pub fn ephemeral_ttl(mut self, ttl: Duration) -> Self {
        self.config.ephemeral_ttl = ttl;
        self
    }

    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Finish building
    pub fn build(self) -> Config {
        self.config
    }
}

fn normalize_words<I, S>(words: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_stopword("the"));
        assert!(config.is_stopword("and"));
        assert!(!config.is_stopword("beatles"));
        assert_eq!(config.ephemeral_ttl(), DEFAULT_EPHEMERAL_TTL);
        assert_eq!(config.namespace(), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_option_presence_ignores_truthiness() {
        let config = Config::builder()
            .option("fuzzy", false)
            .option("trace", serde_json::Value::Null)
            .build();
        assert!(config.has_option("fuzzy"));
        assert!(config.has_option("trace"));
        assert!(!config.has_option("missing"));
        assert_eq!(config.option("fuzzy"), Some(&json!(false)));
    }

    #[test]
    fn test_custom_stopwords_are_normalized() {
        let config = Config::builder().stopwords(["  Foo", "BAR", ""]).build();
        assert!(config.is_stopword("foo"));
        assert!(config.is_stopword("bar"));
        assert!(!config.is_stopword("the"));
        assert_eq!(config.stopwords().len(), 2);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut config = Config::builder()
            .no_stopwords()
            .namespace("test")
            .option("x", 1)
            .build();
        config.reset();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"namespace": "app"}"#).unwrap();
        assert_eq!(config.namespace(), "app");
        assert!(config.is_stopword("the"));
    }
}
