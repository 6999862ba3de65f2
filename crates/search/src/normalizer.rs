//! Text normalization shared by indexing and querying
//!
//! Token pipeline: UAX#29 word boundaries → strip possessives → fold
//! diacritics → remove non-alphanumeric → lowercase → remove stopwords
//!
//! Sort keys: fold diacritics → lowercase → collapse whitespace → strip one
//! leading English article

use std::collections::HashSet;

use quarry_core::Config;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Leading articles ignored by sort keys
const ARTICLES: &[&str] = &["the", "an", "a"];

/// Strip English possessive suffix (`'s` / `\u{2019}s`).
#[inline]
fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("\u{2019}s"))
        .unwrap_or(word)
}

/// Decompose and drop combining marks: "Beyoncé" → "Beyonce"
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Tokenize text into posting tokens.
///
/// # Example
///
/// ```
/// use quarry_core::Config;
/// use quarry_search::normalizer::tokenize;
///
/// let tokens = tokenize("The Beatles' Abbey Road!", &Config::default());
/// assert_eq!(tokens, vec!["beatles", "abbey", "road"]);
/// ```
pub fn tokenize(text: &str, config: &Config) -> Vec<String> {
    text.unicode_words()
        .map(strip_possessive)
        .map(|w| {
            fold_diacritics(w)
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .filter(|w| !config.is_stopword(w))
        .collect()
}

/// Tokenize and deduplicate, preserving first occurrence order.
pub fn tokenize_unique(text: &str, config: &Config) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text, config)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Comparison key used by sort strategies.
///
/// # Example
///
/// ```
/// use quarry_search::normalizer::sort_key;
///
/// assert_eq!(sort_key("The Beatles"), "beatles");
/// assert_eq!(sort_key("ABBA"), sort_key("abba"));
/// ```
pub fn sort_key(text: &str) -> String {
    let folded = fold_diacritics(text).to_lowercase();
    let words: Vec<&str> = folded.split_whitespace().collect();
    let rest = match words.split_first() {
        Some((first, rest)) if !rest.is_empty() && ARTICLES.contains(first) => rest,
        _ => &words[..],
    };
    rest.join(" ")
}
