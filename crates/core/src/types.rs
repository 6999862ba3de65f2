//! Core type definitions for Quarry
//!
//! This module defines the foundational types:
//! - RecordId: identifier of an indexed record
//! - FieldValue: raw value extracted from a record for indexing
//! - IndexKind: discriminates between index strategies

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// RecordId
// ============================================================================

/// Identifier of an indexed record
///
/// Record ids are opaque strings as far as the store is concerned. Ordering is
/// "natural": two ids that both parse as unsigned integers compare
/// numerically, numeric ids sort before non-numeric ones, and everything else
/// compares lexicographically. This keeps `9` ahead of `10` in tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a RecordId from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string
    pub fn into_string(self) -> String {
        self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse::<u64>().ok()
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// FieldValue
// ============================================================================

/// Raw value extracted from a record for indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Several text values (tags, aliases); indexed as if joined by spaces
    List(Vec<String>),
    /// No value; the field is not posted
    Null,
}

impl FieldValue {
    /// Whether the value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text view of the value, if it has one
    ///
    /// Numbers render with their shortest representation, lists join with a
    /// single space.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::List(items) => Some(items.join(" ")),
            FieldValue::Null => None,
        }
    }

    /// Numeric view of the value, if it has one
    ///
    /// Text is accepted when it parses as a float after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::List(_) | FieldValue::Null => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

// ============================================================================
// IndexKind
// ============================================================================

/// Index strategy discriminator
///
/// The four built-in kinds have dedicated variants; any other name is a
/// plugin kind, which is only valid if a strategy with that name is present
/// in the engine's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    /// Word postings
    Text,
    /// Phonetic-code postings
    Phonetic,
    /// Value-ordered postings for range predicates
    Number,
    /// Per-record comparison keys for ordering
    Sort,
    /// Plugin strategy registered under this name
    Custom(String),
}

impl IndexKind {
    /// Registry name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            IndexKind::Text => "text",
            IndexKind::Phonetic => "phonetic",
            IndexKind::Number => "number",
            IndexKind::Sort => "sort",
            IndexKind::Custom(name) => name,
        }
    }

    /// Whether this is one of the built-in kinds
    pub fn is_builtin(&self) -> bool {
        !matches!(self, IndexKind::Custom(_))
    }

    /// The kind as `FromStr` would produce it
    ///
    /// A directly constructed `Custom` name is trimmed and lowercased, and one
    /// spelling a built-in becomes that built-in.
    pub fn canonical(self) -> Self {
        match self {
            IndexKind::Custom(name) => IndexKind::from(name.as_str()),
            builtin => builtin,
        }
    }
}

impl FromStr for IndexKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "text" => IndexKind::Text,
            "phonetic" => IndexKind::Phonetic,
            "number" => IndexKind::Number,
            "sort" => IndexKind::Sort,
            other => IndexKind::Custom(other.to_string()),
        })
    }
}

impl From<&str> for IndexKind {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
