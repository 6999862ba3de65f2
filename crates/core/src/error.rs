//! Error types for Quarry
//!
//! This module defines all error types used throughout the engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two conditions that look like failures are deliberately NOT errors:
//! contradictory numeric bounds (an empty match) and candidate ids that no
//! longer resolve to a record (skipped during materialization).

use thiserror::Error;

/// Result type alias for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Quarry search engine
#[derive(Debug, Error)]
pub enum Error {
    /// A query leaf or sort override names a field that has no registered
    /// strategy of the required kind
    #[error("Unknown field: {field} has no {kind} index")]
    UnknownField {
        /// Field name as referenced by the caller
        field: String,
        /// Strategy kind the reference required
        kind: String,
    },

    /// A field was registered with a strategy kind the engine does not know
    #[error("Invalid index kind: {0}")]
    InvalidIndexKind(String),

    /// The record type has no registered schema
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// The record type was already registered
    #[error("Schema conflict: record type {0} is already registered")]
    SchemaConflict(String),

    /// An extracted value cannot be indexed by the field's strategy
    #[error("Invalid value for field {field}: {reason}")]
    InvalidValue {
        /// Field being indexed
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A post-processor name that was never registered
    #[error("Unknown result processor: {0}")]
    UnknownProcessor(String),

    /// Structurally invalid query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Store key holds a structure of a different type
    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Structure the operation expected
        expected: &'static str,
    },

    /// Store operation failed (transport, availability, ...)
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build an `UnknownField` error
    pub fn unknown_field(field: impl Into<String>, kind: impl Into<String>) -> Self {
        Error::UnknownField {
            field: field.into(),
            kind: kind.into(),
        }
    }

    /// Build an `InvalidValue` error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error originates in the store rather than the engine
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Store(_) | Error::WrongType { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_field() {
        let err = Error::unknown_field("title", "sort");
        let msg = err.to_string();
        assert!(msg.contains("Unknown field"));
        assert!(msg.contains("title"));
        assert!(msg.contains("sort"));
    }

    #[test]
    fn test_error_display_invalid_index_kind() {
        let err = Error::InvalidIndexKind("geo".to_string());
        assert_eq!(err.to_string(), "Invalid index kind: geo");
    }

    #[test]
    fn test_error_display_wrong_type() {
        let err = Error::WrongType {
            key: "q:song:number:year".to_string(),
            expected: "set",
        };
        let msg = err.to_string();
        assert!(msg.contains("q:song:number:year"));
        assert!(msg.contains("set"));
    }

    #[test]
    fn test_store_failure_classification() {
        assert!(Error::Store("connection reset".into()).is_store_failure());
        assert!(Error::WrongType {
            key: "k".into(),
            expected: "hash"
        }
        .is_store_failure());
        assert!(!Error::InvalidQuery("empty".into()).is_store_failure());
        assert!(!Error::unknown_field("a", "text").is_store_failure());
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
