//! Store key layout for Quarry
//!
//! Every structure the engine writes lives under a namespace prefix and the
//! record type it belongs to:
//!
//! ```text
//! {namespace}:{record_type}:{kind}:{field}:{token}   text/phonetic postings (set)
//! {namespace}:{record_type}:number:{field}           numeric postings (sorted)
//! {namespace}:{record_type}:sort:{field}             comparison keys (hash)
//! {namespace}:{record_type}:_postings:{record_id}    posting manifest (set)
//! {namespace}:_tmp:{uuid}                            ephemeral result sets
//! ```
//!
//! Tokens produced by the normalizer never contain `:`; field and record type
//! names are supplied by the application and used verbatim.

use uuid::Uuid;

use crate::types::{IndexKind, RecordId};

/// Key builder scoped to one record type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySpace {
    namespace: String,
    record_type: String,
}

impl KeySpace {
    /// Create a key space for `record_type` under `namespace`
    pub fn new(namespace: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            record_type: record_type.into(),
        }
    }

    /// Namespace prefix shared by all record types
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Record type this key space belongs to
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Prefix for every key of this record type
    pub fn prefix(&self) -> String {
        format!("{}:{}", self.namespace, self.record_type)
    }

    /// Set of record ids posted under `token` for a token-based field
    pub fn posting(&self, kind: &IndexKind, field: &str, token: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix(), kind.as_str(), field, token)
    }

    /// Per-field structure for kinds that keep a single structure per field
    pub fn field(&self, kind: &IndexKind, field: &str) -> String {
        format!("{}:{}:{}", self.prefix(), kind.as_str(), field)
    }

    /// Posting manifest of a record
    pub fn manifest(&self, id: &RecordId) -> String {
        format!("{}:_postings:{}", self.prefix(), id)
    }

    /// Fresh, never-before-used name for an ephemeral set
    pub fn ephemeral(&self) -> String {
        ephemeral_key(&self.namespace)
    }
}

/// Fresh ephemeral key name under `namespace`
pub fn ephemeral_key(namespace: &str) -> String {
    format!("{}:_tmp:{}", namespace, Uuid::new_v4().simple())
}
