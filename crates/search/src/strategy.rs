//! Index strategies
//!
//! A strategy decides two things for one index kind:
//! - which postings a field value produces when a record is indexed
//! - how a leaf predicate on such a field turns into a [`CandidateSet`]
//!
//! Built-in strategies:
//!
//! | kind       | postings                                  | leaf match                       |
//! |------------|-------------------------------------------|----------------------------------|
//! | `text`     | record id in one set per token            | union of token sets, +1 per hit  |
//! | `phonetic` | record id in one set per Metaphone code   | union of code sets, +1 per hit   |
//! | `number`   | record id in a sorted set, scored by value| range scan, score 1              |
//! | `sort`     | comparison key in a per-field hash        | not matchable                    |
//!
//! Plugins implement [`IndexStrategy`] and are registered by name in
//! [`Plugins`](crate::registry::Plugins).

use quarry_core::{
    Config, Error, FieldValue, IndexKind, KeySpace, RecordId, Result, SetStore, WriteOp,
};

use crate::algebra::SetAlgebra;
use crate::candidate::{CandidateSet, Scores};
use crate::normalizer::{sort_key, tokenize_unique};
use crate::phonetic::encode_tokens;
use crate::query::Operand;

// ============================================================================
// Postings
// ============================================================================

/// One store write produced by indexing a field value
#[derive(Debug, Clone, PartialEq)]
pub enum Posting {
    /// Record id added to the set at `key`
    Member {
        /// Posting set
        key: String,
    },
    /// Record id inserted into the sorted set at `key` with `score`
    Sorted {
        /// Sorted set
        key: String,
        /// Ordering value
        score: f64,
    },
    /// `value` stored under the record id in the hash at `key`
    Keyed {
        /// Hash
        key: String,
        /// Stored value
        value: String,
    },
}

impl Posting {
    /// Store key the posting writes to
    pub fn key(&self) -> &str {
        match self {
            Posting::Member { key } | Posting::Sorted { key, .. } | Posting::Keyed { key, .. } => {
                key
            }
        }
    }

    /// Manifest entry recording this posting
    pub fn manifest_ref(&self) -> PostingRef {
        match self {
            Posting::Member { key } => PostingRef::Set(key.clone()),
            Posting::Sorted { key, .. } => PostingRef::Sorted(key.clone()),
            Posting::Keyed { key, .. } => PostingRef::Hash(key.clone()),
        }
    }

    /// Write that applies this posting for `id`
    pub fn write_op(&self, id: &RecordId) -> WriteOp {
        let member = id.as_str().to_string();
        match self {
            Posting::Member { key } => WriteOp::AddMember {
                key: key.clone(),
                member,
            },
            Posting::Sorted { key, score } => WriteOp::SortedInsert {
                key: key.clone(),
                member,
                score: *score,
            },
            Posting::Keyed { key, value } => WriteOp::HashSet {
                key: key.clone(),
                field: member,
                value: value.clone(),
            },
        }
    }
}

/// Manifest entry: which structure a record was posted into
///
/// Encoded as `s:<key>`, `z:<key>` or `h:<key>` so that a record's postings
/// can be removed without re-deriving them from the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostingRef {
    /// Posting set
    Set(String),
    /// Sorted set
    Sorted(String),
    /// Hash
    Hash(String),
}

impl PostingRef {
    /// Manifest encoding
    pub fn encode(&self) -> String {
        match self {
            PostingRef::Set(key) => format!("s:{key}"),
            PostingRef::Sorted(key) => format!("z:{key}"),
            PostingRef::Hash(key) => format!("h:{key}"),
        }
    }

    /// Parse a manifest entry; unknown tags yield `None`
    pub fn decode(encoded: &str) -> Option<Self> {
        let (tag, key) = encoded.split_once(':')?;
        let key = key.to_string();
        match tag {
            "s" => Some(PostingRef::Set(key)),
            "z" => Some(PostingRef::Sorted(key)),
            "h" => Some(PostingRef::Hash(key)),
            _ => None,
        }
    }

    /// Write that removes `id` from the referenced structure
    pub fn removal_op(&self, id: &RecordId) -> WriteOp {
        let member = id.as_str().to_string();
        match self {
            PostingRef::Set(key) => WriteOp::RemoveMember {
                key: key.clone(),
                member,
            },
            PostingRef::Sorted(key) => WriteOp::SortedRemove {
                key: key.clone(),
                member,
            },
            PostingRef::Hash(key) => WriteOp::HashDelete {
                key: key.clone(),
                field: member,
            },
        }
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// What a strategy sees while producing postings
#[derive(Debug, Clone, Copy)]
pub struct IndexContext<'a> {
    /// Key layout of the record type
    pub keys: &'a KeySpace,
    /// Engine configuration
    pub config: &'a Config,
    /// Kind the field was registered with
    pub kind: &'a IndexKind,
}

/// What a strategy sees while matching a leaf
pub struct LeafContext<'a, 's> {
    /// Key layout of the record type
    pub keys: &'a KeySpace,
    /// Engine configuration
    pub config: &'a Config,
    /// Kind the leaf matches through
    pub kind: &'a IndexKind,
    /// Set algebra of the running evaluation; derived keys are released with it
    pub algebra: &'a mut SetAlgebra<'s>,
}

impl<'a, 's> LeafContext<'a, 's> {
    /// The store
    pub fn store(&self) -> &'s dyn SetStore {
        self.algebra.store()
    }
}

// ============================================================================
// IndexStrategy
// ============================================================================

/// Indexing and matching behaviour of one index kind
pub trait IndexStrategy: Send + Sync {
    /// Registry name; equal to the `IndexKind` name fields use
    fn name(&self) -> &str;

    /// Postings for a non-null field value
    fn postings(&self, ctx: &IndexContext<'_>, field: &str, value: &FieldValue)
        -> Result<Vec<Posting>>;

    /// Candidate set for a leaf predicate on `field`
    fn evaluate(
        &self,
        ctx: &mut LeafContext<'_, '_>,
        field: &str,
        operand: &Operand,
    ) -> Result<CandidateSet>;

    /// Whether leaves may target fields of this kind
    fn is_matchable(&self) -> bool {
        true
    }
}

// ============================================================================
// Token strategies
// ============================================================================

fn text_of(field: &str, value: &FieldValue) -> Result<String> {
    value
        .as_text()
        .ok_or_else(|| Error::invalid_value(field, "expected text"))
}

fn operand_text(field: &str, operand: &Operand) -> Result<String> {
    operand
        .as_text()
        .ok_or_else(|| Error::InvalidQuery(format!("field {field} expects a text operand")))
}

fn token_postings(ctx: &IndexContext<'_>, field: &str, tokens: Vec<String>) -> Vec<Posting> {
    tokens
        .into_iter()
        .map(|token| Posting::Member {
            key: ctx.keys.posting(ctx.kind, field, &token),
        })
        .collect()
}

/// Union of the token posting sets, scoring +1 per token set holding an id
fn token_match(
    ctx: &mut LeafContext<'_, '_>,
    field: &str,
    tokens: Vec<String>,
) -> Result<CandidateSet> {
    let keys: Vec<String> = tokens
        .iter()
        .map(|token| ctx.keys.posting(ctx.kind, field, token))
        .collect();

    let store = ctx.store();
    let mut scores = Scores::new();
    for key in &keys {
        for member in store.members(key)? {
            *scores.entry(RecordId::new(member)).or_insert(0.0) += 1.0;
        }
    }
    let key = ctx.algebra.union(&keys)?;
    Ok(CandidateSet::new(key, scores))
}

/// Word postings
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStrategy;

impl IndexStrategy for TextStrategy {
    fn name(&self) -> &str {
        "text"
    }

    fn postings(
        &self,
        ctx: &IndexContext<'_>,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Posting>> {
        let text = text_of(field, value)?;
        Ok(token_postings(ctx, field, tokenize_unique(&text, ctx.config)))
    }

    fn evaluate(
        &self,
        ctx: &mut LeafContext<'_, '_>,
        field: &str,
        operand: &Operand,
    ) -> Result<CandidateSet> {
        let text = operand_text(field, operand)?;
        let tokens = tokenize_unique(&text, ctx.config);
        token_match(ctx, field, tokens)
    }
}

/// Sounds-like postings keyed by Metaphone codes
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneticStrategy;

impl IndexStrategy for PhoneticStrategy {
    fn name(&self) -> &str {
        "phonetic"
    }

    fn postings(
        &self,
        ctx: &IndexContext<'_>,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Posting>> {
        let text = text_of(field, value)?;
        let codes = encode_tokens(&tokenize_unique(&text, ctx.config));
        Ok(token_postings(ctx, field, codes))
    }

    fn evaluate(
        &self,
        ctx: &mut LeafContext<'_, '_>,
        field: &str,
        operand: &Operand,
    ) -> Result<CandidateSet> {
        let text = operand_text(field, operand)?;
        let codes = encode_tokens(&tokenize_unique(&text, ctx.config));
        token_match(ctx, field, codes)
    }
}

// ============================================================================
// Number
// ============================================================================

/// Value-ordered postings for exact and range predicates
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberStrategy;

impl IndexStrategy for NumberStrategy {
    fn name(&self) -> &str {
        "number"
    }

    fn postings(
        &self,
        ctx: &IndexContext<'_>,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Posting>> {
        let score = value
            .as_number()
            .ok_or_else(|| Error::invalid_value(field, "expected a number"))?;
        if score.is_nan() {
            return Err(Error::invalid_value(field, "NaN cannot be indexed"));
        }
        Ok(vec![Posting::Sorted {
            key: ctx.keys.field(ctx.kind, field),
            score: score + 0.0,
        }])
    }

    fn evaluate(
        &self,
        ctx: &mut LeafContext<'_, '_>,
        field: &str,
        operand: &Operand,
    ) -> Result<CandidateSet> {
        let query = operand.as_number_query().ok_or_else(|| {
            Error::InvalidQuery(format!("field {field} expects a numeric operand"))
        })?;
        let members = if query.is_contradictory() {
            Vec::new()
        } else {
            let (lower, upper) = query.bounds();
            ctx.store()
                .sorted_range(&ctx.keys.field(ctx.kind, field), lower, upper)?
        };
        let scores: Scores = members
            .iter()
            .map(|m| (RecordId::new(m.as_str()), 1.0))
            .collect();
        let key = ctx.algebra.materialize(&members)?;
        Ok(CandidateSet::new(key, scores))
    }
}

// ============================================================================
// Sort
// ============================================================================

/// Hex encoding of `n` whose byte order matches numeric order
fn numeric_sort_key(n: f64) -> String {
    let bits = (n + 0.0).to_bits();
    let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
    format!("{ordered:016x}")
}

/// Per-record comparison keys used to order results
#[derive(Debug, Clone, Copy, Default)]
pub struct SortStrategy;

impl IndexStrategy for SortStrategy {
    fn name(&self) -> &str {
        "sort"
    }

    fn postings(
        &self,
        ctx: &IndexContext<'_>,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<Posting>> {
        let value = match value {
            FieldValue::Number(n) => numeric_sort_key(*n),
            other => sort_key(&text_of(field, other)?),
        };
        Ok(vec![Posting::Keyed {
            key: ctx.keys.field(ctx.kind, field),
            value,
        }])
    }

    fn evaluate(
        &self,
        _ctx: &mut LeafContext<'_, '_>,
        field: &str,
        _operand: &Operand,
    ) -> Result<CandidateSet> {
        Err(Error::InvalidQuery(format!(
            "sort field {field} cannot be matched"
        )))
    }

    fn is_matchable(&self) -> bool {
        false
    }
}
