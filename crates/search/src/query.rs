//! Query model
//!
//! A query is a tree of [`Clause`]s built through a [`QueryBuilder`] that the
//! engine hands to a closure:
//!
//! ```
//! use quarry_search::query::{Clause, NumberQuery, QueryBuilder};
//!
//! let q = QueryBuilder::new();
//! let clause: Clause = vec![
//!     q.text("name", "rolling stones"),
//!     q.any([
//!         q.number("serving_size", NumberQuery::new().gt(2).lt(5)),
//!         q.boost(2.0, q.phonetic("name", "stones")),
//!     ]),
//! ]
//! .into();
//! assert!(matches!(clause, Clause::All(_)));
//! ```
//!
//! A list of clauses is a conjunction. Boosts only re-score their enclosing
//! scope; they never add members to it.

use quarry_core::{Error, FieldValue, IndexKind, Result, ScoreBound};
use serde::{Deserialize, Serialize};

use crate::registry::Plugins;
use crate::schema::FieldCatalog;

// ============================================================================
// NumberQuery
// ============================================================================

/// Numeric predicate: an exact value or a range
///
/// Bounds combine: when several lower (or upper) bounds are given, the
/// tightest one wins. Contradictory bounds match nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberQuery {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Bound {
    value: f64,
    inclusive: bool,
}

impl NumberQuery {
    /// Unbounded predicate: every posted value matches
    pub fn new() -> Self {
        Self::default()
    }

    /// Exactly `value`
    pub fn exact(value: impl Into<f64>) -> Self {
        let value = value.into();
        Self::new().min(value).max(value)
    }

    /// Strictly greater than `value`
    pub fn gt(self, value: impl Into<f64>) -> Self {
        self.with_lower(value.into(), false)
    }

    /// Strictly less than `value`
    pub fn lt(self, value: impl Into<f64>) -> Self {
        self.with_upper(value.into(), false)
    }

    /// Greater than or equal to `value`
    pub fn min(self, value: impl Into<f64>) -> Self {
        self.with_lower(value.into(), true)
    }

    /// Less than or equal to `value`
    pub fn max(self, value: impl Into<f64>) -> Self {
        self.with_upper(value.into(), true)
    }

    fn with_lower(mut self, value: f64, inclusive: bool) -> Self {
        let value = value + 0.0;
        let candidate = Bound { value, inclusive };
        self.lower = Some(match self.lower {
            None => candidate,
            Some(current) if value > current.value => candidate,
            Some(current) if value == current.value => Bound {
                value,
                inclusive: current.inclusive && inclusive,
            },
            Some(current) => current,
        });
        self
    }

    fn with_upper(mut self, value: f64, inclusive: bool) -> Self {
        let value = value + 0.0;
        let candidate = Bound { value, inclusive };
        self.upper = Some(match self.upper {
            None => candidate,
            Some(current) if value < current.value => candidate,
            Some(current) if value == current.value => Bound {
                value,
                inclusive: current.inclusive && inclusive,
            },
            Some(current) => current,
        });
        self
    }

    /// Store range bounds for this predicate
    pub fn bounds(&self) -> (ScoreBound, ScoreBound) {
        fn to_bound(bound: Option<Bound>) -> ScoreBound {
            match bound {
                None => ScoreBound::Unbounded,
                Some(Bound { value, inclusive: true }) => ScoreBound::Inclusive(value),
                Some(Bound { value, inclusive: false }) => ScoreBound::Exclusive(value),
            }
        }
        (to_bound(self.lower), to_bound(self.upper))
    }

    /// Whether no value can satisfy the predicate
    pub fn is_contradictory(&self) -> bool {
        let (lower, upper) = self.bounds();
        ScoreBound::is_empty_range(lower, upper)
    }

    fn has_nan(&self) -> bool {
        [self.lower, self.upper]
            .iter()
            .flatten()
            .any(|b| b.value.is_nan())
    }
}

impl From<f64> for NumberQuery {
    fn from(value: f64) -> Self {
        NumberQuery::exact(value)
    }
}

impl From<i64> for NumberQuery {
    fn from(value: i64) -> Self {
        NumberQuery::exact(value as f64)
    }
}

impl From<i32> for NumberQuery {
    fn from(value: i32) -> Self {
        NumberQuery::exact(value)
    }
}

// ============================================================================
// Operand / Leaf / Clause
// ============================================================================

/// Right-hand side of a leaf predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Free text, normalized the same way as indexed values
    Text(String),
    /// Numeric predicate
    Number(NumberQuery),
    /// Arbitrary value for plugin strategies
    Value(FieldValue),
}

impl Operand {
    /// Text view of the operand
    pub fn as_text(&self) -> Option<String> {
        match self {
            Operand::Text(s) => Some(s.clone()),
            Operand::Value(v) => v.as_text(),
            Operand::Number(_) => None,
        }
    }

    /// Numeric predicate view of the operand
    ///
    /// Text and values that parse as a number become an exact predicate.
    pub fn as_number_query(&self) -> Option<NumberQuery> {
        match self {
            Operand::Number(q) => Some(*q),
            Operand::Text(s) => s.trim().parse::<f64>().ok().map(NumberQuery::exact),
            Operand::Value(v) => v.as_number().map(NumberQuery::exact),
        }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::Text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::Text(s)
    }
}

impl From<NumberQuery> for Operand {
    fn from(q: NumberQuery) -> Self {
        Operand::Number(q)
    }
}

impl From<FieldValue> for Operand {
    fn from(v: FieldValue) -> Self {
        Operand::Value(v)
    }
}

/// Predicate on one indexed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Field name
    pub field: String,
    /// Index kind the field is matched through
    pub kind: IndexKind,
    /// Value to match
    pub operand: Operand,
}

/// Node of a query tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    /// Single field predicate
    Leaf(Leaf),
    /// Conjunction: records matching every child
    All(Vec<Clause>),
    /// Disjunction: records matching any child
    Any(Vec<Clause>),
    /// Child's matches with scores multiplied by `weight`
    Weighted {
        /// Score multiplier
        weight: f64,
        /// Weighted clause
        clause: Box<Clause>,
    },
    /// Adds `weight` to enclosing-scope members that also match `clause`
    Boost {
        /// Score added per boosted member
        weight: f64,
        /// Boosting clause
        clause: Box<Clause>,
    },
}

impl Clause {
    /// Whether this clause is a boost
    pub fn is_boost(&self) -> bool {
        matches!(self, Clause::Boost { .. })
    }

    /// Every leaf in the tree, depth first
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Clause::Leaf(leaf) => out.push(leaf),
            Clause::All(children) | Clause::Any(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Clause::Weighted { clause, .. } | Clause::Boost { clause, .. } => {
                clause.collect_leaves(out)
            }
        }
    }
}

impl From<Vec<Clause>> for Clause {
    fn from(children: Vec<Clause>) -> Self {
        Clause::All(children)
    }
}

impl From<Leaf> for Clause {
    fn from(leaf: Leaf) -> Self {
        Clause::Leaf(leaf)
    }
}

// ============================================================================
// QueryBuilder
// ============================================================================

/// Constructs clauses
///
/// The builder is stateless; it is handed to query closures so that query
/// code reads as a small DSL without relying on ambient scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder {
    _private: (),
}

impl QueryBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Word match on a text field
    pub fn text(&self, field: &str, value: impl Into<String>) -> Clause {
        self.leaf(IndexKind::Text, field, Operand::Text(value.into()))
    }

    /// Sounds-like match on a phonetic field
    pub fn phonetic(&self, field: &str, value: impl Into<String>) -> Clause {
        self.leaf(IndexKind::Phonetic, field, Operand::Text(value.into()))
    }

    /// Exact value or range on a number field
    pub fn number(&self, field: &str, query: impl Into<NumberQuery>) -> Clause {
        self.leaf(IndexKind::Number, field, Operand::Number(query.into()))
    }

    /// Match through any registered strategy
    pub fn custom(
        &self,
        kind: impl Into<IndexKind>,
        field: &str,
        operand: impl Into<Operand>,
    ) -> Clause {
        self.leaf(IndexKind::canonical(kind.into()), field, operand.into())
    }

    /// Conjunction of `children`
    pub fn all<I>(&self, children: I) -> Clause
    where
        I: IntoIterator<Item = Clause>,
    {
        Clause::All(children.into_iter().collect())
    }

    /// Disjunction of `children`
    pub fn any<I>(&self, children: I) -> Clause
    where
        I: IntoIterator<Item = Clause>,
    {
        Clause::Any(children.into_iter().collect())
    }

    /// Scale the scores of `clause` by `weight`
    pub fn weighted(&self, weight: f64, clause: Clause) -> Clause {
        Clause::Weighted {
            weight,
            clause: Box::new(clause),
        }
    }

    /// Add `weight` to enclosing-scope members matching `clause`
    pub fn boost(&self, weight: f64, clause: Clause) -> Clause {
        Clause::Boost {
            weight,
            clause: Box::new(clause),
        }
    }

    fn leaf(&self, kind: IndexKind, field: &str, operand: Operand) -> Clause {
        Clause::Leaf(Leaf {
            field: field.to_string(),
            kind,
            operand,
        })
    }
}

// ============================================================================
// Query
// ============================================================================

/// Validated clause tree for one record type
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    record_type: String,
    root: Clause,
}

impl Query {
    /// Validate `root` against a record type's fields and the plugin registry
    ///
    /// # Errors
    ///
    /// - `InvalidIndexKind` when a leaf names a kind with no strategy
    /// - `UnknownField` when a leaf names a field not registered with that kind
    /// - `InvalidQuery` for non-matchable kinds, non-finite weights and NaN bounds
    pub fn new(catalog: &FieldCatalog, plugins: &Plugins, root: Clause) -> Result<Self> {
        validate(&root, catalog, plugins)?;
        Ok(Self {
            record_type: catalog.record_type().to_string(),
            root,
        })
    }

    /// Record type the query targets
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Root clause
    pub fn root(&self) -> &Clause {
        &self.root
    }
}

fn validate(clause: &Clause, catalog: &FieldCatalog, plugins: &Plugins) -> Result<()> {
    match clause {
        Clause::Leaf(leaf) => {
            let strategy = plugins.strategy(&leaf.kind)?;
            if !strategy.is_matchable() {
                return Err(Error::InvalidQuery(format!(
                    "fields indexed as {} cannot be matched",
                    leaf.kind
                )));
            }
            catalog.require(&leaf.field, &leaf.kind)?;
            if let Operand::Number(q) = &leaf.operand {
                if q.has_nan() {
                    return Err(Error::InvalidQuery(format!(
                        "NaN bound on field {}",
                        leaf.field
                    )));
                }
            }
            Ok(())
        }
        Clause::All(children) | Clause::Any(children) => children
            .iter()
            .try_for_each(|child| validate(child, catalog, plugins)),
        Clause::Weighted { weight, clause } | Clause::Boost { weight, clause } => {
            if !weight.is_finite() {
                return Err(Error::InvalidQuery(format!("weight {weight} is not finite")));
            }
            validate(clause, catalog, plugins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_query_tightest_bound_wins() {
        let q = NumberQuery::new().min(2).gt(2).max(10).lt(5);
        assert_eq!(
            q.bounds(),
            (ScoreBound::Exclusive(2.0), ScoreBound::Exclusive(5.0))
        );

        let q = NumberQuery::new().gt(1).min(3);
        assert_eq!(q.bounds().0, ScoreBound::Inclusive(3.0));
    }

    #[test]
    fn test_number_query_exact_and_unbounded() {
        assert_eq!(
            NumberQuery::from(4).bounds(),
            (ScoreBound::Inclusive(4.0), ScoreBound::Inclusive(4.0))
        );
        assert_eq!(
            NumberQuery::new().bounds(),
            (ScoreBound::Unbounded, ScoreBound::Unbounded)
        );
    }

    #[test]
    fn test_number_query_contradiction() {
        assert!(NumberQuery::new().min(10).max(1).is_contradictory());
        assert!(NumberQuery::new().gt(3).lt(3).is_contradictory());
        assert!(!NumberQuery::new().min(3).max(3).is_contradictory());
    }

    #[test]
    fn test_vec_of_clauses_is_conjunction() {
        let q = QueryBuilder::new();
        let clause: Clause = vec![q.text("name", "abba"), q.number("size", 3)].into();
        match clause {
            Clause::All(children) => assert_eq!(children.len(), 2),
            other => panic!("expected All, got {other:?}"),
        }
    }

    #[test]
    fn test_leaves_walks_whole_tree() {
        let q = QueryBuilder::new();
        let clause = q.all([
            q.text("name", "a"),
            q.any([
                q.weighted(2.0, q.phonetic("name", "b")),
                q.boost(1.0, q.custom("initial", "name", "c")),
            ]),
        ]);
        let fields: Vec<String> = clause
            .leaves()
            .iter()
            .map(|l| format!("{}/{}", l.kind, l.field))
            .collect();
        assert_eq!(fields, vec!["text/name", "phonetic/name", "initial/name"]);
    }

    #[test]
    fn test_operand_views() {
        assert_eq!(
            Operand::from("7").as_number_query(),
            Some(NumberQuery::exact(7.0))
        );
        assert_eq!(Operand::from("seven").as_number_query(), None);
        assert_eq!(
            Operand::from(FieldValue::List(vec!["a".into(), "b".into()])).as_text(),
            Some("a b".to_string())
        );
        assert_eq!(Operand::from(NumberQuery::new()).as_text(), None);
    }
}
