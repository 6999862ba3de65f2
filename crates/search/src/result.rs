//! Result sets
//!
//! A [`ResultSet`] holds the ranked ids of one evaluated query plus a view
//! configuration:
//!
//! - a window (`range`, `page`, `slice`, `unwindowed`) selecting what `ids()`
//!   and `records()` return; `size()` always counts the whole sequence
//! - an optional sort override ordering by a sort field instead of score
//! - post-processors applied by name, which rewrite the sequence in place
//!
//! Records are fetched lazily through a [`RecordSource`]; ids the source no
//! longer knows are skipped.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use quarry_core::{IndexKind, RecordId, Result, SetStore, WriteOp};
use tracing::{debug, trace};

use crate::candidate::Scores;
use crate::evaluator::Ranked;
use crate::registry::Plugins;
use crate::schema::FieldCatalog;

// ============================================================================
// Post-processors
// ============================================================================

/// Rewrites a ranked id sequence
///
/// Processors may filter, reorder or truncate; ids they return must come
/// from the input.
pub trait ResultProcessor: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Produce the new sequence from the current one
    fn process(&self, ids: Vec<RecordId>, scores: &Scores) -> Vec<RecordId>;
}

/// Drops ids scoring below a minimum
#[derive(Debug, Clone)]
pub struct ScoreThreshold {
    name: String,
    min: f64,
}

impl ScoreThreshold {
    /// Processor named `name` keeping ids with score `>= min`
    pub fn new(name: impl Into<String>, min: f64) -> Self {
        Self {
            name: name.into(),
            min,
        }
    }
}

impl ResultProcessor for ScoreThreshold {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ids: Vec<RecordId>, scores: &Scores) -> Vec<RecordId> {
        ids.into_iter()
            .filter(|id| scores.get(id).copied().unwrap_or(0.0) >= self.min)
            .collect()
    }
}

// ============================================================================
// Record sources
// ============================================================================

/// Resolves record ids to application records
pub trait RecordSource {
    /// Record type produced
    type Record;

    /// Fetch one record; `Ok(None)` when the id no longer resolves
    fn fetch(&self, id: &RecordId) -> Result<Option<Self::Record>>;
}

impl<R: Clone> RecordSource for HashMap<RecordId, R> {
    type Record = R;

    fn fetch(&self, id: &RecordId) -> Result<Option<R>> {
        Ok(self.get(id).cloned())
    }
}

impl<R: Clone> RecordSource for BTreeMap<RecordId, R> {
    type Record = R;

    fn fetch(&self, id: &RecordId) -> Result<Option<R>> {
        Ok(self.get(id).cloned())
    }
}

/// Record source backed by a closure
pub struct FromFn<F>(pub F);

impl<F, R> RecordSource for FromFn<F>
where
    F: Fn(&RecordId) -> Result<Option<R>>,
{
    type Record = R;

    fn fetch(&self, id: &RecordId) -> Result<Option<R>> {
        (self.0)(id)
    }
}

/// Lazy iterator over the records of a window
pub struct Records<'s, S: ?Sized> {
    source: &'s S,
    ids: std::vec::IntoIter<RecordId>,
}

impl<'s, S: RecordSource + ?Sized> Iterator for Records<'s, S> {
    type Item = Result<S::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.ids.by_ref() {
            match self.source.fetch(&id) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => trace!(id = %id, "skipping unresolvable record"),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len()))
    }
}

// ============================================================================
// Window / sort
// ============================================================================

/// Portion of the ordered sequence exposed by `ids()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Everything
    #[default]
    All,
    /// `length` ids starting at `offset`
    Range {
        /// First position, 0-based
        offset: usize,
        /// Maximum number of ids
        length: usize,
    },
}

impl Window {
    fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match *self {
            Window::All => items,
            Window::Range { offset, length } => {
                let start = offset.min(items.len());
                let end = offset.saturating_add(length).min(items.len());
                &items[start..end]
            }
        }
    }
}

/// Direction of a sort override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending comparison keys
    Asc,
    /// Descending comparison keys
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortSpec {
    field: String,
    order: SortOrder,
}

// ============================================================================
// ResultSet
// ============================================================================

/// Ranked ids of one query with a configurable view
pub struct ResultSet {
    store: Arc<dyn SetStore>,
    catalog: Arc<FieldCatalog>,
    plugins: Arc<Plugins>,
    base: Vec<RecordId>,
    scores: Scores,
    window: Window,
    sort: Option<SortSpec>,
    ordered: OnceCell<Vec<RecordId>>,
}

impl ResultSet {
    pub(crate) fn new(
        store: Arc<dyn SetStore>,
        catalog: Arc<FieldCatalog>,
        plugins: Arc<Plugins>,
        ranked: Ranked,
    ) -> Self {
        Self {
            store,
            catalog,
            plugins,
            base: ranked.ids,
            scores: ranked.scores,
            window: Window::All,
            sort: None,
            ordered: OnceCell::new(),
        }
    }

    /// Record type of the results
    pub fn record_type(&self) -> &str {
        self.catalog.record_type()
    }

    /// Number of results, ignoring the window
    pub fn size(&self) -> usize {
        self.base.len()
    }

    /// Whether there are no results
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Score of `id`, if it is a result
    pub fn score(&self, id: &RecordId) -> Option<f64> {
        self.scores.get(id).copied()
    }

    /// All scores
    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    /// Current window
    pub fn window(&self) -> Window {
        self.window
    }

    /// Ordered ids in the current window
    pub fn ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.window.apply(self.ordered()?).to_vec())
    }

    /// Ordered ids ignoring the window
    pub fn all_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.ordered()?.to_vec())
    }

    /// First id of the current window
    pub fn first(&self) -> Result<Option<RecordId>> {
        Ok(self.window.apply(self.ordered()?).first().cloned())
    }

    /// Window of `length` ids starting at `offset`
    pub fn range(&mut self, offset: usize, length: usize) -> &mut Self {
        self.window = Window::Range { offset, length };
        self
    }

    /// Window for 1-based `page` of `limit` ids; page 0 is treated as page 1
    pub fn page(&mut self, page: usize, limit: usize) -> &mut Self {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        self.range(offset, limit)
    }

    /// Window over a position range
    pub fn slice<B: RangeBounds<usize>>(&mut self, bounds: B) -> &mut Self {
        let start = match bounds.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match bounds.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => usize::MAX,
        };
        self.range(start, end.saturating_sub(start))
    }

    /// Remove the window
    pub fn unwindowed(&mut self) -> &mut Self {
        self.window = Window::All;
        self
    }

    /// Order by the sort field `field`, ascending
    ///
    /// # Errors
    ///
    /// `UnknownField` if `field` is not registered as a sort field.
    pub fn sort_by(&mut self, field: &str) -> Result<&mut Self> {
        self.set_sort(field, SortOrder::Asc)
    }

    /// Order by the sort field `field`, descending
    ///
    /// Missing keys still sort last and ties still break on ascending id.
    pub fn sort_by_desc(&mut self, field: &str) -> Result<&mut Self> {
        self.set_sort(field, SortOrder::Desc)
    }

    /// Drop the sort override and return to score order
    pub fn by_relevance(&mut self) -> &mut Self {
        if self.sort.take().is_some() {
            self.ordered.take();
        }
        self
    }

    /// Active sort override
    pub fn sort_order(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|s| (s.field.as_str(), s.order))
    }

    /// Apply the post-processor registered as `name`
    ///
    /// The processor receives the full current ordering (sort override
    /// included) and its output becomes the new sequence: `size()` and later
    /// windows reflect it, and the sort override is consumed.
    ///
    /// # Errors
    ///
    /// `UnknownProcessor` if nothing is registered as `name`.
    pub fn process(&mut self, name: &str) -> Result<&mut Self> {
        let processor = self.plugins.processor(name)?;
        let current = self.all_ids()?;
        let before = current.len();
        self.base = processor.process(current, &self.scores);
        self.sort = None;
        self.ordered.take();
        debug!(processor = %name, before, after = self.base.len(), "applied result processor");
        Ok(self)
    }

    /// Store the full result as a persistent set at `dest`, replacing it
    ///
    /// Returns the number of ids stored.
    pub fn retain_as(&self, dest: &str) -> Result<usize> {
        let ids = self.ordered()?;
        let mut ops = Vec::with_capacity(ids.len() + 1);
        ops.push(WriteOp::Delete {
            key: dest.to_string(),
        });
        ops.extend(ids.iter().map(|id| WriteOp::AddMember {
            key: dest.to_string(),
            member: id.as_str().to_string(),
        }));
        self.store.apply_batch(&ops)?;
        debug!(key = %dest, count = ids.len(), "retained result set");
        Ok(ids.len())
    }

    /// Lazily fetch the records of the current window from `source`
    pub fn records<'s, S>(&self, source: &'s S) -> Result<Records<'s, S>>
    where
        S: RecordSource + ?Sized,
    {
        Ok(Records {
            source,
            ids: self.ids()?.into_iter(),
        })
    }

    fn set_sort(&mut self, field: &str, order: SortOrder) -> Result<&mut Self> {
        self.catalog.require(field, &IndexKind::Sort)?;
        let spec = SortSpec {
            field: field.to_string(),
            order,
        };
        if self.sort.as_ref() != Some(&spec) {
            self.sort = Some(spec);
            self.ordered.take();
        }
        Ok(self)
    }

    fn ordered(&self) -> Result<&[RecordId]> {
        self.ordered
            .get_or_try_init(|| self.compute_order())
            .map(Vec::as_slice)
    }

    fn compute_order(&self) -> Result<Vec<RecordId>> {
        let Some(sort) = &self.sort else {
            return Ok(self.base.clone());
        };
        let key = self.catalog.keys().field(&IndexKind::Sort, &sort.field);
        let fields: Vec<String> = self.base.iter().map(|id| id.as_str().to_string()).collect();
        let values = self.store.hash_get_many(&key, &fields)?;

        let mut keyed: Vec<(Option<String>, RecordId)> =
            values.into_iter().zip(self.base.iter().cloned()).collect();
        keyed.sort_by(|(ka, ia), (kb, ib)| {
            let by_key = match (ka, kb) {
                (Some(a), Some(b)) => match sort.order {
                    SortOrder::Asc => a.cmp(b),
                    SortOrder::Desc => b.cmp(a),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_key.then_with(|| ia.cmp(ib))
        });
        Ok(keyed.into_iter().map(|(_, id)| id).collect())
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("record_type", &self.record_type())
            .field("size", &self.size())
            .field("window", &self.window)
            .field("sort", &self.sort)
            .finish()
    }
}
