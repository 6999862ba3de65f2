//! Score-ordered member collection backing sorted structures

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound;

use quarry_core::ScoreBound;
use rustc_hash::FxHashMap;

/// f64 with a total order, so it can key a BTreeSet
#[derive(Debug, Clone, Copy)]
struct OrderedScore(f64);

impl PartialEq for OrderedScore {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedScore {}

impl PartialOrd for OrderedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by score, ties by member name
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: FxHashMap<String, f64>,
    ordered: BTreeSet<(OrderedScore, String)>,
}

impl SortedSet {
    /// Create an empty sorted set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or re-score; returns true if the member is new
    ///
    /// `-0.0` is stored as `0.0` so it compares equal to zero in range scans.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        let score = score + 0.0;
        match self.scores.insert(member.to_string(), score) {
            Some(old) => {
                self.ordered.remove(&(OrderedScore(old), member.to_string()));
                self.ordered.insert((OrderedScore(score), member.to_string()));
                false
            }
            None => {
                self.ordered.insert((OrderedScore(score), member.to_string()));
                true
            }
        }
    }

    /// Remove a member; returns true if it was present
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(old) => {
                self.ordered.remove(&(OrderedScore(old), member.to_string()));
                true
            }
            None => false,
        }
    }

    /// Score of a member
    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Members within `lower..upper`, ascending by score
    ///
    /// Contradictory bounds give an empty result rather than a panic.
    pub fn range(&self, lower: ScoreBound, upper: ScoreBound) -> Vec<String> {
        if ScoreBound::is_empty_range(lower, upper) {
            return Vec::new();
        }
        let start = match lower {
            ScoreBound::Unbounded => Bound::Unbounded,
            ScoreBound::Inclusive(l) | ScoreBound::Exclusive(l) => {
                Bound::Included((OrderedScore(l + 0.0), String::new()))
            }
        };
        self.ordered
            .range((start, Bound::Unbounded))
            .filter(|(s, _)| lower.admits_from_below(s.0))
            .take_while(|(s, _)| upper.admits_from_above(s.0))
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether there are no members
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
