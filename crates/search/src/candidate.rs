//! Candidate sets: the output of evaluating any clause

use std::collections::HashMap;

use quarry_core::RecordId;

/// Per-record relevance scores
pub type Scores = HashMap<RecordId, f64>;

/// Ids and scores produced by evaluating a clause
///
/// The ids live in the store under `key` (a posting set, or an ephemeral set
/// owned by the running evaluation); `scores` carries the clause-local score
/// of each of those ids. An id without an entry in `scores` scores 0.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    key: String,
    scores: Scores,
}

impl CandidateSet {
    /// Create a candidate set over the set stored at `key`
    pub fn new(key: impl Into<String>, scores: Scores) -> Self {
        Self {
            key: key.into(),
            scores,
        }
    }

    /// Store key holding the candidate ids
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Scores by id
    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    /// Score of one id
    pub fn score(&self, id: &RecordId) -> f64 {
        self.scores.get(id).copied().unwrap_or(0.0)
    }

    /// Multiply every score by `weight`
    pub fn scale(&mut self, weight: f64) {
        for score in self.scores.values_mut() {
            *score *= weight;
        }
    }

    /// Add `delta` to the score of `id`
    pub fn add(&mut self, id: RecordId, delta: f64) {
        *self.scores.entry(id).or_insert(0.0) += delta;
    }

    /// Consume into key and scores
    pub fn into_parts(self) -> (String, Scores) {
        (self.key, self.scores)
    }
}

/// Order ids by descending score, ties broken by ascending record id
pub fn rank(ids: Vec<RecordId>, scores: &Scores) -> Vec<RecordId> {
    let mut ids = ids;
    ids.sort_by(|a, b| {
        let sa = scores.get(a).copied().unwrap_or(0.0);
        let sb = scores.get(b).copied().unwrap_or(0.0);
        sb.total_cmp(&sa).then_with(|| a.cmp(b))
    });
    ids
}
