//! Store abstraction
//!
//! This module defines the `SetStore` trait: the only storage contract the
//! engine relies on. Any key-value/set-oriented backend that offers these
//! operation semantics can host an index; `quarry-storage` ships an in-memory
//! reference implementation.
//!
//! Semantics follow the usual set-store conventions:
//! - A missing key behaves as an empty structure of whatever type is asked for
//! - Writing an empty result into a key deletes the key
//! - Addressing a key that holds a different structure fails with `WrongType`

use std::time::Duration;

use crate::error::Result;

// ============================================================================
// ScoreBound
// ============================================================================

/// One end of a score range for sorted-structure queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// No limit on this side
    Unbounded,
    /// Scores equal to the bound are included
    Inclusive(f64),
    /// Scores equal to the bound are excluded
    Exclusive(f64),
}

impl ScoreBound {
    /// Whether `score` satisfies this bound used as a lower bound
    pub fn admits_from_below(&self, score: f64) -> bool {
        match *self {
            ScoreBound::Unbounded => true,
            ScoreBound::Inclusive(b) => score >= b,
            ScoreBound::Exclusive(b) => score > b,
        }
    }

    /// Whether `score` satisfies this bound used as an upper bound
    pub fn admits_from_above(&self, score: f64) -> bool {
        match *self {
            ScoreBound::Unbounded => true,
            ScoreBound::Inclusive(b) => score <= b,
            ScoreBound::Exclusive(b) => score < b,
        }
    }

    /// Whether no score can satisfy `lower..upper`
    pub fn is_empty_range(lower: ScoreBound, upper: ScoreBound) -> bool {
        use ScoreBound::*;
        match (lower, upper) {
            (Unbounded, _) | (_, Unbounded) => false,
            (Inclusive(l), Inclusive(u)) => l > u,
            (Inclusive(l), Exclusive(u)) | (Exclusive(l), Inclusive(u)) => l >= u,
            (Exclusive(l), Exclusive(u)) => l >= u,
        }
    }
}

// ============================================================================
// WriteOp
// ============================================================================

/// A single mutation inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Add `member` to the set at `key`
    AddMember {
        /// Set key
        key: String,
        /// Member to add
        member: String,
    },
    /// Remove `member` from the set at `key`
    RemoveMember {
        /// Set key
        key: String,
        /// Member to remove
        member: String,
    },
    /// Insert or re-score `member` in the sorted structure at `key`
    SortedInsert {
        /// Sorted structure key
        key: String,
        /// Member to insert
        member: String,
        /// Score to associate
        score: f64,
    },
    /// Remove `member` from the sorted structure at `key`
    SortedRemove {
        /// Sorted structure key
        key: String,
        /// Member to remove
        member: String,
    },
    /// Set `field` of the hash at `key`
    HashSet {
        /// Hash key
        key: String,
        /// Hash field
        field: String,
        /// Value to store
        value: String,
    },
    /// Delete `field` of the hash at `key`
    HashDelete {
        /// Hash key
        key: String,
        /// Hash field
        field: String,
    },
    /// Delete the whole key
    Delete {
        /// Key to delete
        key: String,
    },
    /// Attach a time-to-live to `key` if it exists, as [`SetStore::expire`]
    Expire {
        /// Key to expire
        key: String,
        /// Time-to-live
        ttl: Duration,
    },
}

// ============================================================================
// SetStore
// ============================================================================

/// Set-oriented storage contract
///
/// Thread safety: all methods must be safe to call concurrently from multiple
/// threads (requires Send + Sync). Every individual method is atomic;
/// `apply_batch` is atomic as a whole.
pub trait SetStore: Send + Sync {
    // ------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------

    /// Add members to a set, returning how many were not already present
    fn add_members(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Remove members from a set, returning how many were present
    fn remove_members(&self, key: &str, members: &[String]) -> Result<usize>;

    /// All members of a set, in unspecified order
    fn members(&self, key: &str) -> Result<Vec<String>>;

    /// Whether `member` belongs to the set
    fn is_member(&self, key: &str, member: &str) -> Result<bool>;

    /// Number of members in the set
    fn cardinality(&self, key: &str) -> Result<usize>;

    /// Overwrite `dest` with the union of `keys`; returns the result size
    ///
    /// `dest` may appear among `keys`. Any expiry on `dest` is cleared.
    fn union_into(&self, dest: &str, keys: &[String]) -> Result<usize>;

    /// Overwrite `dest` with the intersection of `keys`; returns the result size
    ///
    /// `dest` may appear among `keys`. Any expiry on `dest` is cleared.
    fn intersect_into(&self, dest: &str, keys: &[String]) -> Result<usize>;

    /// [`union_into`](Self::union_into), with `dest` expiring after `ttl`
    ///
    /// The default issues `union_into` then `expire`. A process that dies
    /// between the two leaves `dest` without expiry; stores able to write and
    /// expire under one atomic step should override this.
    fn union_into_expiring(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<usize> {
        let len = self.union_into(dest, keys)?;
        self.expire(dest, ttl)?;
        Ok(len)
    }

    /// [`intersect_into`](Self::intersect_into), with `dest` expiring after `ttl`
    ///
    /// Same atomicity caveat as [`union_into_expiring`](Self::union_into_expiring).
    fn intersect_into_expiring(
        &self,
        dest: &str,
        keys: &[String],
        ttl: Duration,
    ) -> Result<usize> {
        let len = self.intersect_into(dest, keys)?;
        self.expire(dest, ttl)?;
        Ok(len)
    }

    // ------------------------------------------------------------------
    // Sorted structures
    // ------------------------------------------------------------------

    /// Insert or re-score a member; returns true if it was newly added
    fn sorted_insert(&self, key: &str, member: &str, score: f64) -> Result<bool>;

    /// Remove a member; returns true if it was present
    fn sorted_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Members whose score lies within `lower..upper`, ascending by score
    fn sorted_range(&self, key: &str, lower: ScoreBound, upper: ScoreBound)
        -> Result<Vec<String>>;

    // ------------------------------------------------------------------
    // Hashes
    // ------------------------------------------------------------------

    /// Set a hash field; returns true if the field was new
    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    /// Read a hash field
    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Read several hash fields at once, positionally aligned with `fields`
    fn hash_get_many(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>>;

    /// Delete a hash field; returns true if it existed
    fn hash_delete(&self, key: &str, field: &str) -> Result<bool>;

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Attach a time-to-live; returns false if the key does not exist
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Drop any time-to-live; returns true if one was removed
    fn persist(&self, key: &str) -> Result<bool>;

    /// Remaining time-to-live, `None` for missing or non-expiring keys
    fn time_to_live(&self, key: &str) -> Result<Option<Duration>>;

    /// Whether the key exists (and has not expired)
    fn exists(&self, key: &str) -> Result<bool>;

    /// Delete keys, returning how many existed
    fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Apply all operations atomically, in order
    fn apply_batch(&self, ops: &[WriteOp]) -> Result<()>;
}
