//! MemoryStore: in-process reference implementation of `SetStore`
//!
//! This module implements the SetStore trait using:
//! - `FxHashMap<String, Entry>` holding sets, sorted sets and hashes
//! - `parking_lot::RwLock` for thread-safe access
//! - A TTL index for efficient expiration cleanup
//!
//! # Design Notes
//!
//! - **Logical TTL expiration**: expired keys are invisible to reads as soon as
//!   their deadline passes; they are physically removed by the next write
//!   touching them or by [`MemoryStore::purge_expired`] (see `TTLCleaner`)
//! - **Single lock**: every operation, including multi-key derivations and
//!   `apply_batch`, runs under one lock acquisition, so no reader can observe a
//!   half-applied batch

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use quarry_core::{Error, Result, ScoreBound, SetStore, WriteOp};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::sorted::SortedSet;
use crate::ttl::TTLIndex;

/// Structure stored under a key
#[derive(Debug, Clone)]
enum Entry {
    Set(FxHashSet<String>),
    Sorted(SortedSet),
    Hash(FxHashMap<String, String>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        match self {
            Entry::Set(s) => s.is_empty(),
            Entry::Sorted(z) => z.is_empty(),
            Entry::Hash(h) => h.is_empty(),
        }
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    data: FxHashMap<String, Entry>,
    deadlines: FxHashMap<String, Instant>,
    ttl_index: TTLIndex,
}

impl Keyspace {
    fn is_expired(&self, key: &str, now: Instant) -> bool {
        self.deadlines.get(key).is_some_and(|d| *d <= now)
    }

    /// Live entry for reads
    fn live(&self, key: &str) -> Option<&Entry> {
        if self.is_expired(key, Instant::now()) {
            return None;
        }
        self.data.get(key)
    }

    fn live_set(&self, key: &str) -> Result<Option<&FxHashSet<String>>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry::Set(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "set")),
        }
    }

    fn live_sorted(&self, key: &str) -> Result<Option<&SortedSet>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry::Sorted(z)) => Ok(Some(z)),
            Some(_) => Err(wrong_type(key, "sorted set")),
        }
    }

    fn live_hash(&self, key: &str) -> Result<Option<&FxHashMap<String, String>>> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(wrong_type(key, "hash")),
        }
    }

    /// Physically drop `key` if its deadline has passed
    fn evict_if_expired(&mut self, key: &str) {
        if self.is_expired(key, Instant::now()) {
            self.remove_key(key);
        }
    }

    fn remove_key(&mut self, key: &str) -> bool {
        self.clear_deadline(key);
        self.data.remove(key).is_some()
    }

    fn clear_deadline(&mut self, key: &str) -> bool {
        match self.deadlines.remove(key) {
            Some(deadline) => {
                self.ttl_index.remove(deadline, key);
                true
            }
            None => false,
        }
    }

    /// Drop `key` if a mutation left it empty
    fn prune(&mut self, key: &str) {
        if self.data.get(key).is_some_and(Entry::is_empty) {
            self.remove_key(key);
        }
    }

    fn set_mut(&mut self, key: &str) -> Result<&mut FxHashSet<String>> {
        self.evict_if_expired(key);
        let entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(FxHashSet::default()));
        match entry {
            Entry::Set(s) => Ok(s),
            _ => Err(wrong_type(key, "set")),
        }
    }

    fn sorted_mut(&mut self, key: &str) -> Result<&mut SortedSet> {
        self.evict_if_expired(key);
        let entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Sorted(SortedSet::new()));
        match entry {
            Entry::Sorted(z) => Ok(z),
            _ => Err(wrong_type(key, "sorted set")),
        }
    }

    fn hash_mut(&mut self, key: &str) -> Result<&mut FxHashMap<String, String>> {
        self.evict_if_expired(key);
        let entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(FxHashMap::default()));
        match entry {
            Entry::Hash(h) => Ok(h),
            _ => Err(wrong_type(key, "hash")),
        }
    }

    /// Overwrite `dest` with `members`, clearing any deadline
    fn store_set(&mut self, dest: &str, members: FxHashSet<String>) -> usize {
        let len = members.len();
        self.remove_key(dest);
        if len > 0 {
            self.data.insert(dest.to_string(), Entry::Set(members));
        }
        len
    }

    /// Attach `ttl` to `key`; a zero TTL deletes it
    fn expire(&mut self, key: &str, ttl: Duration) -> bool {
        self.evict_if_expired(key);
        if !self.data.contains_key(key) {
            return false;
        }
        if ttl.is_zero() {
            self.remove_key(key);
            return true;
        }
        self.clear_deadline(key);
        let deadline = Instant::now() + ttl;
        self.deadlines.insert(key.to_string(), deadline);
        self.ttl_index.insert(deadline, key.to_string());
        true
    }

    fn union(&self, keys: &[String]) -> Result<FxHashSet<String>> {
        let mut result = FxHashSet::default();
        for key in keys {
            if let Some(set) = self.live_set(key)? {
                result.extend(set.iter().cloned());
            }
        }
        Ok(result)
    }

    fn intersection(&self, keys: &[String]) -> Result<FxHashSet<String>> {
        let mut sets = Vec::with_capacity(keys.len());
        for key in keys {
            sets.push(self.live_set(key)?);
        }
        Ok(match sets.split_first() {
            None => FxHashSet::default(),
            Some((first, rest)) => match (first, rest.iter().any(Option::is_none)) {
                (Some(first), false) => first
                    .iter()
                    .filter(|m| rest.iter().flatten().all(|s| s.contains(m.as_str())))
                    .cloned()
                    .collect(),
                _ => FxHashSet::default(),
            },
        })
    }

    fn add_members(&mut self, key: &str, members: &[String]) -> Result<usize> {
        let set = self.set_mut(key)?;
        let added = members.iter().filter(|m| set.insert((*m).clone())).count();
        self.prune(key);
        Ok(added)
    }

    fn remove_members(&mut self, key: &str, members: &[String]) -> Result<usize> {
        self.evict_if_expired(key);
        let removed = match self.data.get_mut(key) {
            None => 0,
            Some(Entry::Set(s)) => members.iter().filter(|m| s.remove(m.as_str())).count(),
            Some(_) => return Err(wrong_type(key, "set")),
        };
        self.prune(key);
        Ok(removed)
    }

    fn sorted_insert(&mut self, key: &str, member: &str, score: f64) -> Result<bool> {
        if score.is_nan() {
            return Err(Error::Store(format!("NaN score for member {member} of {key}")));
        }
        Ok(self.sorted_mut(key)?.insert(member, score))
    }

    fn sorted_remove(&mut self, key: &str, member: &str) -> Result<bool> {
        self.evict_if_expired(key);
        let removed = match self.data.get_mut(key) {
            None => false,
            Some(Entry::Sorted(z)) => z.remove(member),
            Some(_) => return Err(wrong_type(key, "sorted set")),
        };
        self.prune(key);
        Ok(removed)
    }

    fn hash_set(&mut self, key: &str, field: &str, value: &str) -> Result<bool> {
        Ok(self
            .hash_mut(key)?
            .insert(field.to_string(), value.to_string())
            .is_none())
    }

    fn hash_delete(&mut self, key: &str, field: &str) -> Result<bool> {
        self.evict_if_expired(key);
        let removed = match self.data.get_mut(key) {
            None => false,
            Some(Entry::Hash(h)) => h.remove(field).is_some(),
            Some(_) => return Err(wrong_type(key, "hash")),
        };
        self.prune(key);
        Ok(removed)
    }

    fn apply(&mut self, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::AddMember { key, member } => {
                self.add_members(key, std::slice::from_ref(member))?;
            }
            WriteOp::RemoveMember { key, member } => {
                self.remove_members(key, std::slice::from_ref(member))?;
            }
            WriteOp::SortedInsert { key, member, score } => {
                self.sorted_insert(key, member, *score)?;
            }
            WriteOp::SortedRemove { key, member } => {
                self.sorted_remove(key, member)?;
            }
            WriteOp::HashSet { key, field, value } => {
                self.hash_set(key, field, value)?;
            }
            WriteOp::HashDelete { key, field } => {
                self.hash_delete(key, field)?;
            }
            WriteOp::Delete { key } => {
                self.remove_key(key);
            }
            WriteOp::Expire { key, ttl } => {
                self.expire(key, *ttl);
            }
        }
        Ok(())
    }

    /// Reject a batch before touching anything if any op would hit a key of
    /// the wrong type
    fn check_batch(&self, ops: &[WriteOp]) -> Result<()> {
        // Types a key will hold once the preceding ops have run
        let mut pending: FxHashMap<&str, Option<&'static str>> = FxHashMap::default();
        for op in ops {
            let (key, expected) = match op {
                WriteOp::AddMember { key, .. } | WriteOp::RemoveMember { key, .. } => {
                    (key.as_str(), "set")
                }
                WriteOp::SortedInsert { key, member, score } if score.is_nan() => {
                    return Err(Error::Store(format!("NaN score for member {member} of {key}")));
                }
                WriteOp::SortedInsert { key, .. } | WriteOp::SortedRemove { key, .. } => {
                    (key.as_str(), "sorted set")
                }
                WriteOp::HashSet { key, .. } | WriteOp::HashDelete { key, .. } => {
                    (key.as_str(), "hash")
                }
                WriteOp::Delete { key } => {
                    pending.insert(key.as_str(), None);
                    continue;
                }
                WriteOp::Expire { .. } => continue,
            };
            let current = match pending.get(key) {
                Some(t) => *t,
                None => self.live(key).map(entry_type),
            };
            if let Some(actual) = current {
                if actual != expected {
                    return Err(wrong_type(key, expected));
                }
            }
            pending.insert(key, Some(expected));
        }
        Ok(())
    }
}

fn entry_type(entry: &Entry) -> &'static str {
    match entry {
        Entry::Set(_) => "set",
        Entry::Sorted(_) => "sorted set",
        Entry::Hash(_) => "hash",
    }
}

fn wrong_type(key: &str, expected: &'static str) -> Error {
    Error::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// In-memory set store
///
/// Cheap to clone: clones share the same underlying keyspace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Keyspace>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        let ks = self.inner.read();
        let now = Instant::now();
        ks.data.keys().filter(|k| !ks.is_expired(k, now)).count()
    }

    /// Live keys starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let ks = self.inner.read();
        let now = Instant::now();
        let mut keys: Vec<String> = ks
            .data
            .keys()
            .filter(|k| k.starts_with(prefix) && !ks.is_expired(k, now))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Keys whose deadline has passed but which are still held in memory
    pub fn find_expired_keys(&self) -> Vec<String> {
        self.inner.read().ttl_index.find_expired(Instant::now())
    }

    /// Physically remove every expired key, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut ks = self.inner.write();
        let now = Instant::now();
        let expired = ks.ttl_index.find_expired(now);
        let mut purged = 0;
        for key in &expired {
            if ks.is_expired(key, now) {
                ks.deadlines.remove(key);
                if ks.data.remove(key).is_some() {
                    purged += 1;
                }
            }
        }
        ks.ttl_index.remove_expired(now);
        purged
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut ks = self.inner.write();
        *ks = Keyspace::default();
    }
}

impl SetStore for MemoryStore {
    fn add_members(&self, key: &str, members: &[String]) -> Result<usize> {
        self.inner.write().add_members(key, members)
    }

    fn remove_members(&self, key: &str, members: &[String]) -> Result<usize> {
        self.inner.write().remove_members(key, members)
    }

    fn members(&self, key: &str) -> Result<Vec<String>> {
        let ks = self.inner.read();
        Ok(ks
            .live_set(key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn is_member(&self, key: &str, member: &str) -> Result<bool> {
        let ks = self.inner.read();
        Ok(ks.live_set(key)?.is_some_and(|s| s.contains(member)))
    }

    fn cardinality(&self, key: &str) -> Result<usize> {
        let ks = self.inner.read();
        Ok(ks.live_set(key)?.map_or(0, |s| s.len()))
    }

    fn union_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        let mut ks = self.inner.write();
        let result = ks.union(keys)?;
        Ok(ks.store_set(dest, result))
    }

    fn intersect_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        let mut ks = self.inner.write();
        let result = ks.intersection(keys)?;
        Ok(ks.store_set(dest, result))
    }

    fn union_into_expiring(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<usize> {
        let mut ks = self.inner.write();
        let result = ks.union(keys)?;
        let len = ks.store_set(dest, result);
        ks.expire(dest, ttl);
        Ok(len)
    }

    fn intersect_into_expiring(
        &self,
        dest: &str,
        keys: &[String],
        ttl: Duration,
    ) -> Result<usize> {
        let mut ks = self.inner.write();
        let result = ks.intersection(keys)?;
        let len = ks.store_set(dest, result);
        ks.expire(dest, ttl);
        Ok(len)
    }

    fn sorted_insert(&self, key: &str, member: &str, score: f64) -> Result<bool> {
        self.inner.write().sorted_insert(key, member, score)
    }

    fn sorted_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.inner.write().sorted_remove(key, member)
    }

    fn sorted_range(
        &self,
        key: &str,
        lower: ScoreBound,
        upper: ScoreBound,
    ) -> Result<Vec<String>> {
        let ks = self.inner.read();
        Ok(ks
            .live_sorted(key)?
            .map(|z| z.range(lower, upper))
            .unwrap_or_default())
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.inner.write().hash_set(key, field, value)
    }

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let ks = self.inner.read();
        Ok(ks.live_hash(key)?.and_then(|h| h.get(field).cloned()))
    }

    fn hash_get_many(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        let ks = self.inner.read();
        let hash = ks.live_hash(key)?;
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f).cloned()))
            .collect())
    }

    fn hash_delete(&self, key: &str, field: &str) -> Result<bool> {
        self.inner.write().hash_delete(key, field)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        Ok(self.inner.write().expire(key, ttl))
    }

    fn persist(&self, key: &str) -> Result<bool> {
        let mut ks = self.inner.write();
        ks.evict_if_expired(key);
        Ok(ks.clear_deadline(key))
    }

    fn time_to_live(&self, key: &str) -> Result<Option<Duration>> {
        let ks = self.inner.read();
        let now = Instant::now();
        if ks.is_expired(key, now) {
            return Ok(None);
        }
        Ok(ks
            .deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.inner.read().live(key).is_some())
    }

    fn delete(&self, keys: &[String]) -> Result<usize> {
        let mut ks = self.inner.write();
        let mut deleted = 0;
        for key in keys {
            let live = ks.live(key).is_some();
            if ks.remove_key(key) && live {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn apply_batch(&self, ops: &[WriteOp]) -> Result<()> {
        let mut ks = self.inner.write();
        ks.check_batch(ops)?;
        for op in ops {
            ks.apply(op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sorted_members(store: &MemoryStore, key: &str) -> Vec<String> {
        let mut m = store.members(key).unwrap();
        m.sort();
        m
    }

    #[test]
    fn test_add_and_remove_members() {
        let store = MemoryStore::new();
        assert_eq!(store.add_members("s", &strings(&["a", "b", "a"])).unwrap(), 2);
        assert_eq!(store.add_members("s", &strings(&["b", "c"])).unwrap(), 1);
        assert_eq!(store.cardinality("s").unwrap(), 3);
        assert!(store.is_member("s", "c").unwrap());

        assert_eq!(store.remove_members("s", &strings(&["a", "z"])).unwrap(), 1);
        assert_eq!(sorted_members(&store, "s"), strings(&["b", "c"]));
    }

    #[test]
    fn test_empty_set_is_removed() {
        let store = MemoryStore::new();
        store.add_members("s", &strings(&["a"])).unwrap();
        store.remove_members("s", &strings(&["a"])).unwrap();
        assert!(!store.exists("s").unwrap());
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.members("nope").unwrap().is_empty());
        assert_eq!(store.cardinality("nope").unwrap(), 0);
        assert!(!store.is_member("nope", "x").unwrap());
        assert!(store
            .sorted_range("nope", ScoreBound::Unbounded, ScoreBound::Unbounded)
            .unwrap()
            .is_empty());
        assert_eq!(store.hash_get("nope", "f").unwrap(), None);
    }

    #[test]
    fn test_wrong_type() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "v").unwrap();
        let err = store.add_members("h", &strings(&["a"])).unwrap_err();
        assert!(matches!(err, Error::WrongType { .. }));
        assert!(store.members("h").is_err());
        // The hash is untouched
        assert_eq!(store.hash_get("h", "f").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_union_into() {
        let store = MemoryStore::new();
        store.add_members("a", &strings(&["1", "2"])).unwrap();
        store.add_members("b", &strings(&["2", "3"])).unwrap();
        assert_eq!(store.union_into("u", &strings(&["a", "b", "missing"])).unwrap(), 3);
        assert_eq!(sorted_members(&store, "u"), strings(&["1", "2", "3"]));
    }

    #[test]
    fn test_intersect_into_with_dest_as_source() {
        let store = MemoryStore::new();
        store.add_members("a", &strings(&["1", "2", "3"])).unwrap();
        store.add_members("b", &strings(&["2", "3", "4"])).unwrap();
        store.union_into("t", &strings(&["a"])).unwrap();
        assert_eq!(store.intersect_into("t", &strings(&["t", "b"])).unwrap(), 2);
        assert_eq!(sorted_members(&store, "t"), strings(&["2", "3"]));
    }

    #[test]
    fn test_intersect_with_missing_key_is_empty() {
        let store = MemoryStore::new();
        store.add_members("a", &strings(&["1"])).unwrap();
        assert_eq!(store.intersect_into("t", &strings(&["a", "missing"])).unwrap(), 0);
        assert!(!store.exists("t").unwrap());
    }

    #[test]
    fn test_derivation_clears_expiry() {
        let store = MemoryStore::new();
        store.add_members("a", &strings(&["1"])).unwrap();
        store.add_members("t", &strings(&["x"])).unwrap();
        store.expire("t", Duration::from_secs(30)).unwrap();
        store.union_into("t", &strings(&["a"])).unwrap();
        assert_eq!(store.time_to_live("t").unwrap(), None);
    }

    #[test]
    fn test_expiring_derivations_carry_ttl() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(30);
        store.add_members("a", &strings(&["1", "2"])).unwrap();
        store.add_members("b", &strings(&["2", "3"])).unwrap();

        assert_eq!(store.union_into_expiring("u", &strings(&["a", "b"]), ttl).unwrap(), 3);
        assert!(store.time_to_live("u").unwrap().is_some_and(|t| t <= ttl));

        store.union_into_expiring("i", &strings(&["a"]), ttl).unwrap();
        let kept = store
            .intersect_into_expiring("i", &strings(&["i", "b"]), ttl)
            .unwrap();
        assert_eq!(kept, 1);
        assert!(store.time_to_live("i").unwrap().is_some());

        // Empty results are not written, so there is nothing to expire
        assert_eq!(
            store.intersect_into_expiring("e", &strings(&["a", "missing"]), ttl).unwrap(),
            0
        );
        assert!(!store.exists("e").unwrap());
    }

    #[test]
    fn test_apply_batch_expire() {
        let store = MemoryStore::new();
        store
            .apply_batch(&[
                WriteOp::AddMember {
                    key: "t".into(),
                    member: "1".into(),
                },
                WriteOp::Expire {
                    key: "t".into(),
                    ttl: Duration::from_secs(30),
                },
                WriteOp::Expire {
                    key: "missing".into(),
                    ttl: Duration::from_secs(30),
                },
            ])
            .unwrap();
        assert!(store.time_to_live("t").unwrap().is_some());
        assert!(!store.exists("missing").unwrap());
    }

    #[test]
    fn test_sorted_range() {
        let store = MemoryStore::new();
        for (id, v) in [("1", 1.0), ("2", 2.0), ("3", 3.0)] {
            store.sorted_insert("z", id, v).unwrap();
        }
        let got = store
            .sorted_range("z", ScoreBound::Exclusive(1.0), ScoreBound::Unbounded)
            .unwrap();
        assert_eq!(got, strings(&["2", "3"]));
        assert!(store.sorted_remove("z", "2").unwrap());
        assert!(store.sorted_insert("z", "4", f64::NAN).is_err());
    }

    #[test]
    fn test_hash_get_many() {
        let store = MemoryStore::new();
        store.hash_set("h", "1", "beatles").unwrap();
        store.hash_set("h", "2", "abba").unwrap();
        let got = store.hash_get_many("h", &strings(&["2", "9", "1"])).unwrap();
        assert_eq!(
            got,
            vec![Some("abba".to_string()), None, Some("beatles".to_string())]
        );
        assert!(store.hash_delete("h", "1").unwrap());
        assert!(!store.hash_delete("h", "1").unwrap());
    }

    #[test]
    fn test_expire_and_persist() {
        let store = MemoryStore::new();
        assert!(!store.expire("missing", Duration::from_secs(1)).unwrap());

        store.add_members("s", &strings(&["a"])).unwrap();
        assert!(store.expire("s", Duration::from_secs(60)).unwrap());
        let ttl = store.time_to_live("s").unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(50));

        assert!(store.persist("s").unwrap());
        assert_eq!(store.time_to_live("s").unwrap(), None);
        assert!(!store.persist("s").unwrap());
    }

    #[test]
    fn test_logical_expiry() {
        let store = MemoryStore::new();
        store.add_members("s", &strings(&["a"])).unwrap();
        store.expire("s", Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(!store.exists("s").unwrap());
        assert!(store.members("s").unwrap().is_empty());
        assert_eq!(store.find_expired_keys(), strings(&["s"]));

        // A write to an expired key starts from scratch
        store.add_members("s", &strings(&["b"])).unwrap();
        assert_eq!(sorted_members(&store, "s"), strings(&["b"]));
        assert_eq!(store.time_to_live("s").unwrap(), None);
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new();
        store.add_members("short", &strings(&["a"])).unwrap();
        store.add_members("long", &strings(&["a"])).unwrap();
        store.expire("short", Duration::from_millis(10)).unwrap();
        store.expire("long", Duration::from_secs(60)).unwrap();
        thread::sleep(Duration::from_millis(30));

        assert_eq!(store.purge_expired(), 1);
        assert!(store.find_expired_keys().is_empty());
        assert!(store.exists("long").unwrap());
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        store.add_members("a", &strings(&["1"])).unwrap();
        store.hash_set("b", "f", "v").unwrap();
        assert_eq!(store.delete(&strings(&["a", "b", "c"])).unwrap(), 2);
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn test_apply_batch_in_order() {
        let store = MemoryStore::new();
        store.add_members("m", &strings(&["old"])).unwrap();
        store
            .apply_batch(&[
                WriteOp::Delete { key: "m".into() },
                WriteOp::AddMember {
                    key: "m".into(),
                    member: "new".into(),
                },
                WriteOp::SortedInsert {
                    key: "z".into(),
                    member: "1".into(),
                    score: 4.0,
                },
                WriteOp::HashSet {
                    key: "h".into(),
                    field: "1".into(),
                    value: "k".into(),
                },
            ])
            .unwrap();
        assert_eq!(sorted_members(&store, "m"), strings(&["new"]));
        assert_eq!(store.hash_get("h", "1").unwrap(), Some("k".to_string()));
    }

    #[test]
    fn test_apply_batch_rejects_wrong_type_atomically() {
        let store = MemoryStore::new();
        store.hash_set("h", "f", "v").unwrap();
        let result = store.apply_batch(&[
            WriteOp::AddMember {
                key: "s".into(),
                member: "1".into(),
            },
            WriteOp::AddMember {
                key: "h".into(),
                member: "1".into(),
            },
        ]);
        assert!(result.is_err());
        // Nothing from the batch was applied
        assert!(!store.exists("s").unwrap());
    }

    #[test]
    fn test_apply_batch_delete_then_retype() {
        let store = MemoryStore::new();
        store.hash_set("k", "f", "v").unwrap();
        store
            .apply_batch(&[
                WriteOp::Delete { key: "k".into() },
                WriteOp::AddMember {
                    key: "k".into(),
                    member: "1".into(),
                },
            ])
            .unwrap();
        assert!(store.is_member("k", "1").unwrap());
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.add_members("q:_tmp:1", &strings(&["a"])).unwrap();
        store.add_members("q:Song:text:title:x", &strings(&["a"])).unwrap();
        assert_eq!(store.keys_with_prefix("q:_tmp:"), strings(&["q:_tmp:1"]));
    }
}
