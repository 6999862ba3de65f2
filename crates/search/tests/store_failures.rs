//! Store Failure Tests
//!
//! Drives a store that fails selected operations on demand through the
//! engine, checking that failures surface as `Error::Store`, that a failed
//! update leaves no partial postings, and that ephemeral keys never outlive a
//! failed evaluation.

use quarry_core::{Config, Error, FieldValue, RecordId, Result, ScoreBound, SetStore, WriteOp};
use quarry_search::{IndexObserver, Indexable, Indexer, NumberQuery, Schema, SearchEngine};
use quarry_storage::MemoryStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Fault {
    Derive,
    Members,
    Batch,
    Expire,
}

/// MemoryStore wrapper failing the operations listed in `faults`
#[derive(Clone, Default)]
struct FaultyStore {
    inner: MemoryStore,
    faults: Arc<Mutex<HashSet<Fault>>>,
}

impl FaultyStore {
    fn fail(&self, fault: Fault) {
        self.faults.lock().unwrap().insert(fault);
    }

    fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults.lock().unwrap().contains(&fault) {
            return Err(Error::Store(format!("injected {fault:?} failure")));
        }
        Ok(())
    }
}

impl SetStore for FaultyStore {
    fn add_members(&self, key: &str, members: &[String]) -> Result<usize> {
        self.inner.add_members(key, members)
    }

    fn remove_members(&self, key: &str, members: &[String]) -> Result<usize> {
        self.inner.remove_members(key, members)
    }

    fn members(&self, key: &str) -> Result<Vec<String>> {
        self.check(Fault::Members)?;
        self.inner.members(key)
    }

    fn is_member(&self, key: &str, member: &str) -> Result<bool> {
        self.inner.is_member(key, member)
    }

    fn cardinality(&self, key: &str) -> Result<usize> {
        self.inner.cardinality(key)
    }

    fn union_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        self.check(Fault::Derive)?;
        self.inner.union_into(dest, keys)
    }

    fn intersect_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        self.check(Fault::Derive)?;
        self.inner.intersect_into(dest, keys)
    }

    fn union_into_expiring(&self, dest: &str, keys: &[String], ttl: Duration) -> Result<usize> {
        self.check(Fault::Derive)?;
        self.inner.union_into_expiring(dest, keys, ttl)
    }

    fn intersect_into_expiring(
        &self,
        dest: &str,
        keys: &[String],
        ttl: Duration,
    ) -> Result<usize> {
        self.check(Fault::Derive)?;
        self.inner.intersect_into_expiring(dest, keys, ttl)
    }

    fn sorted_insert(&self, key: &str, member: &str, score: f64) -> Result<bool> {
        self.inner.sorted_insert(key, member, score)
    }

    fn sorted_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.inner.sorted_remove(key, member)
    }

    fn sorted_range(
        &self,
        key: &str,
        lower: ScoreBound,
        upper: ScoreBound,
    ) -> Result<Vec<String>> {
        self.inner.sorted_range(key, lower, upper)
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.inner.hash_set(key, field, value)
    }

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.hash_get(key, field)
    }

    fn hash_get_many(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        self.inner.hash_get_many(key, fields)
    }

    fn hash_delete(&self, key: &str, field: &str) -> Result<bool> {
        self.inner.hash_delete(key, field)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check(Fault::Expire)?;
        self.inner.expire(key, ttl)
    }

    fn persist(&self, key: &str) -> Result<bool> {
        self.inner.persist(key)
    }

    fn time_to_live(&self, key: &str) -> Result<Option<Duration>> {
        self.inner.time_to_live(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key)
    }

    fn delete(&self, keys: &[String]) -> Result<usize> {
        self.inner.delete(keys)
    }

    fn apply_batch(&self, ops: &[WriteOp]) -> Result<()> {
        self.check(Fault::Batch)?;
        self.inner.apply_batch(ops)
    }
}

#[derive(Debug, Clone)]
struct Book {
    id: u64,
    title: String,
    pages: u32,
}

impl Indexable for Book {
    fn record_id(&self) -> RecordId {
        self.id.into()
    }

    fn attribute(&self, name: &str) -> Option<FieldValue> {
        match name {
            "title" => Some(self.title.as_str().into()),
            "pages" => Some(self.pages.into()),
            _ => None,
        }
    }
}

fn book(id: u64, title: &str, pages: u32) -> Book {
    Book {
        id,
        title: title.into(),
        pages,
    }
}

fn setup() -> (FaultyStore, SearchEngine, Indexer<Book>) {
    let store = FaultyStore::default();
    let engine = SearchEngine::new(Arc::new(store.clone()), Config::default());
    let books = engine
        .register(
            Schema::builder("book")
                .text("title")
                .number("pages")
                .sort("title")
                .build(),
        )
        .unwrap();
    books
        .update_many(&[
            book(1, "The Silent River", 320),
            book(2, "River of Stars", 210),
            book(3, "Stars Above the Harbor", 480),
        ])
        .unwrap();
    (store, engine, books)
}

fn tmp_keys(store: &FaultyStore) -> Vec<String> {
    store.inner.keys_with_prefix("quarry:_tmp:")
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_derive_failure_reaches_caller() {
    let (store, engine, _books) = setup();
    store.fail(Fault::Derive);

    let err = engine
        .search("book", |q| q.text("title", "river stars"))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(err.is_store_failure());
    assert!(tmp_keys(&store).is_empty());
}

#[test]
fn test_read_failure_reaches_caller() {
    let (store, engine, _books) = setup();
    store.fail(Fault::Members);

    let err = engine
        .search("book", |q| {
            q.any([q.text("title", "river"), q.text("title", "harbor")])
        })
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(tmp_keys(&store).is_empty());
}

#[test]
fn test_failure_midway_discards_ephemeral_keys() {
    let (store, engine, _books) = setup();
    // Number leaves materialize through apply_batch; the text leaf before it
    // has already derived a key by then
    store.fail(Fault::Batch);

    let err = engine
        .search("book", |q| {
            vec![
                q.text("title", "river stars"),
                q.number("pages", NumberQuery::new().min(200)),
            ]
        })
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(tmp_keys(&store).is_empty());

    store.heal();
    let results = engine
        .search("book", |q| {
            vec![
                q.text("title", "river stars"),
                q.number("pages", NumberQuery::new().min(200)),
            ]
        })
        .unwrap();
    assert_eq!(results.size(), 3);
    assert!(tmp_keys(&store).is_empty());
}

#[test]
fn test_ephemeral_keys_do_not_need_separate_expire() {
    let (store, engine, _books) = setup();
    store.fail(Fault::Expire);

    let results = engine
        .search("book", |q| {
            vec![
                q.any([q.text("title", "river"), q.text("title", "harbor")]),
                q.number("pages", NumberQuery::new().max(400)),
            ]
        })
        .unwrap();
    let mut ids: Vec<String> = results
        .all_ids()
        .unwrap()
        .into_iter()
        .map(RecordId::into_string)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_failed_update_leaves_no_partial_postings() {
    let (store, engine, books) = setup();
    let before = store.inner.keys_with_prefix("quarry:book:");

    store.fail(Fault::Batch);
    let err = books
        .update_indices(&book(4, "Lanterns in the Orchard", 150))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(store.inner.keys_with_prefix("quarry:book:"), before);

    let err = books
        .update_indices(&book(1, "A Quiet Meadow", 320))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    store.heal();
    let results = engine.search("book", |q| q.text("title", "silent")).unwrap();
    assert_eq!(results.size(), 1);
    let results = engine.search("book", |q| q.text("title", "meadow")).unwrap();
    assert_eq!(results.size(), 0);
}

#[test]
fn test_failed_manifest_read_aborts_update() {
    let (store, _engine, books) = setup();
    let before = store.inner.keys_with_prefix("quarry:book:");

    store.fail(Fault::Members);
    let err = books
        .update_indices(&book(4, "Lanterns in the Orchard", 150))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(matches!(books.remove_indices_by_id(&RecordId::from(1u64)), Err(Error::Store(_))));
    assert_eq!(store.inner.keys_with_prefix("quarry:book:"), before);
}
