//! Determinism and Consistency Tests
//!
//! Validates that evaluation, ranking and pagination are deterministic and
//! that evaluation leaves no trace in the store.

use quarry_core::{Config, FieldValue, RecordId};
use quarry_search::{IndexObserver, Indexable, Indexer, Schema, SearchEngine};
use quarry_storage::MemoryStore;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

struct Doc {
    id: String,
    body: &'static str,
    rank: i32,
}

impl Indexable for Doc {
    fn record_id(&self) -> RecordId {
        RecordId::new(self.id.as_str())
    }

    fn attribute(&self, name: &str) -> Option<FieldValue> {
        match name {
            "body" => Some(self.body.into()),
            "rank" => Some(self.rank.into()),
            _ => None,
        }
    }
}

fn setup() -> (MemoryStore, SearchEngine, Indexer<Doc>) {
    let store = MemoryStore::new();
    let engine = SearchEngine::new(Arc::new(store.clone()), Config::default());
    let docs = engine
        .register(
            Schema::<Doc>::builder("doc")
                .text("body")
                .phonetic("body")
                .number("rank")
                .sort("body")
                .build(),
        )
        .unwrap();
    (store, engine, docs)
}

fn populate_determinism_data(docs: &Indexer<Doc>) {
    // Identical scores for every doc so ordering depends on the id tie-break
    let bodies = ["test document alpha", "test document beta", "test document gamma"];
    for i in 0..30 {
        docs.update_indices(&Doc {
            id: format!("doc_{i:02}"),
            body: bodies[i % bodies.len()],
            rank: i as i32,
        })
        .unwrap();
    }
}

// ============================================================================
// Evaluation Determinism Tests
// ============================================================================

/// Same query produces identical results
#[test]
fn test_search_deterministic() {
    let (_store, engine, docs) = setup();
    populate_determinism_data(&docs);

    let run = || {
        engine
            .search("doc", |q| q.any([q.text("body", "test"), q.phonetic("body", "dokument")]))
            .unwrap()
            .all_ids()
            .unwrap()
    };
    let first = run();
    assert_eq!(first.len(), 30);
    for _ in 0..5 {
        assert_eq!(run(), first);
    }
}

/// Equal scores break ties on ascending id
#[test]
fn test_ties_break_on_id() {
    let (_store, engine, docs) = setup();
    populate_determinism_data(&docs);

    let ids = engine
        .search("doc", |q| q.text("body", "document"))
        .unwrap()
        .all_ids()
        .unwrap();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

/// Higher match counts rank first regardless of insertion order
#[test]
fn test_match_count_ordering() {
    let (_store, engine, docs) = setup();
    populate_determinism_data(&docs);

    let results = engine
        .search("doc", |q| q.text("body", "document gamma"))
        .unwrap();
    let ids = results.all_ids().unwrap();
    let gammas = ids
        .iter()
        .take_while(|id| results.score(id) == Some(2.0))
        .count();
    assert_eq!(gammas, 10);
    assert!(ids[gammas..].iter().all(|id| results.score(id) == Some(1.0)));
}

// ============================================================================
// Pagination Consistency Tests
// ============================================================================

/// Concatenated pages equal the unwindowed sequence
#[test]
fn test_pages_partition_the_sequence() {
    let (_store, engine, docs) = setup();
    populate_determinism_data(&docs);

    let mut results = engine.search("doc", |q| q.text("body", "test")).unwrap();
    let full = results.all_ids().unwrap();

    let mut paged = Vec::new();
    for page in 1..=4 {
        let ids = results.page(page, 8).ids().unwrap();
        assert!(ids.len() <= 8);
        paged.extend(ids);
    }
    assert_eq!(paged, full);
    assert_eq!(results.size(), 30);
    assert_eq!(results.unwindowed().ids().unwrap(), full);
}

/// Windows apply to the sorted sequence
#[test]
fn test_windows_follow_sort_override() {
    let (_store, engine, docs) = setup();
    populate_determinism_data(&docs);

    let mut results = engine.search("doc", |q| q.text("body", "test")).unwrap();
    results.sort_by("body").unwrap();
    let first_page = results.range(0, 10).ids().unwrap();
    // "alpha" docs sort first: ids 0, 3, 6, ...
    let expected: Vec<RecordId> = (0..30)
        .step_by(3)
        .map(|i| RecordId::new(format!("doc_{i:02}")))
        .collect();
    assert_eq!(first_page, expected);
}

// ============================================================================
// Store Hygiene Tests
// ============================================================================

/// No ephemeral keys survive an evaluation
#[test]
fn test_no_ephemeral_keys_remain() {
    let (store, engine, docs) = setup();
    populate_determinism_data(&docs);
    let before = store.key_count();

    engine
        .search("doc", |q| {
            vec![
                q.any([q.text("body", "alpha"), q.text("body", "beta")]),
                q.number("rank", quarry_search::NumberQuery::new().min(5)),
                q.boost(1.0, q.phonetic("body", "gama")),
            ]
        })
        .unwrap();

    assert!(store.keys_with_prefix("quarry:_tmp:").is_empty());
    assert_eq!(store.key_count(), before);
}
