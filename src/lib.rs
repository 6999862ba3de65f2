//! Quarry - embeddable scored boolean search over set-oriented stores
//!
//! Quarry indexes typed records into sets, sorted sets and hashes of a
//! [`SetStore`], and answers structured queries (conjunctions, disjunctions,
//! weighted branches and boosts over text, phonetic and numeric fields) with
//! relevance-ranked, paginated result sets.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use quarry::{
//!     Config, FieldValue, IndexObserver, Indexable, MemoryStore, RecordId, Schema, SearchEngine,
//! };
//!
//! struct Artist { id: u64, name: &'static str }
//!
//! impl Indexable for Artist {
//!     fn record_id(&self) -> RecordId { self.id.into() }
//!     fn attribute(&self, name: &str) -> Option<FieldValue> {
//!         (name == "name").then(|| self.name.into())
//!     }
//! }
//!
//! let engine = SearchEngine::new(Arc::new(MemoryStore::new()), Config::default());
//! let artists = engine
//!     .register(Schema::<Artist>::builder("artist").phonetic("name").build())
//!     .unwrap();
//! artists.update_indices(&Artist { id: 7, name: "Stephane Michael Cook" }).unwrap();
//!
//! let results = engine
//!     .search("artist", |q| q.phonetic("name", "Stiefen Michel Cooke"))
//!     .unwrap();
//! assert_eq!(results.first().unwrap(), Some(RecordId::from(7u64)));
//! ```
//!
//! # Architecture
//!
//! - [`quarry_core`]: ids, values, key layout, configuration, errors and the
//!   [`SetStore`] contract
//! - [`quarry_storage`]: the in-process [`MemoryStore`] with TTL expiry
//! - [`quarry_search`]: index strategies, query model, evaluator and result sets

pub use quarry_core::*;
pub use quarry_search::*;
pub use quarry_storage::{MemoryStore, TTLCleaner};

pub use quarry_core;
pub use quarry_search;
pub use quarry_storage;
