//! Search and indexing for Quarry
//!
//! This crate provides:
//! - Normalizer: word tokens and sort keys
//! - Metaphone phonetic encoding
//! - IndexStrategy trait with text, phonetic, number and sort strategies
//! - Schema / Indexer: typed field extraction and posting maintenance
//! - SetAlgebra: union/intersection over store sets with ephemeral keys
//! - Query model with an explicit builder, evaluated by match-count scoring
//! - ResultSet: windows, sort overrides, post-processors, lazy records
//! - SearchEngine: the facade tying them together
//!
//! # Usage
//!
//! ```ignore
//! use quarry_search::SearchEngine;
//!
//! let artists = engine.register(schema)?;
//! artists.update_indices(&artist)?;
//! let results = engine.search("artist", |q| q.phonetic("name", "stiefen"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algebra;
pub mod candidate;
pub mod engine;
pub mod evaluator;
pub mod indexer;
pub mod normalizer;
pub mod phonetic;
pub mod query;
pub mod registry;
pub mod result;
pub mod schema;
pub mod strategy;

// Re-export commonly used types
pub use algebra::{Retention, SetAlgebra};
pub use candidate::{CandidateSet, Scores};
pub use engine::SearchEngine;
pub use evaluator::{Evaluator, Ranked};
pub use indexer::{IndexObserver, Indexer};
pub use normalizer::{sort_key, tokenize, tokenize_unique};
pub use query::{Clause, Leaf, NumberQuery, Operand, Query, QueryBuilder};
pub use registry::{Plugins, PluginsBuilder};
pub use result::{
    FromFn, RecordSource, Records, ResultProcessor, ResultSet, ScoreThreshold, SortOrder, Window,
};
pub use schema::{Extractor, FieldCatalog, FieldDefinition, Indexable, Schema, SchemaBuilder};
pub use strategy::{
    IndexContext, IndexStrategy, LeafContext, NumberStrategy, PhoneticStrategy, Posting,
    PostingRef, SortStrategy, TextStrategy,
};
