//! Storage layer for Quarry
//!
//! This crate provides an in-process implementation of the `SetStore`
//! contract:
//! - MemoryStore: sets, sorted sets and hashes behind one RwLock
//! - TTL index for expiration
//! - TTL cleaner background task
//!
//! Production deployments typically implement `SetStore` over an external
//! set-oriented server; `MemoryStore` serves embedded use and tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleaner;
pub mod memory;
pub mod sorted;
pub mod ttl;

pub use cleaner::TTLCleaner;
pub use memory::MemoryStore;
pub use sorted::SortedSet;
pub use ttl::TTLIndex;
