//! Core types and traits for Quarry
//!
//! This crate defines the foundational types used throughout the engine:
//! - RecordId: identifier of an indexed record
//! - FieldValue: raw value extracted from a record
//! - IndexKind: discriminates between index strategies
//! - KeySpace: store key layout
//! - Config: explicit engine configuration
//! - Error: error type hierarchy
//! - SetStore: the storage contract

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod keys;
pub mod traits;
pub mod types;

pub use config::{Config, ConfigBuilder, DEFAULT_EPHEMERAL_TTL, DEFAULT_NAMESPACE};
pub use error::{Error, Result};
pub use keys::KeySpace;
pub use traits::{ScoreBound, SetStore, WriteOp};
pub use types::{FieldValue, IndexKind, RecordId};
