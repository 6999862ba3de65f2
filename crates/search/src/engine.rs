//! Search engine facade
//!
//! The engine ties a store, a configuration and a plugin registry together.
//! Record types are registered once with a [`Schema`]; registration returns
//! the [`Indexer`] the persistence layer notifies on writes. Queries are built
//! through a closure receiving a [`QueryBuilder`] and executed into a
//! [`ResultSet`].
//!
//! ```
//! use std::sync::Arc;
//! use quarry_core::{Config, FieldValue, RecordId};
//! use quarry_search::{IndexObserver, Indexable, NumberQuery, Schema, SearchEngine};
//! use quarry_storage::MemoryStore;
//!
//! struct Dish { id: u64, name: &'static str, serves: u32 }
//!
//! impl Indexable for Dish {
//!     fn record_id(&self) -> RecordId { self.id.into() }
//!     fn attribute(&self, name: &str) -> Option<FieldValue> {
//!         match name {
//!             "name" => Some(self.name.into()),
//!             "serves" => Some(self.serves.into()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let engine = SearchEngine::new(Arc::new(MemoryStore::new()), Config::default());
//! let dishes = engine
//!     .register(Schema::<Dish>::builder("dish").text("name").number("serves").build())
//!     .unwrap();
//! dishes.update_indices(&Dish { id: 1, name: "Pumpkin Soup", serves: 4 }).unwrap();
//! dishes.update_indices(&Dish { id: 2, name: "Pumpkin Pie", serves: 8 }).unwrap();
//!
//! let results = engine
//!     .search("dish", |q| {
//!         vec![
//!             q.text("name", "pumpkin"),
//!             q.number("serves", NumberQuery::new().max(6)),
//!         ]
//!     })
//!     .unwrap();
//! assert_eq!(results.ids().unwrap(), vec![RecordId::from("1")]);
//! ```

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use quarry_core::{Config, Error, Result, SetStore};
use tracing::{debug, info};

use crate::evaluator::Evaluator;
use crate::indexer::Indexer;
use crate::query::{Clause, Query, QueryBuilder};
use crate::registry::Plugins;
use crate::result::ResultSet;
use crate::schema::{FieldCatalog, Indexable, Schema};

/// Embeddable search engine over a [`SetStore`]
pub struct SearchEngine {
    store: Arc<dyn SetStore>,
    config: Arc<Config>,
    plugins: Arc<Plugins>,
    catalogs: DashMap<String, Arc<FieldCatalog>>,
}

impl SearchEngine {
    /// Engine with the built-in strategies
    pub fn new(store: Arc<dyn SetStore>, config: Config) -> Self {
        Self::with_plugins(store, config, Plugins::builtin())
    }

    /// Engine with a custom plugin registry
    pub fn with_plugins(store: Arc<dyn SetStore>, config: Config, plugins: Plugins) -> Self {
        debug!(
            namespace = %config.namespace(),
            strategies = ?plugins.strategy_names(),
            "created search engine"
        );
        Self {
            store,
            config: Arc::new(config),
            plugins: Arc::new(plugins),
            catalogs: DashMap::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plugin registry
    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn SetStore> {
        &self.store
    }

    /// Register a record type
    ///
    /// # Errors
    ///
    /// - `InvalidIndexKind` if a field uses a kind with no registered strategy
    /// - `SchemaConflict` if the record type is already registered
    pub fn register<R: Indexable>(&self, schema: Schema<R>) -> Result<Indexer<R>> {
        let strategies = schema
            .fields()
            .iter()
            .map(|field| self.plugins.strategy(field.kind()))
            .collect::<Result<Vec<_>>>()?;
        let catalog = Arc::new(FieldCatalog::from_schema(self.config.namespace(), &schema));

        match self.catalogs.entry(schema.record_type().to_string()) {
            Entry::Occupied(_) => {
                return Err(Error::SchemaConflict(schema.record_type().to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&catalog));
            }
        }
        info!(
            record_type = %schema.record_type(),
            fields = schema.fields().len(),
            "registered record type"
        );

        Ok(Indexer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            catalog,
            schema,
            strategies,
        ))
    }

    /// Whether `record_type` is registered
    pub fn is_registered(&self, record_type: &str) -> bool {
        self.catalogs.contains_key(record_type)
    }

    /// Registered record types, sorted
    pub fn record_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.catalogs.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Field catalog of `record_type`
    ///
    /// # Errors
    ///
    /// `UnknownRecordType` if the type was never registered.
    pub fn catalog(&self, record_type: &str) -> Result<Arc<FieldCatalog>> {
        self.catalogs
            .get(record_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::UnknownRecordType(record_type.to_string()))
    }

    /// Build and validate a query for `record_type`
    ///
    /// # Errors
    ///
    /// `UnknownRecordType`, `UnknownField`, `InvalidIndexKind` or
    /// `InvalidQuery`, all before anything is evaluated.
    pub fn query<F, C>(&self, record_type: &str, build: F) -> Result<Query>
    where
        F: FnOnce(&QueryBuilder) -> C,
        C: Into<Clause>,
    {
        let catalog = self.catalog(record_type)?;
        let root = build(&QueryBuilder::new()).into();
        Query::new(&catalog, &self.plugins, root)
    }

    /// Evaluate a query
    pub fn execute(&self, query: &Query) -> Result<ResultSet> {
        let catalog = self.catalog(query.record_type())?;
        let ranked = Evaluator::new(self.store.as_ref(), &catalog, &self.config, &self.plugins)
            .evaluate(query.root())?;
        Ok(ResultSet::new(
            Arc::clone(&self.store),
            catalog,
            Arc::clone(&self.plugins),
            ranked,
        ))
    }

    /// Build, validate and evaluate a query in one step
    pub fn search<F, C>(&self, record_type: &str, build: F) -> Result<ResultSet>
    where
        F: FnOnce(&QueryBuilder) -> C,
        C: Into<Clause>,
    {
        let query = self.query(record_type, build)?;
        self.execute(&query)
    }
}

impl fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEngine")
            .field("namespace", &self.config.namespace())
            .field("record_types", &self.record_types())
            .field("plugins", &self.plugins)
            .finish()
    }
}
