//! Record lifecycle hooks
//!
//! The persistence layer calls an [`IndexObserver`] after a record is durably
//! written or deleted. [`Indexer`] is the engine's observer for one record
//! type: it derives the record's postings from its schema and replaces the
//! previous postings in a single store batch.
//!
//! Every record keeps a posting manifest listing the structures it is posted
//! in. Updates diff the new postings against the manifest, so values that
//! disappeared from a record are unposted without re-reading the old record.

use std::collections::BTreeSet;
use std::sync::Arc;

use quarry_core::{Config, RecordId, Result, SetStore, WriteOp};
use tracing::{debug, warn};

use crate::schema::{FieldCatalog, FieldDefinition, Indexable, Schema};
use crate::strategy::{IndexContext, IndexStrategy, Posting, PostingRef};

/// Hooks invoked around record persistence
pub trait IndexObserver<R> {
    /// Replace the postings of `record` after it was saved
    fn update_indices(&self, record: &R) -> Result<()>;

    /// Remove every posting of `record` after it was deleted
    fn remove_indices(&self, record: &R) -> Result<()>;
}

struct IndexedField<R> {
    definition: FieldDefinition<R>,
    strategy: Arc<dyn IndexStrategy>,
}

/// Maintains the postings of one record type
pub struct Indexer<R> {
    store: Arc<dyn SetStore>,
    config: Arc<Config>,
    catalog: Arc<FieldCatalog>,
    fields: Vec<IndexedField<R>>,
}

impl<R: Indexable> Indexer<R> {
    pub(crate) fn new(
        store: Arc<dyn SetStore>,
        config: Arc<Config>,
        catalog: Arc<FieldCatalog>,
        schema: Schema<R>,
        strategies: Vec<Arc<dyn IndexStrategy>>,
    ) -> Self {
        let fields = schema
            .fields()
            .iter()
            .cloned()
            .zip(strategies)
            .map(|(definition, strategy)| IndexedField {
                definition,
                strategy,
            })
            .collect();
        Self {
            store,
            config,
            catalog,
            fields,
        }
    }

    /// Record type maintained by this indexer
    pub fn record_type(&self) -> &str {
        self.catalog.record_type()
    }

    /// Postings `record` produces under the current schema
    pub fn postings(&self, record: &R) -> Result<Vec<Posting>> {
        let keys = self.catalog.keys();
        let mut postings = Vec::new();
        for field in &self.fields {
            let value = field.definition.extract(record);
            if value.is_null() {
                continue;
            }
            let ctx = IndexContext {
                keys,
                config: &self.config,
                kind: field.definition.kind(),
            };
            postings.extend(
                field
                    .strategy
                    .postings(&ctx, field.definition.name(), &value)?,
            );
        }
        Ok(postings)
    }

    /// Structures `id` is currently posted in, according to its manifest
    pub fn posting_refs(&self, id: &RecordId) -> Result<Vec<PostingRef>> {
        let manifest = self.catalog.keys().manifest(id);
        let mut refs: Vec<PostingRef> = self
            .store
            .members(&manifest)?
            .iter()
            .filter_map(|encoded| decode_ref(&manifest, encoded))
            .collect();
        refs.sort();
        Ok(refs)
    }

    /// Remove every posting of the record with `id`
    pub fn remove_indices_by_id(&self, id: &RecordId) -> Result<()> {
        let manifest = self.catalog.keys().manifest(id);
        let mut ops: Vec<WriteOp> = self
            .store
            .members(&manifest)?
            .iter()
            .filter_map(|encoded| decode_ref(&manifest, encoded))
            .map(|r| r.removal_op(id))
            .collect();
        let removed = ops.len();
        ops.push(WriteOp::Delete { key: manifest });
        self.store.apply_batch(&ops)?;
        debug!(record_type = %self.record_type(), id = %id, removed, "removed postings");
        Ok(())
    }

    /// Reindex several records, stopping at the first failure
    ///
    /// Returns the number of records reindexed.
    pub fn update_many<'r, I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'r R>,
        R: 'r,
    {
        let mut count = 0;
        for record in records {
            self.update_indices(record)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<R: Indexable> IndexObserver<R> for Indexer<R> {
    fn update_indices(&self, record: &R) -> Result<()> {
        let id = record.record_id();
        let postings = self.postings(record)?;
        let manifest = self.catalog.keys().manifest(&id);

        let fresh: BTreeSet<PostingRef> = postings.iter().map(Posting::manifest_ref).collect();
        let stale: Vec<PostingRef> = self
            .store
            .members(&manifest)?
            .iter()
            .filter_map(|encoded| decode_ref(&manifest, encoded))
            .filter(|r| !fresh.contains(r))
            .collect();

        let mut ops = Vec::with_capacity(stale.len() + postings.len() * 2 + 1);
        ops.extend(stale.iter().map(|r| r.removal_op(&id)));
        ops.extend(postings.iter().map(|p| p.write_op(&id)));
        ops.push(WriteOp::Delete {
            key: manifest.clone(),
        });
        ops.extend(fresh.iter().map(|r| WriteOp::AddMember {
            key: manifest.clone(),
            member: r.encode(),
        }));
        self.store.apply_batch(&ops)?;

        debug!(
            record_type = %self.record_type(),
            id = %id,
            postings = postings.len(),
            stale = stale.len(),
            "updated postings"
        );
        Ok(())
    }

    fn remove_indices(&self, record: &R) -> Result<()> {
        self.remove_indices_by_id(&record.record_id())
    }
}

impl<R> std::fmt::Debug for Indexer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("record_type", &self.catalog.record_type())
            .field("fields", &self.fields.len())
            .finish()
    }
}

fn decode_ref(manifest: &str, encoded: &str) -> Option<PostingRef> {
    let decoded = PostingRef::decode(encoded);
    if decoded.is_none() {
        warn!(manifest = %manifest, entry = %encoded, "ignoring malformed manifest entry");
    }
    decoded
}
