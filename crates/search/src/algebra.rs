//! Set algebra over store-backed sets
//!
//! `SetAlgebra` derives unions and intersections of stored sets. Whenever a
//! derivation needs a new set it creates a key that the algebra instance owns:
//!
//! - With [`Retention::Ephemeral`] (the default for query evaluation) every
//!   owned key carries a TTL from the write that creates it, and is deleted
//!   when the instance is discarded or dropped. The TTL is the safety net if
//!   the process dies in between.
//! - With [`Retention::Persistent`] derived keys have no TTL and are left in
//!   place for the caller.
//!
//! A derivation over a single key never copies: the input key is returned
//! as is.

use std::time::Duration;

use quarry_core::keys::ephemeral_key;
use quarry_core::{Config, Result, SetStore, WriteOp};
use tracing::{debug, warn};

/// Lifetime of keys created by a [`SetAlgebra`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Expire after the given TTL and delete on discard
    Ephemeral(Duration),
    /// Keep without expiry
    Persistent,
}

impl Retention {
    /// Retention for a TTL, where a zero TTL means persistent
    pub fn from_ttl(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Retention::Persistent
        } else {
            Retention::Ephemeral(ttl)
        }
    }
}

/// Union/intersection engine owning the keys it creates
pub struct SetAlgebra<'s> {
    store: &'s dyn SetStore,
    namespace: String,
    retention: Retention,
    owned: Vec<String>,
}

impl<'s> SetAlgebra<'s> {
    /// Create an algebra writing under `namespace`
    pub fn new(
        store: &'s dyn SetStore,
        namespace: impl Into<String>,
        retention: Retention,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            retention,
            owned: Vec::new(),
        }
    }

    /// Algebra for one query evaluation, using the configured TTL
    pub fn ephemeral(store: &'s dyn SetStore, config: &Config) -> Self {
        Self::new(
            store,
            config.namespace(),
            Retention::from_ttl(config.ephemeral_ttl()),
        )
    }

    /// The underlying store
    pub fn store(&self) -> &'s dyn SetStore {
        self.store
    }

    /// Retention applied to created keys
    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Keys created so far and not yet discarded
    pub fn owned_keys(&self) -> &[String] {
        &self.owned
    }

    /// Union of `keys`
    ///
    /// One key is returned unchanged; otherwise a new key receives the union.
    pub fn union(&mut self, keys: &[String]) -> Result<String> {
        if let [only] = keys {
            return Ok(only.clone());
        }
        let dest = self.fresh_key();
        if !keys.is_empty() {
            self.union_into(&dest, keys)?;
        }
        Ok(dest)
    }

    /// Intersection of `keys`
    ///
    /// One key is returned unchanged; otherwise a new key is seeded with the
    /// first input and the rest are intersected into it one by one.
    pub fn intersect(&mut self, keys: &[String]) -> Result<String> {
        let (first, rest) = match keys {
            [only] => return Ok(only.clone()),
            [first, rest @ ..] => (first, rest),
            [] => {
                let dest = self.fresh_key();
                return Ok(dest);
            }
        };
        let dest = self.fresh_key();
        let mut remaining = self.union_into(&dest, std::slice::from_ref(first))?;
        for key in rest {
            if remaining == 0 {
                break;
            }
            remaining = self.intersect_into(&dest, &[dest.clone(), key.clone()])?;
        }
        Ok(dest)
    }

    /// New key holding exactly `members`
    pub fn materialize(&mut self, members: &[String]) -> Result<String> {
        let dest = self.fresh_key();
        if members.is_empty() {
            return Ok(dest);
        }
        let mut ops: Vec<WriteOp> = members
            .iter()
            .map(|m| WriteOp::AddMember {
                key: dest.clone(),
                member: m.clone(),
            })
            .collect();
        if let Retention::Ephemeral(ttl) = self.retention {
            ops.push(WriteOp::Expire {
                key: dest.clone(),
                ttl,
            });
        }
        self.store.apply_batch(&ops)?;
        Ok(dest)
    }

    /// Delete every owned key, returning how many existed
    pub fn discard(&mut self) -> Result<usize> {
        if self.owned.is_empty() {
            return Ok(0);
        }
        let keys = std::mem::take(&mut self.owned);
        let deleted = self.store.delete(&keys)?;
        debug!(created = keys.len(), deleted, "discarded ephemeral keys");
        Ok(deleted)
    }

    fn fresh_key(&mut self) -> String {
        let key = ephemeral_key(&self.namespace);
        if let Retention::Ephemeral(_) = self.retention {
            self.owned.push(key.clone());
        }
        key
    }

    // Owned keys get their TTL in the same store call that writes them

    fn union_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        match self.retention {
            Retention::Ephemeral(ttl) => self.store.union_into_expiring(dest, keys, ttl),
            Retention::Persistent => self.store.union_into(dest, keys),
        }
    }

    fn intersect_into(&self, dest: &str, keys: &[String]) -> Result<usize> {
        match self.retention {
            Retention::Ephemeral(ttl) => self.store.intersect_into_expiring(dest, keys, ttl),
            Retention::Persistent => self.store.intersect_into(dest, keys),
        }
    }
}

impl Drop for SetAlgebra<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.discard() {
            warn!(error = %e, "failed to discard ephemeral keys; leaving them to expire");
        }
    }
}
