//! Query evaluation
//!
//! Walks a clause tree bottom-up. Every clause produces a [`CandidateSet`]:
//! leaves through their strategy, groups through set algebra over their
//! children's keys. Scores combine by match count:
//!
//! - `All`: ids in every child; score is the sum of the children's scores
//! - `Any`: ids in any child; score is the sum over the children matching
//! - `Weighted`: child's ids; scores multiplied by the weight
//! - `Boost`: applied after the non-boost siblings of its group; members of the
//!   group that also match the boost clause gain the weight. A group with only
//!   boosts is empty.
//!
//! Ephemeral keys created along the way belong to one `SetAlgebra` and are
//! deleted once the ranked ids have been read.

use std::collections::HashSet;

use quarry_core::{Config, RecordId, Result, SetStore};
use tracing::{debug, warn};

use crate::algebra::SetAlgebra;
use crate::candidate::{rank, CandidateSet, Scores};
use crate::query::{Clause, Leaf};
use crate::registry::Plugins;
use crate::schema::FieldCatalog;
use crate::strategy::LeafContext;

/// Ordered ids and scores of an evaluated query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranked {
    /// Ids by descending score, ties by ascending id
    pub ids: Vec<RecordId>,
    /// Score of every id in `ids`
    pub scores: Scores,
}

/// Evaluates clause trees for one record type
pub struct Evaluator<'a> {
    store: &'a dyn SetStore,
    catalog: &'a FieldCatalog,
    config: &'a Config,
    plugins: &'a Plugins,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator
    pub fn new(
        store: &'a dyn SetStore,
        catalog: &'a FieldCatalog,
        config: &'a Config,
        plugins: &'a Plugins,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
            plugins,
        }
    }

    /// Evaluate `clause` into ranked ids
    pub fn evaluate(&self, clause: &Clause) -> Result<Ranked> {
        let mut algebra = SetAlgebra::ephemeral(self.store, self.config);
        let outcome = self.eval(clause, &mut algebra).and_then(|candidates| {
            let members = self.store.members(candidates.key())?;
            Ok((members, candidates))
        });

        let created = algebra.owned_keys().len();
        if let Err(e) = algebra.discard() {
            warn!(error = %e, "failed to discard ephemeral keys; leaving them to expire");
        }
        let (members, candidates) = outcome?;

        let (_, mut all_scores) = candidates.into_parts();
        let mut scores = Scores::with_capacity(members.len());
        let ids: Vec<RecordId> = members.into_iter().map(RecordId::new).collect();
        for id in &ids {
            let score = all_scores.remove(id).unwrap_or(0.0);
            scores.insert(id.clone(), score);
        }
        let ids = rank(ids, &scores);

        debug!(
            record_type = %self.catalog.record_type(),
            matches = ids.len(),
            ephemeral_keys = created,
            "evaluated query"
        );
        Ok(Ranked { ids, scores })
    }

    fn eval(&self, clause: &Clause, algebra: &mut SetAlgebra<'a>) -> Result<CandidateSet> {
        match clause {
            Clause::Leaf(leaf) => self.eval_leaf(leaf, algebra),
            Clause::All(children) => self.eval_group(Mode::All, children, algebra),
            Clause::Any(children) => self.eval_group(Mode::Any, children, algebra),
            Clause::Weighted { weight, clause } => {
                let mut candidates = self.eval(clause, algebra)?;
                candidates.scale(*weight);
                Ok(candidates)
            }
            // A boost outside of a group has no scope to re-score
            Clause::Boost { .. } => {
                self.eval_group(Mode::All, std::slice::from_ref(clause), algebra)
            }
        }
    }

    fn eval_leaf(&self, leaf: &Leaf, algebra: &mut SetAlgebra<'a>) -> Result<CandidateSet> {
        let strategy = self.plugins.strategy(&leaf.kind)?;
        self.catalog.require(&leaf.field, &leaf.kind)?;
        let mut ctx = LeafContext {
            keys: self.catalog.keys(),
            config: self.config,
            kind: &leaf.kind,
            algebra,
        };
        strategy.evaluate(&mut ctx, &leaf.field, &leaf.operand)
    }

    fn eval_group(
        &self,
        mode: Mode,
        children: &[Clause],
        algebra: &mut SetAlgebra<'a>,
    ) -> Result<CandidateSet> {
        let mut parts = Vec::with_capacity(children.len());
        let mut boosts = Vec::new();
        for child in children {
            match child {
                Clause::Boost { weight, clause } => boosts.push((*weight, clause.as_ref())),
                other => parts.push(self.eval(other, algebra)?),
            }
        }

        let mut scope = if parts.len() == 1 {
            parts.remove(0)
        } else {
            self.combine(mode, parts, algebra)?
        };

        for (weight, clause) in boosts {
            let boost = self.eval(clause, algebra)?;
            let hits = algebra.intersect(&[scope.key().to_string(), boost.key().to_string()])?;
            for member in self.store.members(&hits)? {
                scope.add(RecordId::new(member), weight);
            }
        }
        Ok(scope)
    }

    fn combine(
        &self,
        mode: Mode,
        parts: Vec<CandidateSet>,
        algebra: &mut SetAlgebra<'a>,
    ) -> Result<CandidateSet> {
        let keys: Vec<String> = parts.iter().map(|p| p.key().to_string()).collect();
        let mut scores = Scores::new();
        let key = match mode {
            Mode::All => {
                let key = algebra.intersect(&keys)?;
                let members: HashSet<String> = self.store.members(&key)?.into_iter().collect();
                for part in parts {
                    let (_, part_scores) = part.into_parts();
                    for (id, score) in part_scores {
                        if members.contains(id.as_str()) {
                            *scores.entry(id).or_insert(0.0) += score;
                        }
                    }
                }
                key
            }
            Mode::Any => {
                let key = algebra.union(&keys)?;
                for part in parts {
                    let (_, part_scores) = part.into_parts();
                    for (id, score) in part_scores {
                        *scores.entry(id).or_insert(0.0) += score;
                    }
                }
                key
            }
        };
        Ok(CandidateSet::new(key, scores))
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    All,
    Any,
}
