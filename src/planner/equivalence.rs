//! Equivalence sets (§4.4): a group of plan expressions with identical row type and
//! logical semantics. Each group tracks the best known cost per required trait set so
//! the search can answer "cheapest plan meeting trait X" without re-deriving it.

use crate::algebra::rel::{Cost, RelNode};
use crate::algebra::traits::TraitSet;
use std::collections::HashMap;
use std::sync::Arc;

pub type GroupId = usize;

pub struct Group {
    pub members: Vec<Arc<RelNode>>,
    /// Best cost found so far for each required trait set registered against this
    /// group, plus the member that achieves it.
    best: HashMap<TraitSet, (Arc<RelNode>, Cost)>,
}

impl Group {
    fn new(seed: Arc<RelNode>) -> Self {
        Group { members: vec![seed], best: HashMap::new() }
    }

    pub fn best_for(&self, required: &TraitSet) -> Option<&(Arc<RelNode>, Cost)> {
        self.best.get(required)
    }
}

/// Registers expressions by structural digest so duplicate rule firings don't blow up
/// the search (§4.4: "Duplicates are detected by digest equality").
#[derive(Default)]
pub struct EquivalenceSet {
    groups: Vec<Group>,
    digest_to_group: HashMap<String, GroupId>,
}

impl EquivalenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` into the equivalence set, returning its group id and whether
    /// this was a new registration (false if already present by digest).
    pub fn register(&mut self, node: Arc<RelNode>) -> (GroupId, bool) {
        let digest = node.digest();
        if let Some(&gid) = self.digest_to_group.get(&digest) {
            return (gid, false);
        }
        let gid = self.groups.len();
        self.groups.push(Group::new(node));
        self.digest_to_group.insert(digest, gid);
        (gid, true)
    }

    /// Merge `node` into an existing group (an alternative physical realization of the
    /// same logical semantics produced by a rule).
    pub fn add_to_group(&mut self, gid: GroupId, node: Arc<RelNode>) {
        let digest = node.digest();
        if self.digest_to_group.contains_key(&digest) {
            return;
        }
        self.groups[gid].members.push(node);
        self.digest_to_group.insert(digest, gid);
    }

    pub fn group(&self, gid: GroupId) -> &Group {
        &self.groups[gid]
    }

    /// Consider `node` under `required` traits; if its total cost beats the group's
    /// current best for that trait set, record it. Ties are broken by digest for
    /// determinism (§4.4).
    pub fn consider(&mut self, gid: GroupId, required: TraitSet, node: Arc<RelNode>, cost: Cost) {
        let group = &mut self.groups[gid];
        match group.best.get(&required) {
            Some((existing, existing_cost)) => {
                let better = cost.total() < existing_cost.total()
                    || (cost.total() == existing_cost.total() && node.digest() < existing.digest());
                if better {
                    group.best.insert(required, (node, cost));
                }
            }
            None => {
                group.best.insert(required, (node, cost));
            }
        }
    }

    pub fn contains_digest(&self, digest: &str) -> bool {
        self.digest_to_group.contains_key(digest)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
