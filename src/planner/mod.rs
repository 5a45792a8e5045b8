//! Cost-based planner (C4, §4.4): a worklist search over an [`EquivalenceSet`] that
//! applies a constant-folded [`RuleSet`] until no rule produces a new digest or the
//! iteration budget is exhausted, then extracts the cheapest expression meeting the
//! caller's goal trait set.

pub mod equivalence;
pub mod rule;
pub mod rules;

use crate::algebra::rel::{Cost, RelKind, RelNode};
use crate::algebra::traits::TraitSet;
use equivalence::{EquivalenceSet, GroupId};
use rule::RuleSet;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Default cap on rule applications per `optimize()` call, guarding against a rule
/// cycle that would otherwise loop forever (digest dedup makes this unreachable in
/// practice for the standard rule set, but a user-supplied rule set has no such
/// guarantee).
const DEFAULT_MAX_ITERATIONS: usize = 10_000;

pub struct Planner {
    rule_set: RuleSet,
    max_iterations: usize,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    pub fn new() -> Self {
        Self::with_rules(RuleSet::standard())
    }

    pub fn with_rules(rule_set: RuleSet) -> Self {
        Planner { rule_set, max_iterations: DEFAULT_MAX_ITERATIONS }
    }

    /// Explore the equivalence class of `root` and return the cheapest plan meeting
    /// `goal`. If no explored expression satisfies `goal` directly — typically because
    /// `goal` names a convention no explored node carries — the best logical-convention
    /// plan is wrapped in a [`RelKind::Converter`] rather than left unmet, matching the
    /// rule that an illegal edge is never produced but a legal one always is available
    /// back to the logical convention (§4.4).
    ///
    /// The search is driven by a priority queue of pending matches ordered by each
    /// rule's importance heuristic (§4.4), not a plain FIFO worklist: on each step the
    /// most important still-open match is popped and fired, with ties broken on rule
    /// name then match digest so repeated runs over identical inputs agree (§8).
    pub fn optimize(&self, root: Arc<RelNode>, goal: &TraitSet) -> Arc<RelNode> {
        let mut eqs = EquivalenceSet::new();
        let mut discovered: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<Arc<RelNode>> = VecDeque::new();
        let mut heap: BinaryHeap<PendingMatch> = BinaryHeap::new();
        frontier.push_back(root.clone());

        let mut iterations = 0usize;
        loop {
            while let Some(expr) = frontier.pop_front() {
                if !discovered.insert(expr.digest()) {
                    continue;
                }
                for input in expr.inputs() {
                    frontier.push_back(input.clone());
                }
                let (gid, _) = eqs.register(expr.clone());
                eqs.consider(gid, expr.trait_set().clone(), expr.clone(), total_cost(&expr));
                for rule in self.rule_set.rules() {
                    if rule.matches(&expr) {
                        heap.push(PendingMatch {
                            importance: rule.importance(),
                            rule_name: rule.name(),
                            digest: expr.digest(),
                            group: gid,
                            node: expr.clone(),
                        });
                    }
                }
            }

            let Some(pending) = heap.pop() else { break };
            iterations += 1;
            if iterations > self.max_iterations {
                debug!(iterations, "planner iteration budget exhausted");
                break;
            }

            let Some(rule) = self.rule_set.rules().iter().find(|r| r.name() == pending.rule_name) else {
                continue;
            };
            for produced in rule.apply(&pending.node) {
                let produced = Arc::new(produced);
                // A rewrite of `pending.node` is equivalent to it, not a new top-level
                // candidate — merge into its own group so cost comparison and the
                // final best-for-goal lookup can actually see it.
                let is_new = !eqs.contains_digest(&produced.digest());
                eqs.add_to_group(pending.group, produced.clone());
                eqs.consider(
                    pending.group,
                    produced.trait_set().clone(),
                    produced.clone(),
                    total_cost(&produced),
                );
                if is_new {
                    frontier.push_back(produced);
                }
            }
        }

        let (root_gid, _) = eqs.register(root.clone());
        if let Some((node, _)) = eqs.group(root_gid).best_for(goal) {
            return node.clone();
        }

        let fallback = eqs
            .group(root_gid)
            .best_for(&TraitSet::logical())
            .map(|(n, _)| n.clone())
            .unwrap_or(root);
        Arc::new(RelNode::new(
            RelKind::Converter { target_convention: goal.convention() },
            vec![fallback.clone()],
            fallback.row_type().clone(),
            goal.clone(),
        ))
    }
}

/// A rule ready to fire against a specific node, ordered for the planner's priority
/// queue (§4.4). Equality and ordering only consider the fields that determine search
/// order, never `node` itself.
struct PendingMatch {
    importance: i32,
    rule_name: &'static str,
    digest: String,
    group: GroupId,
    node: Arc<RelNode>,
}

impl PartialEq for PendingMatch {
    fn eq(&self, other: &Self) -> bool {
        self.importance == other.importance && self.rule_name == other.rule_name && self.digest == other.digest
    }
}

impl Eq for PendingMatch {}

impl PartialOrd for PendingMatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingMatch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.importance
            .cmp(&other.importance)
            .then_with(|| self.rule_name.cmp(other.rule_name))
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

fn total_cost(node: &RelNode) -> Cost {
    let mut cost = node.compute_self_cost();
    for input in node.inputs() {
        cost = cost.plus(total_cost(input));
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::operator::Operator;
    use crate::algebra::rex::{Literal, RexNode};
    use crate::catalog::CatalogId;
    use crate::types::{Nullability, Type};

    fn int_ty() -> Arc<Type> {
        Arc::new(Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL })
    }

    fn bool_ty() -> Arc<Type> {
        Arc::new(Type::Numeric { precision: Some(1), scale: Some(0), nullable: Nullability::NOT_NULL })
    }

    #[test]
    fn optimize_is_deterministic_across_runs() {
        let scan = Arc::new(RelNode::new(
            RelKind::TableScan { table_id: CatalogId(1) },
            vec![],
            vec![("a".to_string(), int_ty())],
            TraitSet::logical(),
        ));
        let not_not = RexNode::call(
            Operator::Not,
            vec![RexNode::call(Operator::Not, vec![RexNode::literal(bool_ty(), Literal::Boolean(true))]).unwrap()],
        )
        .unwrap();
        let filter = Arc::new(RelNode::new(
            RelKind::Filter { condition: not_not },
            vec![scan],
            vec![("a".to_string(), int_ty())],
            TraitSet::logical(),
        ));
        let planner = Planner::new();
        let first = planner.optimize(filter.clone(), &TraitSet::logical());
        let second = planner.optimize(filter, &TraitSet::logical());
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn optimize_folds_double_negation() {
        let scan = Arc::new(RelNode::new(
            RelKind::TableScan { table_id: CatalogId(1) },
            vec![],
            vec![("a".to_string(), int_ty())],
            TraitSet::logical(),
        ));
        let literal_true = RexNode::literal(bool_ty(), Literal::Boolean(true));
        let not_not = RexNode::call(Operator::Not, vec![RexNode::call(Operator::Not, vec![literal_true.clone()]).unwrap()]).unwrap();
        let filter = Arc::new(RelNode::new(
            RelKind::Filter { condition: not_not },
            vec![scan],
            vec![("a".to_string(), int_ty())],
            TraitSet::logical(),
        ));
        let planner = Planner::new();
        let best = planner.optimize(filter, &TraitSet::logical());
        match &best.kind {
            RelKind::Filter { condition } => assert_eq!(condition, &literal_true),
            other => panic!("expected a Filter at the root, got {other:?}"),
        }
    }
}
