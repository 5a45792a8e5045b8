//! Aggregate pullup through union and DISTINCT-to-group-by conversion (§4.4 rule
//! catalog). Both rules are restricted to `agg_calls.is_empty()` groupings — pure
//! duplicate elimination — since that is the only case where merging branches ahead
//! of aggregation preserves results; re-aggregating a `COUNT`/`SUM` after a union
//! would double-count rows shared between branches.

use crate::algebra::rel::{RelKind, RelNode, SetOpKind};
use crate::planner::rule::Rule;

/// Canonicalizes a plain `DISTINCT`-shaped aggregate (no aggregate calls) to carry an
/// explicit grouping set, so later stages never have to special-case "no grouping
/// sets" as "group by everything".
pub struct DistinctToGroupBy;

impl Rule for DistinctToGroupBy {
    fn name(&self) -> &'static str {
        "DistinctToGroupBy"
    }

    fn matches(&self, node: &RelNode) -> bool {
        matches!(
            &node.kind,
            RelKind::Aggregate { agg_calls, grouping_sets, group_keys }
                if agg_calls.is_empty() && grouping_sets.is_empty() && !group_keys.is_empty()
        )
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Aggregate { group_keys, agg_calls, .. } = &node.kind else { return vec![] };
        vec![RelNode::new(
            RelKind::Aggregate {
                group_keys: group_keys.clone(),
                grouping_sets: vec![group_keys.clone()],
                agg_calls: agg_calls.clone(),
            },
            node.inputs().to_vec(),
            node.row_type().clone(),
            node.trait_set().clone(),
        )]
    }
}

/// Merges `UNION ALL` of two identically-grouped, call-free aggregates into one
/// aggregate over the union of their raw inputs.
pub struct PullupThroughUnion;

impl Rule for PullupThroughUnion {
    fn name(&self) -> &'static str {
        "PullupThroughUnion"
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::SetOp { kind: SetOpKind::Union, all: true } = &node.kind else { return false };
        if node.inputs().len() != 2 {
            return false;
        }
        let (RelKind::Aggregate { group_keys: lk, agg_calls: la, .. }, RelKind::Aggregate { group_keys: rk, agg_calls: ra, .. }) =
            (&node.inputs()[0].kind, &node.inputs()[1].kind)
        else {
            return false;
        };
        la.is_empty() && ra.is_empty() && lk == rk
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Aggregate { group_keys, grouping_sets, .. } = &node.inputs()[0].kind else {
            return vec![];
        };
        let left_input = node.inputs()[0].inputs()[0].clone();
        let right_input = node.inputs()[1].inputs()[0].clone();
        let union = RelNode::new(
            RelKind::SetOp { kind: SetOpKind::Union, all: true },
            vec![left_input, right_input],
            node.inputs()[0].inputs()[0].row_type().clone(),
            node.trait_set().clone(),
        );
        vec![RelNode::new(
            RelKind::Aggregate {
                group_keys: group_keys.clone(),
                grouping_sets: grouping_sets.clone(),
                agg_calls: vec![],
            },
            vec![std::sync::Arc::new(union)],
            node.row_type().clone(),
            node.trait_set().clone(),
        )]
    }
}
