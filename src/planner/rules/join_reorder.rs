//! Join reordering (§4.4 rule catalog: "bushy, bounded by a heuristic window").
//! [`CommuteJoin`] swaps a single join's two inputs, always semantically safe — the
//! router's own adapter-id-ascending ordering (§4.5) is a placement-time concern and
//! operates independently of this rewrite. [`AssociateJoin`] re-associates one level of
//! nesting from a left-deep `(a join b) join c` shape into the bushy `a join (b join
//! c)` shape; the "window" is that one level — it does not search unbounded join trees.

use crate::algebra::rel::{JoinType, RelKind, RelNode, RowType};
use crate::algebra::rex::RexNode;
use crate::planner::rule::Rule;
use std::collections::HashMap;
use std::sync::Arc;

pub struct CommuteJoin;

impl Rule for CommuteJoin {
    fn name(&self) -> &'static str {
        "CommuteJoin"
    }

    fn importance(&self) -> i32 {
        40
    }

    fn matches(&self, node: &RelNode) -> bool {
        matches!(node.kind, RelKind::Join { join_type: JoinType::Inner, .. })
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Join { condition, join_type } = &node.kind else { return vec![] };
        let left = &node.inputs()[0];
        let right = &node.inputs()[1];
        let left_width = left.row_type().len();
        let right_width = right.row_type().len();

        let remap: HashMap<usize, usize> = (0..left_width)
            .map(|i| (i, i + right_width))
            .chain((0..right_width).map(|i| (i + left_width, i)))
            .collect();
        let swapped_condition = remap_indices(condition, &remap);

        let mut row_type: RowType = right.row_type().clone();
        row_type.extend(left.row_type().clone());

        vec![RelNode::new(
            RelKind::Join { condition: swapped_condition, join_type: *join_type },
            vec![right.clone(), left.clone()],
            row_type,
            node.trait_set().clone(),
        )]
    }
}

/// Re-associates `(a join b) join c` into `a join (b join c)` when the outer join's
/// condition references only `b` and `c` columns — in that case the outer condition
/// becomes the new inner join's condition (re-based to the inner join's own index
/// space) and the original inner join's condition becomes the new outer condition
/// unchanged, since `b`'s global column offset is the same in both shapes.
pub struct AssociateJoin;

impl Rule for AssociateJoin {
    fn name(&self) -> &'static str {
        "AssociateJoin"
    }

    fn importance(&self) -> i32 {
        40
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Join { join_type: JoinType::Inner, condition: outer_condition } = &node.kind else {
            return false;
        };
        let Some(left) = node.inputs().first() else { return false };
        if !matches!(left.kind, RelKind::Join { join_type: JoinType::Inner, .. }) {
            return false;
        }
        let a_width = left.inputs()[0].row_type().len();
        condition_refs_below(outer_condition, a_width)
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Join { condition: outer_condition, join_type } = &node.kind else { return vec![] };
        let left = &node.inputs()[0];
        let c = node.inputs()[1].clone();
        let RelKind::Join { condition: inner_condition, join_type: inner_join_type } = &left.kind else {
            return vec![];
        };
        let a = left.inputs()[0].clone();
        let b = left.inputs()[1].clone();
        let a_width = a.row_type().len();

        let bc_condition = shift_indices(outer_condition, a_width);
        let mut bc_row_type: RowType = b.row_type().clone();
        bc_row_type.extend(c.row_type().clone());
        let bc = Arc::new(RelNode::new(
            RelKind::Join { condition: bc_condition, join_type: *join_type },
            vec![b, c],
            bc_row_type.clone(),
            node.trait_set().clone(),
        ));

        let mut row_type: RowType = a.row_type().clone();
        row_type.extend(bc_row_type);
        vec![RelNode::new(
            RelKind::Join { condition: inner_condition.clone(), join_type: *inner_join_type },
            vec![a, bc],
            row_type,
            node.trait_set().clone(),
        )]
    }
}

/// True if every column reference in `expr` is at or above `bound` (i.e. none of them
/// address the relation occupying indices `0..bound`).
fn condition_refs_below(expr: &RexNode, bound: usize) -> bool {
    match expr {
        RexNode::IndexRef { index, .. } => *index >= bound,
        RexNode::Call { args, .. } => args.iter().all(|a| condition_refs_below(a, bound)),
        RexNode::Over { call, .. } => condition_refs_below(call, bound),
        _ => true,
    }
}

fn shift_indices(expr: &RexNode, delta: usize) -> RexNode {
    match expr {
        RexNode::IndexRef { index, data_type } => {
            RexNode::IndexRef { index: index - delta, data_type: data_type.clone() }
        }
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator: *operator,
            args: args.iter().map(|a| shift_indices(a, delta)).collect(),
            data_type: data_type.clone(),
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(shift_indices(call, delta)),
            window: window.clone(),
            data_type: data_type.clone(),
        },
        other => other.clone(),
    }
}

fn remap_indices(expr: &RexNode, remap: &HashMap<usize, usize>) -> RexNode {
    match expr {
        RexNode::IndexRef { index, data_type } => RexNode::IndexRef {
            index: *remap.get(index).unwrap_or(index),
            data_type: data_type.clone(),
        },
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator: *operator,
            args: args.iter().map(|a| remap_indices(a, remap)).collect(),
            data_type: data_type.clone(),
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(remap_indices(call, remap)),
            window: window.clone(),
            data_type: data_type.clone(),
        },
        other => other.clone(),
    }
}
