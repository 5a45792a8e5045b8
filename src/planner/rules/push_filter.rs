//! Push a filter closer to the data source, below a project, join, or set op (§4.4
//! rule catalog: "push-filter past project/join/setop"), remapping the condition's
//! column references as it crosses each kind of node.

use crate::algebra::rel::{JoinType, RelKind, RelNode};
use crate::algebra::rex::RexNode;
use crate::planner::rule::Rule;
use std::collections::HashMap;
use std::sync::Arc;

pub struct PushFilterPastProject;

impl Rule for PushFilterPastProject {
    fn name(&self) -> &'static str {
        "PushFilterPastProject"
    }

    fn importance(&self) -> i32 {
        80
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Filter { condition } = &node.kind else { return false };
        let Some(input) = node.inputs().first() else { return false };
        let RelKind::Project { exprs } = &input.kind else { return false };
        referenced_exprs_are_simple(condition, exprs)
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Filter { condition } = &node.kind else { return vec![] };
        let project = &node.inputs()[0];
        let RelKind::Project { exprs } = &project.kind else { return vec![] };
        let remap: HashMap<usize, usize> = exprs
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                RexNode::IndexRef { index, .. } => Some((i, *index)),
                _ => None,
            })
            .collect();
        let remapped = remap_condition(condition, &remap);
        let inner = project.inputs()[0].clone();
        let pushed_filter = RelNode::new(
            RelKind::Filter { condition: remapped },
            vec![inner],
            project.inputs()[0].row_type().clone(),
            project.inputs()[0].trait_set().clone(),
        );
        let rewritten = RelNode::new(
            RelKind::Project { exprs: exprs.clone() },
            vec![Arc::new(pushed_filter)],
            node.row_type().clone(),
            node.trait_set().clone(),
        );
        vec![rewritten]
    }
}

/// Every output index the condition references must pass through the project as a
/// plain column reference (no computed expression) — otherwise pushing below would
/// require re-deriving the expression from raw input columns.
fn referenced_exprs_are_simple(condition: &RexNode, exprs: &[RexNode]) -> bool {
    fn walk(expr: &RexNode, exprs: &[RexNode], ok: &mut bool) {
        match expr {
            RexNode::IndexRef { index, .. } => {
                if !matches!(exprs.get(*index), Some(RexNode::IndexRef { .. })) {
                    *ok = false;
                }
            }
            RexNode::Call { args, .. } => {
                for a in args {
                    walk(a, exprs, ok);
                }
            }
            RexNode::Over { call, .. } => walk(call, exprs, ok),
            _ => {}
        }
    }
    let mut ok = true;
    walk(condition, exprs, &mut ok);
    ok
}

fn remap_condition(expr: &RexNode, remap: &HashMap<usize, usize>) -> RexNode {
    match expr {
        RexNode::IndexRef { index, data_type } => RexNode::IndexRef {
            index: *remap.get(index).unwrap_or(index),
            data_type: data_type.clone(),
        },
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator: *operator,
            args: args.iter().map(|a| remap_condition(a, remap)).collect(),
            data_type: data_type.clone(),
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(remap_condition(call, remap)),
            window: window.clone(),
            data_type: data_type.clone(),
        },
        other => other.clone(),
    }
}

/// Push a filter below an inner join when its condition only touches one side's
/// columns, so the filtered side can be scanned smaller than the joined result.
/// Outer joins are left alone: filtering ahead of a `Left`/`Right`/`Full` join can
/// change which rows the null-padding side produces.
pub struct PushFilterPastJoin;

impl Rule for PushFilterPastJoin {
    fn name(&self) -> &'static str {
        "PushFilterPastJoin"
    }

    fn importance(&self) -> i32 {
        75
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Filter { condition } = &node.kind else { return false };
        let Some(join) = node.inputs().first() else { return false };
        let RelKind::Join { join_type, .. } = &join.kind else { return false };
        if *join_type != JoinType::Inner {
            return false;
        }
        let left_width = join.inputs()[0].row_type().len();
        condition_side(condition, left_width).is_some()
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Filter { condition } = &node.kind else { return vec![] };
        let join = &node.inputs()[0];
        let RelKind::Join { condition: join_condition, join_type } = &join.kind else { return vec![] };
        let left = join.inputs()[0].clone();
        let right = join.inputs()[1].clone();
        let left_width = left.row_type().len();
        let Some(side) = condition_side(condition, left_width) else { return vec![] };
        let (new_left, new_right) = match side {
            JoinSide::Left => {
                let filtered = RelNode::new(
                    RelKind::Filter { condition: condition.clone() },
                    vec![left.clone()],
                    left.row_type().clone(),
                    left.trait_set().clone(),
                );
                (Arc::new(filtered), right)
            }
            JoinSide::Right => {
                let shifted = shift_condition(condition, left_width);
                let filtered = RelNode::new(
                    RelKind::Filter { condition: shifted },
                    vec![right.clone()],
                    right.row_type().clone(),
                    right.trait_set().clone(),
                );
                (left, Arc::new(filtered))
            }
        };
        let rewritten = RelNode::new(
            RelKind::Join { condition: join_condition.clone(), join_type: *join_type },
            vec![new_left, new_right],
            node.row_type().clone(),
            node.trait_set().clone(),
        );
        vec![rewritten]
    }
}

enum JoinSide {
    Left,
    Right,
}

/// `None` when the condition straddles both sides (can't push without splitting it).
fn condition_side(condition: &RexNode, left_width: usize) -> Option<JoinSide> {
    let mut min_idx = usize::MAX;
    let mut max_idx = 0usize;
    let mut any = false;
    collect_index_range(condition, &mut min_idx, &mut max_idx, &mut any);
    if !any {
        return None;
    }
    if max_idx < left_width {
        Some(JoinSide::Left)
    } else if min_idx >= left_width {
        Some(JoinSide::Right)
    } else {
        None
    }
}

fn collect_index_range(expr: &RexNode, min_idx: &mut usize, max_idx: &mut usize, any: &mut bool) {
    match expr {
        RexNode::IndexRef { index, .. } => {
            *any = true;
            *min_idx = (*min_idx).min(*index);
            *max_idx = (*max_idx).max(*index);
        }
        RexNode::Call { args, .. } => {
            for a in args {
                collect_index_range(a, min_idx, max_idx, any);
            }
        }
        RexNode::Over { call, .. } => collect_index_range(call, min_idx, max_idx, any),
        _ => {}
    }
}

/// Shift every column reference down by `left_width` — used when the condition's
/// indices are all on the join's right side and the filter now sits directly above
/// the right input, which starts counting from zero.
fn shift_condition(expr: &RexNode, left_width: usize) -> RexNode {
    match expr {
        RexNode::IndexRef { index, data_type } => {
            RexNode::IndexRef { index: index - left_width, data_type: data_type.clone() }
        }
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator: *operator,
            args: args.iter().map(|a| shift_condition(a, left_width)).collect(),
            data_type: data_type.clone(),
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(shift_condition(call, left_width)),
            window: window.clone(),
            data_type: data_type.clone(),
        },
        other => other.clone(),
    }
}

/// Push a filter below a set op: `filter(a union b) = filter(a) union filter(b)` holds
/// for every [`crate::algebra::rel::SetOpKind`] since each branch shares the filter's
/// row type and membership in the result never depends on rows from the other branch.
pub struct PushFilterPastSetOp;

impl Rule for PushFilterPastSetOp {
    fn name(&self) -> &'static str {
        "PushFilterPastSetOp"
    }

    fn importance(&self) -> i32 {
        75
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Filter { .. } = &node.kind else { return false };
        matches!(node.inputs().first().map(|i| &i.kind), Some(RelKind::SetOp { .. }))
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Filter { condition } = &node.kind else { return vec![] };
        let set_op = &node.inputs()[0];
        let RelKind::SetOp { kind, all } = &set_op.kind else { return vec![] };
        let filtered_inputs: Vec<Arc<RelNode>> = set_op
            .inputs()
            .iter()
            .map(|branch| {
                Arc::new(RelNode::new(
                    RelKind::Filter { condition: condition.clone() },
                    vec![branch.clone()],
                    branch.row_type().clone(),
                    branch.trait_set().clone(),
                ))
            })
            .collect();
        let rewritten = RelNode::new(
            RelKind::SetOp { kind: *kind, all: *all },
            filtered_inputs,
            node.row_type().clone(),
            node.trait_set().clone(),
        );
        vec![rewritten]
    }
}
