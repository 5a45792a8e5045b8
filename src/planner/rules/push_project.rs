//! Push a column-pruning project below a filter or join (§4.4 rule catalog).

use crate::algebra::rel::{JoinType, RelKind, RelNode, RowType};
use crate::algebra::rex::RexNode;
use crate::planner::rule::Rule;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Pushes `Project` below `Filter` when the project keeps an unbroken prefix of the
/// filter's input columns (positions unchanged) and the filter condition only
/// references columns inside that prefix. Reordering or computed projections never
/// match — the rewrite only trims trailing, unreferenced columns.
pub struct PushProjectPastFilter;

impl Rule for PushProjectPastFilter {
    fn name(&self) -> &'static str {
        "PushProjectPastFilter"
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Project { exprs } = &node.kind else { return false };
        let Some(input) = node.inputs().first() else { return false };
        if !matches!(input.kind, RelKind::Filter { .. }) {
            return false;
        }
        let Some(prefix_len) = identity_prefix_len(exprs) else { return false };
        let RelKind::Filter { condition } = &input.kind else { return false };
        refs_within(condition, prefix_len)
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Project { exprs } = &node.kind else { return vec![] };
        let filter = &node.inputs()[0];
        let RelKind::Filter { condition } = &filter.kind else { return vec![] };
        let inner = filter.inputs()[0].clone();
        let pushed_project = RelNode::new(
            RelKind::Project { exprs: exprs.clone() },
            vec![inner],
            node.row_type().clone(),
            node.trait_set().clone(),
        );
        let rewritten = RelNode::new(
            RelKind::Filter { condition: condition.clone() },
            vec![Arc::new(pushed_project)],
            node.row_type().clone(),
            node.trait_set().clone(),
        );
        vec![rewritten]
    }
}

/// Prunes join inputs down to the columns the output projection and the join
/// condition actually reference, wrapping the trimmed join in a remapping project so
/// the visible output indices are unchanged (a restricted form of Calcite's
/// project-join-transpose).
pub struct PushProjectPastJoin;

impl Rule for PushProjectPastJoin {
    fn name(&self) -> &'static str {
        "PushProjectPastJoin"
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Project { exprs } = &node.kind else { return false };
        if !exprs.iter().all(|e| matches!(e, RexNode::IndexRef { .. })) {
            return false;
        }
        let Some(join) = node.inputs().first() else { return false };
        let RelKind::Join { condition, .. } = &join.kind else { return false };
        let left_width = join.inputs()[0].row_type().len();
        let right_width = join.inputs()[1].row_type().len();
        let mut needed = BTreeSet::new();
        collect_index_refs(condition, &mut needed);
        for e in exprs {
            collect_index_refs(e, &mut needed);
        }
        let left_needed = needed.iter().filter(|&&i| i < left_width).count();
        let right_needed = needed.iter().filter(|&&i| i >= left_width).count();
        left_needed < left_width || right_needed < right_width
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Project { exprs } = &node.kind else { return vec![] };
        let join = &node.inputs()[0];
        let RelKind::Join { condition, join_type } = &join.kind else { return vec![] };
        let left = &join.inputs()[0];
        let right = &join.inputs()[1];
        let left_width = left.row_type().len();

        let mut needed = BTreeSet::new();
        collect_index_refs(condition, &mut needed);
        for e in exprs {
            collect_index_refs(e, &mut needed);
        }
        let mut left_keep: Vec<usize> = needed.iter().copied().filter(|&i| i < left_width).collect();
        let mut right_keep: Vec<usize> = needed
            .iter()
            .copied()
            .filter(|&i| i >= left_width)
            .map(|i| i - left_width)
            .collect();
        left_keep.sort_unstable();
        right_keep.sort_unstable();

        let remap: std::collections::HashMap<usize, usize> = left_keep
            .iter()
            .enumerate()
            .map(|(new_i, &old_i)| (old_i, new_i))
            .chain(
                right_keep
                    .iter()
                    .enumerate()
                    .map(|(new_i, &old_i)| (old_i + left_width, new_i + left_keep.len())),
            )
            .collect();

        let left_row_type: RowType = left_keep.iter().map(|&i| left.row_type()[i].clone()).collect();
        let right_row_type: RowType = right_keep.iter().map(|&i| right.row_type()[i].clone()).collect();
        let left_exprs: Vec<RexNode> = left_keep
            .iter()
            .map(|&i| RexNode::index_ref(i, left.row_type()[i].1.clone()))
            .collect();
        let right_exprs: Vec<RexNode> = right_keep
            .iter()
            .map(|&i| RexNode::index_ref(i, right.row_type()[i].1.clone()))
            .collect();

        let new_left = Arc::new(RelNode::new(
            RelKind::Project { exprs: left_exprs },
            vec![left.clone()],
            left_row_type.clone(),
            left.trait_set().clone(),
        ));
        let new_right = Arc::new(RelNode::new(
            RelKind::Project { exprs: right_exprs },
            vec![right.clone()],
            right_row_type.clone(),
            right.trait_set().clone(),
        ));

        let new_condition = remap_indices(condition, &remap);
        let mut join_row_type = left_row_type;
        join_row_type.extend(right_row_type);
        let new_join = Arc::new(RelNode::new(
            RelKind::Join {
                condition: new_condition,
                join_type: *join_type,
            },
            vec![new_left, new_right],
            join_row_type,
            join.trait_set().clone(),
        ));

        let outer_exprs: Vec<RexNode> = exprs.iter().map(|e| remap_indices(e, &remap)).collect();
        vec![RelNode::new(
            RelKind::Project { exprs: outer_exprs },
            vec![new_join],
            node.row_type().clone(),
            node.trait_set().clone(),
        )]
    }
}

/// Prunes an aggregate's input down to the columns its group keys, grouping sets, and
/// agg-call arguments actually reference — the aggregate's own output row type and the
/// project sitting above it are unaffected, since both only address the aggregate's
/// output positions, not its input.
pub struct PushProjectPastAggregate;

impl Rule for PushProjectPastAggregate {
    fn name(&self) -> &'static str {
        "PushProjectPastAggregate"
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Project { exprs } = &node.kind else { return false };
        if !exprs.iter().all(|e| matches!(e, RexNode::IndexRef { .. })) {
            return false;
        }
        let Some(aggregate) = node.inputs().first() else { return false };
        let RelKind::Aggregate { group_keys, grouping_sets, agg_calls } = &aggregate.kind else { return false };
        let input_width = aggregate.inputs()[0].row_type().len();
        let needed = aggregate_input_refs(group_keys, grouping_sets, agg_calls);
        needed.len() < input_width
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Project { .. } = &node.kind else { return vec![] };
        let aggregate = &node.inputs()[0];
        let RelKind::Aggregate { group_keys, grouping_sets, agg_calls } = &aggregate.kind else { return vec![] };
        let input = &aggregate.inputs()[0];
        let needed = aggregate_input_refs(group_keys, grouping_sets, agg_calls);
        let keep: Vec<usize> = needed.into_iter().collect();
        let remap: std::collections::HashMap<usize, usize> =
            keep.iter().enumerate().map(|(new_i, &old_i)| (old_i, new_i)).collect();

        let pruned_row_type: RowType = keep.iter().map(|&i| input.row_type()[i].clone()).collect();
        let pruned_exprs: Vec<RexNode> =
            keep.iter().map(|&i| RexNode::index_ref(i, input.row_type()[i].1.clone())).collect();
        let pruned_input = Arc::new(RelNode::new(
            RelKind::Project { exprs: pruned_exprs },
            vec![input.clone()],
            pruned_row_type,
            input.trait_set().clone(),
        ));

        let new_aggregate = Arc::new(RelNode::new(
            RelKind::Aggregate {
                group_keys: group_keys.iter().map(|i| remap[i]).collect(),
                grouping_sets: grouping_sets.iter().map(|set| set.iter().map(|i| remap[i]).collect()).collect(),
                agg_calls: agg_calls
                    .iter()
                    .map(|call| crate::algebra::rel::AggCall {
                        function: call.function.clone(),
                        args: call.args.iter().map(|i| remap[i]).collect(),
                        distinct: call.distinct,
                        data_type: call.data_type.clone(),
                    })
                    .collect(),
            },
            vec![pruned_input],
            aggregate.row_type().clone(),
            aggregate.trait_set().clone(),
        ));

        vec![RelNode::new(node.kind.clone(), vec![new_aggregate], node.row_type().clone(), node.trait_set().clone())]
    }
}

fn aggregate_input_refs(
    group_keys: &[usize],
    grouping_sets: &[Vec<usize>],
    agg_calls: &[crate::algebra::rel::AggCall],
) -> BTreeSet<usize> {
    let mut needed = BTreeSet::new();
    needed.extend(group_keys.iter().copied());
    for set in grouping_sets {
        needed.extend(set.iter().copied());
    }
    for call in agg_calls {
        needed.extend(call.args.iter().copied());
    }
    needed
}

fn identity_prefix_len(exprs: &[RexNode]) -> Option<usize> {
    for (i, e) in exprs.iter().enumerate() {
        match e {
            RexNode::IndexRef { index, .. } if *index == i => continue,
            _ => return None,
        }
    }
    Some(exprs.len())
}

fn refs_within(expr: &RexNode, bound: usize) -> bool {
    let mut refs = BTreeSet::new();
    collect_index_refs(expr, &mut refs);
    refs.iter().all(|&i| i < bound)
}

fn collect_index_refs(expr: &RexNode, out: &mut BTreeSet<usize>) {
    match expr {
        RexNode::IndexRef { index, .. } => {
            out.insert(*index);
        }
        RexNode::Call { args, .. } => {
            for a in args {
                collect_index_refs(a, out);
            }
        }
        RexNode::Over { call, .. } => collect_index_refs(call, out),
        _ => {}
    }
}

fn remap_indices(expr: &RexNode, remap: &std::collections::HashMap<usize, usize>) -> RexNode {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::operator::Operator;
    use crate::algebra::traits::TraitSet;
    use crate::catalog::CatalogId;
    use crate::types::{Nullability, Type};

    fn int_ty() -> Arc<Type> {
        Arc::new(Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL })
    }

    fn row_type(names: &[&str]) -> RowType {
        names.iter().map(|n| (n.to_string(), int_ty())).collect()
    }

    #[test]
    fn project_past_filter_trims_trailing_column() {
        let scan = Arc::new(RelNode::new(
            RelKind::TableScan { table_id: CatalogId(1) },
            vec![],
            row_type(&["a", "b"]),
            TraitSet::logical(),
        ));
        let condition = RexNode::call(Operator::IsNotNull, vec![RexNode::index_ref(0, int_ty())]).unwrap();
        let filter = Arc::new(RelNode::new(
            RelKind::Filter { condition },
            vec![scan],
            row_type(&["a", "b"]),
            TraitSet::logical(),
        ));
        let project = RelNode::new(
            RelKind::Project { exprs: vec![RexNode::index_ref(0, int_ty())] },
            vec![filter],
            row_type(&["a"]),
            TraitSet::logical(),
        );
        let rule = PushProjectPastFilter;
        assert!(rule.matches(&project));
        let rewritten = rule.apply(&project);
        assert_eq!(rewritten.len(), 1);
        assert!(matches!(rewritten[0].kind, RelKind::Filter { .. }));
        assert!(matches!(rewritten[0].inputs()[0].kind, RelKind::Project { .. }));
    }
}
