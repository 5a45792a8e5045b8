//! Constant folding and short-circuit simplification over `Filter` conditions (§4.4
//! rule catalog). Reuses the incremental simplifications the builder applies during
//! assembly ([`RexNode::simplify_double_negation`], [`RexNode::flatten_and_dedup_conjuncts`])
//! but walks the whole expression tree so rewrites introduced by other rules are
//! caught too.

use crate::algebra::operator::Operator;
use crate::algebra::rel::{RelKind, RelNode};
use crate::algebra::rex::RexNode;
use crate::planner::rule::Rule;

pub struct FoldDoubleNegation;

impl Rule for FoldDoubleNegation {
    fn name(&self) -> &'static str {
        "FoldDoubleNegation"
    }

    fn importance(&self) -> i32 {
        95
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Filter { condition } = &node.kind else { return false };
        &fold_tree(condition.clone()) != condition
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Filter { condition } = &node.kind else { return vec![] };
        vec![RelNode::new(
            RelKind::Filter { condition: fold_tree(condition.clone()) },
            node.inputs().to_vec(),
            node.row_type().clone(),
            node.trait_set().clone(),
        )]
    }
}

pub struct FoldConjuncts;

impl Rule for FoldConjuncts {
    fn name(&self) -> &'static str {
        "FoldConjuncts"
    }

    fn importance(&self) -> i32 {
        95
    }

    fn matches(&self, node: &RelNode) -> bool {
        let RelKind::Filter { condition } = &node.kind else { return false };
        matches!(condition, RexNode::Call { operator: Operator::And, .. })
            && &condition.clone().flatten_and_dedup_conjuncts() != condition
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        let RelKind::Filter { condition } = &node.kind else { return vec![] };
        vec![RelNode::new(
            RelKind::Filter { condition: condition.clone().flatten_and_dedup_conjuncts() },
            node.inputs().to_vec(),
            node.row_type().clone(),
            node.trait_set().clone(),
        )]
    }
}

fn fold_tree(expr: RexNode) -> RexNode {
    let expr = match expr {
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator,
            args: args.into_iter().map(fold_tree).collect(),
            data_type,
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(fold_tree(*call)),
            window,
            data_type,
        },
        other => other,
    };
    expr.simplify_double_negation()
}
