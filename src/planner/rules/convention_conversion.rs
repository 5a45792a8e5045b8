//! Convention conversion (§4.4 rule catalog, §4.4 "an illegal conversion edge is never
//! materialized"). The logical convention (`NONE`) is always a legal target — every
//! adapter convention is defined as a lowering *from* it — so this rule offers
//! "convert back to logical" as a universal edge. Adapter-specific conversions
//! between two non-logical conventions are inserted directly by the search in
//! [`super::super::optimize`] once a concrete target convention is known, rather than
//! being expressed as a rule that would need to enumerate every adapter pair.

use crate::algebra::rel::RelKind;
use crate::algebra::rel::RelNode;
use crate::algebra::traits::Convention;
use crate::planner::rule::Rule;

pub struct ConventionConversion;

impl Rule for ConventionConversion {
    fn name(&self) -> &'static str {
        "ConventionConversion"
    }

    fn importance(&self) -> i32 {
        10
    }

    fn matches(&self, node: &RelNode) -> bool {
        !node.trait_set().convention().is_logical() && !matches!(node.kind, RelKind::Converter { .. })
    }

    fn apply(&self, node: &RelNode) -> Vec<RelNode> {
        vec![RelNode::new(
            RelKind::Converter { target_convention: Convention::logical() },
            vec![std::sync::Arc::new(node.clone())],
            node.row_type().clone(),
            crate::algebra::traits::TraitSet::logical(),
        )]
    }
}
