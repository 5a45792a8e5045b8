//! The rule system (§4.4, §9): a rule is a first-class value with a pattern predicate
//! and a match callback. Rules are collected into a [`RuleSet`] constant-folded at
//! planner construction. A rule's `on_match` may only return new equivalent
//! expressions — it must not mutate the equivalence set directly; the planner core
//! owns registration.

use crate::algebra::rel::RelNode;

/// A plan rewrite. `matches` is the pattern test (tree template plus operand
/// predicates, collapsed here into a single predicate closure over the node since our
/// variants are a flat tagged union rather than a class hierarchy); `apply` is
/// `onMatch`.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, node: &RelNode) -> bool;
    /// Produce zero or more plans equivalent to `node`.
    fn apply(&self, node: &RelNode) -> Vec<RelNode>;

    /// The heuristic priority a match of this rule is explored at (§4.4: "a priority
    /// queue of pending matches ordered by an importance heuristic"). Higher values
    /// are popped first. Cheap, always-beneficial rewrites (constant folding) rank
    /// above pushdowns, which rank above the more exploratory join-reorder search,
    /// which ranks above the convention-conversion fallback.
    fn importance(&self) -> i32 {
        50
    }
}

/// An immutable collection of rules, built once at planner construction (§9: "Rules
/// are collected into a rule set constant-folded at planner construction").
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        RuleSet { rules }
    }

    /// The rule catalog required by §4.4: project/filter pushdown, join reordering,
    /// aggregate pullup through union, constant folding, and convention conversion.
    pub fn standard() -> Self {
        use super::rules::*;
        Self::new(vec![
            Box::new(push_project::PushProjectPastFilter),
            Box::new(push_project::PushProjectPastJoin),
            Box::new(push_project::PushProjectPastAggregate),
            Box::new(push_filter::PushFilterPastProject),
            Box::new(push_filter::PushFilterPastJoin),
            Box::new(push_filter::PushFilterPastSetOp),
            Box::new(join_reorder::CommuteJoin),
            Box::new(join_reorder::AssociateJoin),
            Box::new(aggregate_pullup::DistinctToGroupBy),
            Box::new(aggregate_pullup::PullupThroughUnion),
            Box::new(constant_fold::FoldDoubleNegation),
            Box::new(constant_fold::FoldConjuncts),
            Box::new(convention_conversion::ConventionConversion),
        ])
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }
}
