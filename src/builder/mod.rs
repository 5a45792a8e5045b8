//! Algebra builder (C9, §4.9): a stack-based fluent assembler used by the router, the
//! constraint enforcer, and external collaborators constructing plans by hand. Each
//! call pushes, pops, or rewrites the top of a node stack; several peephole rewrites
//! fire during assembly rather than waiting for a planner rule pass.

use crate::algebra::rel::{AggCall, JoinType, ModifyOperation, RelKind, RelNode, RowType, SetOpKind};
use crate::algebra::rex::{Literal, RexNode};
use crate::algebra::traits::TraitSet;
use crate::catalog::CatalogId;
use crate::error::{PolyplaneError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Where an `as(alias)` call's name resolves within the current top frame's row type.
#[derive(Debug, Clone)]
struct AliasBinding {
    offset: usize,
    names: Vec<String>,
}

struct Frame {
    node: Arc<RelNode>,
    aliases: HashMap<String, AliasBinding>,
}

/// Assembles [`RelNode`] trees one call at a time. Nodes popped off the stack are
/// never mutated in place — every push builds a new immutable node (§4.3).
#[derive(Default)]
pub struct RelBuilder {
    stack: Vec<Frame>,
}

impl RelBuilder {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn build(&mut self) -> Result<Arc<RelNode>> {
        self.stack
            .pop()
            .map(|f| f.node)
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("builder stack is empty")))
    }

    pub fn peek(&self) -> Option<&Arc<RelNode>> {
        self.stack.last().map(|f| &f.node)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Push an already-built node onto the stack with no alias bindings — used by
    /// callers assembling a tree out of subtrees built elsewhere (e.g. the constraint
    /// enforcer's per-constraint control subplans before a `union_all`).
    pub fn push_existing(&mut self, node: Arc<RelNode>) -> &mut Self {
        self.stack.push(Frame { node, aliases: HashMap::new() });
        self
    }

    fn push_plain(&mut self, node: RelNode) {
        self.stack.push(Frame {
            node: Arc::new(node),
            aliases: HashMap::new(),
        });
    }

    pub fn scan(&mut self, table_id: CatalogId, row_type: RowType) -> &mut Self {
        self.push_plain(RelNode::new(
            RelKind::TableScan { table_id },
            vec![],
            row_type,
            TraitSet::logical(),
        ));
        self
    }

    pub fn values(&mut self, rows: Vec<Vec<RexNode>>, row_type: RowType) -> &mut Self {
        self.push_plain(RelNode::new(
            RelKind::Values { rows },
            vec![],
            row_type,
            TraitSet::logical(),
        ));
        self
    }

    fn empty_values(row_type: RowType) -> RelNode {
        RelNode::new(RelKind::Values { rows: vec![] }, vec![], row_type, TraitSet::logical())
    }

    /// Associate `alias` with the current top frame so a later `field(alias, name)`
    /// resolves `name` against that frame's row type (§4.9).
    pub fn as_alias(&mut self, alias: &str) -> Result<&mut Self> {
        let top = self
            .stack
            .last_mut()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("as() on empty stack")))?;
        let names = top.node.row_type().iter().map(|(n, _)| n.clone()).collect();
        top.aliases.insert(
            alias.to_string(),
            AliasBinding { offset: 0, names },
        );
        Ok(self)
    }

    /// Resolve `alias.name` to an `IndexRef` into the current top frame's row type.
    pub fn field(&self, alias: &str, name: &str) -> Result<RexNode> {
        let top = self
            .stack
            .last()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("field() on empty stack")))?;
        let binding = top.aliases.get(alias).ok_or_else(|| {
            PolyplaneError::UnknownOperator(format!("no alias '{alias}' in scope"))
        })?;
        let local_index = binding
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| {
                PolyplaneError::UnknownOperator(format!("no field '{name}' on alias '{alias}'"))
            })?;
        let absolute = binding.offset + local_index;
        let data_type = top.node.row_type()[absolute].1.clone();
        Ok(RexNode::index_ref(absolute, data_type))
    }

    /// `filter(TRUE)` is a no-op; `filter(FALSE)` replaces the top with an empty
    /// `Values` of the same row type; successive filters merge their conjuncts and
    /// deduplicate (§4.3, §4.9).
    pub fn filter(&mut self, condition: RexNode) -> Result<&mut Self> {
        if condition.is_literal_true() {
            return Ok(self);
        }
        let top = self
            .stack
            .last()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("filter() on empty stack")))?;
        if condition.is_literal_false() {
            let row_type = top.node.row_type().clone();
            self.stack.pop();
            self.push_plain(Self::empty_values(row_type));
            return Ok(self);
        }

        let merged = match &top.node.kind {
            RelKind::Filter { condition: existing } => RexNode::call(
                crate::algebra::operator::Operator::And,
                vec![existing.clone(), condition],
            )?
            .flatten_and_dedup_conjuncts(),
            _ => condition,
        };

        if merged.is_literal_false() {
            let row_type = top.node.row_type().clone();
            self.stack.pop();
            self.push_plain(Self::empty_values(row_type));
            return Ok(self);
        }

        let (input, row_type, aliases) = match &top.node.kind {
            RelKind::Filter { .. } => {
                let inner = top.node.inputs()[0].clone();
                let row_type = top.node.row_type().clone();
                let aliases = self.stack.last().unwrap().aliases.clone();
                (inner, row_type, aliases)
            }
            _ => {
                let row_type = top.node.row_type().clone();
                let aliases = self.stack.last().unwrap().aliases.clone();
                (top.node.clone(), row_type, aliases)
            }
        };
        self.stack.pop();
        self.stack.push(Frame {
            node: Arc::new(RelNode::new(
                RelKind::Filter { condition: merged },
                vec![input],
                row_type,
                TraitSet::logical(),
            )),
            aliases,
        });
        Ok(self)
    }

    /// `project(identity)` over a node whose output matches exactly is a no-op;
    /// `project` following `project` collapses into one projection composing the Rex
    /// trees (§4.9).
    pub fn project(&mut self, exprs: Vec<RexNode>, row_type: RowType) -> Result<&mut Self> {
        let top = self
            .stack
            .last()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("project() on empty stack")))?;

        if is_identity_projection(&exprs, top.node.row_type()) && &row_type == top.node.row_type() {
            return Ok(self);
        }

        let composed = match &top.node.kind {
            RelKind::Project { exprs: inner_exprs } => {
                exprs.into_iter().map(|e| substitute_index_refs(e, inner_exprs)).collect()
            }
            _ => exprs,
        };

        let input = match &top.node.kind {
            RelKind::Project { .. } => top.node.inputs()[0].clone(),
            _ => top.node.clone(),
        };
        self.stack.pop();
        self.push_plain(RelNode::new(
            RelKind::Project { exprs: composed },
            vec![input],
            row_type,
            TraitSet::logical(),
        ));
        Ok(self)
    }

    /// Pop the top two frames and push an equi/theta join, combining row types and
    /// reindexing right-hand aliases by the left width (§4.9: aliases survive one
    /// level up through joins).
    pub fn join(&mut self, join_type: JoinType, condition: RexNode, row_type: RowType) -> Result<&mut Self> {
        let right = self
            .stack
            .pop()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("join() needs two inputs")))?;
        let left = self
            .stack
            .pop()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("join() needs two inputs")))?;
        let left_width = left.node.row_type().len();

        let mut aliases = left.aliases;
        for (name, binding) in right.aliases {
            aliases.insert(
                name,
                AliasBinding {
                    offset: binding.offset + left_width,
                    names: binding.names,
                },
            );
        }

        let node = RelNode::new(
            RelKind::Join { condition, join_type },
            vec![left.node, right.node],
            row_type,
            TraitSet::logical(),
        );
        self.stack.push(Frame { node: Arc::new(node), aliases });
        Ok(self)
    }

    pub fn aggregate(
        &mut self,
        group_keys: Vec<usize>,
        grouping_sets: Vec<Vec<usize>>,
        agg_calls: Vec<AggCall>,
        row_type: RowType,
    ) -> Result<&mut Self> {
        let top = self
            .stack
            .pop()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("aggregate() on empty stack")))?;
        // Aliases do not survive an aggregate (§4.9).
        self.push_plain(RelNode::new(
            RelKind::Aggregate { group_keys, grouping_sets, agg_calls },
            vec![top.node],
            row_type,
            TraitSet::logical(),
        ));
        Ok(self)
    }

    pub fn set_op(&mut self, kind: SetOpKind, all: bool, input_count: usize, row_type: RowType) -> Result<&mut Self> {
        if self.stack.len() < input_count {
            return Err(PolyplaneError::Internal(anyhow::anyhow!(
                "set_op needs {input_count} inputs, stack has {}",
                self.stack.len()
            )));
        }
        let inputs: Vec<Arc<RelNode>> = self
            .stack
            .split_off(self.stack.len() - input_count)
            .into_iter()
            .map(|f| f.node)
            .collect();
        // `union(all=true, x)` with a single input is a no-op (§8).
        if inputs.len() == 1 && all && matches!(kind, SetOpKind::Union) {
            self.stack.push(Frame {
                node: inputs.into_iter().next().unwrap(),
                aliases: HashMap::new(),
            });
            return Ok(self);
        }
        self.push_plain(RelNode::new(
            RelKind::SetOp { kind, all },
            inputs,
            row_type,
            TraitSet::logical(),
        ));
        Ok(self)
    }

    /// `sort(empty)` with `offset=0, fetch=None` is a no-op; `limit(0)` replaces the
    /// top with an empty `Values` (§4.9).
    pub fn sort(
        &mut self,
        collations: Vec<(usize, bool)>,
        offset: Option<usize>,
        fetch: Option<usize>,
    ) -> Result<&mut Self> {
        if collations.is_empty() && offset.unwrap_or(0) == 0 && fetch.is_none() {
            return Ok(self);
        }
        if fetch == Some(0) {
            let top = self
                .stack
                .last()
                .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("sort() on empty stack")))?;
            let row_type = top.node.row_type().clone();
            self.stack.pop();
            self.push_plain(Self::empty_values(row_type));
            return Ok(self);
        }
        let top = self
            .stack
            .pop()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("sort() on empty stack")))?;
        let row_type = top.node.row_type().clone();
        self.stack.push(Frame {
            node: Arc::new(RelNode::new(
                RelKind::Sort { collations, offset, fetch },
                vec![top.node],
                row_type,
                TraitSet::logical(),
            )),
            aliases: top.aliases,
        });
        Ok(self)
    }

    pub fn modify(
        &mut self,
        entity: CatalogId,
        operation: ModifyOperation,
        column_names: Option<Vec<String>>,
        expressions: Option<Vec<RexNode>>,
        row_type: RowType,
    ) -> Result<&mut Self> {
        let top = self
            .stack
            .pop()
            .ok_or_else(|| PolyplaneError::Internal(anyhow::anyhow!("modify() on empty stack")))?;
        self.push_plain(RelNode::new(
            RelKind::Modify { entity, operation, column_names, expressions },
            vec![top.node],
            row_type,
            TraitSet::logical(),
        ));
        Ok(self)
    }
}

fn is_identity_projection(exprs: &[RexNode], input_row_type: &RowType) -> bool {
    if exprs.len() != input_row_type.len() {
        return false;
    }
    exprs.iter().enumerate().all(|(i, e)| matches!(e, RexNode::IndexRef { index, .. } if *index == i))
}

fn substitute_index_refs(expr: RexNode, base_exprs: &[RexNode]) -> RexNode {
    match expr {
        RexNode::IndexRef { index, .. } => base_exprs
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("project composition: index {index} out of range")),
        RexNode::Call { operator, args, data_type } => RexNode::Call {
            operator,
            args: args.into_iter().map(|a| substitute_index_refs(a, base_exprs)).collect(),
            data_type,
        },
        RexNode::Over { call, window, data_type } => RexNode::Over {
            call: Box::new(substitute_index_refs(*call, base_exprs)),
            window,
            data_type,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Nullability, Type};

    fn int_row_type(names: &[&str]) -> RowType {
        names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    Arc::new(Type::Numeric {
                        precision: Some(10),
                        scale: Some(0),
                        nullable: Nullability::NOT_NULL,
                    }),
                )
            })
            .collect()
    }

    #[test]
    fn filter_true_is_a_no_op() {
        let mut b = RelBuilder::new();
        b.scan(CatalogId(1), int_row_type(&["a"]));
        let before = b.peek().unwrap().digest();
        b.filter(RexNode::literal(
            Arc::new(Type::Numeric { precision: Some(1), scale: Some(0), nullable: Nullability::NOT_NULL }),
            Literal::Boolean(true),
        ))
        .unwrap();
        assert_eq!(b.peek().unwrap().digest(), before);
    }

    #[test]
    fn filter_false_yields_empty_values() {
        let mut b = RelBuilder::new();
        b.scan(CatalogId(1), int_row_type(&["a"]));
        b.filter(RexNode::literal(
            Arc::new(Type::Numeric { precision: Some(1), scale: Some(0), nullable: Nullability::NOT_NULL }),
            Literal::Boolean(false),
        ))
        .unwrap();
        assert!(matches!(b.peek().unwrap().kind, RelKind::Values { ref rows } if rows.is_empty()));
    }

    #[test]
    fn identity_project_is_a_no_op() {
        let mut b = RelBuilder::new();
        let rt = int_row_type(&["a", "b"]);
        b.scan(CatalogId(1), rt.clone());
        let before = b.peek().unwrap().digest();
        let exprs = vec![
            RexNode::index_ref(0, rt[0].1.clone()),
            RexNode::index_ref(1, rt[1].1.clone()),
        ];
        b.project(exprs, rt).unwrap();
        assert_eq!(b.peek().unwrap().digest(), before);
    }

    #[test]
    fn successive_projects_collapse() {
        let mut b = RelBuilder::new();
        let rt = int_row_type(&["a", "b"]);
        b.scan(CatalogId(1), rt.clone());
        let swapped_rt = vec![rt[1].clone(), rt[0].clone()];
        b.project(
            vec![RexNode::index_ref(1, rt[1].1.clone()), RexNode::index_ref(0, rt[0].1.clone())],
            swapped_rt.clone(),
        )
        .unwrap();
        let reswapped_rt = vec![swapped_rt[1].clone(), swapped_rt[0].clone()];
        b.project(
            vec![
                RexNode::index_ref(1, swapped_rt[1].1.clone()),
                RexNode::index_ref(0, swapped_rt[0].1.clone()),
            ],
            reswapped_rt,
        )
        .unwrap();
        match &b.peek().unwrap().kind {
            RelKind::Project { exprs } => {
                assert!(matches!(exprs[0], RexNode::IndexRef { index: 0, .. }));
                assert!(matches!(exprs[1], RexNode::IndexRef { index: 1, .. }));
            }
            other => panic!("expected a single collapsed Project, got {other:?}"),
        }
        assert!(matches!(b.peek().unwrap().inputs()[0].kind, RelKind::TableScan { .. }));
    }

    #[test]
    fn alias_survives_a_filter() {
        let mut b = RelBuilder::new();
        let rt = int_row_type(&["a", "b"]);
        b.scan(CatalogId(1), rt.clone());
        b.as_alias("e").unwrap();
        b.filter(
            RexNode::call(
                crate::algebra::operator::Operator::IsNotNull,
                vec![RexNode::index_ref(0, rt[0].1.clone())],
            )
            .unwrap(),
        )
        .unwrap();
        let resolved = b.field("e", "b").unwrap();
        assert!(matches!(resolved, RexNode::IndexRef { index: 1, .. }));
    }

    #[test]
    fn alias_on_right_join_input_is_reindexed() {
        let mut b = RelBuilder::new();
        b.scan(CatalogId(1), int_row_type(&["a"]));
        b.as_alias("left").unwrap();
        b.scan(CatalogId(2), int_row_type(&["b"]));
        b.as_alias("right").unwrap();
        let joined_rt = int_row_type(&["a", "b"]);
        b.join(
            JoinType::Inner,
            RexNode::literal(
                Arc::new(Type::Numeric { precision: Some(1), scale: Some(0), nullable: Nullability::NOT_NULL }),
                Literal::Boolean(true),
            ),
            joined_rt,
        )
        .unwrap();
        let resolved = b.field("right", "b").unwrap();
        assert!(matches!(resolved, RexNode::IndexRef { index: 1, .. }));
    }

    #[test]
    fn limit_zero_yields_empty_values() {
        let mut b = RelBuilder::new();
        b.scan(CatalogId(1), int_row_type(&["a"]));
        b.sort(vec![], Some(0), Some(0)).unwrap();
        assert!(matches!(b.peek().unwrap().kind, RelKind::Values { ref rows } if rows.is_empty()));
    }
}
