//! Relational-expression nodes (C3, §4.3, §9): modeled as a tagged variant
//! ([`RelKind`]) plus a uniform header ([`RelBase`]) carrying inputs, traits, and row
//! type — not a `dyn RelNode` inheritance hierarchy, which would defeat exhaustiveness
//! checking at visit sites. Nodes are immutable after construction; every
//! transformation builds a new node sharing unchanged inputs via `Arc`.

use super::rex::RexNode;
use super::traits::{Distribution, TraitSet};
use crate::catalog::CatalogId;
use crate::types::Type;
use std::sync::Arc;

pub type RowType = Vec<(String, Arc<Type>)>;
pub type Digest = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOperation {
    Insert,
    Update,
    Delete,
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggCall {
    pub function: String,
    pub args: Vec<usize>,
    pub distinct: bool,
    pub data_type: Arc<Type>,
}

/// A fully-bound physical leaf emitted by the router (§4.5): one table fragment
/// resolved to a store and physical names.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterScanSpec {
    pub store_id: CatalogId,
    pub physical_schema_name: String,
    pub physical_table_name: String,
    pub partition_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelKind {
    TableScan {
        table_id: CatalogId,
    },
    AdapterScan(AdapterScanSpec),
    Values {
        rows: Vec<Vec<RexNode>>,
    },
    Project {
        exprs: Vec<RexNode>,
    },
    Filter {
        condition: RexNode,
    },
    Aggregate {
        group_keys: Vec<usize>,
        grouping_sets: Vec<Vec<usize>>,
        agg_calls: Vec<AggCall>,
    },
    Sort {
        collations: Vec<(usize, bool)>,
        offset: Option<usize>,
        fetch: Option<usize>,
    },
    Join {
        condition: RexNode,
        join_type: JoinType,
    },
    Correlate {
        correlation_id: u32,
        required_columns: Vec<usize>,
        join_type: JoinType,
    },
    SetOp {
        kind: SetOpKind,
        all: bool,
    },
    Exchange {
        distribution: Distribution,
    },
    SortExchange {
        distribution: Distribution,
        collations: Vec<(usize, bool)>,
    },
    Match {
        pattern: String,
        measures: Vec<RexNode>,
    },
    Modify {
        entity: CatalogId,
        operation: ModifyOperation,
        column_names: Option<Vec<String>>,
        expressions: Option<Vec<RexNode>>,
    },
    ConstraintEnforcer {
        error_kinds: Vec<String>,
        error_messages: Vec<String>,
    },
    /// Inserted by the planner when a parent requires a convention its child doesn't
    /// carry (§4.4). An illegal conversion edge is never materialized; it prunes the
    /// branch with infinite cost instead.
    Converter {
        target_convention: super::traits::Convention,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelBase {
    pub inputs: Vec<Arc<RelNode>>,
    pub traits: TraitSet,
    pub row_type: RowType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelNode {
    pub base: RelBase,
    pub kind: RelKind,
}

impl RelNode {
    pub fn new(kind: RelKind, inputs: Vec<Arc<RelNode>>, row_type: RowType, traits: TraitSet) -> Self {
        RelNode {
            base: RelBase { inputs, traits, row_type },
            kind,
        }
    }

    pub fn inputs(&self) -> &[Arc<RelNode>] {
        &self.base.inputs
    }

    /// Rebuild this node over `new_inputs`, preserving its trait set and row type.
    /// Per §4.3, nodes are immutable; this always yields a fresh node.
    pub fn with_inputs(&self, new_inputs: Vec<Arc<RelNode>>) -> RelNode {
        RelNode {
            base: RelBase {
                inputs: new_inputs,
                traits: self.base.traits.clone(),
                row_type: self.base.row_type.clone(),
            },
            kind: self.kind.clone(),
        }
    }

    pub fn row_type(&self) -> &RowType {
        &self.base.row_type
    }

    pub fn trait_set(&self) -> &TraitSet {
        &self.base.traits
    }

    pub fn with_traits(&self, traits: TraitSet) -> RelNode {
        RelNode {
            base: RelBase {
                inputs: self.base.inputs.clone(),
                traits,
                row_type: self.base.row_type.clone(),
            },
            kind: self.kind.clone(),
        }
    }

    /// A structural hash over this node's kind, trait set, row type, and the digests
    /// of its inputs — used by the planner to detect duplicate equivalence-set
    /// registrations and by the router to key its placement cache (§4.4, §4.5).
    pub fn digest(&self) -> Digest {
        let mut buf = format!("{:?}|{:?}|{:?}", self.kind, self.base.traits, self.base.row_type);
        for input in &self.base.inputs {
            buf.push('|');
            buf.push_str(&input.digest());
        }
        format!("{:x}", md5::compute(buf.as_bytes()))
    }

    pub fn explain(&self) -> String {
        self.explain_indented(0)
    }

    fn explain_indented(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        let label = explain_label(&self.kind);
        let mut out = format!("{indent}{label}\n");
        for input in &self.base.inputs {
            out.push_str(&input.explain_indented(depth + 1));
        }
        out
    }

    /// Additive self-cost estimate (§4.4). Real cardinality estimation is left to the
    /// metadata-query layer; this assigns coarse per-kind weights sufficient to break
    /// ties deterministically when composed with input costs.
    pub fn compute_self_cost(&self) -> Cost {
        match &self.kind {
            RelKind::TableScan { .. } | RelKind::AdapterScan(_) | RelKind::Values { .. } => {
                Cost { rows: 1000.0, cpu: 1000.0, io: 1000.0 }
            }
            RelKind::Project { exprs } => Cost {
                rows: 0.0,
                cpu: exprs.len() as f64,
                io: 0.0,
            },
            RelKind::Filter { condition } => Cost { rows: 0.0, cpu: rex_size(condition) as f64, io: 0.0 },
            RelKind::Aggregate { agg_calls, .. } => Cost {
                rows: 0.0,
                cpu: 10.0 + agg_calls.len() as f64,
                io: 0.0,
            },
            RelKind::Sort { .. } | RelKind::SortExchange { .. } => {
                Cost { rows: 0.0, cpu: 5.0, io: 0.0 }
            }
            RelKind::Join { .. } => Cost { rows: 0.0, cpu: 50.0, io: 0.0 },
            RelKind::Correlate { .. } => Cost { rows: 0.0, cpu: 50.0, io: 0.0 },
            RelKind::SetOp { .. } => Cost { rows: 0.0, cpu: 5.0, io: 0.0 },
            RelKind::Exchange { .. } => Cost { rows: 0.0, cpu: 5.0, io: 5.0 },
            RelKind::Match { .. } => Cost { rows: 0.0, cpu: 100.0, io: 0.0 },
            RelKind::Modify { .. } => Cost { rows: 0.0, cpu: 10.0, io: 10.0 },
            RelKind::ConstraintEnforcer { .. } => Cost { rows: 0.0, cpu: 20.0, io: 0.0 },
            RelKind::Converter { .. } => Cost { rows: 0.0, cpu: 1.0, io: 0.0 },
        }
    }
}

fn explain_label(kind: &RelKind) -> String {
    match kind {
        RelKind::TableScan { table_id } => format!("TableScan(table={table_id})"),
        RelKind::AdapterScan(spec) => format!(
            "AdapterScan(store={}, {}.{})",
            spec.store_id, spec.physical_schema_name, spec.physical_table_name
        ),
        RelKind::Values { rows } => format!("Values(rows={})", rows.len()),
        RelKind::Project { exprs } => format!("Project(width={})", exprs.len()),
        RelKind::Filter { condition } => format!("Filter({:?})", condition),
        RelKind::Aggregate { group_keys, agg_calls, .. } => {
            format!("Aggregate(keys={:?}, calls={})", group_keys, agg_calls.len())
        }
        RelKind::Sort { collations, offset, fetch } => {
            format!("Sort(collations={collations:?}, offset={offset:?}, fetch={fetch:?})")
        }
        RelKind::Join { join_type, .. } => format!("Join({join_type:?})"),
        RelKind::Correlate { correlation_id, join_type, .. } => {
            format!("Correlate(id={correlation_id}, {join_type:?})")
        }
        RelKind::SetOp { kind, all } => format!("SetOp({kind:?}, all={all})"),
        RelKind::Exchange { distribution } => format!("Exchange({distribution:?})"),
        RelKind::SortExchange { distribution, .. } => format!("SortExchange({distribution:?})"),
        RelKind::Match { pattern, .. } => format!("Match({pattern})"),
        RelKind::Modify { entity, operation, .. } => format!("Modify({entity}, {operation:?})"),
        RelKind::ConstraintEnforcer { error_kinds, .. } => {
            format!("ConstraintEnforcer({error_kinds:?})")
        }
        RelKind::Converter { target_convention } => format!("Converter(to={target_convention})"),
    }
}

/// An additive, per-node cost estimate (§4.4): total cost is self-cost plus the sum of
/// input best-costs under their required trait sets.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

impl Cost {
    pub fn total(self) -> f64 {
        self.rows + self.cpu + self.io
    }

    pub fn plus(self, other: Cost) -> Cost {
        Cost {
            rows: self.rows + other.rows,
            cpu: self.cpu + other.cpu,
            io: self.io + other.io,
        }
    }
}
