//! Row expressions (C3, §3): the scalar expression IR evaluated per row. Every node
//! carries its inferred [`Type`]; construction fails fast via [`Operator::infer`]
//! rather than deferring the type check to evaluation.

use super::operator::Operator;
use crate::error::Result;
use crate::types::Type;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
}

/// A window specification for `Over`, kept opaque beyond ordering/partitioning since
/// window-function execution is delegated to adapters (§1 out-of-scope).
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub partition_by: Vec<usize>,
    pub order_by: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RexNode {
    /// References the `i`-th field of the immediate input's row type.
    IndexRef { index: usize, data_type: Arc<Type> },
    Literal { data_type: Arc<Type>, value: Literal },
    /// 1-based per call site (§9 "Dynamic parameters").
    DynamicParam { index: usize, data_type: Arc<Type> },
    Call {
        operator: Operator,
        args: Vec<RexNode>,
        data_type: Arc<Type>,
    },
    CorrelationRef {
        var_id: u32,
        field: usize,
        data_type: Arc<Type>,
    },
    PatternRef {
        label: String,
        data_type: Arc<Type>,
        index: usize,
    },
    Over {
        call: Box<RexNode>,
        window: WindowSpec,
        data_type: Arc<Type>,
    },
}

impl RexNode {
    pub fn index_ref(index: usize, data_type: Arc<Type>) -> Self {
        RexNode::IndexRef { index, data_type }
    }

    pub fn literal(data_type: Arc<Type>, value: Literal) -> Self {
        RexNode::Literal { data_type, value }
    }

    /// Build a `Call`, inferring and validating its return type from its arguments.
    pub fn call(operator: Operator, args: Vec<RexNode>) -> Result<Self> {
        let arg_types: Vec<Type> = args.iter().map(|a| (*a.data_type()).clone()).collect();
        let data_type = Arc::new(operator.infer(&arg_types)?);
        Ok(RexNode::Call {
            operator,
            args,
            data_type,
        })
    }

    pub fn data_type(&self) -> &Arc<Type> {
        match self {
            RexNode::IndexRef { data_type, .. }
            | RexNode::Literal { data_type, .. }
            | RexNode::DynamicParam { data_type, .. }
            | RexNode::Call { data_type, .. }
            | RexNode::CorrelationRef { data_type, .. }
            | RexNode::PatternRef { data_type, .. }
            | RexNode::Over { data_type, .. } => data_type,
        }
    }

    pub fn is_literal_true(&self) -> bool {
        matches!(
            self,
            RexNode::Literal {
                value: Literal::Boolean(true),
                ..
            }
        )
    }

    pub fn is_literal_false(&self) -> bool {
        matches!(
            self,
            RexNode::Literal {
                value: Literal::Boolean(false),
                ..
            }
        )
    }

    /// `NOT NOT x` ≡ `x`; collapses one level per call, matching the builder's
    /// incremental simplification during assembly (§4.3).
    pub fn simplify_double_negation(self) -> RexNode {
        if let RexNode::Call {
            operator: Operator::Not,
            mut args,
            ..
        } = &self
        {
            if args.len() == 1 {
                if let RexNode::Call {
                    operator: Operator::Not,
                    args: inner_args,
                    ..
                } = &args[0]
                {
                    if inner_args.len() == 1 {
                        return args.remove(0);
                    }
                }
            }
        }
        self
    }

    /// Flatten nested `AND` calls and drop duplicate conjuncts (§4.3, §4.9).
    pub fn flatten_and_dedup_conjuncts(self) -> RexNode {
        fn collect(node: RexNode, out: &mut Vec<RexNode>) {
            match node {
                RexNode::Call {
                    operator: Operator::And,
                    args,
                    ..
                } => {
                    for a in args {
                        collect(a, out);
                    }
                }
                other => out.push(other),
            }
        }
        let mut conjuncts = Vec::new();
        collect(self, &mut conjuncts);
        let mut deduped: Vec<RexNode> = Vec::new();
        for c in conjuncts {
            if !deduped.contains(&c) {
                deduped.push(c);
            }
        }
        match deduped.len() {
            1 => deduped.pop().unwrap(),
            _ => RexNode::call(Operator::And, deduped)
                .expect("AND over already-typed boolean conjuncts cannot fail inference"),
        }
    }

    pub fn digest(&self) -> String {
        format!("{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nullability;

    fn bool_type() -> Arc<Type> {
        Arc::new(Type::Numeric {
            precision: Some(1),
            scale: Some(0),
            nullable: Nullability::NOT_NULL,
        })
    }

    #[test]
    fn double_negation_collapses() {
        let x = RexNode::index_ref(0, bool_type());
        let not_x = RexNode::call(Operator::Not, vec![x.clone()]).unwrap();
        let not_not_x = RexNode::call(Operator::Not, vec![not_x]).unwrap();
        assert_eq!(not_not_x.simplify_double_negation(), x);
    }

    #[test]
    fn duplicate_conjuncts_are_deduplicated() {
        let a = RexNode::index_ref(0, bool_type());
        let b = RexNode::index_ref(1, bool_type());
        let conj = RexNode::call(Operator::And, vec![a.clone(), b.clone(), a.clone()]).unwrap();
        let simplified = conj.flatten_and_dedup_conjuncts();
        match simplified {
            RexNode::Call { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected Call, got {other:?}"),
        }
    }
}
