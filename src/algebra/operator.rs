//! Row-expression operators (§3 glossary, §4.3): each carries a declared return-type
//! inference procedure. Errors in inference are reported at construction, not lazily.

use crate::error::{PolyplaneError, Result};
use crate::types::{Nullability, Type, least_restrictive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Not,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Times,
    Divide,
    IsNull,
    IsNotNull,
    Like,
    Cast,
    CaseWhen,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Times => "*",
            Operator::Divide => "/",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
            Operator::Cast => "CAST",
            Operator::CaseWhen => "CASE",
        }
    }

    /// Infer this call's return type from its already-typed arguments.
    pub fn infer(self, args: &[Type]) -> Result<Type> {
        let boolean = |nullable: Nullability| Type::Numeric {
            precision: Some(1),
            scale: Some(0),
            nullable,
        };
        match self {
            Operator::And | Operator::Or | Operator::Not => {
                let nullable = args
                    .iter()
                    .fold(Nullability::NOT_NULL, |acc, t| acc.union(t.nullable()));
                Ok(boolean(nullable))
            }
            Operator::Equals
            | Operator::NotEquals
            | Operator::LessThan
            | Operator::LessThanOrEqual
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::Like => {
                let nullable = args
                    .iter()
                    .fold(Nullability::NOT_NULL, |acc, t| acc.union(t.nullable()));
                Ok(boolean(nullable))
            }
            Operator::Plus | Operator::Minus | Operator::Times | Operator::Divide => {
                least_restrictive(args)
            }
            Operator::IsNull | Operator::IsNotNull => Ok(boolean(Nullability::NOT_NULL)),
            Operator::Cast => args
                .first()
                .cloned()
                .ok_or_else(|| PolyplaneError::UnknownOperator("CAST with no operand".into())),
            Operator::CaseWhen => least_restrictive(args),
        }
    }
}
