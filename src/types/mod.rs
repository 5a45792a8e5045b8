//! Canonical logical type system (C1, §4.1).
//!
//! Types are value objects: two descriptors with identical canonicalized fields
//! compare equal and hash equal. [`TypeFactory`] interns them so equality becomes
//! pointer-cheap without resorting to a global singleton — the factory is owned by
//! whichever [`crate::planner`] context needs it.

use crate::error::{PolyplaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullability(pub bool);

impl Nullability {
    pub const NOT_NULL: Nullability = Nullability(false);
    pub const NULLABLE: Nullability = Nullability(true);

    pub fn union(self, other: Nullability) -> Nullability {
        Nullability(self.0 || other.0)
    }

    pub fn intersect(self, other: Nullability) -> Nullability {
        Nullability(self.0 && other.0)
    }
}

/// Family tag used by [`sameFamily`](same_family)/[`isComparable`](is_comparable) checks,
/// independent of precision/scale/length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeFamily {
    Numeric,
    Char,
    Temporal,
    Binary,
    Array,
    Map,
    Interval,
    Multiset,
    Any,
}

/// A canonical logical type descriptor (C1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
        nullable: Nullability,
    },
    Char {
        length: Option<u32>,
        charset: Option<String>,
        collation: Option<String>,
        nullable: Nullability,
    },
    Temporal {
        kind: TemporalKind,
        precision: Option<u32>,
        nullable: Nullability,
    },
    Binary {
        length: Option<u32>,
        nullable: Nullability,
    },
    Array {
        element: Arc<Type>,
        nullable: Nullability,
    },
    Map {
        key: Arc<Type>,
        value: Arc<Type>,
        nullable: Nullability,
    },
    Interval {
        nullable: Nullability,
    },
    Multiset {
        element: Arc<Type>,
        nullable: Nullability,
    },
    /// The dynamic-parameter placeholder type; assignable to/from anything.
    Any {
        nullable: Nullability,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

impl Type {
    pub fn family(&self) -> TypeFamily {
        match self {
            Type::Numeric { .. } => TypeFamily::Numeric,
            Type::Char { .. } => TypeFamily::Char,
            Type::Temporal { .. } => TypeFamily::Temporal,
            Type::Binary { .. } => TypeFamily::Binary,
            Type::Array { .. } => TypeFamily::Array,
            Type::Map { .. } => TypeFamily::Map,
            Type::Interval { .. } => TypeFamily::Interval,
            Type::Multiset { .. } => TypeFamily::Multiset,
            Type::Any { .. } => TypeFamily::Any,
        }
    }

    pub fn nullable(&self) -> Nullability {
        match self {
            Type::Numeric { nullable, .. }
            | Type::Char { nullable, .. }
            | Type::Temporal { nullable, .. }
            | Type::Binary { nullable, .. }
            | Type::Array { nullable, .. }
            | Type::Map { nullable, .. }
            | Type::Interval { nullable, .. }
            | Type::Multiset { nullable, .. }
            | Type::Any { nullable, .. } => *nullable,
        }
    }

    pub fn with_nullability(&self, nullable: Nullability) -> Type {
        let mut out = self.clone();
        match &mut out {
            Type::Numeric { nullable: n, .. }
            | Type::Char { nullable: n, .. }
            | Type::Temporal { nullable: n, .. }
            | Type::Binary { nullable: n, .. }
            | Type::Array { nullable: n, .. }
            | Type::Map { nullable: n, .. }
            | Type::Interval { nullable: n, .. }
            | Type::Multiset { nullable: n, .. }
            | Type::Any { nullable: n, .. } => *n = nullable,
        }
        out
    }
}

pub fn same_family(a: &Type, b: &Type) -> bool {
    a.family() == b.family() || a.family() == TypeFamily::Any || b.family() == TypeFamily::Any
}

pub fn is_comparable(a: &Type, b: &Type) -> bool {
    same_family(a, b)
}

pub fn is_assignable(from: &Type, to: &Type) -> bool {
    if to.family() == TypeFamily::Any || from.family() == TypeFamily::Any {
        return true;
    }
    if from.family() != to.family() {
        return false;
    }
    match (from, to) {
        (Type::Numeric { precision: fp, .. }, Type::Numeric { precision: tp, .. }) => {
            match (fp, tp) {
                (Some(fp), Some(tp)) => fp <= tp,
                _ => true,
            }
        }
        (Type::Char { length: fl, .. }, Type::Char { length: tl, .. }) => match (fl, tl) {
            (Some(fl), Some(tl)) => fl <= tl,
            _ => true,
        },
        _ => true,
    }
}

/// Least-restrictive promotion over the type lattice (§4.1).
pub fn least_restrictive(types: &[Type]) -> Result<Type> {
    let mut iter = types.iter();
    let first = iter
        .next()
        .ok_or_else(|| PolyplaneError::UnknownType("empty type list".into()))?;
    let mut acc = first.clone();
    for t in iter {
        acc = least_restrictive_pair(&acc, t)?;
    }
    Ok(acc)
}

fn least_restrictive_pair(a: &Type, b: &Type) -> Result<Type> {
    if !same_family(a, b) {
        return Err(PolyplaneError::TypeMismatch {
            site: "leastRestrictive".into(),
            expected: format!("{:?}", a.family()),
            actual: format!("{:?}", b.family()),
        });
    }
    let nullable = a.nullable().union(b.nullable());
    let widened = match (a, b) {
        (Type::Any { .. }, other) | (other, Type::Any { .. }) => other.clone(),
        (
            Type::Numeric { precision: pa, scale: sa, .. },
            Type::Numeric { precision: pb, scale: sb, .. },
        ) => Type::Numeric {
            precision: max_opt(*pa, *pb),
            scale: max_opt(*sa, *sb),
            nullable,
        },
        (
            Type::Char { length: la, charset: ca, collation: cola, .. },
            Type::Char { length: lb, charset: cb, .. },
        ) => Type::Char {
            length: max_opt(*la, *lb),
            charset: ca.clone().or_else(|| cb.clone()),
            collation: cola.clone(),
            nullable,
        },
        (
            Type::Temporal { kind: ka, precision: pa, .. },
            Type::Temporal { kind: kb, precision: pb, .. },
        ) => {
            if ka != kb {
                return Err(PolyplaneError::TypeMismatch {
                    site: "leastRestrictive".into(),
                    expected: format!("{ka:?}"),
                    actual: format!("{kb:?}"),
                });
            }
            Type::Temporal {
                kind: *ka,
                precision: max_opt(*pa, *pb),
                nullable,
            }
        }
        (Type::Binary { length: la, .. }, Type::Binary { length: lb, .. }) => Type::Binary {
            length: max_opt(*la, *lb),
            nullable,
        },
        (Type::Array { element: ea, .. }, Type::Array { element: eb, .. }) => Type::Array {
            element: Arc::new(least_restrictive_pair(ea, eb)?),
            nullable,
        },
        (Type::Multiset { element: ea, .. }, Type::Multiset { element: eb, .. }) => {
            Type::Multiset {
                element: Arc::new(least_restrictive_pair(ea, eb)?),
                nullable,
            }
        }
        (Type::Interval { .. }, Type::Interval { .. }) => Type::Interval { nullable },
        (same_a, _) => same_a.with_nullability(nullable),
    };
    Ok(widened)
}

fn max_opt(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}

/// Interns canonicalized type descriptors so equal types share one allocation.
/// Owned by the caller (e.g. a planner context), never a process-global singleton.
#[derive(Debug, Default)]
pub struct TypeFactory {
    interned: HashMap<Type, Arc<Type>>,
}

impl TypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, ty: Type) -> Arc<Type> {
        if let Some(existing) = self.interned.get(&ty) {
            return existing.clone();
        }
        let arc = Arc::new(ty.clone());
        self.interned.insert(ty, arc.clone());
        arc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_restrictive_widens_numeric_precision() {
        let a = Type::Numeric {
            precision: Some(5),
            scale: Some(0),
            nullable: Nullability::NOT_NULL,
        };
        let b = Type::Numeric {
            precision: Some(10),
            scale: Some(2),
            nullable: Nullability::NULLABLE,
        };
        let widened = least_restrictive(&[a, b]).unwrap();
        match widened {
            Type::Numeric { precision, scale, nullable } => {
                assert_eq!(precision, Some(10));
                assert_eq!(scale, Some(2));
                assert_eq!(nullable, Nullability::NULLABLE);
            }
            other => panic!("expected Numeric, got {other:?}"),
        }
    }

    #[test]
    fn least_restrictive_rejects_incompatible_families() {
        let a = Type::Numeric {
            precision: Some(5),
            scale: Some(0),
            nullable: Nullability::NOT_NULL,
        };
        let b = Type::Char {
            length: Some(10),
            charset: None,
            collation: None,
            nullable: Nullability::NOT_NULL,
        };
        assert!(least_restrictive(&[a, b]).is_err());
    }

    #[test]
    fn factory_interns_equal_types() {
        let mut factory = TypeFactory::new();
        let a = factory.intern(Type::Numeric {
            precision: Some(5),
            scale: Some(0),
            nullable: Nullability::NOT_NULL,
        });
        let b = factory.intern(Type::Numeric {
            precision: Some(5),
            scale: Some(0),
            nullable: Nullability::NOT_NULL,
        });
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn null_union_combines_nullability() {
        assert_eq!(
            Nullability::NOT_NULL.union(Nullability::NULLABLE),
            Nullability::NULLABLE
        );
        assert_eq!(
            Nullability::NULLABLE.intersect(Nullability::NOT_NULL),
            Nullability::NOT_NULL
        );
    }
}
