//! Trait dimensions (§3, §9): a trait set is a heterogeneous map from trait-definition
//! to trait value. `convention` is special — two nodes sharing a convention compose
//! directly; otherwise a converter node is required. The planner core never hard-codes
//! dimension names; it consults [`TraitDef::can_convert`] generically.

use std::collections::BTreeMap;
use std::fmt;

/// A physical execution family (e.g. `"NONE"` for logical nodes, `"iterator"`,
/// `"jdbc-sql"`, `"mongo-pipeline"`). One adapter's convention per backend family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Convention(pub String);

impl Convention {
    pub const NONE: &'static str = "NONE";

    pub fn logical() -> Self {
        Convention(Self::NONE.to_string())
    }

    pub fn is_logical(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Collation(pub Vec<(usize, bool)>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Distribution(pub Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraitValue {
    Convention(Convention),
    Collation(Collation),
    Distribution(Distribution),
}

/// A trait set, keyed by dimension name (`"convention"`, `"collation"`,
/// `"distribution"`, or an adapter-defined extension). A `BTreeMap` keeps digests
/// deterministic across runs (§5 "two runs ... yield identical output plans").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TraitSet(BTreeMap<String, TraitValue>);

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logical() -> Self {
        let mut set = Self::new();
        set.set("convention", TraitValue::Convention(Convention::logical()));
        set
    }

    pub fn with_convention(convention: Convention) -> Self {
        let mut set = Self::new();
        set.set("convention", TraitValue::Convention(convention));
        set
    }

    pub fn set(&mut self, dimension: &str, value: TraitValue) {
        self.0.insert(dimension.to_string(), value);
    }

    pub fn get(&self, dimension: &str) -> Option<&TraitValue> {
        self.0.get(dimension)
    }

    pub fn convention(&self) -> Convention {
        match self.get("convention") {
            Some(TraitValue::Convention(c)) => c.clone(),
            _ => Convention::logical(),
        }
    }

    /// Does this set satisfy every dimension `required` asks for? A dimension absent
    /// from `required` is unconstrained.
    pub fn satisfies(&self, required: &TraitSet) -> bool {
        required.0.iter().all(|(dim, want)| self.0.get(dim) == Some(want))
    }
}
