//! Relational algebra IR (C3, §4.3): logical/physical plan nodes plus the row
//! expression language they carry.

pub mod operator;
pub mod rel;
pub mod rex;
pub mod traits;
