//! Shared "get-one" arity enforcement (§4.2): a lookup fails with `NotFound` if empty
//! and `IntegrityViolation` if more than one row is returned.

use crate::error::{PolyplaneError, Result};

pub fn one_row<T>(entity_kind: &'static str, key: &str, mut rows: Vec<T>) -> Result<T> {
    match rows.len() {
        0 => Err(PolyplaneError::NotFound {
            entity_kind,
            key: key.to_string(),
        }),
        1 => Ok(rows.pop().unwrap()),
        _ => Err(PolyplaneError::IntegrityViolation {
            entity_kind,
            key: key.to_string(),
        }),
    }
}

/// Enforce that a mutation affected exactly one persistent record (§4.2: "Each
/// mutation requires the projected change to affect exactly one persistent record").
pub fn expect_one_row_affected(
    entity_kind: &'static str,
    key: &str,
    rows_affected: u64,
) -> Result<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(PolyplaneError::IntegrityViolation {
            entity_kind,
            key: key.to_string(),
        })
    }
}
