//! Placement fingerprints (§4.5): a stable hash over the ordered
//! `(adapterId, physicalSchemaName, physicalTableName, partitionId, columnIds)`
//! quadruples that back one routed scan subtree. Two snapshots that resolve a table
//! to the same placements produce the same fingerprint, which is what lets
//! [`super::cache::PlacementCache`] reuse a cached subtree across queries.

use crate::catalog::CatalogId;
use std::fmt;

/// One adapter's contribution to a table's placement fingerprint.
#[derive(Debug, Clone)]
pub struct FingerprintEntry {
    pub store_id: CatalogId,
    pub physical_schema_name: String,
    pub physical_table_name: String,
    pub partition_id: Option<i64>,
    pub column_ids: Vec<CatalogId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// `entries` must already be in the router's stable join order (adapter-id
    /// ascending, §4.5) — this does not sort them itself, so callers that build
    /// entries out of order will get a fingerprint that doesn't match an
    /// equivalently-placed table assembled in order.
    pub fn compute(table_id: CatalogId, entries: &[FingerprintEntry]) -> Self {
        let mut buf = format!("table={table_id}");
        for entry in entries {
            let mut column_ids = entry.column_ids.clone();
            column_ids.sort();
            buf.push('|');
            buf.push_str(&format!(
                "{}:{}:{}:{:?}:{:?}",
                entry.store_id, entry.physical_schema_name, entry.physical_table_name,
                entry.partition_id, column_ids
            ));
        }
        Fingerprint(format!("{:x}", md5::compute(buf.as_bytes())))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
