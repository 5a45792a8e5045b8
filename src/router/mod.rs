//! Router / placement engine (C5, §4.5): binds a logical plan's scans to physical
//! placements. Per scan: partition the required columns by adapter; a single-store
//! table becomes one [`RelKind::AdapterScan`]; a vertically-partitioned table becomes
//! one scan per store, primary-key-completed, chained by ascending-store-id inner
//! joins, then projected back down to the originally required columns in their
//! original order. Non-scan nodes are structural copies over their routed children;
//! `Values` and other leaves with no table reference pass through unchanged.

pub mod cache;
pub mod fingerprint;

use crate::algebra::operator::Operator;
use crate::algebra::rel::{AdapterScanSpec, JoinType, RelKind, RelNode, RowType};
use crate::algebra::rex::RexNode;
use crate::algebra::traits::TraitSet;
use crate::catalog::column::Column;
use crate::catalog::{CatalogId, Snapshot};
use crate::error::{PolyplaneError, Result};
use cache::PlacementCache;
use fingerprint::{Fingerprint, FingerprintEntry};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Route every `TableScan` in `plan` to adapter-specific scans against `snapshot`,
/// reusing `cache` for any table whose placement fingerprint was already routed.
pub fn route(plan: Arc<RelNode>, snapshot: &Snapshot, cache: &PlacementCache) -> Result<Arc<RelNode>> {
    route_node(&plan, snapshot, cache)
}

fn route_node(node: &RelNode, snapshot: &Snapshot, cache: &PlacementCache) -> Result<Arc<RelNode>> {
    match &node.kind {
        RelKind::TableScan { table_id } => route_scan(*table_id, node.row_type(), snapshot, cache),
        RelKind::Values { .. } | RelKind::AdapterScan(_) => Ok(Arc::new(node.clone())),
        _ => {
            let routed_inputs = node
                .inputs()
                .iter()
                .map(|input| route_node(input, snapshot, cache))
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(node.with_inputs(routed_inputs)))
        }
    }
}

fn route_scan(
    table_id: CatalogId,
    required_row_type: &RowType,
    snapshot: &Snapshot,
    cache: &PlacementCache,
) -> Result<Arc<RelNode>> {
    let columns = snapshot.table_columns(table_id);
    if columns.is_empty() {
        return Err(PolyplaneError::NotFound {
            entity_kind: "Table",
            key: table_id.to_string(),
        });
    }
    if snapshot.data_placements_by_table.get(&table_id).map(Vec::len).unwrap_or(0) == 0 {
        return Err(PolyplaneError::IntegrityViolation {
            entity_kind: "DataPlacement",
            key: table_id.to_string(),
        });
    }
    let _ = required_row_type; // a TableScan always requires the table's full row type

    let table = snapshot.tables.get(&table_id).ok_or_else(|| PolyplaneError::NotFound {
        entity_kind: "Table",
        key: table_id.to_string(),
    })?;

    let column_ids: Vec<CatalogId> = columns.iter().map(|c| c.id).collect();
    let primary_key_cols: Vec<CatalogId> = snapshot
        .primary_key(table_id)
        .and_then(|k| snapshot.key_columns.get(&k.id))
        .cloned()
        .unwrap_or_default();

    // Step 2: partition the required column set by adapter. `BTreeMap` keeps stores
    // in ascending order for the stable join order required by step 4/scenario 7.
    let mut by_store: BTreeMap<CatalogId, Vec<CatalogId>> = BTreeMap::new();
    for col in &columns {
        let placements = snapshot.column_placements_by_column.get(&col.id).ok_or_else(|| {
            PolyplaneError::IntegrityViolation { entity_kind: "ColumnPlacement", key: col.id.to_string() }
        })?;
        let chosen = placements.first().ok_or_else(|| PolyplaneError::IntegrityViolation {
            entity_kind: "ColumnPlacement",
            key: col.id.to_string(),
        })?;
        by_store.entry(chosen.store_id).or_default().push(col.id);
    }

    // Step 4: every partition must carry the primary key so the joins can reconstruct
    // the row. This assumes the catalog already replicated a placement for each
    // primary-key column onto every partition's store; a missing one is an
    // integrity error, not something the router can paper over.
    if by_store.len() > 1 {
        for (store_id, cols) in by_store.iter_mut() {
            for pk_col in &primary_key_cols {
                if !cols.contains(pk_col) {
                    snapshot.column_placement_on_store(*pk_col, *store_id).ok_or_else(|| {
                        PolyplaneError::IntegrityViolation {
                            entity_kind: "ColumnPlacement",
                            key: format!("primary key column {pk_col} missing a placement on store {store_id}"),
                        }
                    })?;
                    cols.push(*pk_col);
                }
            }
        }
    }

    let fingerprint = compute_fingerprint(table_id, &table_physical_name(table), &by_store, snapshot)?;
    if let Some(cached) = cache.get(&fingerprint) {
        return Ok(cached);
    }

    let mut scans: Vec<(CatalogId, Arc<RelNode>, Vec<CatalogId>)> = Vec::new();
    for (store_id, cols) in &by_store {
        let row_type = scan_row_type(&columns, cols)?;
        let physical_schema_name = physical_schema_for(snapshot, *store_id, cols)?;
        let spec = AdapterScanSpec {
            store_id: *store_id,
            physical_schema_name,
            physical_table_name: table_physical_name(table),
            partition_id: None,
        };
        let node = RelNode::new(RelKind::AdapterScan(spec), vec![], row_type, TraitSet::logical());
        scans.push((*store_id, Arc::new(node), cols.clone()));
    }

    // Step 4: chain inner joins on the primary key, ascending adapter-id order.
    let mut iter = scans.into_iter();
    let (_, mut acc_node, mut acc_cols) = iter.next().expect("at least one store covers this table (checked above)");
    for (_store_id, node, cols) in iter {
        if primary_key_cols.is_empty() {
            return Err(PolyplaneError::IntegrityViolation {
                entity_kind: "Key",
                key: format!("table {table_id} is vertically partitioned but has no primary key to join on"),
            });
        }
        let left_width = acc_cols.len();
        let mut condition: Option<RexNode> = None;
        for pk in &primary_key_cols {
            let left_idx = acc_cols.iter().position(|c| c == pk).expect("pk completed into left partition above");
            let right_idx = cols.iter().position(|c| c == pk).expect("pk completed into right partition above");
            let eq = RexNode::call(
                Operator::Equals,
                vec![
                    RexNode::index_ref(left_idx, acc_node.row_type()[left_idx].1.clone()),
                    RexNode::index_ref(left_width + right_idx, node.row_type()[right_idx].1.clone()),
                ],
            )?;
            condition = Some(match condition {
                None => eq,
                Some(existing) => RexNode::call(Operator::And, vec![existing, eq])?,
            });
        }
        let condition = condition.expect("vertically partitioned table always has ≥1 primary key column here");

        let mut joined_row_type = acc_node.row_type().clone();
        joined_row_type.extend(node.row_type().clone());
        let joined = RelNode::new(
            RelKind::Join { condition, join_type: JoinType::Inner },
            vec![acc_node, node],
            joined_row_type,
            TraitSet::logical(),
        );
        let mut joined_cols = acc_cols;
        joined_cols.extend(cols);
        acc_node = Arc::new(joined);
        acc_cols = joined_cols;
    }

    // Step 5: project the unioned result down to the originally required columns in
    // their original order.
    let mut exprs = Vec::with_capacity(column_ids.len());
    let mut row_type = Vec::with_capacity(column_ids.len());
    for (col, col_id) in columns.iter().zip(column_ids.iter()) {
        let idx = acc_cols
            .iter()
            .position(|c| c == col_id)
            .expect("every originally required column survives the join chain");
        let data_type = acc_node.row_type()[idx].1.clone();
        exprs.push(RexNode::index_ref(idx, data_type.clone()));
        row_type.push((col.name.clone(), data_type));
    }
    let routed = Arc::new(RelNode::new(
        RelKind::Project { exprs },
        vec![acc_node],
        row_type,
        TraitSet::logical(),
    ));

    cache.insert(fingerprint, table_id, routed.clone());
    Ok(routed)
}

fn table_physical_name(table: &crate::catalog::table::Table) -> String {
    table.name.clone()
}

fn scan_row_type(columns: &[&Column], wanted: &[CatalogId]) -> Result<RowType> {
    wanted
        .iter()
        .map(|id| {
            let col = columns
                .iter()
                .find(|c| c.id == *id)
                .expect("wanted column ids are drawn from this table's own columns");
            Ok((col.name.clone(), Arc::new(col.data_type()?)))
        })
        .collect()
}

fn physical_schema_for(snapshot: &Snapshot, store_id: CatalogId, cols: &[CatalogId]) -> Result<String> {
    for col_id in cols {
        if let Some(placement) = snapshot.column_placement_on_store(*col_id, store_id) {
            return Ok(placement.physical_schema_name.clone());
        }
    }
    Err(PolyplaneError::IntegrityViolation {
        entity_kind: "ColumnPlacement",
        key: format!("no column of this partition is actually placed on store {store_id}"),
    })
}

fn compute_fingerprint(
    table_id: CatalogId,
    physical_table_name: &str,
    by_store: &BTreeMap<CatalogId, Vec<CatalogId>>,
    snapshot: &Snapshot,
) -> Result<Fingerprint> {
    let mut entries = Vec::with_capacity(by_store.len());
    for (store_id, cols) in by_store {
        let physical_schema_name = physical_schema_for(snapshot, *store_id, cols)?;
        entries.push(FingerprintEntry {
            store_id: *store_id,
            physical_schema_name,
            physical_table_name: physical_table_name.to_string(),
            partition_id: None,
            column_ids: cols.clone(),
        });
    }
    Ok(Fingerprint::compute(table_id, &entries))
}
