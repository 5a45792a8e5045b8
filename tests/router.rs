//! Integration coverage for the router (C5, §4.5) exercised purely through the public
//! API — no `pub(crate)` shortcuts — covering the error paths the in-module unit tests
//! don't reach: a table with no placement at all, and a vertical split missing the
//! primary key on one partition.

use polyplane::algebra::rel::{RelKind, RelNode, RowType};
use polyplane::algebra::traits::TraitSet;
use polyplane::catalog::placement::PlacementType;
use polyplane::catalog::schema::SchemaType;
use polyplane::catalog::table::TableType;
use polyplane::catalog::{Catalog, CatalogId};
use polyplane::router::cache::PlacementCache;
use polyplane::router::route;
use polyplane::txn::Coordinator;
use polyplane::types::{Nullability, Type};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

mod support;
use support::pool;

fn int_ty() -> Type {
    Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL }
}

async fn add_bare_table(pool: &SqlitePool) -> CatalogId {
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
    tx.commit().await.unwrap();
    table
}

#[tokio::test]
async fn scan_of_an_unplaced_table_is_an_integrity_violation() {
    let pool = pool().await;
    let table_id = add_bare_table(&pool).await;
    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();

    let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
    let scan = Arc::new(RelNode::new(RelKind::TableScan { table_id }, vec![], row_type, TraitSet::logical()));
    let cache = PlacementCache::new(8);
    let err = route(scan, &snapshot, &cache).unwrap_err();
    assert!(err.to_string().contains("DataPlacement") || err.to_string().contains("Integrity"));
}

#[tokio::test]
async fn split_partition_missing_the_primary_key_fails_to_route() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
    let deptno = tx.add_column("deptno", table, 2, &int_ty()).await.unwrap();
    let key = tx.add_key(table, &[empid], polyplane::catalog::key::EnforcementTime::OnQuery).await.unwrap();
    tx.set_primary_key(table, key).await.unwrap();

    let s1 = tx.add_store("s1", "mock", &HashMap::new()).await.unwrap();
    let s2 = tx.add_store("s2", "mock", &HashMap::new()).await.unwrap();
    tx.add_data_placement(s1, table, PlacementType::Automatic).await.unwrap();
    tx.add_data_placement(s2, table, PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(s1, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
    // deptno lives only on s2, and s2 never gets the primary key replicated onto it.
    tx.add_column_placement(s2, deptno, "public", "deptno", PlacementType::Automatic).await.unwrap();
    tx.commit().await.unwrap();

    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();
    let row_type: RowType = vec![
        ("empid".into(), Arc::new(int_ty())),
        ("deptno".into(), Arc::new(int_ty())),
    ];
    let scan = Arc::new(RelNode::new(RelKind::TableScan { table_id: table }, vec![], row_type, TraitSet::logical()));
    let cache = PlacementCache::new(8);
    assert!(route(scan, &snapshot, &cache).is_err());
}
