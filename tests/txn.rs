//! Integration coverage for the two-phase-commit coordinator (C6, §4.6, §8 scenarios
//! 5 and 6): a clean commit across two adapters, and a rollback triggered by one
//! adapter refusing to prepare.

use polyplane::adapter::mock::InMemoryAdapter;
use polyplane::adapter::AdapterDriver;
use polyplane::catalog::placement::PlacementType;
use polyplane::catalog::schema::SchemaType;
use polyplane::catalog::table::TableType;
use polyplane::catalog::{Catalog, CatalogId};
use polyplane::txn::registry::TxnStatus;
use polyplane::txn::Coordinator;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

mod support;
use support::pool;

async fn two_store_table(pool: &SqlitePool) -> (CatalogId, CatalogId, CatalogId) {
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let s1 = tx.add_store("s1", "mock", &HashMap::new()).await.unwrap();
    let s2 = tx.add_store("s2", "mock", &HashMap::new()).await.unwrap();
    tx.add_data_placement(s1, table, PlacementType::Automatic).await.unwrap();
    tx.add_data_placement(s2, table, PlacementType::Automatic).await.unwrap();
    tx.commit().await.unwrap();
    (table, s1, s2)
}

#[tokio::test]
async fn two_adapters_agree_and_the_transaction_commits() {
    let pool = pool().await;
    let (_table, s1, s2) = two_store_table(&pool).await;

    let coordinator = Coordinator::new();
    let xid = coordinator.begin(false);
    let adapter1 = Arc::new(InMemoryAdapter::new(s1));
    let adapter2 = Arc::new(InMemoryAdapter::new(s2));
    coordinator.register_involved_adapter(xid, adapter1.clone()).unwrap();
    coordinator.register_involved_adapter(xid, adapter2.clone()).unwrap();

    let catalog = Catalog::from_pool(pool);
    let catalog_txn = catalog.begin(xid).await.unwrap();
    coordinator.commit(xid, catalog_txn).await.unwrap();

    assert!(adapter1.is_committed(xid));
    assert!(adapter2.is_committed(xid));
    assert!(!adapter1.is_rolled_back(xid));
    assert!(!adapter2.is_rolled_back(xid));
}

#[tokio::test]
async fn one_adapter_refusing_to_prepare_rolls_back_every_participant() {
    let pool = pool().await;
    let (_table, s1, s2) = two_store_table(&pool).await;

    let coordinator = Coordinator::new();
    let xid = coordinator.begin(false);
    let adapter1 = Arc::new(InMemoryAdapter::new(s1));
    let adapter2 = Arc::new(InMemoryAdapter::failing_prepare(s2));
    coordinator.register_involved_adapter(xid, adapter1.clone()).unwrap();
    coordinator.register_involved_adapter(xid, adapter2.clone()).unwrap();

    let catalog = Catalog::from_pool(pool);
    let catalog_txn = catalog.begin(xid).await.unwrap();
    let result = coordinator.commit(xid, catalog_txn).await;

    assert!(result.is_err());
    assert!(!adapter1.is_committed(xid));
    assert!(!adapter2.is_committed(xid));
    assert!(adapter1.is_rolled_back(xid));
}

#[tokio::test]
async fn a_read_only_transaction_skips_the_prepare_round() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool);

    let coordinator = Coordinator::new();
    let xid = coordinator.begin(true);
    assert_eq!(coordinator.status(xid).unwrap(), TxnStatus::Active);

    let catalog_txn = catalog.begin(xid).await.unwrap();
    coordinator.commit(xid, catalog_txn).await.unwrap();

    assert!(coordinator.status(xid).is_err());
}

#[tokio::test]
async fn cancelling_a_transaction_before_commit_forces_a_rollback() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let (_table, s1, _s2) = two_store_table(&pool).await;

    let coordinator = Coordinator::new();
    let xid = coordinator.begin(false);
    let adapter1 = Arc::new(InMemoryAdapter::new(s1));
    coordinator.register_involved_adapter(xid, adapter1.clone()).unwrap();
    coordinator.cancel(xid).unwrap();
    assert!(coordinator.is_cancelled(xid));

    let catalog_txn = catalog.begin(xid).await.unwrap();
    let result = coordinator.commit(xid, catalog_txn).await;
    assert!(result.is_err());
}
