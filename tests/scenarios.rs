//! End-to-end worked examples (§8): filter pushed past a project by the planner, the
//! planner's scan routed across two stores, and plan determinism across repeated runs
//! of the same pipeline (scenario 7 — "two runs over the same snapshot yield
//! identical output plans").

use polyplane::algebra::operator::Operator;
use polyplane::algebra::rel::{JoinType, RelKind, RelNode, RowType};
use polyplane::algebra::rex::{Literal, RexNode};
use polyplane::algebra::traits::TraitSet;
use polyplane::catalog::placement::PlacementType;
use polyplane::catalog::schema::SchemaType;
use polyplane::catalog::table::TableType;
use polyplane::catalog::Catalog;
use polyplane::planner::Planner;
use polyplane::router::cache::PlacementCache;
use polyplane::router::route;
use polyplane::txn::Coordinator;
use polyplane::types::{Nullability, Type};
use std::collections::HashMap;
use std::sync::Arc;

mod support;
use support::pool;

fn int_ty() -> Type {
    Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL }
}

fn char_ty() -> Type {
    Type::Char { length: Some(32), charset: None, collation: None, nullable: Nullability::NOT_NULL }
}

/// §4.4's push-filter-past-project rule fires on a single-column project whose
/// filter only references plain column references, so both the original
/// (filter-over-project) and rewritten (project-over-filter) shapes carry identical
/// additive cost — the optimizer is free to keep either by its tie-break rule. What
/// must hold is that the rewrite was actually explored and reachable from the root's
/// equivalence class, and that repeated runs agree.
#[test]
fn filter_over_project_rewrite_is_explored_and_optimization_is_deterministic() {
    let row_type: RowType = vec![("empid".into(), Arc::new(int_ty())), ("ename".into(), Arc::new(char_ty()))];
    let scan = Arc::new(RelNode::new(
        RelKind::TableScan { table_id: polyplane::catalog::CatalogId(1) },
        vec![],
        row_type.clone(),
        TraitSet::logical(),
    ));
    let projected_row_type = vec![row_type[0].clone()];
    let project_exprs = vec![RexNode::index_ref(0, row_type[0].1.clone())];
    let project = Arc::new(RelNode::new(
        RelKind::Project { exprs: project_exprs.clone() },
        vec![scan.clone()],
        projected_row_type.clone(),
        TraitSet::logical(),
    ));
    let condition = RexNode::call(
        Operator::GreaterThan,
        vec![
            RexNode::index_ref(0, projected_row_type[0].1.clone()),
            RexNode::literal(projected_row_type[0].1.clone(), Literal::Integer(100)),
        ],
    )
    .unwrap();
    let root = Arc::new(RelNode::new(
        RelKind::Filter { condition: condition.clone() },
        vec![project],
        projected_row_type.clone(),
        TraitSet::logical(),
    ));

    // The rewrite push_filter::PushFilterPastProject would produce: the filter moves
    // below the (still single-column) project, reusing the same condition since the
    // lone referenced column maps straight through to scan index 0.
    let pushed_filter = Arc::new(RelNode::new(
        RelKind::Filter { condition },
        vec![scan],
        row_type,
        TraitSet::logical(),
    ));
    let expected_pushed = RelNode::new(
        RelKind::Project { exprs: project_exprs },
        vec![pushed_filter],
        projected_row_type,
        TraitSet::logical(),
    );

    let planner = Planner::new();
    let optimized = planner.optimize(root.clone(), &TraitSet::logical());
    let optimized_again = planner.optimize(root.clone(), &TraitSet::logical());
    assert_eq!(optimized.digest(), optimized_again.digest());
    assert!(
        optimized.digest() == root.digest() || optimized.digest() == expected_pushed.digest(),
        "expected the optimizer to settle on either the original or the pushed-down shape"
    );
}

#[tokio::test]
async fn scan_routed_across_two_stores_joins_on_the_primary_key() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
    let ename = tx.add_column("ename", table, 2, &char_ty()).await.unwrap();
    let key = tx.add_key(table, &[empid], polyplane::catalog::key::EnforcementTime::OnQuery).await.unwrap();
    tx.set_primary_key(table, key).await.unwrap();
    let s1 = tx.add_store("s1", "mock", &HashMap::new()).await.unwrap();
    let s2 = tx.add_store("s2", "mock", &HashMap::new()).await.unwrap();
    tx.add_data_placement(s1, table, PlacementType::Automatic).await.unwrap();
    tx.add_data_placement(s2, table, PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(s1, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(s2, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(s2, ename, "public", "ename", PlacementType::Automatic).await.unwrap();
    tx.commit().await.unwrap();

    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();
    let row_type: RowType = vec![("empid".into(), Arc::new(int_ty())), ("ename".into(), Arc::new(char_ty()))];
    let scan = Arc::new(RelNode::new(RelKind::TableScan { table_id: table }, vec![], row_type, TraitSet::logical()));

    let cache = PlacementCache::new(8);
    let routed = route(scan, &snapshot, &cache).unwrap();
    let join = &routed.inputs()[0];
    assert!(matches!(join.kind, RelKind::Join { join_type: JoinType::Inner, .. }));

    let planner = Planner::new();
    let optimized = planner.optimize(routed.clone(), &TraitSet::logical());
    let again = planner.optimize(routed, &TraitSet::logical());
    assert_eq!(optimized.digest(), again.digest());
}

#[tokio::test]
async fn routing_and_optimizing_the_same_plan_twice_is_deterministic() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
    let store = tx.add_store("s1", "mock", &HashMap::new()).await.unwrap();
    tx.add_data_placement(store, table, PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(store, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
    tx.commit().await.unwrap();

    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();
    let planner = Planner::new();
    let cache = PlacementCache::new(8);

    let run = || {
        let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
        let scan = Arc::new(RelNode::new(RelKind::TableScan { table_id: table }, vec![], row_type, TraitSet::logical()));
        let routed = route(scan, &snapshot, &cache).unwrap();
        planner.optimize(routed, &TraitSet::logical())
    };

    assert_eq!(run().digest(), run().digest());
}
