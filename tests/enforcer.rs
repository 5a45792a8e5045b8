//! Integration coverage for the constraint enforcer (C8, §4.8), through the public
//! API: a foreign-key check on an INSERT, and a table whose only constraint is
//! `ON_COMMIT`-enforced and therefore never wrapped here.

use polyplane::algebra::rel::{ModifyOperation, RelKind, RelNode, RowType};
use polyplane::algebra::traits::TraitSet;
use polyplane::catalog::key::EnforcementTime;
use polyplane::catalog::placement::PlacementType;
use polyplane::catalog::schema::SchemaType;
use polyplane::catalog::table::TableType;
use polyplane::catalog::Catalog;
use polyplane::enforcer::build_enforcer;
use polyplane::txn::Coordinator;
use polyplane::types::{Nullability, Type};
use std::collections::HashMap;
use std::sync::Arc;

mod support;
use support::pool;

fn int_ty() -> Type {
    Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL }
}

#[tokio::test]
async fn foreign_key_insert_produces_an_orphan_check() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();

    let dept = tx.add_table("department", schema, owner, TableType::Table).await.unwrap();
    let deptno = tx.add_column("deptno", dept, 1, &int_ty()).await.unwrap();
    let dept_pk = tx.add_key(dept, &[deptno], EnforcementTime::OnQuery).await.unwrap();
    tx.set_primary_key(dept, dept_pk).await.unwrap();

    let emp = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let empid = tx.add_column("empid", emp, 1, &int_ty()).await.unwrap();
    let emp_deptno = tx.add_column("deptno", emp, 2, &int_ty()).await.unwrap();
    let emp_pk = tx.add_key(emp, &[empid], EnforcementTime::OnQuery).await.unwrap();
    tx.set_primary_key(emp, emp_pk).await.unwrap();
    let fk_key = tx.add_key(emp, &[emp_deptno], EnforcementTime::OnQuery).await.unwrap();
    tx.add_foreign_key(
        fk_key,
        dept_pk,
        "fk_employee_department",
        polyplane::catalog::foreign_key::ReferentialAction::NoAction,
        polyplane::catalog::foreign_key::ReferentialAction::NoAction,
    )
    .await
    .unwrap();

    let store = tx.add_store("s1", "mock", &HashMap::new()).await.unwrap();
    tx.add_data_placement(store, dept, PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(store, deptno, "public", "deptno", PlacementType::Automatic).await.unwrap();
    tx.add_data_placement(store, emp, PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(store, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
    tx.add_column_placement(store, emp_deptno, "public", "deptno", PlacementType::Automatic).await.unwrap();
    tx.commit().await.unwrap();

    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();

    let row_type: RowType =
        vec![("empid".into(), Arc::new(int_ty())), ("deptno".into(), Arc::new(int_ty()))];
    let modify = Arc::new(RelNode::new(
        RelKind::Modify { entity: emp, operation: ModifyOperation::Insert, column_names: None, expressions: None },
        vec![],
        row_type,
        TraitSet::logical(),
    ));
    let wrapped = build_enforcer(modify, &snapshot).unwrap();
    match &wrapped.kind {
        RelKind::ConstraintEnforcer { error_kinds, error_messages } => {
            assert_eq!(error_kinds, &vec!["FOREIGN_KEY".to_string()]);
            assert_eq!(error_messages.len(), 1);
        }
        other => panic!("expected ConstraintEnforcer, got {other:?}"),
    }
}

#[tokio::test]
async fn on_commit_key_is_left_unwrapped() {
    let pool = pool().await;
    let catalog = Catalog::from_pool(pool.clone());
    let xid = Coordinator::new().begin(false);
    let mut tx = catalog.begin(xid).await.unwrap();
    let owner = tx.add_user("admin", "x").await.unwrap();
    let db = tx.add_database("db", owner).await.unwrap();
    let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
    let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
    let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
    let key = tx.add_key(table, &[empid], EnforcementTime::OnCommit).await.unwrap();
    tx.set_primary_key(table, key).await.unwrap();
    tx.add_constraint(key, polyplane::catalog::constraint::ConstraintType::Unique, "pk_employee")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let catalog = Catalog::from_pool(pool);
    let snapshot = catalog.snapshot().await.unwrap();
    let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
    let modify = Arc::new(RelNode::new(
        RelKind::Modify { entity: table, operation: ModifyOperation::Insert, column_names: None, expressions: None },
        vec![],
        row_type,
        TraitSet::logical(),
    ));
    let wrapped = build_enforcer(modify.clone(), &snapshot).unwrap();
    assert_eq!(wrapped.digest(), modify.digest());
}
