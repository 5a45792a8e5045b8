//! Constraint enforcer (C8, §4.8): synthesizes the control subplan attached to a
//! `Modify` node so a unique or foreign-key constraint violation surfaces as data
//! rather than requiring a second catalog round-trip. Only keys whose
//! `enforcement_time` is `ON_QUERY` are enforced here; `ON_COMMIT` keys are the
//! transaction coordinator's concern at commit time, against the adapters actually
//! holding the data.

use crate::algebra::operator::Operator;
use crate::algebra::rel::{AggCall, JoinType, ModifyOperation, RelKind, RelNode, RowType, SetOpKind};
use crate::algebra::rex::{Literal, RexNode};
use crate::builder::RelBuilder;
use crate::catalog::constraint::ConstraintType;
use crate::catalog::foreign_key::ForeignKey;
use crate::catalog::key::{EnforcementTime, Key};
use crate::catalog::{CatalogId, Snapshot};
use crate::error::{PolyplaneError, Result};
use crate::types::{Nullability, Type};
use std::sync::Arc;

fn pos_type() -> Arc<Type> {
    Arc::new(Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL })
}

fn count_type() -> Arc<Type> {
    Arc::new(Type::Numeric { precision: Some(19), scale: Some(0), nullable: Nullability::NOT_NULL })
}

/// Build the `ConstraintEnforcer(modify, control, errorKinds[], errorMessages[])` node
/// wrapping `modify` (§4.8). Returns `modify` itself, unwrapped, if the target table has
/// no `ON_QUERY` unique or foreign-key constraint applicable to `modify`'s operation.
pub fn build_enforcer(modify: Arc<RelNode>, snapshot: &Snapshot) -> Result<Arc<RelNode>> {
    let (entity, operation) = match &modify.kind {
        RelKind::Modify { entity, operation, .. } => (*entity, *operation),
        other => {
            return Err(PolyplaneError::Internal(anyhow::anyhow!(
                "build_enforcer requires a Modify node, got {other:?}"
            )))
        }
    };

    // DELETE cannot itself produce a duplicate or a dangling child row; only the
    // modifying-row operations need a post-modification re-check.
    if !matches!(operation, ModifyOperation::Insert | ModifyOperation::Update | ModifyOperation::Merge) {
        return Ok(modify);
    }

    let mut subplans = Vec::new();
    let mut error_kinds = Vec::new();
    let mut error_messages = Vec::new();

    for constraint in snapshot.constraints_for_table(entity) {
        if constraint.constraint_type()? != ConstraintType::Unique {
            continue;
        }
        let key = snapshot
            .keys
            .get(&constraint.key_id)
            .ok_or_else(|| PolyplaneError::IntegrityViolation {
                entity_kind: "Key",
                key: constraint.key_id.to_string(),
            })?;
        if key.enforcement_time()? != EnforcementTime::OnQuery {
            continue;
        }
        let pos = subplans.len() as i64;
        subplans.push(build_unique_subplan(entity, key, pos, snapshot)?);
        error_kinds.push("UNIQUE".to_string());
        error_messages.push(format!("unique constraint {} violated", constraint.name));
    }

    for fk in snapshot.foreign_keys_for_table(entity) {
        let key = snapshot.keys.get(&fk.key_id).ok_or_else(|| PolyplaneError::IntegrityViolation {
            entity_kind: "Key",
            key: fk.key_id.to_string(),
        })?;
        if key.enforcement_time()? != EnforcementTime::OnQuery {
            continue;
        }
        let pos = subplans.len() as i64;
        subplans.push(build_foreign_key_subplan(fk, key, pos, snapshot)?);
        error_kinds.push("FOREIGN_KEY".to_string());
        error_messages.push(format!("foreign key {} violated", fk.name));
    }

    if subplans.is_empty() {
        return Ok(modify);
    }

    let control = union_all(subplans)?;
    let enforcer = RelNode::new(
        RelKind::ConstraintEnforcer { error_kinds, error_messages },
        vec![modify, control],
        vec![("pos".to_string(), pos_type())],
        crate::algebra::traits::TraitSet::logical(),
    );
    Ok(Arc::new(enforcer))
}

fn union_all(mut subplans: Vec<Arc<RelNode>>) -> Result<Arc<RelNode>> {
    if subplans.len() == 1 {
        return Ok(subplans.pop().unwrap());
    }
    let row_type = subplans[0].row_type().clone();
    let mut builder = RelBuilder::new();
    for subplan in subplans {
        builder.push_existing(subplan);
    }
    let count = builder.stack_len();
    builder.set_op(SetOpKind::Union, true, count, row_type)?;
    builder.build()
}

/// Re-scan the table, group by the key's columns, keep groups with more than one row,
/// and tag each surviving row with `pos` so the caller can map it back to this
/// constraint (§4.8 step 1).
fn build_unique_subplan(table_id: CatalogId, key: &Key, pos: i64, snapshot: &Snapshot) -> Result<Arc<RelNode>> {
    let key_columns = snapshot
        .key_columns
        .get(&key.id)
        .cloned()
        .ok_or_else(|| PolyplaneError::IntegrityViolation { entity_kind: "KeyColumn", key: key.id.to_string() })?;
    let table_columns = snapshot.table_columns(table_id);
    let row_type: RowType = table_columns
        .iter()
        .map(|c| Ok((c.name.clone(), Arc::new(c.data_type()?))))
        .collect::<Result<_>>()?;

    let key_indices: Vec<usize> = key_columns
        .iter()
        .map(|col_id| {
            table_columns
                .iter()
                .position(|c| c.id == *col_id)
                .ok_or_else(|| PolyplaneError::IntegrityViolation {
                    entity_kind: "Column",
                    key: col_id.to_string(),
                })
        })
        .collect::<Result<_>>()?;

    let group_row_type: RowType = key_indices.iter().map(|&i| row_type[i].clone()).collect();
    let group_exprs: Vec<RexNode> = key_indices.iter().map(|&i| RexNode::index_ref(i, row_type[i].1.clone())).collect();

    let mut aggregate_row_type = group_row_type.clone();
    aggregate_row_type.push(("cnt".to_string(), count_type()));
    let group_keys: Vec<usize> = (0..key_indices.len()).collect();

    let mut builder = RelBuilder::new();
    builder.scan(table_id, row_type);
    builder.project(group_exprs, group_row_type)?;
    builder.aggregate(
        group_keys.clone(),
        vec![group_keys.clone()],
        vec![AggCall { function: "COUNT".to_string(), args: vec![], distinct: false, data_type: count_type() }],
        aggregate_row_type.clone(),
    )?;
    let cnt_index = aggregate_row_type.len() - 1;
    builder.filter(RexNode::call(
        Operator::GreaterThan,
        vec![
            RexNode::index_ref(cnt_index, count_type()),
            RexNode::literal(count_type(), Literal::Integer(1)),
        ],
    )?)?;
    builder.project(vec![RexNode::literal(pos_type(), Literal::Integer(pos))], vec![("pos".to_string(), pos_type())])?;
    builder.build()
}

/// Left-join the child key-column projection against the parent's referenced-key
/// projection and keep rows where the parent side is absent (an orphan), tagged with
/// `pos` (§4.8 step 2).
fn build_foreign_key_subplan(fk: &ForeignKey, child_key: &Key, pos: i64, snapshot: &Snapshot) -> Result<Arc<RelNode>> {
    let child_table_id = child_key.table_id;
    let parent_key = snapshot.keys.get(&fk.referenced_key_id).ok_or_else(|| {
        PolyplaneError::IntegrityViolation { entity_kind: "Key", key: fk.referenced_key_id.to_string() }
    })?;
    let parent_table_id = parent_key.table_id;

    let child_key_columns = snapshot.key_columns.get(&child_key.id).cloned().ok_or_else(|| {
        PolyplaneError::IntegrityViolation { entity_kind: "KeyColumn", key: child_key.id.to_string() }
    })?;
    let parent_key_columns = snapshot.key_columns.get(&parent_key.id).cloned().ok_or_else(|| {
        PolyplaneError::IntegrityViolation { entity_kind: "KeyColumn", key: parent_key.id.to_string() }
    })?;

    let child_projection = projected_row(child_table_id, &child_key_columns, snapshot)?;
    let parent_projection = projected_row(parent_table_id, &parent_key_columns, snapshot)?;
    let width = child_projection.1.len();

    let mut condition: Option<RexNode> = None;
    for i in 0..child_projection.1.len() {
        let eq = RexNode::call(
            Operator::Equals,
            vec![
                RexNode::index_ref(i, child_projection.1[i].1.clone()),
                RexNode::index_ref(width + i, parent_projection.1[i].1.clone()),
            ],
        )?;
        condition = Some(match condition {
            None => eq,
            Some(existing) => RexNode::call(Operator::And, vec![existing, eq])?,
        });
    }
    let condition = condition.ok_or_else(|| {
        PolyplaneError::IntegrityViolation { entity_kind: "Key", key: "foreign key with no columns".to_string() }
    })?;

    let mut joined_row_type = child_projection.1.clone();
    joined_row_type.extend(parent_projection.1.clone());

    let mut builder = RelBuilder::new();
    builder.scan(child_table_id, child_projection.0);
    builder.project(child_projection.1.iter().enumerate().map(|(i, (_, ty))| RexNode::index_ref(i, ty.clone())).collect(), child_projection.1.clone())?;
    builder.scan(parent_table_id, parent_projection.0);
    builder.project(parent_projection.1.iter().enumerate().map(|(i, (_, ty))| RexNode::index_ref(i, ty.clone())).collect(), parent_projection.1.clone())?;
    builder.join(JoinType::Left, condition, joined_row_type.clone())?;

    // Any parent-side field being NULL after a LEFT JOIN means the match failed — the
    // child row is orphaned. The first parent column suffices to detect this.
    builder.filter(RexNode::call(Operator::IsNull, vec![RexNode::index_ref(width, joined_row_type[width].1.clone())])?)?;
    builder.project(vec![RexNode::literal(pos_type(), Literal::Integer(pos))], vec![("pos".to_string(), pos_type())])?;
    builder.build()
}

/// The full row type for `table_id` plus the index-ref projection selecting just
/// `key_columns`, keyed to their catalog ids.
fn projected_row(table_id: CatalogId, key_columns: &[CatalogId], snapshot: &Snapshot) -> Result<(RowType, RowType)> {
    let table_columns = snapshot.table_columns(table_id);
    let full_row_type: RowType = table_columns
        .iter()
        .map(|c| Ok((c.name.clone(), Arc::new(c.data_type()?))))
        .collect::<Result<_>>()?;
    let projected: RowType = key_columns
        .iter()
        .map(|col_id| {
            let idx = table_columns
                .iter()
                .position(|c| c.id == *col_id)
                .ok_or_else(|| PolyplaneError::IntegrityViolation { entity_kind: "Column", key: col_id.to_string() })?;
            Ok(full_row_type[idx].clone())
        })
        .collect::<Result<_>>()?;
    Ok((full_row_type, projected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::key::EnforcementTime;
    use crate::catalog::placement::PlacementType;
    use crate::catalog::table::TableType;
    use crate::txn::Coordinator;
    use crate::types::Type;
    use sqlx::SqlitePool;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::catalog::Catalog::bootstrap(&pool).await.unwrap();
        pool
    }

    fn int_ty() -> Type {
        Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL }
    }

    #[tokio::test]
    async fn unique_constraint_produces_a_control_subplan() {
        let pool = pool().await;
        let catalog = crate::catalog::Catalog::from_pool(pool.clone());
        let xid = Coordinator::new().begin(false);
        let mut tx = catalog.begin(xid).await.unwrap();
        let owner = tx.add_user("admin", "x").await.unwrap();
        let db = tx.add_database("db", owner).await.unwrap();
        let schema = tx.add_schema("public", db, owner, crate::catalog::schema::SchemaType::Relational).await.unwrap();
        let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
        let key = tx.add_key(table, &[empid], EnforcementTime::OnQuery).await.unwrap();
        tx.set_primary_key(table, key).await.unwrap();
        tx.add_constraint(key, crate::catalog::constraint::ConstraintType::Unique, "pk_employee").await.unwrap();
        let store = tx.add_store("s1", "mock", &std::collections::HashMap::new()).await.unwrap();
        tx.add_data_placement(store, table, PlacementType::Automatic).await.unwrap();
        tx.add_column_placement(store, empid, "public", "empid", PlacementType::Automatic).await.unwrap();
        tx.commit().await.unwrap();

        let catalog = crate::catalog::Catalog::from_pool(pool);
        let snapshot = catalog.snapshot().await.unwrap();

        let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
        let modify = Arc::new(RelNode::new(
            RelKind::Modify { entity: table, operation: ModifyOperation::Insert, column_names: None, expressions: None },
            vec![],
            row_type,
            crate::algebra::traits::TraitSet::logical(),
        ));
        let wrapped = build_enforcer(modify, &snapshot).unwrap();
        match &wrapped.kind {
            RelKind::ConstraintEnforcer { error_kinds, .. } => assert_eq!(error_kinds, &vec!["UNIQUE".to_string()]),
            other => panic!("expected ConstraintEnforcer, got {other:?}"),
        }
        assert_eq!(wrapped.inputs().len(), 2);
    }

    #[tokio::test]
    async fn delete_is_returned_unwrapped() {
        let pool = pool().await;
        let catalog = crate::catalog::Catalog::from_pool(pool.clone());
        let xid = Coordinator::new().begin(false);
        let mut tx = catalog.begin(xid).await.unwrap();
        let owner = tx.add_user("admin", "x").await.unwrap();
        let db = tx.add_database("db", owner).await.unwrap();
        let schema = tx.add_schema("public", db, owner, crate::catalog::schema::SchemaType::Relational).await.unwrap();
        let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
        tx.commit().await.unwrap();

        let catalog = crate::catalog::Catalog::from_pool(pool);
        let snapshot = catalog.snapshot().await.unwrap();
        let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
        let modify = Arc::new(RelNode::new(
            RelKind::Modify { entity: table, operation: ModifyOperation::Delete, column_names: None, expressions: None },
            vec![],
            row_type,
            crate::algebra::traits::TraitSet::logical(),
        ));
        let wrapped = build_enforcer(modify.clone(), &snapshot).unwrap();
        assert_eq!(wrapped.digest(), modify.digest());
    }

    #[tokio::test]
    async fn no_constraints_passes_modify_through_unwrapped() {
        let pool = pool().await;
        let catalog = crate::catalog::Catalog::from_pool(pool.clone());
        let xid = Coordinator::new().begin(false);
        let mut tx = catalog.begin(xid).await.unwrap();
        let owner = tx.add_user("admin", "x").await.unwrap();
        let db = tx.add_database("db", owner).await.unwrap();
        let schema = tx.add_schema("public", db, owner, crate::catalog::schema::SchemaType::Relational).await.unwrap();
        let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
        tx.commit().await.unwrap();

        let catalog = crate::catalog::Catalog::from_pool(pool);
        let snapshot = catalog.snapshot().await.unwrap();
        let row_type: RowType = vec![("empid".into(), Arc::new(int_ty()))];
        let modify = Arc::new(RelNode::new(
            RelKind::Modify { entity: table, operation: ModifyOperation::Insert, column_names: None, expressions: None },
            vec![],
            row_type,
            crate::algebra::traits::TraitSet::logical(),
        ));
        let wrapped = build_enforcer(modify.clone(), &snapshot).unwrap();
        assert_eq!(wrapped.digest(), modify.digest());
    }
}
