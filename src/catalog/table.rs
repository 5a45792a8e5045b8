//! Table (§3): `{id, name, schemaId, ownerId, type, columns, primaryKey}`. `type` is
//! one of `TABLE`, `VIEW`, `MATERIALIZED_VIEW`, `STREAM`, `SOURCE`; only `TABLE` takes
//! part in routing/placement (§5).

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::{NamePattern, validate_identifier};
use super::rows::{expect_one_row_affected, one_row};
use crate::error::{ConstraintKind, PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Table,
    View,
    MaterializedView,
    Stream,
    Source,
}

impl TableType {
    fn as_str(self) -> &'static str {
        match self {
            TableType::Table => "TABLE",
            TableType::View => "VIEW",
            TableType::MaterializedView => "MATERIALIZED_VIEW",
            TableType::Stream => "STREAM",
            TableType::Source => "SOURCE",
        }
    }
}

impl FromStr for TableType {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TABLE" => Ok(TableType::Table),
            "VIEW" => Ok(TableType::View),
            "MATERIALIZED_VIEW" => Ok(TableType::MaterializedView),
            "STREAM" => Ok(TableType::Stream),
            "SOURCE" => Ok(TableType::Source),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Table {
    pub id: CatalogId,
    pub name: String,
    pub schema_id: CatalogId,
    pub owner_id: CatalogId,
    #[sqlx(rename = "type")]
    pub table_type: String,
    pub definition: Option<String>,
    pub primary_key_id: Option<CatalogId>,
}

impl Table {
    pub fn table_type(&self) -> Result<TableType> {
        self.table_type.parse()
    }
}

impl CatalogTxn<'_> {
    pub async fn add_table(
        &mut self,
        name: &str,
        schema_id: CatalogId,
        owner_id: CatalogId,
        table_type: TableType,
    ) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        sqlx::query(
            "INSERT INTO \"table\" (id, name, schema_id, owner_id, type) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(name)
        .bind(schema_id.0)
        .bind(owner_id.0)
        .bind(table_type.as_str())
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_table(&mut self, id: CatalogId) -> Result<Table> {
        let rows = sqlx::query_as::<_, Table>(
            "SELECT id, name, schema_id, owner_id, type, definition, primary_key_id \
             FROM \"table\" WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Table", &id.to_string(), rows)
    }

    pub async fn get_table_by_name(&mut self, schema_id: CatalogId, name: &str) -> Result<Table> {
        let rows = sqlx::query_as::<_, Table>(
            "SELECT id, name, schema_id, owner_id, type, definition, primary_key_id \
             FROM \"table\" WHERE schema_id = ? AND name = ?",
        )
        .bind(schema_id.0)
        .bind(name)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Table", name, rows)
    }

    pub async fn get_tables(
        &mut self,
        schema_id: CatalogId,
        pattern: &NamePattern,
    ) -> Result<Vec<Table>> {
        let all = sqlx::query_as::<_, Table>(
            "SELECT id, name, schema_id, owner_id, type, definition, primary_key_id \
             FROM \"table\" WHERE schema_id = ?",
        )
        .bind(schema_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(all.into_iter().filter(|t| pattern.matches(&t.name)).collect())
    }

    pub async fn rename_table(&mut self, id: CatalogId, new_name: &str) -> Result<()> {
        validate_identifier(new_name)?;
        let affected = sqlx::query("UPDATE \"table\" SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Table", &id.to_string(), affected)
    }

    pub async fn set_primary_key(&mut self, id: CatalogId, key_id: CatalogId) -> Result<()> {
        let affected = sqlx::query("UPDATE \"table\" SET primary_key_id = ? WHERE id = ?")
            .bind(key_id.0)
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Table", &id.to_string(), affected)
    }

    /// Drop a table and everything that exists only to describe it: columns,
    /// placements, keys, foreign keys, constraints, and indexes (§3: "Deleting a table
    /// cascades to its columns, placements, keys, foreign keys, constraints, indexes").
    /// Rejected outright if another table's foreign key still references one of this
    /// table's keys — [`CatalogTxn::get_exported_keys`] is the anti-join
    /// [`crate::enforcer`] polices on the read path; here it's the write-path guard.
    pub async fn delete_table(&mut self, id: CatalogId) -> Result<()> {
        let exported = self.get_exported_keys(id).await?;
        if !exported.is_empty() {
            return Err(PolyplaneError::ConstraintViolation {
                constraint_name: format!("table {id} is referenced by a foreign key on another table"),
                kind: ConstraintKind::ForeignKey,
            });
        }

        sqlx::query("DELETE FROM index_ WHERE key_id IN (SELECT id FROM key WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM constraint_ WHERE key_id IN (SELECT id FROM key WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM foreign_key WHERE key_id IN (SELECT id FROM key WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM key_column WHERE key_id IN (SELECT id FROM key WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM key WHERE table_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;

        sqlx::query("DELETE FROM column_placement WHERE column_id IN (SELECT id FROM column_ WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM default_value WHERE column_id IN (SELECT id FROM column_ WHERE table_id = ?)")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM column_ WHERE table_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;

        sqlx::query("DELETE FROM data_placement WHERE table_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;

        let affected = sqlx::query("DELETE FROM \"table\" WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Table", &id.to_string(), affected)?;
        self.invalidate_cache(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::foreign_key::ReferentialAction;
    use crate::catalog::key::EnforcementTime;
    use crate::catalog::schema::SchemaType;
    use crate::txn::Coordinator;
    use crate::types::{Nullability, Type};
    use sqlx::SqlitePool;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::catalog::Catalog::bootstrap(&pool).await.unwrap();
        pool
    }

    fn int_ty() -> Type {
        Type::Numeric { precision: Some(10), scale: Some(0), nullable: Nullability::NOT_NULL }
    }

    #[test]
    fn table_type_round_trips() {
        for ty in [
            TableType::Table,
            TableType::View,
            TableType::MaterializedView,
            TableType::Stream,
            TableType::Source,
        ] {
            assert_eq!(ty.as_str().parse::<TableType>().unwrap(), ty);
        }
    }

    #[tokio::test]
    async fn delete_table_cascades_to_columns_placements_and_keys() {
        let pool = pool().await;
        let catalog = crate::catalog::Catalog::from_pool(pool.clone());
        let xid = Coordinator::new().begin(false);
        let mut tx = catalog.begin(xid).await.unwrap();
        let owner = tx.add_user("admin", "x").await.unwrap();
        let db = tx.add_database("db", owner).await.unwrap();
        let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();
        let table = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        let empid = tx.add_column("empid", table, 1, &int_ty()).await.unwrap();
        let key = tx.add_key(table, &[empid], EnforcementTime::OnQuery).await.unwrap();
        tx.set_primary_key(table, key).await.unwrap();
        tx.add_constraint(key, crate::catalog::constraint::ConstraintType::Primary, "pk_employee")
            .await
            .unwrap();
        let store = tx.add_store("s1", "mock", &std::collections::HashMap::new()).await.unwrap();
        tx.add_index(key, "ix_employee_empid", "BTREE", true, store).await.unwrap();
        tx.add_data_placement(store, table, crate::catalog::placement::PlacementType::Automatic)
            .await
            .unwrap();
        tx.add_column_placement(store, empid, "public", "empid", crate::catalog::placement::PlacementType::Automatic)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        tx.delete_table(table).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        assert!(tx.get_table(table).await.is_err());
        assert!(tx.get_keys_for_table(table).await.unwrap().is_empty());
        assert!(tx.get_columns(table, &crate::catalog::naming::NamePattern::any()).await.unwrap().is_empty());
        assert!(tx.get_data_placements(table).await.unwrap().is_empty());
        assert!(tx.get_indexes(table).await.unwrap().is_empty());
        assert!(tx.get_constraints(table).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_table_is_rejected_while_another_table_still_references_it() {
        let pool = pool().await;
        let catalog = crate::catalog::Catalog::from_pool(pool.clone());
        let xid = Coordinator::new().begin(false);
        let mut tx = catalog.begin(xid).await.unwrap();
        let owner = tx.add_user("admin", "x").await.unwrap();
        let db = tx.add_database("db", owner).await.unwrap();
        let schema = tx.add_schema("public", db, owner, SchemaType::Relational).await.unwrap();

        let parent = tx.add_table("department", schema, owner, TableType::Table).await.unwrap();
        let deptno = tx.add_column("deptno", parent, 1, &int_ty()).await.unwrap();
        let parent_key = tx.add_key(parent, &[deptno], EnforcementTime::OnQuery).await.unwrap();
        tx.set_primary_key(parent, parent_key).await.unwrap();

        let child = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        let child_deptno = tx.add_column("deptno", child, 1, &int_ty()).await.unwrap();
        let child_key = tx.add_key(child, &[child_deptno], EnforcementTime::OnQuery).await.unwrap();
        tx.add_foreign_key(child_key, parent_key, "fk_employee_department", ReferentialAction::NoAction, ReferentialAction::Restrict)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        let err = tx.delete_table(parent).await.unwrap_err();
        assert!(matches!(err, PolyplaneError::ConstraintViolation { .. }));
    }
}
