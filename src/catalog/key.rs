//! Key (§3): an ordered column list underlying a primary/unique constraint, foreign
//! key, or index — `{id, tableId, columns, enforcementTime}`.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::rows::one_row;
use crate::error::{ConstraintKind, PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementTime {
    OnQuery,
    OnCommit,
}

impl EnforcementTime {
    fn as_str(self) -> &'static str {
        match self {
            EnforcementTime::OnQuery => "ON_QUERY",
            EnforcementTime::OnCommit => "ON_COMMIT",
        }
    }
}

impl FromStr for EnforcementTime {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ON_QUERY" => Ok(EnforcementTime::OnQuery),
            "ON_COMMIT" => Ok(EnforcementTime::OnCommit),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Key {
    pub id: CatalogId,
    pub table_id: CatalogId,
    pub enforcement_time: String,
}

impl Key {
    pub fn enforcement_time(&self) -> Result<EnforcementTime> {
        self.enforcement_time.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct KeyColumn {
    pub key_id: CatalogId,
    pub seq: i64,
    pub column_id: CatalogId,
}

impl CatalogTxn<'_> {
    pub async fn add_key(
        &mut self,
        table_id: CatalogId,
        columns: &[CatalogId],
        enforcement_time: EnforcementTime,
    ) -> Result<CatalogId> {
        let id = self.next_id();
        sqlx::query("INSERT INTO key (id, table_id, enforcement_time) VALUES (?, ?, ?)")
            .bind(id.0)
            .bind(table_id.0)
            .bind(enforcement_time.as_str())
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        for (seq, column_id) in columns.iter().enumerate() {
            sqlx::query("INSERT INTO key_column (key_id, seq, column_id) VALUES (?, ?, ?)")
                .bind(id.0)
                .bind(seq as i64)
                .bind(column_id.0)
                .execute(self.tx())
                .await
                .map_err(anyhow::Error::from)?;
        }
        Ok(id)
    }

    pub async fn get_key(&mut self, id: CatalogId) -> Result<Key> {
        let rows = sqlx::query_as::<_, Key>(
            "SELECT id, table_id, enforcement_time FROM key WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Key", &id.to_string(), rows)
    }

    pub async fn get_key_columns(&mut self, key_id: CatalogId) -> Result<Vec<CatalogId>> {
        let rows = sqlx::query_as::<_, KeyColumn>(
            "SELECT key_id, seq, column_id FROM key_column WHERE key_id = ? ORDER BY seq",
        )
        .bind(key_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(rows.into_iter().map(|kc| kc.column_id).collect())
    }

    pub async fn get_keys_for_table(&mut self, table_id: CatalogId) -> Result<Vec<Key>> {
        sqlx::query_as::<_, Key>(
            "SELECT id, table_id, enforcement_time FROM key WHERE table_id = ?",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    /// Drop a key, cascading to the foreign key, constraint, and index rows that exist
    /// only to describe it. Rejected if another table's foreign key still references
    /// this key (§3) — the caller must drop that foreign key first.
    pub async fn delete_key(&mut self, id: CatalogId) -> Result<()> {
        let (referencing,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM foreign_key WHERE referenced_key_id = ?")
                .bind(id.0)
                .fetch_one(self.tx())
                .await
                .map_err(anyhow::Error::from)?;
        if referencing > 0 {
            return Err(PolyplaneError::ConstraintViolation {
                constraint_name: format!("key {id} is referenced by a foreign key on another table"),
                kind: ConstraintKind::ForeignKey,
            });
        }

        sqlx::query("DELETE FROM index_ WHERE key_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM constraint_ WHERE key_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM foreign_key WHERE key_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM key_column WHERE key_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        sqlx::query("DELETE FROM key WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::foreign_key::ReferentialAction;
    use crate::catalog::schema::SchemaType;
    use crate::catalog::table::TableType;
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

    #[tokio::test]
    async fn delete_key_is_rejected_while_a_foreign_key_still_references_it() {
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

        let child = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        let child_deptno = tx.add_column("deptno", child, 1, &int_ty()).await.unwrap();
        let child_key = tx.add_key(child, &[child_deptno], EnforcementTime::OnQuery).await.unwrap();
        tx.add_foreign_key(
            child_key,
            parent_key,
            "fk_employee_department",
            ReferentialAction::NoAction,
            ReferentialAction::Restrict,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        let err = tx.delete_key(parent_key).await.unwrap_err();
        assert!(matches!(err, PolyplaneError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn delete_key_cascades_to_its_own_foreign_key_and_constraint_rows() {
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

        let child = tx.add_table("employee", schema, owner, TableType::Table).await.unwrap();
        let child_deptno = tx.add_column("deptno", child, 1, &int_ty()).await.unwrap();
        let child_key = tx.add_key(child, &[child_deptno], EnforcementTime::OnQuery).await.unwrap();
        tx.add_foreign_key(
            child_key,
            parent_key,
            "fk_employee_department",
            ReferentialAction::NoAction,
            ReferentialAction::Restrict,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        tx.delete_key(child_key).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = catalog.begin(Coordinator::new().begin(false)).await.unwrap();
        assert!(tx.get_foreign_keys(child).await.unwrap().is_empty());
        assert!(tx.get_key(child_key).await.is_err());
    }
}
