//! Database / namespace (§3): `{id, name unique within system, ownerId,
//! defaultSchemaId nullable, encoding, collation, connectionLimit}`.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::{NamePattern, validate_identifier};
use super::rows::{expect_one_row_affected, one_row};
use crate::error::Result;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Database {
    pub id: CatalogId,
    pub name: String,
    pub owner_id: CatalogId,
    pub default_schema_id: Option<CatalogId>,
    pub encoding: String,
    pub collation: Option<String>,
    pub connection_limit: i64,
}

impl CatalogTxn<'_> {
    pub async fn add_database(&mut self, name: &str, owner_id: CatalogId) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        sqlx::query(
            "INSERT INTO database (id, name, owner_id, encoding, connection_limit) \
             VALUES (?, ?, ?, 'UTF8', -1)",
        )
        .bind(id.0)
        .bind(name)
        .bind(owner_id.0)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_database(&mut self, id: CatalogId) -> Result<Database> {
        let rows = sqlx::query_as::<_, Database>(
            "SELECT id, name, owner_id, default_schema_id, encoding, collation, connection_limit \
             FROM database WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Database", &id.to_string(), rows)
    }

    pub async fn get_database_by_name(&mut self, name: &str) -> Result<Database> {
        let rows = sqlx::query_as::<_, Database>(
            "SELECT id, name, owner_id, default_schema_id, encoding, collation, connection_limit \
             FROM database WHERE name = ?",
        )
        .bind(name)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Database", name, rows)
    }

    pub async fn get_databases(&mut self, pattern: &NamePattern) -> Result<Vec<Database>> {
        let all = sqlx::query_as::<_, Database>(
            "SELECT id, name, owner_id, default_schema_id, encoding, collation, connection_limit \
             FROM database",
        )
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(all.into_iter().filter(|d| pattern.matches(&d.name)).collect())
    }

    pub async fn rename_database(&mut self, id: CatalogId, new_name: &str) -> Result<()> {
        validate_identifier(new_name)?;
        let affected = sqlx::query("UPDATE database SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Database", &id.to_string(), affected)
    }

    pub async fn set_default_schema(&mut self, id: CatalogId, schema_id: CatalogId) -> Result<()> {
        let affected = sqlx::query("UPDATE database SET default_schema_id = ? WHERE id = ?")
            .bind(schema_id.0)
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Database", &id.to_string(), affected)
    }

    pub async fn delete_database(&mut self, id: CatalogId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM database WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Database", &id.to_string(), affected)
    }
}
