//! Schema (§3): `{id, name, databaseId, ownerId, type}`, one of `RELATIONAL`,
//! `DOCUMENT`, or `GRAPH`.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::{NamePattern, validate_identifier};
use super::rows::{expect_one_row_affected, one_row};
use crate::error::{PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Relational,
    Document,
    Graph,
}

impl SchemaType {
    fn as_str(self) -> &'static str {
        match self {
            SchemaType::Relational => "RELATIONAL",
            SchemaType::Document => "DOCUMENT",
            SchemaType::Graph => "GRAPH",
        }
    }
}

impl FromStr for SchemaType {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RELATIONAL" => Ok(SchemaType::Relational),
            "DOCUMENT" => Ok(SchemaType::Document),
            "GRAPH" => Ok(SchemaType::Graph),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Schema {
    pub id: CatalogId,
    pub name: String,
    pub database_id: CatalogId,
    pub owner_id: CatalogId,
    #[sqlx(rename = "type")]
    pub schema_type: String,
}

impl Schema {
    pub fn schema_type(&self) -> Result<SchemaType> {
        self.schema_type.parse()
    }
}

impl CatalogTxn<'_> {
    pub async fn add_schema(
        &mut self,
        name: &str,
        database_id: CatalogId,
        owner_id: CatalogId,
        schema_type: SchemaType,
    ) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        sqlx::query(
            "INSERT INTO schema (id, name, database_id, owner_id, type) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(name)
        .bind(database_id.0)
        .bind(owner_id.0)
        .bind(schema_type.as_str())
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_schema(&mut self, id: CatalogId) -> Result<Schema> {
        let rows = sqlx::query_as::<_, Schema>(
            "SELECT id, name, database_id, owner_id, type FROM schema WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Schema", &id.to_string(), rows)
    }

    pub async fn get_schema_by_name(
        &mut self,
        database_id: CatalogId,
        name: &str,
    ) -> Result<Schema> {
        let rows = sqlx::query_as::<_, Schema>(
            "SELECT id, name, database_id, owner_id, type FROM schema \
             WHERE database_id = ? AND name = ?",
        )
        .bind(database_id.0)
        .bind(name)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Schema", name, rows)
    }

    pub async fn get_schemas(
        &mut self,
        database_id: CatalogId,
        pattern: &NamePattern,
    ) -> Result<Vec<Schema>> {
        let all = sqlx::query_as::<_, Schema>(
            "SELECT id, name, database_id, owner_id, type FROM schema WHERE database_id = ?",
        )
        .bind(database_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(all.into_iter().filter(|s| pattern.matches(&s.name)).collect())
    }

    pub async fn rename_schema(&mut self, id: CatalogId, new_name: &str) -> Result<()> {
        validate_identifier(new_name)?;
        let affected = sqlx::query("UPDATE schema SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Schema", &id.to_string(), affected)
    }

    pub async fn delete_schema(&mut self, id: CatalogId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM schema WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Schema", &id.to_string(), affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_type_round_trips_through_its_wire_string() {
        for ty in [SchemaType::Relational, SchemaType::Document, SchemaType::Graph] {
            let parsed: SchemaType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn schema_type_rejects_unknown_strings() {
        assert!("MADE_UP".parse::<SchemaType>().is_err());
    }
}
