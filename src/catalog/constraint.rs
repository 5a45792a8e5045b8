//! Constraint (§3): names a [`super::key::Key`] as `UNIQUE` or `PRIMARY`. Backed by
//! [`crate::enforcer`] with a synthesized control subplan when the owning key's
//! `enforcement_time` is `ON_QUERY`.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::validate_identifier;
use super::rows::one_row;
use crate::error::{PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    Unique,
    Primary,
}

impl ConstraintType {
    fn as_str(self) -> &'static str {
        match self {
            ConstraintType::Unique => "UNIQUE",
            ConstraintType::Primary => "PRIMARY",
        }
    }
}

impl FromStr for ConstraintType {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNIQUE" => Ok(ConstraintType::Unique),
            "PRIMARY" => Ok(ConstraintType::Primary),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Constraint {
    pub id: CatalogId,
    pub key_id: CatalogId,
    #[sqlx(rename = "type")]
    pub constraint_type: String,
    pub name: String,
}

impl Constraint {
    pub fn constraint_type(&self) -> Result<ConstraintType> {
        self.constraint_type.parse()
    }
}

impl CatalogTxn<'_> {
    pub async fn add_constraint(
        &mut self,
        key_id: CatalogId,
        constraint_type: ConstraintType,
        name: &str,
    ) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        sqlx::query(
            "INSERT INTO constraint_ (id, key_id, type, name) VALUES (?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(key_id.0)
        .bind(constraint_type.as_str())
        .bind(name)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_constraint(&mut self, id: CatalogId) -> Result<Constraint> {
        let rows = sqlx::query_as::<_, Constraint>(
            "SELECT id, key_id, type, name FROM constraint_ WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Constraint", &id.to_string(), rows)
    }

    /// Constraints on the table owning `table_id`, across all of its keys.
    pub async fn get_constraints(&mut self, table_id: CatalogId) -> Result<Vec<Constraint>> {
        sqlx::query_as::<_, Constraint>(
            "SELECT c.id, c.key_id, c.type, c.name \
             FROM constraint_ c \
             JOIN key k ON k.id = c.key_id \
             WHERE k.table_id = ?",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn delete_constraint(&mut self, id: CatalogId) -> Result<()> {
        sqlx::query("DELETE FROM constraint_ WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}
