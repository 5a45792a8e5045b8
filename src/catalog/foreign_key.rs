//! Foreign key (§3): a [`super::key::Key`] annotated with the key it references and
//! the `ON UPDATE`/`ON DELETE` actions, enforced by [`crate::enforcer`] when the
//! owning key's `enforcement_time` is `ON_COMMIT`.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::validate_identifier;
use super::rows::one_row;
use crate::error::{PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ReferentialAction {
    fn as_str(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO_ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET_NULL",
            ReferentialAction::SetDefault => "SET_DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NO_ACTION" => Ok(ReferentialAction::NoAction),
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET_NULL" => Ok(ReferentialAction::SetNull),
            "SET_DEFAULT" => Ok(ReferentialAction::SetDefault),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ForeignKey {
    pub key_id: CatalogId,
    pub referenced_key_id: CatalogId,
    pub name: String,
    pub on_update: String,
    pub on_delete: String,
}

impl ForeignKey {
    pub fn on_update(&self) -> Result<ReferentialAction> {
        self.on_update.parse()
    }

    pub fn on_delete(&self) -> Result<ReferentialAction> {
        self.on_delete.parse()
    }
}

impl CatalogTxn<'_> {
    pub async fn add_foreign_key(
        &mut self,
        key_id: CatalogId,
        referenced_key_id: CatalogId,
        name: &str,
        on_update: ReferentialAction,
        on_delete: ReferentialAction,
    ) -> Result<()> {
        validate_identifier(name)?;
        sqlx::query(
            "INSERT INTO foreign_key (key_id, referenced_key_id, name, on_update, on_delete) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key_id.0)
        .bind(referenced_key_id.0)
        .bind(name)
        .bind(on_update.as_str())
        .bind(on_delete.as_str())
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(())
    }

    pub async fn get_foreign_key(&mut self, key_id: CatalogId) -> Result<ForeignKey> {
        let rows = sqlx::query_as::<_, ForeignKey>(
            "SELECT key_id, referenced_key_id, name, on_update, on_delete \
             FROM foreign_key WHERE key_id = ?",
        )
        .bind(key_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("ForeignKey", &key_id.to_string(), rows)
    }

    /// Foreign keys declared by the table owning `table_id` (`getForeignKeys`, §3).
    pub async fn get_foreign_keys(&mut self, table_id: CatalogId) -> Result<Vec<ForeignKey>> {
        sqlx::query_as::<_, ForeignKey>(
            "SELECT fk.key_id, fk.referenced_key_id, fk.name, fk.on_update, fk.on_delete \
             FROM foreign_key fk \
             JOIN key k ON k.id = fk.key_id \
             WHERE k.table_id = ?",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    /// Foreign keys declared by *other* tables that reference a key owned by `table_id`
    /// (`getExportedKeys`, §3) — the anti-join set [`CatalogTxn::delete_table`] checks
    /// before allowing a delete on the referenced side.
    pub async fn get_exported_keys(&mut self, table_id: CatalogId) -> Result<Vec<ForeignKey>> {
        sqlx::query_as::<_, ForeignKey>(
            "SELECT fk.key_id, fk.referenced_key_id, fk.name, fk.on_update, fk.on_delete \
             FROM foreign_key fk \
             JOIN key k ON k.id = fk.referenced_key_id \
             WHERE k.table_id = ?",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn delete_foreign_key(&mut self, key_id: CatalogId) -> Result<()> {
        sqlx::query("DELETE FROM foreign_key WHERE key_id = ?")
            .bind(key_id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}
