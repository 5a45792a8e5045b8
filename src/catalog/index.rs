//! Index (§3): a physical access structure over a [`super::key::Key`], located on one
//! [`super::store::Store`]. Deliberately flat compared to a storage-engine index
//! catalog — `type` is an adapter-defined label, not a closed enum, since different
//! adapters expose different index kinds.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::validate_identifier;
use super::rows::one_row;
use crate::error::Result;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Index {
    pub id: CatalogId,
    pub key_id: CatalogId,
    pub name: String,
    #[sqlx(rename = "type")]
    pub index_type: String,
    #[sqlx(rename = "unique")]
    pub is_unique: bool,
    pub location: CatalogId,
}

impl CatalogTxn<'_> {
    pub async fn add_index(
        &mut self,
        key_id: CatalogId,
        name: &str,
        index_type: &str,
        is_unique: bool,
        location: CatalogId,
    ) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        sqlx::query(
            "INSERT INTO index_ (id, key_id, name, type, \"unique\", location) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(key_id.0)
        .bind(name)
        .bind(index_type)
        .bind(is_unique)
        .bind(location.0)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_index(&mut self, id: CatalogId) -> Result<Index> {
        let rows = sqlx::query_as::<_, Index>(
            "SELECT id, key_id, name, type, \"unique\", location FROM index_ WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Index", &id.to_string(), rows)
    }

    pub async fn get_indexes(&mut self, table_id: CatalogId) -> Result<Vec<Index>> {
        sqlx::query_as::<_, Index>(
            "SELECT i.id, i.key_id, i.name, i.type, i.\"unique\", i.location \
             FROM index_ i \
             JOIN key k ON k.id = i.key_id \
             WHERE k.table_id = ?",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn delete_index(&mut self, id: CatalogId) -> Result<()> {
        sqlx::query("DELETE FROM index_ WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}
