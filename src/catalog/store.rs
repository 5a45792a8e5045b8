//! Store (§3, C7): a registered adapter instance — `{id, uniqueName, adapter, settings}`.
//! One store backs one [`crate::adapter::AdapterDriver`] at runtime; the catalog only
//! persists its identity and configuration, never a live connection.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::validate_identifier;
use super::rows::{expect_one_row_affected, one_row};
use crate::error::Result;
use sqlx::FromRow;
use std::collections::HashMap;

#[derive(Debug, Clone, FromRow)]
pub struct Store {
    pub id: CatalogId,
    pub unique_name: String,
    pub adapter: String,
    pub settings_json: String,
}

impl Store {
    pub fn settings(&self) -> Result<HashMap<String, String>> {
        Ok(serde_json::from_str(&self.settings_json).map_err(anyhow::Error::from)?)
    }
}

impl CatalogTxn<'_> {
    pub async fn add_store(
        &mut self,
        unique_name: &str,
        adapter: &str,
        settings: &HashMap<String, String>,
    ) -> Result<CatalogId> {
        validate_identifier(unique_name)?;
        let id = self.next_id();
        let settings_json = serde_json::to_string(settings).map_err(anyhow::Error::from)?;
        sqlx::query(
            "INSERT INTO store (id, unique_name, adapter, settings_json) VALUES (?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(unique_name)
        .bind(adapter)
        .bind(&settings_json)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_store(&mut self, id: CatalogId) -> Result<Store> {
        let rows = sqlx::query_as::<_, Store>(
            "SELECT id, unique_name, adapter, settings_json FROM store WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Store", &id.to_string(), rows)
    }

    pub async fn get_store_by_name(&mut self, unique_name: &str) -> Result<Store> {
        let rows = sqlx::query_as::<_, Store>(
            "SELECT id, unique_name, adapter, settings_json FROM store WHERE unique_name = ?",
        )
        .bind(unique_name)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Store", unique_name, rows)
    }

    pub async fn get_stores(&mut self) -> Result<Vec<Store>> {
        sqlx::query_as::<_, Store>("SELECT id, unique_name, adapter, settings_json FROM store")
            .fetch_all(self.tx())
            .await
            .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn delete_store(&mut self, id: CatalogId) -> Result<()> {
        let affected = sqlx::query("DELETE FROM store WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Store", &id.to_string(), affected)
    }
}
