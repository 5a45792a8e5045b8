//! Data/column placement (§3, §5): which [`super::store::Store`] holds which table
//! (vertically partitioned across stores when a table's columns are split).

use super::CatalogTxn;
use super::ids::CatalogId;
use crate::error::{PolyplaneError, Result};
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementType {
    Automatic,
    Manual,
    Static,
}

impl PlacementType {
    fn as_str(self) -> &'static str {
        match self {
            PlacementType::Automatic => "AUTOMATIC",
            PlacementType::Manual => "MANUAL",
            PlacementType::Static => "STATIC",
        }
    }
}

impl FromStr for PlacementType {
    type Err = PolyplaneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AUTOMATIC" => Ok(PlacementType::Automatic),
            "MANUAL" => Ok(PlacementType::Manual),
            "STATIC" => Ok(PlacementType::Static),
            other => Err(PolyplaneError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DataPlacement {
    pub store_id: CatalogId,
    pub table_id: CatalogId,
    #[sqlx(rename = "placement_type")]
    pub placement_type: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ColumnPlacement {
    pub store_id: CatalogId,
    pub column_id: CatalogId,
    pub physical_schema_name: String,
    pub physical_column_name: String,
    #[sqlx(rename = "placement_type")]
    pub placement_type: String,
}

impl CatalogTxn<'_> {
    pub async fn add_data_placement(
        &mut self,
        store_id: CatalogId,
        table_id: CatalogId,
        placement_type: PlacementType,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO data_placement (store_id, table_id, placement_type) VALUES (?, ?, ?)",
        )
        .bind(store_id.0)
        .bind(table_id.0)
        .bind(placement_type.as_str())
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        self.invalidate_cache(table_id);
        Ok(())
    }

    pub async fn get_data_placements(&mut self, table_id: CatalogId) -> Result<Vec<DataPlacement>> {
        sqlx::query_as::<_, DataPlacement>(
            "SELECT store_id, table_id, placement_type FROM data_placement WHERE table_id = ? \
             ORDER BY store_id",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn delete_data_placement(&mut self, store_id: CatalogId, table_id: CatalogId) -> Result<()> {
        sqlx::query("DELETE FROM data_placement WHERE store_id = ? AND table_id = ?")
            .bind(store_id.0)
            .bind(table_id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        self.invalidate_cache(table_id);
        Ok(())
    }

    pub async fn add_column_placement(
        &mut self,
        store_id: CatalogId,
        column_id: CatalogId,
        physical_schema_name: &str,
        physical_column_name: &str,
        placement_type: PlacementType,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO column_placement \
                (store_id, column_id, physical_schema_name, physical_column_name, placement_type) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(store_id.0)
        .bind(column_id.0)
        .bind(physical_schema_name)
        .bind(physical_column_name)
        .bind(placement_type.as_str())
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        let (table_id,): (CatalogId,) = sqlx::query_as("SELECT table_id FROM column_ WHERE id = ?")
            .bind(column_id.0)
            .fetch_one(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        self.invalidate_cache(table_id);
        Ok(())
    }

    pub async fn get_column_placements(
        &mut self,
        table_id: CatalogId,
    ) -> Result<Vec<ColumnPlacement>> {
        sqlx::query_as::<_, ColumnPlacement>(
            "SELECT cp.store_id, cp.column_id, cp.physical_schema_name, cp.physical_column_name, \
                    cp.placement_type \
             FROM column_placement cp \
             JOIN column_ c ON c.id = cp.column_id \
             WHERE c.table_id = ? \
             ORDER BY cp.store_id, c.position",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }

    pub async fn get_column_placements_on_store(
        &mut self,
        store_id: CatalogId,
        table_id: CatalogId,
    ) -> Result<Vec<ColumnPlacement>> {
        sqlx::query_as::<_, ColumnPlacement>(
            "SELECT cp.store_id, cp.column_id, cp.physical_schema_name, cp.physical_column_name, \
                    cp.placement_type \
             FROM column_placement cp \
             JOIN column_ c ON c.id = cp.column_id \
             WHERE cp.store_id = ? AND c.table_id = ? \
             ORDER BY c.position",
        )
        .bind(store_id.0)
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(|e| anyhow::Error::from(e).into())
    }
}
