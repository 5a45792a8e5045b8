//! A read-only, `Arc`-shared point-in-time view of the whole catalog (§5: "the router
//! and planner never query the live catalog mid-plan; they read a snapshot captured at
//! the start of the query"). Loaded once per query via [`super::Catalog::snapshot`] and
//! shared by the planner, router, and enforcer for the rest of that query's lifetime.

use super::column::Column;
use super::constraint::Constraint;
use super::database::Database;
use super::foreign_key::ForeignKey;
use super::ids::CatalogId;
use super::index::Index;
use super::key::{Key, KeyColumn};
use super::placement::{ColumnPlacement, DataPlacement};
use super::schema::Schema;
use super::store::Store;
use super::table::Table;
use crate::error::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Snapshot {
    pub databases: HashMap<CatalogId, Database>,
    pub schemas: HashMap<CatalogId, Schema>,
    pub tables: HashMap<CatalogId, Table>,
    pub columns: HashMap<CatalogId, Column>,
    pub stores: HashMap<CatalogId, Store>,
    pub keys: HashMap<CatalogId, Key>,
    pub constraints: HashMap<CatalogId, Constraint>,
    pub foreign_keys: HashMap<CatalogId, ForeignKey>,
    pub indexes: HashMap<CatalogId, Index>,

    pub schemas_by_database: HashMap<CatalogId, Vec<CatalogId>>,
    pub tables_by_schema: HashMap<CatalogId, Vec<CatalogId>>,
    pub columns_by_table: HashMap<CatalogId, Vec<CatalogId>>,
    pub keys_by_table: HashMap<CatalogId, Vec<CatalogId>>,
    pub key_columns: HashMap<CatalogId, Vec<CatalogId>>,
    pub data_placements_by_table: HashMap<CatalogId, Vec<DataPlacement>>,
    pub column_placements_by_column: HashMap<CatalogId, Vec<ColumnPlacement>>,
}

impl Snapshot {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let databases = sqlx::query_as::<_, Database>(
            "SELECT id, name, owner_id, default_schema_id, encoding, collation, connection_limit \
             FROM database",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let schemas = sqlx::query_as::<_, Schema>(
            "SELECT id, name, database_id, owner_id, type FROM schema",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let tables = sqlx::query_as::<_, Table>(
            "SELECT id, name, schema_id, owner_id, type, definition, primary_key_id FROM \"table\"",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let columns = sqlx::query_as::<_, Column>(
            "SELECT id, name, table_id, position, type_json, length, scale, nullable, collation \
             FROM column_ ORDER BY position",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let stores = sqlx::query_as::<_, Store>(
            "SELECT id, unique_name, adapter, settings_json FROM store",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let keys = sqlx::query_as::<_, Key>("SELECT id, table_id, enforcement_time FROM key")
            .fetch_all(pool)
            .await
            .map_err(anyhow::Error::from)?;

        let key_column_rows = sqlx::query_as::<_, KeyColumn>(
            "SELECT key_id, seq, column_id FROM key_column ORDER BY seq",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let constraints = sqlx::query_as::<_, Constraint>(
            "SELECT id, key_id, type, name FROM constraint_",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let foreign_keys = sqlx::query_as::<_, ForeignKey>(
            "SELECT key_id, referenced_key_id, name, on_update, on_delete FROM foreign_key",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let indexes = sqlx::query_as::<_, Index>(
            "SELECT id, key_id, name, type, \"unique\", location FROM index_",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let data_placements = sqlx::query_as::<_, DataPlacement>(
            "SELECT store_id, table_id, placement_type FROM data_placement ORDER BY store_id",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let column_placements = sqlx::query_as::<_, ColumnPlacement>(
            "SELECT store_id, column_id, physical_schema_name, physical_column_name, placement_type \
             FROM column_placement ORDER BY store_id",
        )
        .fetch_all(pool)
        .await
        .map_err(anyhow::Error::from)?;

        let mut snapshot = Snapshot::default();

        for db in databases {
            snapshot.databases.insert(db.id, db);
        }
        for schema in schemas {
            snapshot
                .schemas_by_database
                .entry(schema.database_id)
                .or_default()
                .push(schema.id);
            snapshot.schemas.insert(schema.id, schema);
        }
        for table in tables {
            snapshot
                .tables_by_schema
                .entry(table.schema_id)
                .or_default()
                .push(table.id);
            snapshot.tables.insert(table.id, table);
        }
        for column in columns {
            snapshot
                .columns_by_table
                .entry(column.table_id)
                .or_default()
                .push(column.id);
            snapshot.columns.insert(column.id, column);
        }
        for store in stores {
            snapshot.stores.insert(store.id, store);
        }
        for key in keys {
            snapshot
                .keys_by_table
                .entry(key.table_id)
                .or_default()
                .push(key.id);
            snapshot.keys.insert(key.id, key);
        }
        for kc in key_column_rows {
            snapshot
                .key_columns
                .entry(kc.key_id)
                .or_default()
                .push(kc.column_id);
        }
        for constraint in constraints {
            snapshot.constraints.insert(constraint.id, constraint);
        }
        for fk in foreign_keys {
            snapshot.foreign_keys.insert(fk.key_id, fk);
        }
        for index in indexes {
            snapshot.indexes.insert(index.id, index);
        }
        for dp in data_placements {
            snapshot
                .data_placements_by_table
                .entry(dp.table_id)
                .or_default()
                .push(dp);
        }
        for cp in column_placements {
            snapshot
                .column_placements_by_column
                .entry(cp.column_id)
                .or_default()
                .push(cp);
        }

        Ok(snapshot)
    }

    pub fn table_columns(&self, table_id: CatalogId) -> Vec<&Column> {
        self.columns_by_table
            .get(&table_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.columns.get(id))
            .collect()
    }

    pub fn stores_for_table(&self, table_id: CatalogId) -> Vec<&Store> {
        self.data_placements_by_table
            .get(&table_id)
            .into_iter()
            .flatten()
            .filter_map(|dp| self.stores.get(&dp.store_id))
            .collect()
    }

    pub fn primary_key(&self, table_id: CatalogId) -> Option<&Key> {
        let table = self.tables.get(&table_id)?;
        let key_id = table.primary_key_id?;
        self.keys.get(&key_id)
    }

    /// The column placement carrying `column_id`'s values on `store_id`, if any.
    pub fn column_placement_on_store(
        &self,
        column_id: CatalogId,
        store_id: CatalogId,
    ) -> Option<&ColumnPlacement> {
        self.column_placements_by_column
            .get(&column_id)?
            .iter()
            .find(|p| p.store_id == store_id)
    }

    /// Constraints declared on any key of `table_id` (§4.8), ordered by id for
    /// determinism.
    pub fn constraints_for_table(&self, table_id: CatalogId) -> Vec<&Constraint> {
        let key_ids: std::collections::HashSet<CatalogId> = self
            .keys_by_table
            .get(&table_id)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        let mut out: Vec<&Constraint> = self
            .constraints
            .values()
            .filter(|c| key_ids.contains(&c.key_id))
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    /// Foreign keys owned (locally declared) by `table_id` (`getForeignKeys`, §3),
    /// ordered by key id for determinism.
    pub fn foreign_keys_for_table(&self, table_id: CatalogId) -> Vec<&ForeignKey> {
        let mut out: Vec<&ForeignKey> = self
            .keys_by_table
            .get(&table_id)
            .into_iter()
            .flatten()
            .filter_map(|kid| self.foreign_keys.get(kid))
            .collect();
        out.sort_by_key(|fk| fk.key_id);
        out
    }
}
