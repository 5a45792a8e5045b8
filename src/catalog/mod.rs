//! Catalog store (C2, §4.2): a persistent relational metamodel of users, databases,
//! schemas, tables, columns, stores, placements, keys, and constraints, durable in an
//! embedded SQLite pool. Every mutation runs inside a [`CatalogTxn`] bound to the
//! coordinator-issued [`crate::txn::TransactionId`] for the surrounding distributed
//! transaction; every lookup is either a surrogate-id point read or a [`naming::NamePattern`]
//! scan over an in-process [`Snapshot`].

pub mod column;
pub mod constraint;
pub mod database;
pub mod foreign_key;
pub mod ids;
pub mod index;
pub mod key;
pub mod naming;
pub mod placement;
pub mod rows;
pub mod schema;
pub mod schema_sql;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod user;

pub use ids::CatalogId;
pub use snapshot::Snapshot;

use crate::error::Result;
use crate::txn::TransactionId;
use ids::IdGenerator;
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

/// A sink a catalog mutation notifies when it touches a table's placements or columns
/// (§4.5: cache invalidation is "coarse-grained: drop cache entry on any DDL against
/// the table id"). Defined here rather than in `router` so the catalog doesn't depend
/// on the router crate-internally; [`crate::router::cache::PlacementCache`] is the one
/// real implementation.
pub trait PlacementCacheHandle: Send + Sync {
    fn invalidate_table(&self, table_id: CatalogId);
}

/// The catalog handle: an embedded SQLite pool plus the monotonic id generator owned
/// by this catalog instance (not a global).
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
    cache: Option<Arc<dyn PlacementCacheHandle>>,
}

impl Catalog {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await.map_err(anyhow::Error::from)?;
        Self::bootstrap(&pool).await?;
        Ok(Self {
            pool,
            ids: Arc::new(IdGenerator::default()),
            cache: None,
        })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            ids: Arc::new(IdGenerator::default()),
            cache: None,
        }
    }

    /// Route placement-cache invalidation for this catalog's mutations through `cache`
    /// (typically a [`crate::router::cache::PlacementCache`] shared with the router).
    pub fn with_cache(mut self, cache: Arc<dyn PlacementCacheHandle>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Install the bootstrap schema (§6). Idempotent against a freshly wiped store.
    pub async fn bootstrap(pool: &SqlitePool) -> Result<()> {
        info!("installing catalog bootstrap schema");
        for statement in schema_sql::BOOTSTRAP_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(anyhow::Error::from)?;
        }
        Ok(())
    }

    /// Drop the bootstrap schema entirely, mirroring `dropSchema(tx)` in §4.2.
    pub async fn drop_schema(pool: &SqlitePool) -> Result<()> {
        const TABLES: &[&str] = &[
            "index_",
            "constraint_",
            "foreign_key",
            "key_column",
            "key",
            "column_placement",
            "data_placement",
            "store",
            "default_value",
            "column_",
            "\"table\"",
            "schema",
            "database",
            "\"user\"",
        ];
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(pool)
                .await
                .map_err(anyhow::Error::from)?;
        }
        Ok(())
    }

    /// Begin a catalog transaction bound to `xid`, the distributed transaction id
    /// issued by the [`crate::txn::Coordinator`] for this session.
    pub async fn begin(&self, xid: TransactionId) -> Result<CatalogTxn<'_>> {
        let inner = self.pool.begin().await.map_err(anyhow::Error::from)?;
        Ok(CatalogTxn {
            inner,
            xid,
            ids: self.ids.clone(),
            cache: self.cache.clone(),
        })
    }

    /// Capture a read-only, `Arc`-shared point-in-time snapshot of the catalog,
    /// used throughout one query's planning/routing (§5).
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        Snapshot::load(&self.pool).await.map(Arc::new)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A mutation scope bound to a single distributed transaction. `prepare`/`commit`/
/// `rollback` are driven by [`crate::txn::Coordinator`], not called directly by callers.
pub struct CatalogTxn<'c> {
    inner: sqlx::Transaction<'c, Sqlite>,
    xid: TransactionId,
    ids: Arc<IdGenerator>,
    cache: Option<Arc<dyn PlacementCacheHandle>>,
}

impl<'c> CatalogTxn<'c> {
    pub fn xid(&self) -> TransactionId {
        self.xid
    }

    pub(crate) fn next_id(&self) -> CatalogId {
        self.ids.next()
    }

    pub(crate) fn tx(&mut self) -> &mut sqlx::SqliteConnection {
        &mut self.inner
    }

    /// Notify the placement cache (if one is attached) that `table_id`'s routed scans
    /// are stale. A no-op for a catalog built without [`Catalog::with_cache`].
    pub(crate) fn invalidate_cache(&self, table_id: CatalogId) {
        if let Some(cache) = &self.cache {
            cache.invalidate_table(table_id);
        }
    }

    pub async fn commit(self) -> Result<()> {
        self.inner.commit().await.map_err(anyhow::Error::from)?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.inner.rollback().await.map_err(anyhow::Error::from)?;
        Ok(())
    }
}
