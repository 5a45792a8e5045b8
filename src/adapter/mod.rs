//! Adapter interface (C7, §4.7): the narrow contract every physical store implements.
//! Adapters are trait objects enlisted by [`crate::txn::Coordinator`] and consulted by
//! [`crate::planner`] rules for convention conversion and by [`crate::router`] for
//! scan binding.

pub mod mock;

use crate::algebra::rel::RelNode;
use crate::catalog::CatalogId;
use crate::catalog::column::Column;
use crate::catalog::index::Index;
use crate::catalog::placement::ColumnPlacement;
use crate::catalog::table::Table;
use crate::error::Result;
use crate::txn::TransactionId;
use crate::types::Type;
use futures_util::future::BoxFuture;
use std::fmt;

/// A logical-table allocation: which store and which physical names back it.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub store_id: CatalogId,
    pub physical_schema_name: String,
    pub physical_table_name: String,
}

/// Capability flags an adapter advertises (§4.7, §6). Consumed by the planner before
/// it chooses this adapter's convention for a subtree, and by the builder when
/// deciding whether a rewrite is legal for a given target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_nested_arrays: bool,
    pub supports_binary_stream: bool,
    pub supports_write: bool,
    pub supports_indexes: bool,
    pub supports_rollback: bool,
    pub supports_prepare: bool,
}

/// The uniform contract every physical store driver implements. Methods return boxed
/// futures rather than using `async fn` so the trait stays object-safe: the
/// coordinator and router hold adapters as `Arc<dyn AdapterDriver>`.
pub trait AdapterDriver: fmt::Debug + Send + Sync {
    /// A stable identifier for join-order and commit-order purposes (§4.5, §5).
    fn store_id(&self) -> CatalogId;

    fn capabilities(&self) -> Capabilities;

    fn create_namespace<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;

    fn create_table<'a>(
        &'a self,
        table: &'a Table,
        allocation: &'a Allocation,
        columns: &'a [Column],
    ) -> BoxFuture<'a, Result<()>>;

    fn drop_table<'a>(&'a self, allocation: &'a Allocation) -> BoxFuture<'a, Result<()>>;

    fn add_column<'a>(
        &'a self,
        allocation: &'a Allocation,
        column: &'a Column,
    ) -> BoxFuture<'a, Result<()>>;

    fn drop_column<'a>(&'a self, allocation: &'a Allocation, placement: &'a ColumnPlacement) -> BoxFuture<'a, Result<()>>;

    /// Materialize a catalog [`Index`] physically on `allocation` (§4.7:
    /// `addIndex(ctx, index)`).
    fn add_index<'a>(&'a self, allocation: &'a Allocation, index: &'a Index) -> BoxFuture<'a, Result<()>>;

    /// Drop a physical index by name (§4.7: `dropIndex(ctx, index)`).
    fn drop_index<'a>(&'a self, allocation: &'a Allocation, index: &'a Index) -> BoxFuture<'a, Result<()>>;

    /// Alter a placed column's physical type (§4.7: `updateColumnType(ctx, placement,
    /// newType, oldType)`).
    fn update_column_type<'a>(
        &'a self,
        placement: &'a ColumnPlacement,
        new_type: &'a Type,
        old_type: &'a Type,
    ) -> BoxFuture<'a, Result<()>>;

    fn truncate<'a>(&'a self, allocation: &'a Allocation) -> BoxFuture<'a, Result<()>>;

    /// Run a physical scan plan rooted at `plan` against this store. A production
    /// driver would translate `plan` into its wire protocol; the narrow contract here
    /// is that it returns the digest it actually executed, for observability.
    fn scan<'a>(&'a self, plan: &'a RelNode) -> BoxFuture<'a, Result<String>>;

    fn prepare<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<bool>>;

    fn commit<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<()>>;

    fn rollback<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<()>>;
}
