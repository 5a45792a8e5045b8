//! An in-process adapter used by tests and by examples that don't need a real backend
//! wire protocol. Tracks prepared/committed/rolled-back transaction ids and table rows
//! in memory so scenarios can assert on coordinator behavior without a live store.

use super::{Allocation, Capabilities, AdapterDriver};
use crate::algebra::rel::RelNode;
use crate::catalog::CatalogId;
use crate::catalog::column::Column;
use crate::catalog::index::Index;
use crate::catalog::placement::ColumnPlacement;
use crate::catalog::table::Table;
use crate::error::{PolyplaneError, Result};
use crate::txn::TransactionId;
use crate::types::Type;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    namespaces: HashSet<String>,
    tables: HashMap<String, Vec<String>>,
    indexes: HashSet<String>,
    prepared: HashSet<TransactionId>,
    committed: HashSet<TransactionId>,
    rolled_back: HashSet<TransactionId>,
}

/// An in-memory [`AdapterDriver`] for tests. `fail_prepare` simulates a store whose
/// `prepare` call returns `false` (scenario 6, §8).
#[derive(Debug)]
pub struct InMemoryAdapter {
    store_id: CatalogId,
    capabilities: Capabilities,
    fail_prepare: bool,
    state: Mutex<State>,
}

impl InMemoryAdapter {
    pub fn new(store_id: CatalogId) -> Self {
        Self {
            store_id,
            capabilities: Capabilities {
                supports_nested_arrays: true,
                supports_binary_stream: true,
                supports_write: true,
                supports_indexes: true,
                supports_rollback: true,
                supports_prepare: true,
            },
            fail_prepare: false,
            state: Mutex::new(State::default()),
        }
    }

    pub fn failing_prepare(store_id: CatalogId) -> Self {
        Self {
            fail_prepare: true,
            ..Self::new(store_id)
        }
    }

    pub fn is_committed(&self, xid: TransactionId) -> bool {
        self.state.lock().unwrap().committed.contains(&xid)
    }

    pub fn is_rolled_back(&self, xid: TransactionId) -> bool {
        self.state.lock().unwrap().rolled_back.contains(&xid)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().unwrap().indexes.contains(name)
    }
}

impl AdapterDriver for InMemoryAdapter {
    fn store_id(&self) -> CatalogId {
        self.store_id
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_namespace<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state.lock().unwrap().namespaces.insert(name.to_string());
            Ok(())
        }
        .boxed()
    }

    fn create_table<'a>(
        &'a self,
        _table: &'a Table,
        allocation: &'a Allocation,
        columns: &'a [Column],
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let names = columns.iter().map(|c| c.name.clone()).collect();
            self.state
                .lock()
                .unwrap()
                .tables
                .insert(allocation.physical_table_name.clone(), names);
            Ok(())
        }
        .boxed()
    }

    fn drop_table<'a>(&'a self, allocation: &'a Allocation) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state
                .lock()
                .unwrap()
                .tables
                .remove(&allocation.physical_table_name);
            Ok(())
        }
        .boxed()
    }

    fn add_column<'a>(
        &'a self,
        allocation: &'a Allocation,
        column: &'a Column,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if let Some(cols) = self
                .state
                .lock()
                .unwrap()
                .tables
                .get_mut(&allocation.physical_table_name)
            {
                cols.push(column.name.clone());
            }
            Ok(())
        }
        .boxed()
    }

    fn drop_column<'a>(&'a self, allocation: &'a Allocation, placement: &'a ColumnPlacement) -> BoxFuture<'a, Result<()>> {
        async move {
            if let Some(cols) = self
                .state
                .lock()
                .unwrap()
                .tables
                .get_mut(&allocation.physical_table_name)
            {
                cols.retain(|c| c != &placement.physical_column_name);
            }
            Ok(())
        }
        .boxed()
    }

    fn add_index<'a>(&'a self, _allocation: &'a Allocation, index: &'a Index) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state.lock().unwrap().indexes.insert(index.name.clone());
            Ok(())
        }
        .boxed()
    }

    fn drop_index<'a>(&'a self, _allocation: &'a Allocation, index: &'a Index) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state.lock().unwrap().indexes.remove(&index.name);
            Ok(())
        }
        .boxed()
    }

    fn update_column_type<'a>(
        &'a self,
        _placement: &'a ColumnPlacement,
        _new_type: &'a Type,
        _old_type: &'a Type,
    ) -> BoxFuture<'a, Result<()>> {
        async move { Ok(()) }.boxed()
    }

    fn truncate<'a>(&'a self, allocation: &'a Allocation) -> BoxFuture<'a, Result<()>> {
        async move {
            if !self
                .state
                .lock()
                .unwrap()
                .tables
                .contains_key(&allocation.physical_table_name)
            {
                return Err(PolyplaneError::NotFound {
                    entity_kind: "Table",
                    key: allocation.physical_table_name.clone(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn scan<'a>(&'a self, plan: &'a RelNode) -> BoxFuture<'a, Result<String>> {
        async move { Ok(plan.digest()) }.boxed()
    }

    fn prepare<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<bool>> {
        async move {
            if self.fail_prepare {
                return Ok(false);
            }
            self.state.lock().unwrap().prepared.insert(xid);
            Ok(true)
        }
        .boxed()
    }

    fn commit<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state.lock().unwrap().committed.insert(xid);
            Ok(())
        }
        .boxed()
    }

    fn rollback<'a>(&'a self, xid: TransactionId) -> BoxFuture<'a, Result<()>> {
        async move {
            self.state.lock().unwrap().rolled_back.insert(xid);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_column(id: i64, table_id: i64, name: &str) -> Column {
        Column {
            id: CatalogId(id),
            name: name.to_string(),
            table_id: CatalogId(table_id),
            position: 1,
            type_json: "{}".to_string(),
            length: None,
            scale: None,
            nullable: false,
            collation: None,
        }
    }

    #[tokio::test]
    async fn drop_column_finds_the_table_created_under_the_same_physical_name() {
        let adapter = InMemoryAdapter::new(CatalogId(1));
        let allocation = Allocation {
            store_id: CatalogId(1),
            physical_schema_name: "public".to_string(),
            physical_table_name: "employee".to_string(),
        };
        let table = Table {
            id: CatalogId(10),
            name: "employee".to_string(),
            schema_id: CatalogId(1),
            owner_id: CatalogId(1),
            table_type: "TABLE".to_string(),
            definition: None,
            primary_key_id: None,
        };
        let columns = vec![dummy_column(100, 10, "empid"), dummy_column(101, 10, "ename")];
        adapter.create_table(&table, &allocation, &columns).await.unwrap();

        let placement = ColumnPlacement {
            store_id: CatalogId(1),
            column_id: CatalogId(101),
            physical_schema_name: "public".to_string(),
            physical_column_name: "ename".to_string(),
            placement_type: "AUTOMATIC".to_string(),
        };
        adapter.drop_column(&allocation, &placement).await.unwrap();

        let remaining = adapter.state.lock().unwrap().tables.get("employee").cloned().unwrap();
        assert_eq!(remaining, vec!["empid".to_string()]);
    }

    #[tokio::test]
    async fn add_index_then_drop_index_round_trips() {
        let adapter = InMemoryAdapter::new(CatalogId(1));
        let allocation = Allocation {
            store_id: CatalogId(1),
            physical_schema_name: "public".to_string(),
            physical_table_name: "employee".to_string(),
        };
        let index = Index {
            id: CatalogId(5),
            key_id: CatalogId(2),
            name: "ix_employee_empid".to_string(),
            index_type: "BTREE".to_string(),
            is_unique: true,
            location: CatalogId(1),
        };
        adapter.add_index(&allocation, &index).await.unwrap();
        assert!(adapter.has_index("ix_employee_empid"));
        adapter.drop_index(&allocation, &index).await.unwrap();
        assert!(!adapter.has_index("ix_employee_empid"));
    }
}
