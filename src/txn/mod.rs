//! Two-phase-commit transaction coordinator (C6, §4.6). Assigns a distributed
//! transaction id per session, enlists adapters on first touch, drives 2PC or
//! unanimous rollback, and rolls back catalog changes atomically with data changes.

pub mod registry;

use crate::adapter::AdapterDriver;
use crate::catalog::CatalogTxn;
use crate::error::{PolyplaneError, Result};
use registry::{Registry, TxnStatus};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A 128-bit value, opaque to adapters, stable for the transaction's lifetime and
/// included in every adapter call for correlation (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drives 2PC over the adapters enlisted in one transaction plus the catalog's own
/// transaction handle. Holds no global state of its own beyond its [`Registry`] — a
/// session creates one `Coordinator` and shares it across concurrent queries.
#[derive(Default)]
pub struct Coordinator {
    registry: Registry,
}

impl Coordinator {
    pub fn new() -> Self {
        Self { registry: Registry::new() }
    }

    /// Begin a new distributed transaction. Read-only transactions skip the prepare
    /// round and commit immediately (§4.6).
    pub fn begin(&self, read_only: bool) -> TransactionId {
        let xid = TransactionId::new();
        self.registry.begin(xid, read_only);
        xid
    }

    pub fn register_involved_adapter(&self, xid: TransactionId, adapter: Arc<dyn AdapterDriver>) -> Result<()> {
        self.registry.register_involved_adapter(xid, adapter)
    }

    pub fn cancel(&self, xid: TransactionId) -> Result<()> {
        self.registry.cancel(xid)
    }

    pub fn is_cancelled(&self, xid: TransactionId) -> bool {
        self.registry.is_cancelled(xid)
    }

    pub fn status(&self, xid: TransactionId) -> Result<TxnStatus> {
        self.registry.status(xid)
    }

    /// Drive 2PC to completion: `catalog.prepare()` (satisfied implicitly by holding
    /// the catalog transaction open) then each adapter's `prepare(xid)`; if every
    /// participant agrees, `catalog.commit()` then each adapter's `commit(xid)`. If
    /// any prepare fails, every participant is rolled back and the commit fails
    /// (§4.6, §8 scenario 6).
    pub async fn commit(&self, xid: TransactionId, catalog_txn: CatalogTxn<'_>) -> Result<()> {
        if self.is_cancelled(xid) {
            let _ = catalog_txn.rollback().await;
            self.rollback_participants(xid).await;
            self.registry.remove(xid);
            return Err(PolyplaneError::Cancelled);
        }

        if self.registry.is_read_only(xid)? {
            catalog_txn.commit().await?;
            self.registry.remove(xid);
            return Ok(());
        }

        let participants = self.registry.participants(xid)?;
        if participants.is_empty() {
            catalog_txn.commit().await?;
            self.registry.remove(xid);
            return Ok(());
        }

        self.registry.set_status(xid, TxnStatus::Preparing)?;
        let mut failed_adapter: Option<String> = None;
        for adapter in &participants {
            match adapter.prepare(xid).await {
                Ok(true) => {}
                Ok(false) => {
                    failed_adapter = Some(adapter.store_id().to_string());
                    break;
                }
                Err(_) => {
                    failed_adapter = Some(adapter.store_id().to_string());
                    break;
                }
            }
        }

        if let Some(adapter_name) = failed_adapter {
            warn!(%xid, adapter = %adapter_name, "prepare failed, rolling back transaction");
            self.registry.set_status(xid, TxnStatus::RollingBack)?;
            self.rollback_participants(xid).await;
            let _ = catalog_txn.rollback().await;
            self.registry.set_status(xid, TxnStatus::RolledBack)?;
            self.registry.remove(xid);
            return Err(PolyplaneError::PrepareFailed {
                adapter: adapter_name,
                xid: xid.to_string(),
            });
        }

        self.registry.set_status(xid, TxnStatus::Prepared)?;
        catalog_txn.commit().await?;
        for adapter in &participants {
            adapter.commit(xid).await?;
        }
        self.registry.set_status(xid, TxnStatus::Committed)?;
        info!(%xid, participants = participants.len(), "transaction committed");
        self.registry.remove(xid);
        Ok(())
    }

    /// Roll back every enlisted adapter (best-effort — failures are logged but do not
    /// short-circuit) then the catalog; the transaction is removed from the registry
    /// regardless (§4.6).
    pub async fn rollback(&self, xid: TransactionId, catalog_txn: CatalogTxn<'_>) -> Result<()> {
        self.registry.set_status(xid, TxnStatus::RollingBack).ok();
        self.rollback_participants(xid).await;
        let result = catalog_txn.rollback().await;
        self.registry.set_status(xid, TxnStatus::RolledBack).ok();
        self.registry.remove(xid);
        result
    }

    async fn rollback_participants(&self, xid: TransactionId) {
        let participants = match self.registry.participants(xid) {
            Ok(p) => p,
            Err(_) => return,
        };
        for adapter in &participants {
            if let Err(err) = adapter.rollback(xid).await {
                warn!(%xid, store_id = %adapter.store_id(), error = %err, "adapter rollback failed");
            }
        }
    }

    /// Exposed for tests that need to assert on the cancellation flag directly
    /// without going through `cancel`/`is_cancelled`.
    pub fn cancellation_flag_value(&self, xid: TransactionId) -> bool {
        self.registry
            .cancellation_token(xid)
            .map(|t| t.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
