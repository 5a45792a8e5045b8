//! The in-memory bookkeeping backing [`super::Coordinator`]: per-transaction state,
//! enlisted adapters, and a cancellation flag (§4.6, §5). Owned by one coordinator
//! instance — not a process-global table.

use super::TransactionId;
use crate::adapter::AdapterDriver;
use crate::error::{PolyplaneError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Active,
    Preparing,
    Prepared,
    Committed,
    RollingBack,
    RolledBack,
}

struct Entry {
    status: TxnStatus,
    participants: Vec<Arc<dyn AdapterDriver>>,
    read_only: bool,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<TransactionId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, xid: TransactionId, read_only: bool) {
        self.entries.lock().unwrap().insert(
            xid,
            Entry {
                status: TxnStatus::Active,
                participants: Vec::new(),
                read_only,
                cancelled: Arc::new(AtomicBool::new(false)),
            },
        );
    }

    /// Enlist `adapter` the first time it is touched within `xid`. Append-only and
    /// deduplicated by store id (§4.6).
    pub fn register_involved_adapter(&self, xid: TransactionId, adapter: Arc<dyn AdapterDriver>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&xid)
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))?;
        if !entry.participants.iter().any(|p| p.store_id() == adapter.store_id()) {
            entry.participants.push(adapter);
        }
        Ok(())
    }

    pub fn participants(&self, xid: TransactionId) -> Result<Vec<Arc<dyn AdapterDriver>>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&xid)
            .map(|e| e.participants.clone())
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))
    }

    pub fn is_read_only(&self, xid: TransactionId) -> Result<bool> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&xid)
            .map(|e| e.read_only)
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))
    }

    pub fn set_status(&self, xid: TransactionId, status: TxnStatus) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&xid)
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))?;
        entry.status = status;
        Ok(())
    }

    pub fn status(&self, xid: TransactionId) -> Result<TxnStatus> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&xid)
            .map(|e| e.status)
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))
    }

    /// A cancellation flag polled at scan boundaries and at the start of each rule
    /// invocation (§5). Setting it triggers rollback.
    pub fn cancellation_token(&self, xid: TransactionId) -> Result<Arc<AtomicBool>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&xid)
            .map(|e| e.cancelled.clone())
            .ok_or_else(|| PolyplaneError::TransactionConflict(xid.to_string()))
    }

    pub fn cancel(&self, xid: TransactionId) -> Result<()> {
        let token = self.cancellation_token(xid)?;
        token.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_cancelled(&self, xid: TransactionId) -> bool {
        self.cancellation_token(xid)
            .map(|t| t.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn remove(&self, xid: TransactionId) {
        self.entries.lock().unwrap().remove(&xid);
    }
}
