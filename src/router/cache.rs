//! The routed-scan cache (§4.5, §5): an LRU of the joined-scan subtree the router
//! produced for a given placement fingerprint. Access is protected by a lightweight
//! `RwLock`; a hit only needs a shared read followed by an LRU-touch under a brief
//! write lock, a miss inserts under the same write lock. Entries are invalidated
//! wholesale per table id on any catalog mutation touching that table's placements or
//! columns (§4.5: "coarse-grained: drop cache entry on any DDL against the table id").

use super::fingerprint::Fingerprint;
use crate::algebra::rel::RelNode;
use crate::catalog::CatalogId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

struct Entry {
    table_id: CatalogId,
    node: Arc<RelNode>,
}

struct Inner {
    capacity: usize,
    entries: HashMap<Fingerprint, Entry>,
    /// Most-recently-used at the back; eviction pops the front.
    order: VecDeque<Fingerprint>,
}

impl Inner {
    fn touch(&mut self, key: &Fingerprint) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos).unwrap();
            self.order.push_back(key);
        }
    }
}

/// A shared, read-mostly LRU cache of routed scan subtrees keyed by
/// [`Fingerprint`] (§4.5, §5). Cloning shares the underlying store.
#[derive(Clone)]
pub struct PlacementCache {
    inner: Arc<RwLock<Inner>>,
}

impl PlacementCache {
    pub fn new(capacity: usize) -> Self {
        PlacementCache {
            inner: Arc::new(RwLock::new(Inner {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Arc<RelNode>> {
        {
            let guard = self.inner.read().unwrap();
            if let Some(entry) = guard.entries.get(key) {
                let node = entry.node.clone();
                drop(guard);
                self.inner.write().unwrap().touch(key);
                return Some(node);
            }
        }
        None
    }

    pub fn insert(&self, key: Fingerprint, table_id: CatalogId, node: Arc<RelNode>) {
        let mut guard = self.inner.write().unwrap();
        if !guard.entries.contains_key(&key) {
            guard.order.push_back(key.clone());
        } else {
            guard.touch(&key);
        }
        guard.entries.insert(key, Entry { table_id, node });
        while guard.entries.len() > guard.capacity {
            if let Some(oldest) = guard.order.pop_front() {
                guard.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Drop every cached subtree for `table_id` (§4.5: invalidation is coarse-grained
    /// per table, triggered by any DDL touching that table's placements or columns).
    pub fn invalidate_table(&self, table_id: CatalogId) {
        let mut guard = self.inner.write().unwrap();
        let dead: Vec<Fingerprint> = guard
            .entries
            .iter()
            .filter(|(_, e)| e.table_id == table_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in dead {
            guard.entries.remove(&key);
            if let Some(pos) = guard.order.iter().position(|k| k == &key) {
                guard.order.remove(pos);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl crate::catalog::PlacementCacheHandle for PlacementCache {
    fn invalidate_table(&self, table_id: CatalogId) {
        PlacementCache::invalidate_table(self, table_id)
    }
}
