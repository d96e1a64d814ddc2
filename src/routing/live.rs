//! Hot-swappable handle to the active routing table.
//!
//! # Design Decisions
//! - Single writer (reload coordinator), many lock-free readers
//! - Readers take one `Arc` snapshot per request and keep it until done
//! - Replacement is one pointer swap: no reader sees a half-built table

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::table::RoutingTable;

/// Shared, atomically replaceable routing table.
#[derive(Debug, Clone)]
pub struct LiveTable {
    inner: Arc<ArcSwap<RoutingTable>>,
}

impl LiveTable {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// Take a consistent snapshot of the current table.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.inner.load_full()
    }

    /// Install a new table, returning the one it replaced.
    pub fn swap(&self, table: RoutingTable) -> Arc<RoutingTable> {
        self.inner.swap(Arc::new(table))
    }
}

impl Default for LiveTable {
    fn default() -> Self {
        Self::new(RoutingTable::default())
    }
}
