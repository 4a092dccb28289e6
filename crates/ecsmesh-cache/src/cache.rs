//! The snapshot cache keyed by node hash.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use ecsmesh_core::NodeHash;

use crate::snapshot::Snapshot;
use crate::stats::CacheStats;
use crate::watch::WatchManager;

/// Trait for snapshot caches, mostly useful to keep test doubles honest.
pub trait Cache: Send + Sync {
    /// Get the snapshot serving a node, falling back to the wildcard
    /// snapshot when the node has none of its own.
    fn get_snapshot(&self, node: NodeHash) -> Option<Arc<Snapshot>>;

    /// Install a snapshot for a node and notify its watches. Installing
    /// under the wildcard hash notifies every watch, since the wildcard
    /// snapshot serves all nodes without a dedicated one.
    fn set_snapshot(&self, node: NodeHash, snapshot: Snapshot);

    /// Remove a node's snapshot.
    fn clear_snapshot(&self, node: NodeHash);

    /// Number of stored snapshots.
    fn snapshot_count(&self) -> usize;
}

/// A concurrent snapshot cache over `DashMap`.
///
/// Reads are lock-free from the caller's perspective; the `Ref` guards that
/// DashMap hands out are dropped before anything can await.
#[derive(Debug, Default)]
pub struct ShardedCache {
    snapshots: DashMap<NodeHash, Arc<Snapshot>>,
    watches: WatchManager,
    stats: CacheStats,
}

impl ShardedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The watch manager, for serving streams that subscribe to updates.
    #[inline]
    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Subscribe to snapshot updates for a node.
    #[inline]
    pub fn create_watch(&self, node: NodeHash) -> crate::watch::Watch {
        self.watches.create_watch(node)
    }

    /// Whether a node has a dedicated snapshot.
    pub fn has_snapshot(&self, node: NodeHash) -> bool {
        self.snapshots.contains_key(&node)
    }
}

impl Cache for ShardedCache {
    fn get_snapshot(&self, node: NodeHash) -> Option<Arc<Snapshot>> {
        let found = self
            .snapshots
            .get(&node)
            .or_else(|| self.snapshots.get(&NodeHash::wildcard()))
            .map(|r| Arc::clone(&*r));

        if found.is_some() {
            self.stats.record_hit();
            trace!(node = %node, "cache hit");
        } else {
            self.stats.record_miss();
            trace!(node = %node, "cache miss");
        }

        found
    }

    fn set_snapshot(&self, node: NodeHash, snapshot: Snapshot) {
        let version = snapshot.version().to_string();
        let total = snapshot.total_resources();
        let snapshot = Arc::new(snapshot);

        self.snapshots.insert(node, Arc::clone(&snapshot));
        self.stats.record_set();

        if node.is_wildcard() {
            self.watches.notify_all(snapshot);
        } else {
            self.watches.notify(node, snapshot);
        }

        debug!(node = %node, version = %version, resources = total, "snapshot installed");
    }

    fn clear_snapshot(&self, node: NodeHash) {
        self.snapshots.remove(&node);
        self.stats.record_clear();
        debug!(node = %node, "snapshot cleared");
    }

    fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}
