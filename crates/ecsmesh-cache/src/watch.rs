//! Watch subscriptions for snapshot updates.
//!
//! Serving streams hold a [`Watch`] so a freshly published snapshot reaches
//! connected clients without waiting for them to send another request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use ecsmesh_core::{MeshError, NodeHash};

use crate::snapshot::Snapshot;

/// Unique identifier of a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A subscription receiving snapshot updates for one node.
#[derive(Debug)]
pub struct Watch {
    id: WatchId,
    node: NodeHash,
    receiver: mpsc::Receiver<Arc<Snapshot>>,
}

impl Watch {
    /// This watch's identifier.
    #[inline]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// The node this watch is subscribed for.
    #[inline]
    pub fn node(&self) -> NodeHash {
        self.node
    }

    /// Receive the next snapshot; `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.recv().await
    }
}

#[derive(Debug, Clone)]
struct WatchSender {
    id: WatchId,
    sender: mpsc::Sender<Arc<Snapshot>>,
}

impl WatchSender {
    /// Non-blocking send. A full channel drops this update; the receiver
    /// will catch up from the next one, and SotW responses carry the whole
    /// set anyway.
    fn try_send(&self, snapshot: Arc<Snapshot>) -> Result<(), MeshError> {
        match self.sender.try_send(snapshot) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(watch_id = %self.id, "watch channel full, skipping update");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MeshError::WatchClosed {
                watch_id: self.id.0,
            }),
        }
    }
}

/// Tracks and notifies watch subscriptions.
#[derive(Debug)]
pub struct WatchManager {
    watches: std::sync::Mutex<HashMap<NodeHash, Vec<WatchSender>>>,
    channel_buffer: usize,
}

impl Default for WatchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchManager {
    /// Create a manager with the default channel depth.
    pub fn new() -> Self {
        Self {
            watches: std::sync::Mutex::new(HashMap::new()),
            channel_buffer: 16,
        }
    }

    /// Subscribe to updates for a node.
    pub fn create_watch(&self, node: NodeHash) -> Watch {
        let id = WatchId::next();
        let (sender, receiver) = mpsc::channel(self.channel_buffer);

        {
            let mut watches = self.watches.lock().expect("watch lock poisoned");
            watches
                .entry(node)
                .or_default()
                .push(WatchSender { id, sender });
        }

        debug!(watch_id = %id, node = %node, "created watch");
        Watch { id, node, receiver }
    }

    /// Drop a subscription.
    pub fn cancel_watch(&self, watch_id: WatchId) {
        let mut watches = self.watches.lock().expect("watch lock poisoned");
        for senders in watches.values_mut() {
            if let Some(pos) = senders.iter().position(|s| s.id == watch_id) {
                senders.swap_remove(pos);
                debug!(watch_id = %watch_id, "cancelled watch");
                return;
            }
        }
    }

    /// Notify the watches of one node.
    pub fn notify(&self, node: NodeHash, snapshot: Arc<Snapshot>) {
        let senders: Vec<WatchSender> = {
            let watches = self.watches.lock().expect("watch lock poisoned");
            watches.get(&node).cloned().unwrap_or_default()
        };
        self.dispatch(node, senders, snapshot);
    }

    /// Notify every watch regardless of node. Used for wildcard snapshots,
    /// which serve all nodes without a dedicated snapshot.
    pub fn notify_all(&self, snapshot: Arc<Snapshot>) {
        let senders: Vec<WatchSender> = {
            let watches = self.watches.lock().expect("watch lock poisoned");
            watches.values().flatten().cloned().collect()
        };
        self.dispatch(NodeHash::wildcard(), senders, snapshot);
    }

    fn dispatch(&self, node: NodeHash, senders: Vec<WatchSender>, snapshot: Arc<Snapshot>) {
        if senders.is_empty() {
            return;
        }

        let mut closed = Vec::new();
        for sender in &senders {
            if let Err(MeshError::WatchClosed { watch_id }) =
                sender.try_send(Arc::clone(&snapshot))
            {
                closed.push(WatchId(watch_id));
            }
        }

        if !closed.is_empty() {
            let mut watches = self.watches.lock().expect("watch lock poisoned");
            for senders in watches.values_mut() {
                senders.retain(|s| !closed.contains(&s.id));
            }
            debug!(count = closed.len(), "removed closed watches");
        }

        trace!(
            node = %node,
            notified = senders.len() - closed.len(),
            "notified watches"
        );
    }

    /// Number of live watches for a node.
    pub fn watch_count(&self, node: NodeHash) -> usize {
        let watches = self.watches.lock().expect("watch lock poisoned");
        watches.get(&node).map(Vec::len).unwrap_or(0)
    }
}
