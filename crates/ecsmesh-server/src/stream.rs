//! Per-stream bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ecsmesh_core::NodeHash;

/// Unique identifier of one gRPC stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Mint a fresh id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Metadata for one active discovery stream.
#[derive(Debug)]
pub struct StreamContext {
    id: StreamId,
    node_hash: Option<NodeHash>,
    node_id: Option<String>,
    created_at: Instant,
    requests: AtomicU64,
    responses: AtomicU64,
}

impl StreamContext {
    /// Context for a newly opened stream.
    pub fn new() -> Self {
        Self {
            id: StreamId::new(),
            node_hash: None,
            node_id: None,
            created_at: Instant::now(),
            requests: AtomicU64::new(0),
            responses: AtomicU64::new(0),
        }
    }

    /// The stream id.
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The client's node hash, once identified.
    #[inline]
    pub fn node_hash(&self) -> Option<NodeHash> {
        self.node_hash
    }

    /// The client's node id, once identified.
    #[inline]
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// Record the client identity from its first request.
    pub fn set_node(&mut self, node_id: String, node_hash: NodeHash) {
        self.node_id = Some(node_id);
        self.node_hash = Some(node_hash);
    }

    /// How long the stream has been open.
    pub fn duration(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Count a received request.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a sent response.
    pub fn record_response(&self) {
        self.responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests received so far.
    #[inline]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Responses sent so far.
    #[inline]
    pub fn response_count(&self) -> u64 {
        self.responses.load(Ordering::Relaxed)
    }
}

impl Default for StreamContext {
    fn default() -> Self {
        Self::new()
    }
}
