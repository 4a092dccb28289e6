//! Envoy node identification.
//!
//! Snapshots are cached per Envoy node. The node's declared `id` is used
//! verbatim as the identity and hashed with FNV-1a for cheap lookup. The
//! wildcard hash holds a snapshot that serves any node without one of its
//! own, which is the common case for a one-Envoy-per-host sidecar where the
//! node id is not known to the reconciler ahead of time.

use std::fmt;
use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

/// Hash-based node identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHash {
    hash: u64,
    is_wildcard: bool,
}

impl NodeHash {
    const WILDCARD_HASH: u64 = 0;

    /// Hash a node id string.
    #[must_use]
    pub fn from_id(node_id: &str) -> Self {
        let mut hasher = FnvHasher::default();
        node_id.hash(&mut hasher);
        let hash = hasher.finish();

        // Zero is reserved for the wildcard.
        let hash = if hash == Self::WILDCARD_HASH {
            hash.wrapping_add(1)
        } else {
            hash
        };

        Self {
            hash,
            is_wildcard: false,
        }
    }

    /// The wildcard identity: a snapshot stored under it answers requests
    /// from any node that has no dedicated snapshot.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            hash: Self::WILDCARD_HASH,
            is_wildcard: true,
        }
    }

    /// Whether this is the wildcard identity.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    /// Raw hash value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.hash
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard {
            write!(f, "<wildcard>")
        } else {
            write!(f, "{:016x}", self.hash)
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        Self::wildcard()
    }
}
