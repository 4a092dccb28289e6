//! # ecsmesh-cache
//!
//! The snapshot cache sitting between the reconciler and the xDS streams.
//!
//! - [`Snapshot`] - an immutable, versioned bundle of resources grouped by
//!   type URL
//! - [`ShardedCache`] - snapshots keyed by node hash with watch
//!   notifications on update
//! - [`Watch`] - a subscription a serving stream holds to learn about new
//!   snapshots without polling
//!
//! Publication is the single synchronization point of the whole process: the
//! reconciler installs a complete snapshot, and every concurrent stream
//! observes either the previous snapshot or the new one, never a mix.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod snapshot;
mod stats;
mod watch;

pub use cache::{Cache, ShardedCache};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotResources};
pub use stats::CacheStats;
pub use watch::{Watch, WatchId, WatchManager};
