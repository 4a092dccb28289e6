//! Snapshot version minting.
//!
//! xDS clients compare version strings for equality, but the reconciler's
//! contract is stronger: versions published on one node must be strictly
//! increasing, lexicographically. A counter rendered as zero-padded decimal
//! satisfies that ("00000000000000000009" < "00000000000000000010"), where a
//! bare decimal rendering would not ("10" < "9").

use std::sync::atomic::{AtomicU64, Ordering};

/// A process-lifetime source of strictly increasing version strings.
#[derive(Debug, Default)]
pub struct VersionSequence {
    counter: AtomicU64,
}

impl VersionSequence {
    /// Create a sequence starting at version 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next version string.
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        render(n)
    }

    /// The numeric value of the most recently minted version, 0 if none.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Render a counter value as a fixed-width version string. u64::MAX has 20
/// decimal digits, so 20 columns never truncate.
pub(crate) fn render(n: u64) -> String {
    format!("{n:020}")
}
