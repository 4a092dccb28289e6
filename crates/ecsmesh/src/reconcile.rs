//! The polling reconciliation loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ecsmesh_cache::ShardedCache;
use ecsmesh_core::{NodeHash, Result, VersionSequence};
use ecsmesh_discovery::{assemble, claim, find_diffs, ClusterInventory, TaskPort, TaskPortDiff};

use crate::config::{Config, EmptyPolicy};
use crate::xds::{build_resources, publish};

/// Ceiling for the failure backoff. Successful cycles return to the
/// configured interval immediately.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What one reconciliation cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A snapshot was published under the given version.
    Published {
        /// The minted version string.
        version: String,
    },
    /// Zero endpoints and the suppress policy: previous snapshot retained.
    Suppressed,
}

/// Drives assemble -> match -> diff -> build -> publish on a fixed
/// interval.
///
/// The reconciler is the only writer of the "previous endpoint sets" and of
/// the cache; one cycle runs at a time, and the next does not start until
/// the previous one finished plus the wait interval, so no locking guards
/// the previous sets.
#[derive(Debug)]
pub struct Reconciler<I> {
    inventory: I,
    config: Config,
    local_ip: String,
    cache: Arc<ShardedCache>,
    node: NodeHash,
    versions: VersionSequence,
    previous_egress: Vec<TaskPort>,
    previous_ingress: Vec<TaskPort>,
}

impl<I: ClusterInventory> Reconciler<I> {
    /// Build a reconciler publishing into `cache`.
    pub fn new(inventory: I, config: Config, local_ip: String, cache: Arc<ShardedCache>) -> Self {
        let node = match config.node_id.as_deref() {
            Some(id) => NodeHash::from_id(id),
            None => NodeHash::wildcard(),
        };
        Self {
            inventory,
            config,
            local_ip,
            cache,
            node,
            versions: VersionSequence::new(),
            previous_egress: Vec::new(),
            previous_ingress: Vec::new(),
        }
    }

    /// Run one cycle. On error nothing is published and the previous
    /// endpoint sets are untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let assembled = assemble(&self.inventory, &self.config.all_refs()).await?;

        let egress = claim(&self.config.egress, &assembled, None);
        let ingress = claim(&self.config.ingress, &assembled, Some(&self.local_ip));

        let egress_diff = find_diffs(&self.previous_egress, &egress);
        let ingress_diff = find_diffs(&self.previous_ingress, &ingress);
        log_diff("egress", &egress_diff);
        log_diff("ingress", &ingress_diff);

        if egress.is_empty()
            && ingress.is_empty()
            && self.config.on_empty == EmptyPolicy::Suppress
        {
            debug!("zero endpoints discovered; publication suppressed by policy");
            return Ok(CycleOutcome::Suppressed);
        }

        let version = self.versions.next();
        let resources = build_resources(
            &egress,
            &ingress,
            &self.config.envoy,
            self.versions.current(),
        )?;
        publish(&self.cache, self.node, &version, resources)?;

        self.previous_egress = egress;
        self.previous_ingress = ingress;

        if !egress_diff.is_empty() || !ingress_diff.is_empty() {
            info!(version = %version, "topology changed, snapshot published");
        }
        Ok(CycleOutcome::Published { version })
    }

    /// Run cycles until `shutdown` resolves. Recoverable errors keep the
    /// previous snapshot and back the interval off; invariant violations
    /// propagate and terminate the process.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        let base = self.config.wait_time;
        let mut wait = base;

        info!(
            egress_refs = self.config.egress.len(),
            ingress_refs = self.config.ingress.len(),
            interval = ?base,
            node = %self.node,
            "reconciler started"
        );

        loop {
            match self.run_cycle().await {
                Ok(_) => wait = base,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!(%error, "reconciliation failed; previous snapshot retained");
                    wait = (wait * 2).min(MAX_BACKOFF);
                }
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!("reconciler stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Numeric value of the last minted version.
    pub fn current_version(&self) -> u64 {
        self.versions.current()
    }

    /// The inventory this reconciler discovers from.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// The cache this reconciler publishes into.
    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }
}

fn log_diff(side: &str, diff: &TaskPortDiff) {
    if diff.is_empty() {
        return;
    }
    debug!(
        side,
        added = diff.added.len(),
        removed = diff.removed.len(),
        "endpoint delta"
    );
    for port in &diff.added {
        debug!(side, port = %port.describe(), "endpoint added");
    }
    for port in &diff.removed {
        debug!(side, port = %port.describe(), "endpoint removed");
    }
}
