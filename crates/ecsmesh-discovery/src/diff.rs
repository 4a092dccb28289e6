//! Deltas between successive claimed endpoint sets.

use crate::task_port::TaskPort;

/// The additions and removals between two reconciliation cycles.
///
/// `added` is a subset of the current set, `removed` a subset of the
/// previous set, and the two are disjoint. The delta is for change
/// detection and logging only; snapshots are always rebuilt from the full
/// current set.
#[derive(Debug, Clone, Default)]
pub struct TaskPortDiff {
    /// Ports present now that have no equivalent in the previous set.
    pub added: Vec<TaskPort>,
    /// Ports from the previous set with no equivalent now.
    pub removed: Vec<TaskPort>,
}

impl TaskPortDiff {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Two ports are equivalent when a proxy could not tell them apart: same
/// claiming ref (which already pins service, cluster, container name, and
/// container port) on the same host at the same host port and protocol.
fn equivalent(left: &TaskPort, right: &TaskPort) -> bool {
    left.ref_id == right.ref_id
        && left.container_instance_arn == right.container_instance_arn
        && left.host_port == right.host_port
        && left.protocol == right.protocol
}

/// Compute the delta from `previous` to `current` by two-phase marking:
/// each current port consumes the first equivalent entry from a working
/// copy of the previous set; the residue is `removed`, the unconsumed
/// currents are `added`. Duplicates are matched one-for-one.
pub fn find_diffs(previous: &[TaskPort], current: &[TaskPort]) -> TaskPortDiff {
    let mut remaining: Vec<&TaskPort> = previous.iter().collect();
    let mut added = Vec::new();

    for port in current {
        match remaining.iter().position(|prev| equivalent(prev, port)) {
            Some(index) => {
                remaining.swap_remove(index);
            }
            None => added.push(port.clone()),
        }
    }

    TaskPortDiff {
        added,
        removed: remaining.into_iter().cloned().collect(),
    }
}
