//! Mapping configured refs onto assembled task ports.

use std::collections::BTreeSet;

use tracing::warn;

use crate::path_ref::PathRef;
use crate::task_port::TaskPort;

/// The task ports one ref claims.
///
/// A ref may claim several ports (multi-deployment and multi-instance
/// fan-out is normal). When the ref leaves container name or port
/// unconstrained and the candidates disagree on the omitted field, the
/// match is ambiguous: it is reported and nothing is claimed, so a
/// mis-scoped ref can never sluice traffic to the wrong container.
pub fn find_matches(path_ref: &PathRef, task_ports: &[TaskPort]) -> Vec<TaskPort> {
    let candidates: Vec<&TaskPort> = task_ports
        .iter()
        .filter(|port| {
            path_ref.service_arn == port.service_arn
                && path_ref.cluster == port.cluster_name
                && path_ref
                    .container_name
                    .as_ref()
                    .is_none_or(|name| *name == port.container_name)
                && path_ref
                    .container_port
                    .is_none_or(|port_number| port_number == port.container_port)
        })
        .collect();

    let mut conflicts: Vec<&str> = Vec::new();
    if path_ref.container_name.is_none() {
        let names: BTreeSet<&str> = candidates
            .iter()
            .map(|p| p.container_name.as_str())
            .collect();
        if names.len() > 1 {
            conflicts.push("container name");
        }
    }
    if path_ref.container_port.is_none() {
        let ports: BTreeSet<u32> = candidates.iter().map(|p| p.container_port).collect();
        if ports.len() > 1 {
            conflicts.push("container port");
        }
    }

    if !conflicts.is_empty() {
        warn!(
            path_ref = %path_ref,
            disagree_on = conflicts.join(", "),
            "conflicting matches; ref claims nothing this cycle"
        );
        for candidate in &candidates {
            warn!(matched = %candidate.describe(), "conflicting candidate");
        }
        return Vec::new();
    }

    candidates
        .into_iter()
        .map(|port| {
            let mut claimed = port.clone();
            claimed.ref_id = Some(path_ref.id().to_string());
            claimed.proxy_path = Some(path_ref.path.clone());
            claimed
        })
        .collect()
}

/// Claim task ports for every ref in a list.
///
/// When `local_ip` is given (ingress), claimed ports on other hosts are
/// dropped after matching.
pub fn claim(refs: &[PathRef], task_ports: &[TaskPort], local_ip: Option<&str>) -> Vec<TaskPort> {
    let mut claimed = Vec::new();
    for path_ref in refs {
        let mut matches = find_matches(path_ref, task_ports);
        if let Some(local_ip) = local_ip {
            matches.retain(|port| port.is_local(local_ip));
        }
        claimed.extend(matches);
    }
    claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Ec2Instance;

    fn port(container: &str, container_port: u32, ip: &str) -> TaskPort {
        TaskPort {
            service_arn: "arn:svc-a".into(),
            service_name: "svc-a".into(),
            cluster_name: "c1".into(),
            task_arn: format!("arn:task-{container}-{container_port}"),
            container_name: container.into(),
            container_instance_arn: "arn:ci-1".into(),
            container_port,
            host_port: container_port + 27000,
            protocol: "tcp".into(),
            ec2: Some(Ec2Instance {
                instance_id: "i-1".into(),
                private_ip: Some(ip.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn claims_all_candidates() {
        let ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5000, "10.0.0.8")];
        let path_ref = PathRef::new("arn:svc-a", "/a", None, None, "c1");

        let claimed = find_matches(&path_ref, &ports);
        assert_eq!(claimed.len(), 2);
        for port in &claimed {
            assert_eq!(port.ref_id.as_deref(), Some(path_ref.id()));
            assert_eq!(port.proxy_path.as_deref(), Some("/a"));
        }
    }

    #[test]
    fn deterministic() {
        let ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5000, "10.0.0.8")];
        let path_ref = PathRef::new("arn:svc-a", "/a", None, None, "c1");
        assert_eq!(
            find_matches(&path_ref, &ports),
            find_matches(&path_ref, &ports)
        );
    }

    #[test]
    fn wrong_service_or_cluster_never_matches() {
        let ports = vec![port("web", 5000, "10.0.0.7")];
        assert!(find_matches(&PathRef::new("arn:svc-b", "/a", None, None, "c1"), &ports).is_empty());
        assert!(find_matches(&PathRef::new("arn:svc-a", "/a", None, None, "c2"), &ports).is_empty());
    }

    #[test]
    fn port_constraint_must_match_exactly() {
        let ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5001, "10.0.0.7")];
        let path_ref = PathRef::new("arn:svc-a", "/a", None, Some(5001), "c1");

        let claimed = find_matches(&path_ref, &ports);
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].container_port, 5001);
    }

    #[test]
    fn omitted_port_with_disagreeing_candidates_is_ambiguous() {
        let ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5001, "10.0.0.7")];
        let path_ref = PathRef::new("arn:svc-a", "/a", None, None, "c1");

        assert!(find_matches(&path_ref, &ports).is_empty());
    }

    #[test]
    fn omitted_name_with_disagreeing_candidates_is_ambiguous() {
        let ports = vec![port("web", 5000, "10.0.0.7"), port("worker", 5000, "10.0.0.7")];
        let path_ref = PathRef::new("arn:svc-a", "/a", None, None, "c1");

        assert!(find_matches(&path_ref, &ports).is_empty());
    }

    #[test]
    fn constrained_field_cannot_be_ambiguous() {
        // Disagreeing ports, but the ref pins the port, so only one matches.
        let ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5001, "10.0.0.7")];
        let path_ref = PathRef::new("arn:svc-a", "/a", Some("web".into()), Some(5000), "c1");

        let claimed = find_matches(&path_ref, &ports);
        assert_eq!(claimed.len(), 1);
    }

    #[test]
    fn ambiguity_spares_other_refs() {
        let mut ports = vec![port("web", 5000, "10.0.0.7"), port("web", 5001, "10.0.0.7")];
        let mut other = port("api", 9000, "10.0.0.9");
        other.service_arn = "arn:svc-b".into();
        other.service_name = "svc-b".into();
        ports.push(other);

        let refs = vec![
            PathRef::new("arn:svc-a", "/a", None, None, "c1"),
            PathRef::new("arn:svc-b", "/b", None, None, "c1"),
        ];
        let claimed = claim(&refs, &ports, None);
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].service_arn, "arn:svc-b");
    }

    #[test]
    fn ingress_filter_keeps_local_only() {
        let ports = vec![port("web", 5000, "10.0.0.5"), port("web", 5000, "10.0.0.6")];
        let refs = vec![PathRef::new("arn:svc-a", "/", Some("web".into()), None, "c1")];

        let claimed = claim(&refs, &ports, Some("10.0.0.5"));
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].private_ip(), Some("10.0.0.5"));
    }
}
