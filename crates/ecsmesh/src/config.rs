//! Environment configuration.
//!
//! Configuration is read once at startup and is a pure function of a key
//! lookup, so tests feed maps instead of mutating the process environment.
//! The egress and ingress ref lists are indexed (`SERVICE_ARN_1`,
//! `SERVICE_ARN_2`, ...) and terminate at the first index whose required
//! variables are missing.

use std::time::Duration;

use tracing::warn;

use ecsmesh_core::{MeshError, Result};
use ecsmesh_discovery::PathRef;

/// What to do when a cycle succeeds but discovers zero endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// Publish a valid empty snapshot, draining every upstream pool.
    #[default]
    Publish,
    /// Keep the previous snapshot and skip publication.
    Suppress,
}

/// Envoy-facing ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvoyConfig {
    /// Port the xDS gRPC server listens on.
    pub admin_port: u16,
    /// Envoy's ingress listener port; 0 disables the ingress listener.
    pub ingress_port: u32,
    /// Envoy's egress listener port; 0 disables the egress listener.
    pub egress_port: u32,
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Egress route targets.
    pub egress: Vec<PathRef>,
    /// Ingress route targets.
    pub ingress: Vec<PathRef>,
    /// Envoy ports.
    pub envoy: EnvoyConfig,
    /// Poll interval between reconciliation cycles.
    pub wait_time: Duration,
    /// Envoy node id keying published snapshots; unset publishes under the
    /// wildcard identity.
    pub node_id: Option<String>,
    /// Zero-endpoint policy.
    pub on_empty: EmptyPolicy,
}

const DEFAULT_ADMIN_PORT: u16 = 9902;
const DEFAULT_WAIT_MS: u64 = 100;

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_cluster = lookup("CLUSTER");

        let egress = read_egress(&lookup, default_cluster.as_deref())?;
        let ingress = read_ingress(&lookup, default_cluster.as_deref())?;

        let envoy = EnvoyConfig {
            admin_port: parse_number(&lookup, "ENVOY_ADMIN_PORT")?.unwrap_or(DEFAULT_ADMIN_PORT),
            ingress_port: parse_number(&lookup, "INGRESS_LISTEN_PORT")?.unwrap_or(0),
            egress_port: parse_number(&lookup, "EGRESS_LISTEN_PORT")?.unwrap_or(0),
        };
        if envoy.ingress_port != 0 && envoy.ingress_port == envoy.egress_port {
            return Err(MeshError::Config(format!(
                "INGRESS_LISTEN_PORT and EGRESS_LISTEN_PORT both bind {}",
                envoy.ingress_port
            )));
        }

        let wait_time = Duration::from_millis(
            parse_number(&lookup, "WAITTIME")?.unwrap_or(DEFAULT_WAIT_MS),
        );

        let on_empty = match lookup("ON_EMPTY").as_deref() {
            None | Some("publish") => EmptyPolicy::Publish,
            Some("suppress") => EmptyPolicy::Suppress,
            Some(other) => {
                return Err(MeshError::Config(format!(
                    "ON_EMPTY must be `publish` or `suppress`, got `{other}`"
                )))
            }
        };

        Ok(Self {
            egress,
            ingress,
            envoy,
            wait_time,
            node_id: lookup("ENVOY_NODE_ID").filter(|id| !id.is_empty()),
            on_empty,
        })
    }

    /// The union of egress and ingress refs, for assembly.
    pub fn all_refs(&self) -> Vec<PathRef> {
        self.egress
            .iter()
            .chain(self.ingress.iter())
            .cloned()
            .collect()
    }
}

/// Egress entries: `SERVICE_ARN_<n>` + `SERVICE_PATH_<n>` + a cluster
/// (per-entry override or the `CLUSTER` default), with optional container
/// name and port constraints.
fn read_egress(
    lookup: &impl Fn(&str) -> Option<String>,
    default_cluster: Option<&str>,
) -> Result<Vec<PathRef>> {
    let mut refs = Vec::new();
    for n in 1.. {
        let arn = lookup(&format!("SERVICE_ARN_{n}"));
        let path = lookup(&format!("SERVICE_PATH_{n}"));
        let cluster = lookup(&format!("SERVICE_CLUSTER_{n}"))
            .or_else(|| default_cluster.map(String::from));

        let (Some(arn), Some(path), Some(cluster)) = (arn, path, cluster) else {
            warn_on_partial_entry("SERVICE", n, lookup);
            break;
        };

        let container = lookup(&format!("SERVICE_CONTAINER_{n}"));
        let port = parse_optional_port(lookup, &format!("SERVICE_PORT_{n}"))?;
        refs.push(PathRef::new(arn, path, container, port, cluster));
    }
    Ok(refs)
}

/// Ingress entries: `TASK_NAME_<n>` + `TASK_PATH_<n>`, all matching against
/// `CURRENT_SERVICE_ARN` in the default cluster. Ingress is disabled when
/// either of those is absent.
fn read_ingress(
    lookup: &impl Fn(&str) -> Option<String>,
    default_cluster: Option<&str>,
) -> Result<Vec<PathRef>> {
    let (Some(service_arn), Some(cluster)) = (lookup("CURRENT_SERVICE_ARN"), default_cluster)
    else {
        return Ok(Vec::new());
    };

    let mut refs = Vec::new();
    for n in 1.. {
        let name = lookup(&format!("TASK_NAME_{n}"));
        let path = lookup(&format!("TASK_PATH_{n}"));
        let (Some(name), Some(path)) = (name, path) else {
            warn_on_partial_entry("TASK", n, lookup);
            break;
        };

        let port = parse_optional_port(lookup, &format!("TASK_PORT_{n}"))?;
        refs.push(PathRef::new(
            service_arn.clone(),
            path,
            Some(name),
            port,
            cluster,
        ));
    }
    Ok(refs)
}

/// The lists terminate silently at a gap, but a half-specified entry at the
/// terminating index is almost certainly a typo worth pointing out.
fn warn_on_partial_entry(prefix: &str, n: u32, lookup: &impl Fn(&str) -> Option<String>) {
    let arn_key = match prefix {
        "SERVICE" => format!("SERVICE_ARN_{n}"),
        _ => format!("TASK_NAME_{n}"),
    };
    let path_key = format!("{prefix}_PATH_{n}");
    if lookup(&arn_key).is_some() != lookup(&path_key).is_some() {
        warn!(index = n, "partially specified {prefix} entry terminates the list");
    }
}

/// Parse an optional numeric variable; absence yields `None`.
fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MeshError::Config(format!("{key} is not a valid number: `{raw}`"))),
    }
}

/// An optional port constraint; 0 or absent means unconstrained.
fn parse_optional_port(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u32>> {
    Ok(parse_number::<u32>(lookup, key)?.filter(|port| *port > 0))
}
