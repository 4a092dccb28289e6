//! Converting claimed task ports into Envoy resources and publishing them.
//!
//! Snapshots are always rebuilt from the full current endpoint set; the
//! differ's output never feeds this module. Groupings and orderings are all
//! deterministic, so the same endpoint set yields the same resources
//! whatever order discovery returned them in.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use ecsmesh_types::Message;

use ecsmesh_cache::{Cache, ShardedCache, Snapshot};
use ecsmesh_core::{BoxResource, MeshError, NodeHash, Result, TypeUrl};
use ecsmesh_discovery::TaskPort;
use ecsmesh_types::cluster::cluster::{ClusterDiscoveryType, ClusterProtocolSelection, DiscoveryType};
use ecsmesh_types::core::{Address, Http1ProtocolOptions, Http2ProtocolOptions};
use ecsmesh_types::endpoint::{LbEndpoint, LocalityLbEndpoints};
use ecsmesh_types::http_connection_manager::http_connection_manager::{CodecType, RouteSpecifier};
use ecsmesh_types::http_connection_manager::{HttpConnectionManager, HttpFilter};
use ecsmesh_types::listener::{filter::ConfigType, Filter, FilterChain};
use ecsmesh_types::route::{Route, VirtualHost};
use ecsmesh_types::{
    filter_names, Cluster, ClusterLoadAssignment, Listener, RouteConfiguration,
    HTTP_CONNECTION_MANAGER_TYPE_URL,
};

use crate::config::EnvoyConfig;

const CONNECT_TIMEOUT_SECONDS: i64 = 5;
const ANY_ADDRESS: &str = "0.0.0.0";

/// Task ports grouped under one upstream cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCluster {
    /// Cluster name; the ECS service name.
    pub name: String,
    /// Distinct path prefixes routed to this cluster, sorted.
    pub paths: Vec<String>,
    /// Distinct `(private ip, host port)` endpoints, sorted.
    pub endpoints: Vec<(String, u32)>,
    /// Restrict the upstream to HTTP/1.
    pub http1_only: bool,
}

/// Group claimed task ports by service into clusters.
///
/// Several refs can land on the same service (multiple paths), and every
/// ref fans out over deployments and instances, so both paths and endpoints
/// are sets here.
pub fn group_service_clusters(ports: &[TaskPort]) -> Vec<ServiceCluster> {
    let mut groups: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<(&str, u32)>)> = BTreeMap::new();
    for port in ports {
        let (Some(path), Some(ip)) = (port.proxy_path.as_deref(), port.private_ip()) else {
            // Unclaimed or incomplete ports never reach the builder.
            continue;
        };
        let group = groups.entry(port.service_name.as_str()).or_default();
        group.0.insert(path);
        group.1.insert((ip, port.host_port));
    }

    groups
        .into_iter()
        .map(|(name, (paths, endpoints))| ServiceCluster {
            name: name.to_string(),
            paths: paths.into_iter().map(String::from).collect(),
            endpoints: endpoints
                .into_iter()
                .map(|(ip, port)| (ip.to_string(), port))
                .collect(),
            http1_only: false,
        })
        .collect()
}

/// The load assignment backing one service cluster.
pub fn make_load_assignment(cluster: &ServiceCluster) -> ClusterLoadAssignment {
    ClusterLoadAssignment {
        cluster_name: cluster.name.clone(),
        endpoints: vec![LocalityLbEndpoints {
            lb_endpoints: cluster
                .endpoints
                .iter()
                .map(|(ip, port)| LbEndpoint::socket(ip.clone(), *port))
                .collect(),
        }],
    }
}

/// A STATIC cluster with its endpoints inlined.
pub fn make_cluster(cluster: &ServiceCluster) -> Cluster {
    Cluster {
        name: cluster.name.clone(),
        cluster_discovery_type: Some(ClusterDiscoveryType::Type(DiscoveryType::Static as i32)),
        connect_timeout: Some(prost_types::Duration {
            seconds: CONNECT_TIMEOUT_SECONDS,
            nanos: 0,
        }),
        http_protocol_options: Some(Http1ProtocolOptions {}),
        http2_protocol_options: (!cluster.http1_only).then_some(Http2ProtocolOptions {}),
        protocol_selection: ClusterProtocolSelection::UseConfiguredProtocol as i32,
        load_assignment: Some(make_load_assignment(cluster)),
    }
}

/// The routing table for one listener: one prefix route per (cluster, path).
///
/// `validate_clusters` makes Envoy reject any snapshot whose routes point at
/// a cluster missing from the same snapshot.
pub fn make_route_config(name: &str, clusters: &[ServiceCluster]) -> RouteConfiguration {
    let routes = clusters
        .iter()
        .flat_map(|cluster| {
            cluster
                .paths
                .iter()
                .map(|path| Route::prefix_to_cluster(path.clone(), cluster.name.clone()))
        })
        .collect();

    RouteConfiguration {
        name: name.to_string(),
        validate_clusters: Some(true),
        virtual_hosts: vec![VirtualHost {
            name: name.to_string(),
            domains: vec!["*".to_string()],
            routes,
        }],
    }
}

/// An HTTP listener on `0.0.0.0:port` routing to `clusters`.
///
/// The name embeds the port and the snapshot index, so successive snapshots
/// swap listeners add-then-remove and no window exists where the port is
/// unserved.
pub fn make_listener(port: u32, index: u64, clusters: &[ServiceCluster]) -> Listener {
    let route_config = make_route_config(&format!("route-{port}-{index}"), clusters);
    let manager = HttpConnectionManager {
        codec_type: CodecType::Auto as i32,
        stat_prefix: "http".to_string(),
        route_specifier: Some(RouteSpecifier::RouteConfig(route_config)),
        http_filters: vec![HttpFilter {
            name: filter_names::ROUTER.to_string(),
        }],
    };

    Listener {
        name: format!("service-http-{port}-{index}"),
        address: Some(Address::socket(ANY_ADDRESS, port)),
        filter_chains: vec![FilterChain {
            filters: vec![Filter {
                name: filter_names::HTTP_CONNECTION_MANAGER.to_string(),
                config_type: Some(ConfigType::TypedConfig(prost_types::Any {
                    type_url: HTTP_CONNECTION_MANAGER_TYPE_URL.to_string(),
                    value: manager.encode_to_vec(),
                })),
            }],
        }],
    }
}

/// The four resource lists of one snapshot.
#[derive(Debug, Default)]
pub struct BuiltResources {
    /// CDS payload.
    pub clusters: Vec<Cluster>,
    /// EDS payload.
    pub endpoints: Vec<ClusterLoadAssignment>,
    /// RDS payload.
    pub routes: Vec<RouteConfiguration>,
    /// LDS payload.
    pub listeners: Vec<Listener>,
}

/// Build the full resource graph from the current claimed sets.
///
/// Egress and ingress are grouped separately (their endpoint sets differ:
/// ingress is filtered to this host) but publish into one snapshot, so a
/// service referenced by both sides would collide on cluster name; that is
/// rejected here as a publish-level error rather than shipped for Envoy to
/// NACK.
pub fn build_resources(
    egress: &[TaskPort],
    ingress: &[TaskPort],
    envoy: &EnvoyConfig,
    index: u64,
) -> Result<BuiltResources> {
    let egress_clusters = group_service_clusters(egress);
    let ingress_clusters = group_service_clusters(ingress);

    let mut built = BuiltResources::default();
    let mut seen = HashSet::new();
    for cluster in egress_clusters.iter().chain(ingress_clusters.iter()) {
        if !seen.insert(cluster.name.clone()) {
            return Err(MeshError::Publish(format!(
                "cluster name `{}` appears on both the egress and ingress side",
                cluster.name
            )));
        }
        built.clusters.push(make_cluster(cluster));
        built.endpoints.push(make_load_assignment(cluster));
    }

    if envoy.egress_port != 0 {
        built
            .routes
            .push(make_route_config(&format!("route-{}-{index}", envoy.egress_port), &egress_clusters));
        built
            .listeners
            .push(make_listener(envoy.egress_port, index, &egress_clusters));
    }
    if envoy.ingress_port != 0 {
        built.routes.push(make_route_config(
            &format!("route-{}-{index}", envoy.ingress_port),
            &ingress_clusters,
        ));
        built
            .listeners
            .push(make_listener(envoy.ingress_port, index, &ingress_clusters));
    }

    Ok(built)
}

/// Validate and publish one snapshot to the cache.
///
/// This is the single synchronization point between the reconciler and the
/// xDS streams: all four resource lists land atomically under one version.
pub fn publish(
    cache: &ShardedCache,
    node: NodeHash,
    version: &str,
    resources: BuiltResources,
) -> Result<()> {
    let mut names = HashSet::new();
    for cluster in &resources.clusters {
        if !names.insert(cluster.name.clone()) {
            return Err(MeshError::Publish(format!(
                "duplicate cluster name `{}` in snapshot",
                cluster.name
            )));
        }
    }

    let mut ports = HashSet::new();
    for listener in &resources.listeners {
        if let Some(port) = listener.address.as_ref().and_then(listener_port) {
            if !ports.insert(port) {
                return Err(MeshError::Publish(format!(
                    "two listeners bind port {port} in one snapshot"
                )));
            }
        }
    }

    let snapshot = Snapshot::builder()
        .version(version)
        .resources(
            TypeUrl::new(TypeUrl::CLUSTER),
            resources
                .clusters
                .into_iter()
                .map(|resource| Arc::new(resource) as BoxResource),
        )
        .resources(
            TypeUrl::new(TypeUrl::ENDPOINT),
            resources
                .endpoints
                .into_iter()
                .map(|resource| Arc::new(resource) as BoxResource),
        )
        .resources(
            TypeUrl::new(TypeUrl::ROUTE),
            resources
                .routes
                .into_iter()
                .map(|resource| Arc::new(resource) as BoxResource),
        )
        .resources(
            TypeUrl::new(TypeUrl::LISTENER),
            resources
                .listeners
                .into_iter()
                .map(|resource| Arc::new(resource) as BoxResource),
        )
        .build();

    cache.set_snapshot(node, snapshot);
    Ok(())
}

fn listener_port(address: &Address) -> Option<u32> {
    let ecsmesh_types::core::address::Address::SocketAddress(socket) =
        address.address.as_ref()?;
    match socket.port_specifier.as_ref()? {
        ecsmesh_types::core::socket_address::PortSpecifier::PortValue(port) => Some(*port),
        _ => None,
    }
}
