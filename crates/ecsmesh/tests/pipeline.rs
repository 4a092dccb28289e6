//! End-to-end reconciliation scenarios: environment configuration through
//! discovery, matching, diffing, and snapshot publication, against the
//! in-memory inventory.

use std::collections::HashMap;
use std::sync::Arc;

use ecsmesh::config::Config;
use ecsmesh::reconcile::{CycleOutcome, Reconciler};
use ecsmesh_cache::{Cache, ShardedCache, Snapshot};
use ecsmesh_core::{NodeHash, TypeUrl};
use ecsmesh_discovery::{
    ContainerRecord, DeploymentRecord, Ec2Instance, PortBinding, ServiceRecord, StaticInventory,
    TaskRecord,
};
use ecsmesh_types::core::socket_address::PortSpecifier;
use ecsmesh_types::core::{address, Address};
use ecsmesh_types::endpoint::lb_endpoint::HostIdentifier;
use ecsmesh_types::route::route::Action;
use ecsmesh_types::route::route_action::ClusterSpecifier;
use ecsmesh_types::route::route_match::PathSpecifier;
use ecsmesh_types::{Cluster, ClusterLoadAssignment, Listener, RouteConfiguration};

const LOCAL_IP: &str = "10.0.0.5";

fn config(vars: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(move |key| map.get(key).cloned()).expect("config")
}

fn add_service(
    inventory: &StaticInventory,
    cluster: &str,
    arn: &str,
    name: &str,
    deployments: &[(&str, &str, &str)],
) {
    inventory.upsert_service(
        cluster,
        ServiceRecord {
            service_arn: arn.into(),
            service_name: name.into(),
            cluster_arn: format!("arn:cluster:{cluster}"),
            status: "ACTIVE".into(),
            launch_type: "EC2".into(),
            deployments: deployments
                .iter()
                .map(|(id, status, task_definition)| DeploymentRecord {
                    id: id.to_string(),
                    status: status.to_string(),
                    task_definition_arn: task_definition.to_string(),
                    launch_type: "EC2".into(),
                })
                .collect(),
        },
    );
}

fn add_task(
    inventory: &StaticInventory,
    cluster: &str,
    task_arn: &str,
    task_definition: &str,
    container_instance: &str,
    containers: &[(&str, u32, u32)],
) {
    inventory.upsert_task(
        cluster,
        TaskRecord {
            task_arn: task_arn.into(),
            task_definition_arn: task_definition.into(),
            container_instance_arn: Some(container_instance.into()),
            launch_type: "EC2".into(),
            last_status: "RUNNING".into(),
            containers: containers
                .iter()
                .map(|(name, container_port, host_port)| ContainerRecord {
                    container_arn: format!("{task_arn}:{name}"),
                    name: name.to_string(),
                    runtime_id: None,
                    network_bindings: vec![PortBinding {
                        bind_ip: Some("0.0.0.0".into()),
                        container_port: *container_port,
                        host_port: *host_port,
                        protocol: "tcp".into(),
                    }],
                })
                .collect(),
        },
    );
}

fn add_host(inventory: &StaticInventory, cluster: &str, container_instance: &str, ip: &str) {
    let instance_id = format!("i-{ip}");
    inventory.insert_container_instance(cluster, container_instance, &instance_id);
    inventory.insert_ec2_instance(Ec2Instance {
        instance_id,
        private_ip: Some(ip.into()),
        subnet_id: Some("subnet-1".into()),
        ..Default::default()
    });
}

fn reconciler(inventory: StaticInventory, config: Config) -> Reconciler<StaticInventory> {
    Reconciler::new(inventory, config, LOCAL_IP.into(), Arc::new(ShardedCache::new()))
}

fn snapshot_of(reconciler: &Reconciler<StaticInventory>) -> Arc<Snapshot> {
    reconciler
        .cache()
        .get_snapshot(NodeHash::from_id("test-envoy"))
        .expect("published snapshot")
}

fn clusters_of(snapshot: &Snapshot) -> Vec<Cluster> {
    resources_of(snapshot, TypeUrl::CLUSTER)
}

fn load_assignments_of(snapshot: &Snapshot) -> Vec<ClusterLoadAssignment> {
    resources_of(snapshot, TypeUrl::ENDPOINT)
}

fn routes_of(snapshot: &Snapshot) -> Vec<RouteConfiguration> {
    resources_of(snapshot, TypeUrl::ROUTE)
}

fn listeners_of(snapshot: &Snapshot) -> Vec<Listener> {
    resources_of(snapshot, TypeUrl::LISTENER)
}

fn resources_of<T: Clone + 'static>(snapshot: &Snapshot, type_url: &str) -> Vec<T> {
    snapshot
        .get_resources(&TypeUrl::new(type_url))
        .map(|set| {
            set.to_vec()
                .iter()
                .map(|resource| {
                    resource
                        .as_any()
                        .downcast_ref::<T>()
                        .expect("resource type")
                        .clone()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn socket_of(address: &Address) -> (String, u32) {
    let address::Address::SocketAddress(socket) =
        address.address.as_ref().expect("address kind");
    let port = match &socket.port_specifier {
        Some(PortSpecifier::PortValue(port)) => *port,
        _ => 0,
    };
    (socket.address.clone(), port)
}

fn endpoints_of(assignment: &ClusterLoadAssignment) -> Vec<(String, u32)> {
    assignment
        .endpoints
        .iter()
        .flat_map(|locality| &locality.lb_endpoints)
        .filter_map(|endpoint| match &endpoint.host_identifier {
            Some(HostIdentifier::Endpoint(endpoint)) => {
                endpoint.address.as_ref().map(socket_of)
            }
            None => None,
        })
        .collect()
}

fn route_pairs(route_config: &RouteConfiguration) -> Vec<(String, String)> {
    route_config
        .virtual_hosts
        .iter()
        .flat_map(|vh| &vh.routes)
        .map(|route| {
            let Some(PathSpecifier::Prefix(prefix)) = route
                .r#match
                .as_ref()
                .and_then(|m| m.path_specifier.as_ref())
            else {
                panic!("route without prefix match");
            };
            let Some(Action::Route(action)) = &route.action else {
                panic!("route without forward action");
            };
            let Some(ClusterSpecifier::Cluster(cluster)) = &action.cluster_specifier else {
                panic!("route without cluster target");
            };
            (prefix.clone(), cluster.clone())
        })
        .collect()
}

// Scenario: one egress ref, one running task.
#[tokio::test]
async fn single_egress_single_task() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-a", "svc-a", &[("dep-1", "PRIMARY", "arn:td-a:1")]);
    add_task(&inventory, "c1", "arn:task-1", "arn:td-a:1", "arn:ci-1", &[("web", 5000, 32001)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    let outcome = reconciler.run_cycle().await.expect("cycle");
    assert!(matches!(outcome, CycleOutcome::Published { .. }));

    let snapshot = snapshot_of(&reconciler);

    let clusters = clusters_of(&snapshot);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].name, "svc-a");

    let assignments = load_assignments_of(&snapshot);
    assert_eq!(assignments.len(), 1);
    assert_eq!(endpoints_of(&assignments[0]), [("10.0.0.7".to_string(), 32001)]);

    let routes = routes_of(&snapshot);
    assert_eq!(routes.len(), 1);
    assert_eq!(route_pairs(&routes[0]), [("/a".to_string(), "svc-a".to_string())]);

    let listeners = listeners_of(&snapshot);
    assert_eq!(listeners.len(), 1);
    let (bind_ip, port) = socket_of(listeners[0].address.as_ref().expect("address"));
    assert_eq!((bind_ip.as_str(), port), ("0.0.0.0", 8080));
}

// Scenario: ingress filtering keeps only tasks on this host.
#[tokio::test]
async fn ingress_filters_to_local_host() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-b", "svc-b", &[("dep-1", "PRIMARY", "arn:td-b:1")]);
    add_task(&inventory, "c1", "arn:task-1", "arn:td-b:1", "arn:ci-local", &[("web", 8000, 32011)]);
    add_task(&inventory, "c1", "arn:task-2", "arn:td-b:1", "arn:ci-remote", &[("web", 8000, 32012)]);
    add_host(&inventory, "c1", "arn:ci-local", LOCAL_IP);
    add_host(&inventory, "c1", "arn:ci-remote", "10.0.0.6");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("CURRENT_SERVICE_ARN", "arn:svc-b"),
            ("TASK_NAME_1", "web"),
            ("TASK_PATH_1", "/"),
            ("INGRESS_LISTEN_PORT", "9000"),
        ]),
    );

    reconciler.run_cycle().await.expect("cycle");
    let snapshot = snapshot_of(&reconciler);

    let assignments = load_assignments_of(&snapshot);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].cluster_name, "svc-b");
    assert_eq!(endpoints_of(&assignments[0]), [(LOCAL_IP.to_string(), 32011)]);

    let listeners = listeners_of(&snapshot);
    assert_eq!(listeners.len(), 1);
    let (_, port) = socket_of(listeners[0].address.as_ref().expect("address"));
    assert_eq!(port, 9000);
}

// Scenario: a ref omitting the container port, matched against a service
// exposing two ports, claims nothing; other refs are unaffected.
#[tokio::test]
async fn ambiguous_ref_claims_nothing() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-a", "svc-a", &[("dep-1", "PRIMARY", "arn:td-a:1")]);
    add_task(
        &inventory,
        "c1",
        "arn:task-1",
        "arn:td-a:1",
        "arn:ci-1",
        &[("web", 5000, 32001), ("metrics", 5001, 32002)],
    );
    add_service(&inventory, "c1", "arn:svc-c", "svc-c", &[("dep-2", "PRIMARY", "arn:td-c:1")]);
    add_task(&inventory, "c1", "arn:task-2", "arn:td-c:1", "arn:ci-1", &[("api", 7000, 32003)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("SERVICE_ARN_2", "arn:svc-c"),
            ("SERVICE_PATH_2", "/c"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    reconciler.run_cycle().await.expect("cycle");
    let snapshot = snapshot_of(&reconciler);

    let clusters = clusters_of(&snapshot);
    assert_eq!(clusters.len(), 1, "ambiguous svc-a must not be claimed");
    assert_eq!(clusters[0].name, "svc-c");

    let routes = routes_of(&snapshot);
    assert_eq!(route_pairs(&routes[0]), [("/c".to_string(), "svc-c".to_string())]);
}

// Scenario: a host-port change between cycles re-publishes with the new
// endpoint and a higher version.
#[tokio::test]
async fn diff_across_cycles_republishes() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-a", "svc-a", &[("dep-1", "PRIMARY", "arn:td-a:1")]);
    add_task(&inventory, "c1", "arn:task-a", "arn:td-a:1", "arn:ci-1", &[("web", 5000, 32001)]);
    add_task(&inventory, "c1", "arn:task-b", "arn:td-a:1", "arn:ci-2", &[("web", 5000, 32002)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");
    add_host(&inventory, "c1", "arn:ci-2", "10.0.0.8");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    let first = reconciler.run_cycle().await.expect("cycle 1");
    let CycleOutcome::Published { version: v1 } = first else {
        panic!("expected publication");
    };

    // Task B restarts on a new host port.
    add_task(reconciler.inventory(), "c1", "arn:task-b", "arn:td-a:1", "arn:ci-2", &[("web", 5000, 32003)]);

    let second = reconciler.run_cycle().await.expect("cycle 2");
    let CycleOutcome::Published { version: v2 } = second else {
        panic!("expected publication");
    };
    assert!(v1 < v2, "versions must increase lexicographically");

    let snapshot = snapshot_of(&reconciler);
    assert_eq!(snapshot.version(), v2);
    let assignments = load_assignments_of(&snapshot);
    let mut endpoints = endpoints_of(&assignments[0]);
    endpoints.sort();
    assert_eq!(
        endpoints,
        [("10.0.0.7".to_string(), 32001), ("10.0.0.8".to_string(), 32003)]
    );
}

// Scenario: a transient inventory failure keeps the previous snapshot.
#[tokio::test]
async fn transient_failure_retains_previous_snapshot() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-a", "svc-a", &[("dep-1", "PRIMARY", "arn:td-a:1")]);
    add_task(&inventory, "c1", "arn:task-1", "arn:td-a:1", "arn:ci-1", &[("web", 5000, 32001)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    let CycleOutcome::Published { version: v1 } =
        reconciler.run_cycle().await.expect("cycle 1")
    else {
        panic!("expected publication");
    };

    reconciler.inventory().fail_operation("DescribeTasks");
    let error = reconciler.run_cycle().await.expect_err("cycle 2 fails");
    assert!(!error.is_fatal());
    assert_eq!(snapshot_of(&reconciler).version(), v1, "previous snapshot stays");

    reconciler.inventory().clear_failure();
    let CycleOutcome::Published { version: v3 } =
        reconciler.run_cycle().await.expect("cycle 3")
    else {
        panic!("expected publication");
    };
    assert!(v1 < v3);
}

// Scenario: ACTIVE and PRIMARY deployments of one service both contribute
// endpoints to the same cluster.
#[tokio::test]
async fn multi_deployment_fan_out() {
    let inventory = StaticInventory::new();
    add_service(
        &inventory,
        "c1",
        "arn:svc-a",
        "svc-a",
        &[
            ("dep-old", "ACTIVE", "arn:td-a:1"),
            ("dep-new", "PRIMARY", "arn:td-a:2"),
        ],
    );
    add_task(&inventory, "c1", "arn:task-old", "arn:td-a:1", "arn:ci-1", &[("web", 5000, 32001)]);
    add_task(&inventory, "c1", "arn:task-new", "arn:td-a:2", "arn:ci-2", &[("web", 5000, 32002)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");
    add_host(&inventory, "c1", "arn:ci-2", "10.0.0.8");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    reconciler.run_cycle().await.expect("cycle");
    let snapshot = snapshot_of(&reconciler);

    let clusters = clusters_of(&snapshot);
    assert_eq!(clusters.len(), 1);

    let mut endpoints = endpoints_of(&load_assignments_of(&snapshot)[0]);
    endpoints.sort();
    assert_eq!(
        endpoints,
        [("10.0.0.7".to_string(), 32001), ("10.0.0.8".to_string(), 32002)]
    );
}

// Boundary: an empty inventory publishes a valid empty snapshot under the
// default policy and suppresses under the explicit one.
#[tokio::test]
async fn empty_cycle_policies() {
    let publish_config = config(&[
        ("CLUSTER", "c1"),
        ("SERVICE_ARN_1", "arn:svc-a"),
        ("SERVICE_PATH_1", "/a"),
        ("EGRESS_LISTEN_PORT", "8080"),
    ]);
    let mut publishing = reconciler(StaticInventory::new(), publish_config);
    let outcome = publishing.run_cycle().await.expect("cycle");
    assert!(matches!(outcome, CycleOutcome::Published { .. }));
    let snapshot = snapshot_of(&publishing);
    assert!(clusters_of(&snapshot).is_empty());
    // The listener still exists; it simply has no routes.
    assert_eq!(listeners_of(&snapshot).len(), 1);
    assert!(route_pairs(&routes_of(&snapshot)[0]).is_empty());

    let suppress_config = config(&[
        ("CLUSTER", "c1"),
        ("SERVICE_ARN_1", "arn:svc-a"),
        ("SERVICE_PATH_1", "/a"),
        ("EGRESS_LISTEN_PORT", "8080"),
        ("ON_EMPTY", "suppress"),
    ]);
    let mut suppressing = reconciler(StaticInventory::new(), suppress_config);
    let outcome = suppressing.run_cycle().await.expect("cycle");
    assert_eq!(outcome, CycleOutcome::Suppressed);
    assert!(suppressing
        .cache()
        .get_snapshot(NodeHash::from_id("test-envoy"))
        .is_none());
}

// Versions increase lexicographically across many cycles.
#[tokio::test]
async fn versions_strictly_increase() {
    let inventory = StaticInventory::new();
    add_service(&inventory, "c1", "arn:svc-a", "svc-a", &[("dep-1", "PRIMARY", "arn:td-a:1")]);
    add_task(&inventory, "c1", "arn:task-1", "arn:td-a:1", "arn:ci-1", &[("web", 5000, 32001)]);
    add_host(&inventory, "c1", "arn:ci-1", "10.0.0.7");

    let mut reconciler = reconciler(
        inventory,
        config(&[
            ("CLUSTER", "c1"),
            ("SERVICE_ARN_1", "arn:svc-a"),
            ("SERVICE_PATH_1", "/a"),
            ("EGRESS_LISTEN_PORT", "8080"),
        ]),
    );

    let mut versions = Vec::new();
    for _ in 0..12 {
        let CycleOutcome::Published { version } = reconciler.run_cycle().await.expect("cycle")
        else {
            panic!("expected publication");
        };
        versions.push(version);
    }
    for pair in versions.windows(2) {
        assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
    }
    assert_eq!(reconciler.current_version(), 12);
}
