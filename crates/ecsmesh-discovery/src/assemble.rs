//! Endpoint assembly: correlating inventory into complete [`TaskPort`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use ecsmesh_core::{MeshError, Result};

use crate::inventory::{ClusterInventory, DeploymentRecord, ServiceRecord, TaskRecord};
use crate::path_ref::PathRef;
use crate::task_port::TaskPort;

/// Transient collation of one ECS service while its tasks are attached.
#[derive(Debug)]
struct ServiceBuilder {
    service_arn: String,
    service_name: String,
    cluster_name: String,
    cluster_arn: String,
    /// Non-INACTIVE deployments keyed by task-definition ARN; tasks find
    /// their owning service through this map.
    task_definitions: HashMap<String, DeploymentRecord>,
}

impl ServiceBuilder {
    fn from_record(cluster: &str, record: &ServiceRecord) -> Self {
        let mut task_definitions = HashMap::new();
        for deployment in &record.deployments {
            // INACTIVE deployments no longer own running tasks.
            if deployment.status == "INACTIVE" {
                continue;
            }
            task_definitions.insert(deployment.task_definition_arn.clone(), deployment.clone());
        }
        Self {
            service_arn: record.service_arn.clone(),
            service_name: record.service_name.clone(),
            cluster_name: cluster.to_string(),
            cluster_arn: record.cluster_arn.clone(),
            task_definitions,
        }
    }
}

/// Discover every task port backing the configured refs.
///
/// Refs are grouped by cluster and service ARNs deduplicated before any
/// inventory call is made. The returned ports all satisfy the completeness
/// invariant; anything the proxy could not reach is dropped here.
pub async fn assemble(
    inventory: &dyn ClusterInventory,
    refs: &[PathRef],
) -> Result<Vec<TaskPort>> {
    let mut arns_by_cluster: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for path_ref in refs {
        arns_by_cluster
            .entry(path_ref.cluster.as_str())
            .or_default()
            .insert(path_ref.service_arn.as_str());
    }

    let mut ports = Vec::new();
    for (cluster, arns) in arns_by_cluster {
        let arns: Vec<String> = arns.into_iter().map(String::from).collect();
        ports.extend(assemble_cluster(inventory, cluster, &arns).await?);
    }

    populate_ec2(inventory, &mut ports).await?;

    let before = ports.len();
    ports.retain(|port| {
        if port.is_complete() {
            true
        } else {
            debug!(port = %port.describe(), "dropping incomplete task port");
            false
        }
    });
    if ports.len() < before {
        debug!(dropped = before - ports.len(), "incomplete task ports dropped");
    }

    Ok(ports)
}

/// Assemble one cluster: services, then running tasks, then bindings.
async fn assemble_cluster(
    inventory: &dyn ClusterInventory,
    cluster: &str,
    service_arns: &[String],
) -> Result<Vec<TaskPort>> {
    debug!(cluster, services = service_arns.len(), "loading services");
    let services = inventory.describe_services(cluster, service_arns).await?;

    let builders: Vec<ServiceBuilder> = services
        .iter()
        .filter(|s| s.status == "ACTIVE")
        .map(|s| ServiceBuilder::from_record(cluster, s))
        .collect();
    if builders.is_empty() {
        return Ok(Vec::new());
    }

    // Task -> service correlation goes through the task-definition ARN, so
    // one ARN claimed by two services would mis-attribute tasks. The ref
    // list was deduplicated above; hitting this means a logic defect.
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for builder in &builders {
        for task_definition in builder.task_definitions.keys() {
            if let Some(previous) = owners.insert(task_definition, &builder.service_arn) {
                return Err(MeshError::invariant(format!(
                    "task definition {task_definition} is deployed by both {previous} and {}",
                    builder.service_arn,
                )));
            }
        }
    }

    let task_arns = inventory.list_running_tasks(cluster).await?;
    if task_arns.is_empty() {
        return Ok(Vec::new());
    }
    let tasks = inventory.describe_tasks(cluster, &task_arns).await?;

    let mut ports = Vec::new();
    for task in &tasks {
        if task.last_status != "RUNNING" {
            continue;
        }
        let Some(builder) = builders
            .iter()
            .find(|b| b.task_definitions.contains_key(&task.task_definition_arn))
        else {
            // Task belongs to a service nobody configured a ref for.
            continue;
        };
        ports.extend(task_ports_for(builder, task));
    }

    debug!(cluster, ports = ports.len(), "assembled task ports");
    Ok(ports)
}

/// One TaskPort per container network binding of a task.
fn task_ports_for(builder: &ServiceBuilder, task: &TaskRecord) -> Vec<TaskPort> {
    let deployment_id = builder
        .task_definitions
        .get(&task.task_definition_arn)
        .map(|d| d.id.clone());

    let mut ports = Vec::new();
    for container in &task.containers {
        // A container with no bindings exposes nothing to route to.
        for binding in &container.network_bindings {
            ports.push(TaskPort {
                ref_id: None,
                proxy_path: None,
                service_arn: builder.service_arn.clone(),
                service_name: builder.service_name.clone(),
                cluster_name: builder.cluster_name.clone(),
                cluster_arn: builder.cluster_arn.clone(),
                task_arn: task.task_arn.clone(),
                container_arn: container.container_arn.clone(),
                container_name: container.name.clone(),
                runtime_id: container.runtime_id.clone(),
                container_instance_arn: task.container_instance_arn.clone().unwrap_or_default(),
                launch_type: task.launch_type.clone(),
                task_definition_arn: task.task_definition_arn.clone(),
                deployment_id: deployment_id.clone(),
                bind_ip: binding.bind_ip.clone(),
                container_port: binding.container_port,
                host_port: binding.host_port,
                protocol: binding.protocol.clone(),
                ec2: None,
            });
        }
    }
    ports
}

/// Resolve container instances to EC2 records and stitch them onto the
/// assembled ports.
async fn populate_ec2(inventory: &dyn ClusterInventory, ports: &mut [TaskPort]) -> Result<()> {
    if ports.is_empty() {
        return Ok(());
    }

    let mut arns_by_cluster: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for port in ports.iter() {
        if !port.container_instance_arn.is_empty() {
            arns_by_cluster
                .entry(port.cluster_name.as_str())
                .or_default()
                .insert(port.container_instance_arn.as_str());
        }
    }

    let mut arn_to_instance_id: HashMap<String, String> = HashMap::new();
    for (cluster, arns) in arns_by_cluster {
        let arns: Vec<String> = arns.into_iter().map(String::from).collect();
        arn_to_instance_id.extend(
            inventory
                .describe_container_instances(cluster, &arns)
                .await?,
        );
    }

    let instance_ids: BTreeSet<&String> = arn_to_instance_id.values().collect();
    let instance_ids: Vec<String> = instance_ids.into_iter().cloned().collect();
    let instances = inventory.describe_ec2_instances(&instance_ids).await?;
    let instances_by_id: HashMap<&str, _> = instances
        .iter()
        .map(|i| (i.instance_id.as_str(), i))
        .collect();

    let mut unresolved = 0usize;
    for port in ports.iter_mut() {
        let instance = arn_to_instance_id
            .get(&port.container_instance_arn)
            .and_then(|id| instances_by_id.get(id.as_str()));
        match instance {
            Some(instance) => port.ec2 = Some((*instance).clone()),
            None => unresolved += 1,
        }
    }
    if unresolved > 0 {
        warn!(unresolved, "task ports without a resolvable EC2 instance");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{
        ContainerRecord, Ec2Instance, PortBinding, ServiceRecord, StaticInventory,
    };

    fn fixture() -> StaticInventory {
        let inventory = StaticInventory::new();
        inventory.upsert_service(
            "c1",
            ServiceRecord {
                service_arn: "arn:svc-a".into(),
                service_name: "svc-a".into(),
                cluster_arn: "arn:cluster:c1".into(),
                status: "ACTIVE".into(),
                launch_type: "EC2".into(),
                deployments: vec![DeploymentRecord {
                    id: "dep-1".into(),
                    status: "PRIMARY".into(),
                    task_definition_arn: "arn:td-a:1".into(),
                    launch_type: "EC2".into(),
                }],
            },
        );
        inventory.upsert_task(
            "c1",
            TaskRecord {
                task_arn: "arn:task-1".into(),
                task_definition_arn: "arn:td-a:1".into(),
                container_instance_arn: Some("arn:ci-1".into()),
                launch_type: "EC2".into(),
                last_status: "RUNNING".into(),
                containers: vec![ContainerRecord {
                    container_arn: "arn:container-1".into(),
                    name: "web".into(),
                    runtime_id: Some("abc123".into()),
                    network_bindings: vec![PortBinding {
                        bind_ip: Some("0.0.0.0".into()),
                        container_port: 5000,
                        host_port: 32001,
                        protocol: "tcp".into(),
                    }],
                }],
            },
        );
        inventory.insert_container_instance("c1", "arn:ci-1", "i-1");
        inventory.insert_ec2_instance(Ec2Instance {
            instance_id: "i-1".into(),
            private_ip: Some("10.0.0.7".into()),
            subnet_id: Some("subnet-1".into()),
            ..Default::default()
        });
        inventory
    }

    fn refs() -> Vec<PathRef> {
        vec![PathRef::new("arn:svc-a", "/a", None, None, "c1")]
    }

    #[tokio::test]
    async fn assembles_complete_ports() {
        let inventory = fixture();
        let ports = assemble(&inventory, &refs()).await.expect("assemble");

        assert_eq!(ports.len(), 1);
        let port = &ports[0];
        assert_eq!(port.service_name, "svc-a");
        assert_eq!(port.container_port, 5000);
        assert_eq!(port.host_port, 32001);
        assert_eq!(port.deployment_id.as_deref(), Some("dep-1"));
        assert_eq!(port.private_ip(), Some("10.0.0.7"));
        assert!(port.is_complete());
    }

    #[tokio::test]
    async fn container_without_bindings_is_dropped() {
        let inventory = fixture();
        inventory.upsert_task(
            "c1",
            TaskRecord {
                task_arn: "arn:task-2".into(),
                task_definition_arn: "arn:td-a:1".into(),
                container_instance_arn: Some("arn:ci-1".into()),
                launch_type: "EC2".into(),
                last_status: "RUNNING".into(),
                containers: vec![ContainerRecord {
                    container_arn: "arn:container-2".into(),
                    name: "sidecar".into(),
                    runtime_id: None,
                    network_bindings: vec![],
                }],
            },
        );

        let ports = assemble(&inventory, &refs()).await.expect("assemble");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].task_arn, "arn:task-1");
    }

    #[tokio::test]
    async fn missing_ec2_record_drops_port() {
        let inventory = fixture();
        // A second task on a host we cannot resolve.
        inventory.upsert_task(
            "c1",
            TaskRecord {
                task_arn: "arn:task-3".into(),
                task_definition_arn: "arn:td-a:1".into(),
                container_instance_arn: Some("arn:ci-unknown".into()),
                launch_type: "EC2".into(),
                last_status: "RUNNING".into(),
                containers: vec![ContainerRecord {
                    container_arn: "arn:container-3".into(),
                    name: "web".into(),
                    runtime_id: None,
                    network_bindings: vec![PortBinding {
                        bind_ip: None,
                        container_port: 5000,
                        host_port: 32002,
                        protocol: "tcp".into(),
                    }],
                }],
            },
        );

        let ports = assemble(&inventory, &refs()).await.expect("assemble");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].task_arn, "arn:task-1");
    }

    #[tokio::test]
    async fn unconfigured_service_tasks_are_ignored() {
        let inventory = fixture();
        inventory.upsert_task(
            "c1",
            TaskRecord {
                task_arn: "arn:task-other".into(),
                task_definition_arn: "arn:td-other:1".into(),
                container_instance_arn: Some("arn:ci-1".into()),
                launch_type: "EC2".into(),
                last_status: "RUNNING".into(),
                containers: vec![ContainerRecord {
                    container_arn: "arn:container-x".into(),
                    name: "web".into(),
                    runtime_id: None,
                    network_bindings: vec![PortBinding {
                        bind_ip: None,
                        container_port: 80,
                        host_port: 32099,
                        protocol: "tcp".into(),
                    }],
                }],
            },
        );

        let ports = assemble(&inventory, &refs()).await.expect("assemble");
        assert_eq!(ports.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_task_definition_across_services_is_fatal() {
        let inventory = fixture();
        inventory.upsert_service(
            "c1",
            ServiceRecord {
                service_arn: "arn:svc-b".into(),
                service_name: "svc-b".into(),
                cluster_arn: "arn:cluster:c1".into(),
                status: "ACTIVE".into(),
                launch_type: "EC2".into(),
                deployments: vec![DeploymentRecord {
                    id: "dep-2".into(),
                    status: "ACTIVE".into(),
                    // Same task definition as svc-a's deployment.
                    task_definition_arn: "arn:td-a:1".into(),
                    launch_type: "EC2".into(),
                }],
            },
        );

        let mut refs = refs();
        refs.push(PathRef::new("arn:svc-b", "/b", None, None, "c1"));
        let err = assemble(&inventory, &refs).await.expect_err("invariant");
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn inactive_deployments_do_not_own_tasks() {
        let inventory = fixture();
        inventory.upsert_service(
            "c1",
            ServiceRecord {
                service_arn: "arn:svc-a".into(),
                service_name: "svc-a".into(),
                cluster_arn: "arn:cluster:c1".into(),
                status: "ACTIVE".into(),
                launch_type: "EC2".into(),
                deployments: vec![DeploymentRecord {
                    id: "dep-1".into(),
                    status: "INACTIVE".into(),
                    task_definition_arn: "arn:td-a:1".into(),
                    launch_type: "EC2".into(),
                }],
            },
        );

        let ports = assemble(&inventory, &refs()).await.expect("assemble");
        assert!(ports.is_empty());
    }
}
