//! The live [`ClusterInventory`] over the AWS SDK.
//!
//! All batching limits live here: DescribeServices takes at most 10 ARNs,
//! DescribeTasks and DescribeContainerInstances 100, and DescribeInstances
//! is held to 20 per call to keep responses bounded. ListTasks is paginated
//! by the SDK's paginator.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_ecs::types::DesiredStatus;
use tracing::debug;

use ecsmesh_core::{MeshError, Result};

use crate::inventory::{
    ClusterInventory, ContainerRecord, DeploymentRecord, Ec2Instance, PortBinding, ServiceRecord,
    TaskRecord,
};

const DESCRIBE_SERVICES_BATCH: usize = 10;
const DESCRIBE_TASKS_BATCH: usize = 100;
const DESCRIBE_CONTAINER_INSTANCES_BATCH: usize = 100;
const DESCRIBE_INSTANCES_BATCH: usize = 20;

/// ECS/EC2 inventory backed by the official SDK clients.
#[derive(Debug, Clone)]
pub struct AwsInventory {
    ecs: aws_sdk_ecs::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsInventory {
    /// Build clients from the ambient AWS configuration (environment,
    /// profile, or instance role).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            ecs: aws_sdk_ecs::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
        }
    }
}

#[async_trait]
impl ClusterInventory for AwsInventory {
    async fn describe_services(
        &self,
        cluster: &str,
        service_arns: &[String],
    ) -> Result<Vec<ServiceRecord>> {
        let mut records = Vec::new();
        for batch in service_arns.chunks(DESCRIBE_SERVICES_BATCH) {
            debug!(cluster, services = batch.len(), "DescribeServices");
            let response = self
                .ecs
                .describe_services()
                .cluster(cluster)
                .set_services(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| MeshError::inventory("DescribeServices", e))?;

            for service in response.services() {
                // DRAINING and INACTIVE services have no routable tasks.
                if service.status() != Some("ACTIVE") {
                    continue;
                }
                records.push(ServiceRecord {
                    service_arn: service.service_arn().unwrap_or_default().to_string(),
                    service_name: service.service_name().unwrap_or_default().to_string(),
                    cluster_arn: service.cluster_arn().unwrap_or_default().to_string(),
                    status: "ACTIVE".to_string(),
                    launch_type: service
                        .launch_type()
                        .map(|l| l.as_str().to_string())
                        .unwrap_or_default(),
                    deployments: service
                        .deployments()
                        .iter()
                        .map(|deployment| DeploymentRecord {
                            id: deployment.id().unwrap_or_default().to_string(),
                            status: deployment.status().unwrap_or_default().to_string(),
                            task_definition_arn: deployment
                                .task_definition()
                                .unwrap_or_default()
                                .to_string(),
                            launch_type: deployment
                                .launch_type()
                                .map(|l| l.as_str().to_string())
                                .unwrap_or_default(),
                        })
                        .collect(),
                });
            }
        }
        Ok(records)
    }

    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut pages = self
            .ecs
            .list_tasks()
            .cluster(cluster)
            .desired_status(DesiredStatus::Running)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| MeshError::inventory("ListTasks", e))?;
            arns.extend(page.task_arns().iter().cloned());
        }
        debug!(cluster, tasks = arns.len(), "ListTasks");
        Ok(arns)
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<TaskRecord>> {
        let mut records = Vec::new();
        for batch in task_arns.chunks(DESCRIBE_TASKS_BATCH) {
            debug!(cluster, tasks = batch.len(), "DescribeTasks");
            let response = self
                .ecs
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| MeshError::inventory("DescribeTasks", e))?;

            for task in response.tasks() {
                records.push(TaskRecord {
                    task_arn: task.task_arn().unwrap_or_default().to_string(),
                    task_definition_arn: task
                        .task_definition_arn()
                        .unwrap_or_default()
                        .to_string(),
                    container_instance_arn: task
                        .container_instance_arn()
                        .map(str::to_string),
                    launch_type: task
                        .launch_type()
                        .map(|l| l.as_str().to_string())
                        .unwrap_or_default(),
                    last_status: task.last_status().unwrap_or_default().to_string(),
                    containers: task
                        .containers()
                        .iter()
                        .map(|container| ContainerRecord {
                            container_arn: container
                                .container_arn()
                                .unwrap_or_default()
                                .to_string(),
                            name: container.name().unwrap_or_default().to_string(),
                            runtime_id: container.runtime_id().map(str::to_string),
                            network_bindings: container
                                .network_bindings()
                                .iter()
                                .filter_map(|binding| {
                                    let container_port =
                                        u32::try_from(binding.container_port()?).ok()?;
                                    let host_port = u32::try_from(binding.host_port()?).ok()?;
                                    Some(PortBinding {
                                        bind_ip: binding.bind_ip().map(str::to_string),
                                        container_port,
                                        host_port,
                                        protocol: binding
                                            .protocol()
                                            .map(|p| p.as_str().to_string())
                                            .unwrap_or_else(|| "tcp".to_string()),
                                    })
                                })
                                .collect(),
                        })
                        .collect(),
                });
            }
        }
        Ok(records)
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        container_instance_arns: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut mapping = HashMap::new();
        for batch in container_instance_arns.chunks(DESCRIBE_CONTAINER_INSTANCES_BATCH) {
            debug!(cluster, instances = batch.len(), "DescribeContainerInstances");
            let response = self
                .ecs
                .describe_container_instances()
                .cluster(cluster)
                .set_container_instances(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| MeshError::inventory("DescribeContainerInstances", e))?;

            for instance in response.container_instances() {
                if let (Some(arn), Some(id)) =
                    (instance.container_instance_arn(), instance.ec2_instance_id())
                {
                    mapping.insert(arn.to_string(), id.to_string());
                }
            }
        }
        Ok(mapping)
    }

    async fn describe_ec2_instances(&self, instance_ids: &[String]) -> Result<Vec<Ec2Instance>> {
        let mut records = Vec::new();
        for batch in instance_ids.chunks(DESCRIBE_INSTANCES_BATCH) {
            debug!(instances = batch.len(), "DescribeInstances");
            let response = self
                .ec2
                .describe_instances()
                .set_instance_ids(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| MeshError::inventory("DescribeInstances", e))?;

            for reservation in response.reservations() {
                for instance in reservation.instances() {
                    records.push(Ec2Instance {
                        instance_id: instance.instance_id().unwrap_or_default().to_string(),
                        private_ip: instance.private_ip_address().map(str::to_string),
                        public_ip: instance.public_ip_address().map(str::to_string),
                        private_dns: instance.private_dns_name().map(str::to_string),
                        public_dns: instance.public_dns_name().map(str::to_string),
                        subnet_id: instance.subnet_id().map(str::to_string),
                    });
                }
            }
        }
        Ok(records)
    }
}
