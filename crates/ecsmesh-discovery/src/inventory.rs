//! The cluster-inventory capability and its record types.
//!
//! The assembler talks to ECS/EC2 exclusively through [`ClusterInventory`].
//! Pagination, batching, and status filtering are the provider's problem;
//! callers hand over full ARN lists. [`StaticInventory`] is the in-memory
//! implementation used throughout the test suites.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ecsmesh_core::{MeshError, Result};

/// An ECS service as the assembler needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRecord {
    /// Service ARN.
    pub service_arn: String,
    /// Service name.
    pub service_name: String,
    /// Owning cluster ARN.
    pub cluster_arn: String,
    /// Service status; providers only return `ACTIVE` services.
    pub status: String,
    /// Launch type.
    pub launch_type: String,
    /// Deployments in any status; the assembler filters `INACTIVE` ones.
    pub deployments: Vec<DeploymentRecord>,
}

/// One deployment of a service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentRecord {
    /// Deployment id.
    pub id: String,
    /// Deployment status: `PRIMARY`, `ACTIVE`, or `INACTIVE`.
    pub status: String,
    /// Task definition this deployment rolls out.
    pub task_definition_arn: String,
    /// Launch type.
    pub launch_type: String,
}

/// One ECS task with its containers and port bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    /// Task ARN.
    pub task_arn: String,
    /// Task definition the task was started from.
    pub task_definition_arn: String,
    /// Hosting container instance; absent for tasks not bound to one.
    pub container_instance_arn: Option<String>,
    /// Launch type.
    pub launch_type: String,
    /// Last observed status.
    pub last_status: String,
    /// The task's containers.
    pub containers: Vec<ContainerRecord>,
}

/// One container within a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerRecord {
    /// Container ARN.
    pub container_arn: String,
    /// Container name.
    pub name: String,
    /// Runtime id, when reported.
    pub runtime_id: Option<String>,
    /// Host/container port bindings; may be empty.
    pub network_bindings: Vec<PortBinding>,
}

/// One host/container port binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortBinding {
    /// IP the container bound, when reported.
    pub bind_ip: Option<String>,
    /// Port inside the container.
    pub container_port: u32,
    /// Port on the host.
    pub host_port: u32,
    /// Transport protocol.
    pub protocol: String,
}

/// An EC2 instance's network coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ec2Instance {
    /// Instance id.
    pub instance_id: String,
    /// Private IPv4 address.
    pub private_ip: Option<String>,
    /// Public IPv4 address, when one is attached.
    pub public_ip: Option<String>,
    /// Private DNS name.
    pub private_dns: Option<String>,
    /// Public DNS name.
    pub public_dns: Option<String>,
    /// Subnet the instance sits in.
    pub subnet_id: Option<String>,
}

/// Paginated, batched queries against the cluster orchestrator.
///
/// Every operation fails with [`MeshError::Inventory`] carrying the
/// underlying cause.
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// Describe the given services in `cluster`, filtered to status
    /// `ACTIVE`. Implementations batch at most 10 ARNs per upstream call.
    async fn describe_services(
        &self,
        cluster: &str,
        service_arns: &[String],
    ) -> Result<Vec<ServiceRecord>>;

    /// ARNs of tasks in `cluster` whose last status is `RUNNING`.
    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>>;

    /// Full task records. Implementations batch at most 100 ARNs per call.
    async fn describe_tasks(&self, cluster: &str, task_arns: &[String])
        -> Result<Vec<TaskRecord>>;

    /// Map container-instance ARNs to EC2 instance ids. Batches of 100.
    async fn describe_container_instances(
        &self,
        cluster: &str,
        container_instance_arns: &[String],
    ) -> Result<HashMap<String, String>>;

    /// Full EC2 records for the given instance ids. Batches of 20.
    async fn describe_ec2_instances(&self, instance_ids: &[String]) -> Result<Vec<Ec2Instance>>;
}

#[derive(Debug, Default)]
struct StaticState {
    services: HashMap<String, Vec<ServiceRecord>>,
    tasks: HashMap<String, Vec<TaskRecord>>,
    container_instances: HashMap<String, HashMap<String, String>>,
    ec2_instances: HashMap<String, Ec2Instance>,
    fail_operation: Option<String>,
}

/// An in-memory inventory backed by fixtures.
///
/// Topology can be edited between reconciliation cycles, and any single
/// operation can be made to fail to exercise the loop's error paths.
#[derive(Debug, Default)]
pub struct StaticInventory {
    state: Mutex<StaticState>,
}

impl StaticInventory {
    /// An empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a service in a cluster.
    pub fn upsert_service(&self, cluster: &str, service: ServiceRecord) {
        let mut state = self.state.lock().expect("state lock");
        let services = state.services.entry(cluster.to_string()).or_default();
        services.retain(|s| s.service_arn != service.service_arn);
        services.push(service);
    }

    /// Add or replace a task in a cluster.
    pub fn upsert_task(&self, cluster: &str, task: TaskRecord) {
        let mut state = self.state.lock().expect("state lock");
        let tasks = state.tasks.entry(cluster.to_string()).or_default();
        tasks.retain(|t| t.task_arn != task.task_arn);
        tasks.push(task);
    }

    /// Remove a task from a cluster.
    pub fn remove_task(&self, cluster: &str, task_arn: &str) {
        let mut state = self.state.lock().expect("state lock");
        if let Some(tasks) = state.tasks.get_mut(cluster) {
            tasks.retain(|t| t.task_arn != task_arn);
        }
    }

    /// Register a container instance and its EC2 instance id.
    pub fn insert_container_instance(&self, cluster: &str, arn: &str, instance_id: &str) {
        let mut state = self.state.lock().expect("state lock");
        state
            .container_instances
            .entry(cluster.to_string())
            .or_default()
            .insert(arn.to_string(), instance_id.to_string());
    }

    /// Register an EC2 instance.
    pub fn insert_ec2_instance(&self, instance: Ec2Instance) {
        let mut state = self.state.lock().expect("state lock");
        state
            .ec2_instances
            .insert(instance.instance_id.clone(), instance);
    }

    /// Make the named operation fail until [`Self::clear_failure`].
    pub fn fail_operation(&self, operation: &str) {
        let mut state = self.state.lock().expect("state lock");
        state.fail_operation = Some(operation.to_string());
    }

    /// Let all operations succeed again.
    pub fn clear_failure(&self) {
        let mut state = self.state.lock().expect("state lock");
        state.fail_operation = None;
    }

    fn check_failure(&self, operation: &str) -> Result<()> {
        let state = self.state.lock().expect("state lock");
        if state.fail_operation.as_deref() == Some(operation) {
            return Err(MeshError::inventory(
                operation,
                std::io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterInventory for StaticInventory {
    async fn describe_services(
        &self,
        cluster: &str,
        service_arns: &[String],
    ) -> Result<Vec<ServiceRecord>> {
        self.check_failure("DescribeServices")?;
        let state = self.state.lock().expect("state lock");
        Ok(state
            .services
            .get(cluster)
            .map(|services| {
                services
                    .iter()
                    .filter(|s| s.status == "ACTIVE")
                    .filter(|s| service_arns.contains(&s.service_arn))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_running_tasks(&self, cluster: &str) -> Result<Vec<String>> {
        self.check_failure("ListTasks")?;
        let state = self.state.lock().expect("state lock");
        Ok(state
            .tasks
            .get(cluster)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|t| t.last_status == "RUNNING")
                    .map(|t| t.task_arn.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<TaskRecord>> {
        self.check_failure("DescribeTasks")?;
        let state = self.state.lock().expect("state lock");
        Ok(state
            .tasks
            .get(cluster)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|t| task_arns.contains(&t.task_arn))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        container_instance_arns: &[String],
    ) -> Result<HashMap<String, String>> {
        self.check_failure("DescribeContainerInstances")?;
        let state = self.state.lock().expect("state lock");
        Ok(state
            .container_instances
            .get(cluster)
            .map(|instances| {
                instances
                    .iter()
                    .filter(|(arn, _)| container_instance_arns.contains(arn))
                    .map(|(arn, id)| (arn.clone(), id.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_ec2_instances(&self, instance_ids: &[String]) -> Result<Vec<Ec2Instance>> {
        self.check_failure("DescribeInstances")?;
        let state = self.state.lock().expect("state lock");
        Ok(instance_ids
            .iter()
            .filter_map(|id| state.ec2_instances.get(id).cloned())
            .collect())
    }
}
