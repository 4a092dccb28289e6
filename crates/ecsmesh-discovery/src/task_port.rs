//! Concrete network endpoints discovered from ECS.

use crate::inventory::Ec2Instance;

/// One network endpoint exposed by a running container: the join of an ECS
/// task, one of its containers, one of that container's port bindings, and
/// the EC2 host behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPort {
    /// Id of the [`crate::PathRef`] that claimed this port; set by the
    /// matcher.
    pub ref_id: Option<String>,
    /// Path prefix of the claiming ref; set by the matcher.
    pub proxy_path: Option<String>,

    /// Owning service ARN.
    pub service_arn: String,
    /// Owning service name.
    pub service_name: String,
    /// Cluster name.
    pub cluster_name: String,
    /// Cluster ARN.
    pub cluster_arn: String,

    /// Task ARN.
    pub task_arn: String,
    /// Container ARN.
    pub container_arn: String,
    /// Container name.
    pub container_name: String,
    /// Container runtime id, when the agent reports one.
    pub runtime_id: Option<String>,
    /// ARN of the container instance hosting the task.
    pub container_instance_arn: String,
    /// Launch type of the task.
    pub launch_type: String,
    /// Task definition the task was started from.
    pub task_definition_arn: String,
    /// Deployment that rolled the task out, when its service reported one.
    pub deployment_id: Option<String>,

    /// IP the container bound inside the task network.
    pub bind_ip: Option<String>,
    /// Port inside the container.
    pub container_port: u32,
    /// Port on the host forwarding to the container.
    pub host_port: u32,
    /// Transport protocol of the binding.
    pub protocol: String,

    /// The backing EC2 instance; stitched in after task assembly.
    pub ec2: Option<Ec2Instance>,
}

impl TaskPort {
    /// The completeness invariant: a task port may only leave the assembler
    /// if everything a proxy needs to reach it is present.
    pub fn is_complete(&self) -> bool {
        !self.service_arn.is_empty()
            && !self.cluster_name.is_empty()
            && !self.task_arn.is_empty()
            && !self.container_name.is_empty()
            && self.container_port > 0
            && self.host_port > 0
            && !self.protocol.is_empty()
            && self.private_ip().is_some()
    }

    /// Private IP of the backing host, when known.
    pub fn private_ip(&self) -> Option<&str> {
        self.ec2.as_ref().and_then(|e| e.private_ip.as_deref())
    }

    /// Whether this port is served from the given host.
    pub fn is_local(&self, local_ip: &str) -> bool {
        self.private_ip() == Some(local_ip)
    }

    /// One-line description used in match warnings and check output.
    pub fn describe(&self) -> String {
        format!(
            "task={} container={} {}/{} host_port={} ip={}",
            self.task_arn,
            self.container_name,
            self.protocol,
            self.container_port,
            self.host_port,
            self.private_ip().unwrap_or("(unknown)"),
        )
    }
}
