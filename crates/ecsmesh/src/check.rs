//! One-shot diagnostic modes.

use std::net::SocketAddr;

use ecsmesh_core::{MeshError, Result};
use ecsmesh_discovery::{assemble, claim, ClusterInventory, TaskPort};

use crate::config::Config;

/// Run one discovery pass and dump the claimed endpoints to stdout.
///
/// Errors propagate to the caller so the process exits non-zero on
/// inventory failure.
pub async fn aws_check(
    inventory: &dyn ClusterInventory,
    config: &Config,
    local_ip: &str,
) -> Result<()> {
    println!("Local IP: {local_ip}");

    let assembled = assemble(inventory, &config.all_refs()).await?;
    let egress = claim(&config.egress, &assembled, None);
    let ingress = claim(&config.ingress, &assembled, Some(local_ip));

    println!("==================================================");
    println!("Discovered egress ports:");
    for port in &egress {
        print_task_port(port);
    }
    println!("==================================================");
    println!("Discovered ingress ports:");
    for port in &ingress {
        print_task_port(port);
    }
    Ok(())
}

fn print_task_port(port: &TaskPort) {
    println!("  - service: {} ({})", port.service_name, port.service_arn);
    println!(
        "    path: {}  cluster: {}",
        port.proxy_path.as_deref().unwrap_or("-"),
        port.cluster_name
    );
    println!(
        "    task: {}  container: {}  deployment: {}",
        port.task_arn,
        port.container_name,
        port.deployment_id.as_deref().unwrap_or("-")
    );
    println!(
        "    binding: {}/{} -> host {}  instance: {} ({})",
        port.protocol,
        port.container_port,
        port.host_port,
        port.private_ip().unwrap_or("-"),
        port.ec2
            .as_ref()
            .map(|e| e.instance_id.as_str())
            .unwrap_or("-"),
    );
}

/// Verify the xDS server can bind its port, then exit.
pub async fn envoy_check(config: &Config) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.envoy.admin_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MeshError::Config(format!("cannot bind xDS port {addr}: {e}")))?;
    drop(listener);
    println!("xDS server can bind {addr}");
    Ok(())
}
