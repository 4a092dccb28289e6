//! EC2 instance-metadata lookups.

use ecsmesh_core::{MeshError, Result};

const LOCAL_IPV4_URL: &str = "http://169.254.169.254/2018-09-24/meta-data/local-ipv4";

/// The private IPv4 of the host this process runs on, from the instance
/// metadata service. Only reachable on EC2; off-instance callers get an
/// error and decide for themselves whether that is fatal.
pub async fn instance_local_ip() -> Result<String> {
    let response = reqwest::get(LOCAL_IPV4_URL)
        .await
        .map_err(|e| MeshError::Config(format!("instance metadata unreachable: {e}")))?;
    let body = response
        .text()
        .await
        .map_err(|e| MeshError::Config(format!("instance metadata read failed: {e}")))?;
    let ip = body.trim();
    if ip.is_empty() {
        return Err(MeshError::Config(
            "instance metadata returned an empty local-ipv4".into(),
        ));
    }
    Ok(ip.to_string())
}
