//! Configured route targets.

use std::fmt;

/// A user-declared route target: traffic for a path prefix should be routed
/// to (egress) or accepted for (ingress) some ECS service.
///
/// Immutable after construction. The id is derived from the full tuple, so
/// two refs with identical tuples always carry identical ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRef {
    id: String,
    /// ARN of the ECS service backing this route.
    pub service_arn: String,
    /// HTTP path prefix proxied to or from the service.
    pub path: String,
    /// Constrain matching to this container name; `None` leaves the
    /// container unconstrained.
    pub container_name: Option<String>,
    /// Constrain matching to this container port; `None` leaves the port
    /// unconstrained.
    pub container_port: Option<u32>,
    /// Name of the ECS cluster the service runs in.
    pub cluster: String,
}

impl PathRef {
    /// Build a ref, deriving its id from the tuple.
    pub fn new(
        service_arn: impl Into<String>,
        path: impl Into<String>,
        container_name: Option<String>,
        container_port: Option<u32>,
        cluster: impl Into<String>,
    ) -> Self {
        let service_arn = service_arn.into();
        let path = path.into();
        let cluster = cluster.into();
        let id = format!(
            "{}&{}&{}&{}&{}",
            service_arn,
            path,
            container_name.as_deref().unwrap_or(""),
            container_port.unwrap_or(0),
            cluster,
        );
        Self {
            id,
            service_arn,
            path,
            container_name,
            container_port,
            cluster,
        }
    }

    /// The stable identity of this ref.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} path={} cluster={} container={} port={}",
            self.service_arn,
            self.path,
            self.cluster,
            self.container_name.as_deref().unwrap_or("(any)"),
            self.container_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(any)".into()),
        )
    }
}
