//! Type URLs for the v2 xDS resource family.

use std::fmt;

/// Type URL wrapper for xDS resource types.
///
/// # Example
///
/// ```rust
/// use ecsmesh_core::TypeUrl;
///
/// let cluster = TypeUrl::new(TypeUrl::CLUSTER);
/// assert_eq!(cluster.short_name(), "Cluster");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeUrl(String);

impl TypeUrl {
    /// Type URL for Cluster (CDS).
    pub const CLUSTER: &'static str = "type.googleapis.com/envoy.api.v2.Cluster";

    /// Type URL for ClusterLoadAssignment (EDS).
    pub const ENDPOINT: &'static str = "type.googleapis.com/envoy.api.v2.ClusterLoadAssignment";

    /// Type URL for RouteConfiguration (RDS).
    pub const ROUTE: &'static str = "type.googleapis.com/envoy.api.v2.RouteConfiguration";

    /// Type URL for Listener (LDS).
    pub const LISTENER: &'static str = "type.googleapis.com/envoy.api.v2.Listener";

    /// The four type URLs served over ADS, in the dependency order Envoy
    /// expects updates to arrive (clusters before the endpoints that fill
    /// them, routes before the listeners that reference them).
    pub const ALL: [&'static str; 4] = [Self::CLUSTER, Self::ENDPOINT, Self::ROUTE, Self::LISTENER];

    /// Create a type URL from a string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing message name, e.g. `Cluster`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit('/')
            .next()
            .and_then(|s| s.rsplit('.').next())
            .unwrap_or(&self.0)
    }

    /// Whether this looks like a well-formed xDS type URL.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0.starts_with("type.googleapis.com/")
    }
}

impl fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TypeUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TypeUrl {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TypeUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(TypeUrl::new(TypeUrl::CLUSTER).short_name(), "Cluster");
        assert_eq!(
            TypeUrl::new(TypeUrl::ENDPOINT).short_name(),
            "ClusterLoadAssignment"
        );
        assert_eq!(TypeUrl::new(TypeUrl::LISTENER).short_name(), "Listener");
    }

    #[test]
    fn validity() {
        assert!(TypeUrl::new(TypeUrl::ROUTE).is_valid());
        assert!(!TypeUrl::new("envoy.api.v2.Cluster").is_valid());
    }
}
