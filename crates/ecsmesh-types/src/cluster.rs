//! `envoy.api.v2.Cluster` message subset.

use ecsmesh_core::{MeshError, Resource, TypeUrl};
use prost::Message;

/// An upstream cluster (the CDS payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cluster {
    /// Cluster name; route actions refer to clusters by this name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Service-discovery mechanism. This plane always emits `STATIC`
    /// clusters with the endpoints inlined in `load_assignment`.
    #[prost(oneof = "cluster::ClusterDiscoveryType", tags = "2")]
    pub cluster_discovery_type: ::core::option::Option<cluster::ClusterDiscoveryType>,
    /// Timeout for new network connections to the cluster.
    #[prost(message, optional, tag = "4")]
    pub connect_timeout: ::core::option::Option<::prost_types::Duration>,
    /// HTTP/1 settings; presence enables HTTP/1 upstream.
    #[prost(message, optional, tag = "13")]
    pub http_protocol_options: ::core::option::Option<crate::core::Http1ProtocolOptions>,
    /// HTTP/2 settings; presence enables HTTP/2 upstream.
    #[prost(message, optional, tag = "14")]
    pub http2_protocol_options: ::core::option::Option<crate::core::Http2ProtocolOptions>,
    /// How the upstream protocol is chosen.
    #[prost(enumeration = "cluster::ClusterProtocolSelection", tag = "26")]
    pub protocol_selection: i32,
    /// Endpoints for `STATIC` clusters.
    #[prost(message, optional, tag = "33")]
    pub load_assignment: ::core::option::Option<crate::endpoint::ClusterLoadAssignment>,
}

/// Nested types for [`Cluster`].
pub mod cluster {
    /// Service-discovery mechanism.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ClusterDiscoveryType {
        /// One of the built-in discovery types.
        #[prost(enumeration = "DiscoveryType", tag = "2")]
        Type(i32),
    }

    /// Built-in discovery types.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum DiscoveryType {
        /// Endpoints are listed explicitly in the load assignment.
        Static = 0,
        /// DNS-resolved, all addresses used.
        StrictDns = 1,
        /// DNS-resolved, one address used.
        LogicalDns = 2,
        /// Endpoints come from EDS.
        Eds = 3,
        /// Original destination of the downstream connection.
        OriginalDst = 4,
    }

    /// How the upstream protocol is chosen.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum ClusterProtocolSelection {
        /// Use the configured protocol options as-is.
        UseConfiguredProtocol = 0,
        /// Mirror the downstream protocol.
        UseDownstreamProtocol = 1,
    }
}

impl Resource for Cluster {
    fn type_url(&self) -> &str {
        TypeUrl::CLUSTER
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self) -> Result<prost_types::Any, MeshError> {
        Ok(prost_types::Any {
            type_url: TypeUrl::CLUSTER.to_string(),
            value: self.encode_to_vec(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
