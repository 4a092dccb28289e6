//! `envoy.api.v2.ClusterLoadAssignment` message subset.

use ecsmesh_core::{MeshError, Resource, TypeUrl};
use prost::Message;

/// The endpoints backing one cluster (the EDS payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterLoadAssignment {
    /// Name of the cluster these endpoints belong to.
    #[prost(string, tag = "1")]
    pub cluster_name: ::prost::alloc::string::String,
    /// Endpoint groups, one per locality.
    #[prost(message, repeated, tag = "2")]
    pub endpoints: ::prost::alloc::vec::Vec<LocalityLbEndpoints>,
}

/// Endpoints within one locality.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocalityLbEndpoints {
    /// The load-balanced endpoints.
    #[prost(message, repeated, tag = "2")]
    pub lb_endpoints: ::prost::alloc::vec::Vec<LbEndpoint>,
}

/// One load-balanced endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LbEndpoint {
    /// The upstream host.
    #[prost(oneof = "lb_endpoint::HostIdentifier", tags = "1")]
    pub host_identifier: ::core::option::Option<lb_endpoint::HostIdentifier>,
}

/// Nested types for [`LbEndpoint`].
pub mod lb_endpoint {
    /// How the upstream host is identified.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum HostIdentifier {
        /// A directly addressed endpoint.
        #[prost(message, tag = "1")]
        Endpoint(super::Endpoint),
    }
}

/// A directly addressed upstream host.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Endpoint {
    /// The host's address.
    #[prost(message, optional, tag = "1")]
    pub address: ::core::option::Option<crate::core::Address>,
}

impl LbEndpoint {
    /// An endpoint at `ip:port`.
    pub fn socket(ip: impl Into<String>, port: u32) -> Self {
        Self {
            host_identifier: Some(lb_endpoint::HostIdentifier::Endpoint(Endpoint {
                address: Some(crate::core::Address::socket(ip, port)),
            })),
        }
    }
}

impl Resource for ClusterLoadAssignment {
    fn type_url(&self) -> &str {
        TypeUrl::ENDPOINT
    }

    fn name(&self) -> &str {
        &self.cluster_name
    }

    fn encode(&self) -> Result<prost_types::Any, MeshError> {
        Ok(prost_types::Any {
            type_url: TypeUrl::ENDPOINT.to_string(),
            value: self.encode_to_vec(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
