//! `envoy.api.v2.RouteConfiguration` message subset.

use ecsmesh_core::{MeshError, Resource, TypeUrl};
use prost::Message;

/// A routing table (the RDS payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteConfiguration {
    /// Route configuration name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Virtual hosts making up the table.
    #[prost(message, repeated, tag = "2")]
    pub virtual_hosts: ::prost::alloc::vec::Vec<VirtualHost>,
    /// When true, Envoy rejects the configuration if any route points at a
    /// cluster absent from the current cluster set.
    #[prost(message, optional, tag = "7")]
    pub validate_clusters: ::core::option::Option<bool>,
}

/// A set of routes for a set of domains.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VirtualHost {
    /// Virtual host name, for stats only.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Domains matched against the host header; `*` matches everything.
    #[prost(string, repeated, tag = "2")]
    pub domains: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Routes tried in order.
    #[prost(message, repeated, tag = "3")]
    pub routes: ::prost::alloc::vec::Vec<Route>,
}

/// A single match-and-forward rule.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Route {
    /// What requests this route matches.
    #[prost(message, optional, tag = "1")]
    pub r#match: ::core::option::Option<RouteMatch>,
    /// What to do with matched requests.
    #[prost(oneof = "route::Action", tags = "2")]
    pub action: ::core::option::Option<route::Action>,
}

/// Nested types for [`Route`].
pub mod route {
    /// Route action.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Action {
        /// Forward to an upstream cluster.
        #[prost(message, tag = "2")]
        Route(super::RouteAction),
    }
}

/// Request matching criteria.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteMatch {
    /// Path matching rule.
    #[prost(oneof = "route_match::PathSpecifier", tags = "1")]
    pub path_specifier: ::core::option::Option<route_match::PathSpecifier>,
}

/// Nested types for [`RouteMatch`].
pub mod route_match {
    /// Path matching rule.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PathSpecifier {
        /// Match any path with this prefix.
        #[prost(string, tag = "1")]
        Prefix(::prost::alloc::string::String),
    }
}

/// Forwarding target.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RouteAction {
    /// The cluster to forward to.
    #[prost(oneof = "route_action::ClusterSpecifier", tags = "1")]
    pub cluster_specifier: ::core::option::Option<route_action::ClusterSpecifier>,
}

/// Nested types for [`RouteAction`].
pub mod route_action {
    /// How the target cluster is named.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ClusterSpecifier {
        /// A cluster name.
        #[prost(string, tag = "1")]
        Cluster(::prost::alloc::string::String),
    }
}

impl Route {
    /// A rule forwarding `prefix`-matched requests to `cluster`.
    pub fn prefix_to_cluster(prefix: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            r#match: Some(RouteMatch {
                path_specifier: Some(route_match::PathSpecifier::Prefix(prefix.into())),
            }),
            action: Some(route::Action::Route(RouteAction {
                cluster_specifier: Some(route_action::ClusterSpecifier::Cluster(cluster.into())),
            })),
        }
    }
}

impl Resource for RouteConfiguration {
    fn type_url(&self) -> &str {
        TypeUrl::ROUTE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self) -> Result<prost_types::Any, MeshError> {
        Ok(prost_types::Any {
            type_url: TypeUrl::ROUTE.to_string(),
            value: self.encode_to_vec(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
