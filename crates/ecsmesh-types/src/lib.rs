//! # ecsmesh-types
//!
//! Hand-maintained Rust types for the slice of the Envoy v2 xDS API this
//! control plane speaks. Each message carries the upstream protobuf field
//! tags, so the prost encoding is wire-compatible with what `tonic-build`
//! would generate from the data-plane-api protos, without checking the
//! proto tree into this repository. Fields the plane never sets are
//! omitted; prost skips unknown tags on decode, so subset messages remain
//! safe to use on the receive path.
//!
//! Layout mirrors the proto packages:
//!
//! - [`core`] - `envoy.api.v2.core`: addresses, protocol options, node
//! - [`cluster`] - `envoy.api.v2.Cluster`
//! - [`endpoint`] - `envoy.api.v2.ClusterLoadAssignment` and friends
//! - [`route`] - `envoy.api.v2.RouteConfiguration` and friends
//! - [`listener`] - `envoy.api.v2.Listener` and friends
//! - [`http_connection_manager`] - the v2 HTTP connection manager filter
//! - [`discovery`] - `DiscoveryRequest`/`DiscoveryResponse` plus the five
//!   discovery service server scaffolds

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod core;
pub mod discovery;
pub mod endpoint;
pub mod http_connection_manager;
pub mod listener;
pub mod route;

pub use cluster::Cluster;
pub use discovery::{DiscoveryRequest, DiscoveryResponse};
pub use endpoint::ClusterLoadAssignment;
pub use listener::Listener;
pub use route::RouteConfiguration;

// Re-export prost essentials so consumers don't need a direct dependency.
pub use prost::Message;
pub use prost_types::Any;

/// Well-known filter names from the v2 era.
pub mod filter_names {
    /// The HTTP connection manager network filter.
    pub const HTTP_CONNECTION_MANAGER: &str = "envoy.http_connection_manager";
    /// The terminal router HTTP filter.
    pub const ROUTER: &str = "envoy.router";
}

/// Type URL of the v2 HTTP connection manager configuration.
pub const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.filter.network.http_connection_manager.v2.HttpConnectionManager";
