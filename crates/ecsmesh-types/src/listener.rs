//! `envoy.api.v2.Listener` message subset.

use ecsmesh_core::{MeshError, Resource, TypeUrl};
use prost::Message;

/// A downstream listener (the LDS payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Listener {
    /// Listener name. Names are minted fresh per snapshot so Envoy performs
    /// an add-then-remove swap instead of an in-place update.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The address to bind.
    #[prost(message, optional, tag = "2")]
    pub address: ::core::option::Option<crate::core::Address>,
    /// Filter chains; this plane emits exactly one, holding the HTTP
    /// connection manager.
    #[prost(message, repeated, tag = "3")]
    pub filter_chains: ::prost::alloc::vec::Vec<FilterChain>,
}

/// A chain of network filters.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterChain {
    /// The filters, applied in order.
    #[prost(message, repeated, tag = "3")]
    pub filters: ::prost::alloc::vec::Vec<Filter>,
}

/// A single network filter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    /// Well-known filter name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Filter configuration.
    #[prost(oneof = "filter::ConfigType", tags = "4")]
    pub config_type: ::core::option::Option<filter::ConfigType>,
}

/// Nested types for [`Filter`].
pub mod filter {
    /// Filter configuration encoding.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ConfigType {
        /// Typed configuration.
        #[prost(message, tag = "4")]
        TypedConfig(::prost_types::Any),
    }
}

impl Resource for Listener {
    fn type_url(&self) -> &str {
        TypeUrl::LISTENER
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self) -> Result<prost_types::Any, MeshError> {
        Ok(prost_types::Any {
            type_url: TypeUrl::LISTENER.to_string(),
            value: self.encode_to_vec(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
