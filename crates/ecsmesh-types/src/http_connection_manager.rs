//! The v2 HTTP connection manager filter configuration subset.

/// `envoy.config.filter.network.http_connection_manager.v2.HttpConnectionManager`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpConnectionManager {
    /// Downstream codec selection.
    #[prost(enumeration = "http_connection_manager::CodecType", tag = "1")]
    pub codec_type: i32,
    /// Prefix for the listener's HTTP stats.
    #[prost(string, tag = "2")]
    pub stat_prefix: ::prost::alloc::string::String,
    /// Where routes come from; this plane inlines the route configuration.
    #[prost(oneof = "http_connection_manager::RouteSpecifier", tags = "4")]
    pub route_specifier: ::core::option::Option<http_connection_manager::RouteSpecifier>,
    /// HTTP-level filters; the router must be last.
    #[prost(message, repeated, tag = "5")]
    pub http_filters: ::prost::alloc::vec::Vec<HttpFilter>,
}

/// Nested types for [`HttpConnectionManager`].
pub mod http_connection_manager {
    /// Downstream codec selection.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum CodecType {
        /// Sniff HTTP/1 vs HTTP/2.
        Auto = 0,
        /// Force HTTP/1.
        Http1 = 1,
        /// Force HTTP/2.
        Http2 = 2,
    }

    /// Route source.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum RouteSpecifier {
        /// An inline route configuration.
        #[prost(message, tag = "4")]
        RouteConfig(crate::route::RouteConfiguration),
    }
}

/// An HTTP-level filter entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpFilter {
    /// Well-known filter name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
