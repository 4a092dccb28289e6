//! `envoy.service.discovery.v2` / `envoy.api.v2` discovery plumbing.
//!
//! All five discovery services speak the same State-of-the-World request and
//! response messages; only the gRPC method path and the expected type URL
//! differ. The `discovery_service!` macro below stamps out a server scaffold
//! per service in the shape `tonic-build` would emit, so the serving crate
//! only implements the per-service trait.

/// `google.rpc.Status`, carried by NACKs.
pub mod rpc {
    /// Error details attached to a rejected configuration.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        /// Canonical error code.
        #[prost(int32, tag = "1")]
        pub code: i32,
        /// Developer-facing error message.
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
    }
}

/// A State-of-the-World discovery request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscoveryRequest {
    /// Version from the last accepted response; empty on the first request.
    #[prost(string, tag = "1")]
    pub version_info: ::prost::alloc::string::String,
    /// The requesting node.
    #[prost(message, optional, tag = "2")]
    pub node: ::core::option::Option<crate::core::Node>,
    /// Requested resource names; empty means wildcard.
    #[prost(string, repeated, tag = "3")]
    pub resource_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Type URL of the requested resources. Optional on single-type streams.
    #[prost(string, tag = "4")]
    pub type_url: ::prost::alloc::string::String,
    /// Nonce of the response being ACKed or NACKed; empty on first request.
    #[prost(string, tag = "5")]
    pub response_nonce: ::prost::alloc::string::String,
    /// Present iff this request NACKs the nonced response.
    #[prost(message, optional, tag = "6")]
    pub error_detail: ::core::option::Option<rpc::Status>,
}

/// A State-of-the-World discovery response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscoveryResponse {
    /// Version of this resource set.
    #[prost(string, tag = "1")]
    pub version_info: ::prost::alloc::string::String,
    /// The full resource set of `type_url` at this version.
    #[prost(message, repeated, tag = "2")]
    pub resources: ::prost::alloc::vec::Vec<::prost_types::Any>,
    /// Canary flag; never set by this plane.
    #[prost(bool, tag = "3")]
    pub canary: bool,
    /// Type URL of the resources.
    #[prost(string, tag = "4")]
    pub type_url: ::prost::alloc::string::String,
    /// Unique nonce for ACK correlation.
    #[prost(string, tag = "5")]
    pub nonce: ::prost::alloc::string::String,
}

macro_rules! discovery_service {
    (
        $(#[$attr:meta])*
        $module:ident, $svc_trait:ident, $server:ident, $method:ident,
        $stream_ty:ident, $service_name:literal, $method_path:literal
    ) => {
        $(#[$attr])*
        pub mod $module {
            use super::{DiscoveryRequest, DiscoveryResponse};

            /// Service behavior, implemented by the control plane.
            #[tonic::async_trait]
            pub trait $svc_trait: Send + Sync + 'static {
                /// Server response stream.
                type $stream_ty: futures_core::Stream<
                        Item = std::result::Result<DiscoveryResponse, tonic::Status>,
                    > + Send
                    + 'static;

                /// Handle one bidirectional discovery stream.
                async fn $method(
                    &self,
                    request: tonic::Request<tonic::Streaming<DiscoveryRequest>>,
                ) -> std::result::Result<tonic::Response<Self::$stream_ty>, tonic::Status>;
            }

            /// gRPC server wrapper for the service.
            #[derive(Debug)]
            pub struct $server<T> {
                inner: std::sync::Arc<T>,
            }

            impl<T> $server<T> {
                /// Wrap a service implementation.
                pub fn new(inner: T) -> Self {
                    Self {
                        inner: std::sync::Arc::new(inner),
                    }
                }
            }

            impl<T> Clone for $server<T> {
                fn clone(&self) -> Self {
                    Self {
                        inner: std::sync::Arc::clone(&self.inner),
                    }
                }
            }

            impl<T: $svc_trait, B> tonic::codegen::Service<tonic::codegen::http::Request<B>>
                for $server<T>
            where
                B: tonic::codegen::Body + Send + 'static,
                B::Error: Into<tonic::codegen::StdError> + Send + 'static,
            {
                type Response = tonic::codegen::http::Response<tonic::body::BoxBody>;
                type Error = std::convert::Infallible;
                type Future = tonic::codegen::BoxFuture<Self::Response, Self::Error>;

                fn poll_ready(
                    &mut self,
                    _cx: &mut std::task::Context<'_>,
                ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
                    std::task::Poll::Ready(Ok(()))
                }

                fn call(&mut self, req: tonic::codegen::http::Request<B>) -> Self::Future {
                    match req.uri().path() {
                        $method_path => {
                            struct MethodSvc<T>(std::sync::Arc<T>);
                            impl<T: $svc_trait>
                                tonic::server::StreamingService<DiscoveryRequest>
                                for MethodSvc<T>
                            {
                                type Response = DiscoveryResponse;
                                type ResponseStream = T::$stream_ty;
                                type Future = tonic::codegen::BoxFuture<
                                    tonic::Response<Self::ResponseStream>,
                                    tonic::Status,
                                >;

                                fn call(
                                    &mut self,
                                    request: tonic::Request<tonic::Streaming<DiscoveryRequest>>,
                                ) -> Self::Future {
                                    let inner = std::sync::Arc::clone(&self.0);
                                    Box::pin(async move { inner.$method(request).await })
                                }
                            }

                            let inner = std::sync::Arc::clone(&self.inner);
                            Box::pin(async move {
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                Ok(grpc.streaming(MethodSvc(inner), req).await)
                            })
                        }
                        _ => Box::pin(async move {
                            Ok(tonic::codegen::http::Response::builder()
                                .status(200)
                                .header("grpc-status", "12")
                                .header("content-type", "application/grpc")
                                .body(tonic::codegen::empty_body())
                                .unwrap())
                        }),
                    }
                }
            }

            impl<T: $svc_trait> tonic::server::NamedService for $server<T> {
                const NAME: &'static str = $service_name;
            }
        }
    };
}

discovery_service!(
    /// Aggregated Discovery Service: every resource type over one stream.
    aggregated_discovery_service_server,
    AggregatedDiscoveryService,
    AggregatedDiscoveryServiceServer,
    stream_aggregated_resources,
    StreamAggregatedResourcesStream,
    "envoy.service.discovery.v2.AggregatedDiscoveryService",
    "/envoy.service.discovery.v2.AggregatedDiscoveryService/StreamAggregatedResources"
);

discovery_service!(
    /// Cluster Discovery Service.
    cluster_discovery_service_server,
    ClusterDiscoveryService,
    ClusterDiscoveryServiceServer,
    stream_clusters,
    StreamClustersStream,
    "envoy.api.v2.ClusterDiscoveryService",
    "/envoy.api.v2.ClusterDiscoveryService/StreamClusters"
);

discovery_service!(
    /// Endpoint Discovery Service.
    endpoint_discovery_service_server,
    EndpointDiscoveryService,
    EndpointDiscoveryServiceServer,
    stream_endpoints,
    StreamEndpointsStream,
    "envoy.api.v2.EndpointDiscoveryService",
    "/envoy.api.v2.EndpointDiscoveryService/StreamEndpoints"
);

discovery_service!(
    /// Route Discovery Service.
    route_discovery_service_server,
    RouteDiscoveryService,
    RouteDiscoveryServiceServer,
    stream_routes,
    StreamRoutesStream,
    "envoy.api.v2.RouteDiscoveryService",
    "/envoy.api.v2.RouteDiscoveryService/StreamRoutes"
);

discovery_service!(
    /// Listener Discovery Service.
    listener_discovery_service_server,
    ListenerDiscoveryService,
    ListenerDiscoveryServiceServer,
    stream_listeners,
    StreamListenersStream,
    "envoy.api.v2.ListenerDiscoveryService",
    "/envoy.api.v2.ListenerDiscoveryService/StreamListeners"
);

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn request_round_trips() {
        let req = DiscoveryRequest {
            version_info: "00000000000000000001".into(),
            node: Some(crate::core::Node {
                id: "sidecar".into(),
                cluster: "c1".into(),
            }),
            resource_names: vec![],
            type_url: ecsmesh_core::TypeUrl::CLUSTER.into(),
            response_nonce: String::new(),
            error_detail: None,
        };
        let decoded = DiscoveryRequest::decode(req.encode_to_vec().as_slice()).expect("decode");
        assert_eq!(decoded, req);
    }

    #[test]
    fn nack_carries_error_detail() {
        let req = DiscoveryRequest {
            error_detail: Some(rpc::Status {
                code: 3,
                message: "dangling cluster reference".into(),
            }),
            ..Default::default()
        };
        let decoded = DiscoveryRequest::decode(req.encode_to_vec().as_slice()).expect("decode");
        assert_eq!(
            decoded.error_detail.expect("detail").message,
            "dangling cluster reference"
        );
    }
}
