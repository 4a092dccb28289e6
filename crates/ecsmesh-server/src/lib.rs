//! # ecsmesh-server
//!
//! The gRPC serving layer: five State-of-the-World discovery services
//! (ADS plus per-type CDS/EDS/RDS/LDS) answering from the snapshot cache.
//!
//! Every stream holds a cache watch, so a snapshot published by the
//! reconciler is pushed to connected Envoys immediately; clients do not
//! need to re-request to observe updates.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod services;
pub mod shutdown;
mod sotw;
mod stream;
mod streaming;

pub use sotw::{SotwHandler, SotwResponse};
pub use stream::{StreamContext, StreamId};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use ecsmesh_cache::ShardedCache;
use ecsmesh_types::discovery::{
    aggregated_discovery_service_server::AggregatedDiscoveryServiceServer,
    cluster_discovery_service_server::ClusterDiscoveryServiceServer,
    endpoint_discovery_service_server::EndpointDiscoveryServiceServer,
    listener_discovery_service_server::ListenerDiscoveryServiceServer,
    route_discovery_service_server::RouteDiscoveryServiceServer,
};

/// The xDS gRPC server, backed by a shared snapshot cache.
#[derive(Debug)]
pub struct XdsServer {
    cache: Arc<ShardedCache>,
}

impl XdsServer {
    /// Build a server over a cache.
    pub fn new(cache: Arc<ShardedCache>) -> Self {
        Self { cache }
    }

    /// The cache this server answers from.
    #[inline]
    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }

    /// Serve all five discovery services on `addr` until `shutdown`
    /// resolves. In-flight streams are dropped when the listener closes;
    /// Envoy reconnects and replays its state on the next stream.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), tonic::transport::Error> {
        let handler = Arc::new(SotwHandler::new(Arc::clone(&self.cache)));
        let services = services::DiscoveryServices::new(Arc::clone(&self.cache), handler);

        info!(addr = %addr, "xDS server listening");
        tonic::transport::Server::builder()
            .add_service(AggregatedDiscoveryServiceServer::new(services.ads))
            .add_service(ClusterDiscoveryServiceServer::new(services.cds))
            .add_service(EndpointDiscoveryServiceServer::new(services.eds))
            .add_service(RouteDiscoveryServiceServer::new(services.rds))
            .add_service(ListenerDiscoveryServiceServer::new(services.lds))
            .serve_with_shutdown(addr, shutdown)
            .await
    }
}
