//! Route Discovery Service (RDS).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use ecsmesh_cache::ShardedCache;
use ecsmesh_core::TypeUrl;
use ecsmesh_types::discovery::route_discovery_service_server::RouteDiscoveryService;
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::streaming::spawn_stream;

/// RDS implementation, pinned to the route-configuration type URL.
#[derive(Debug, Clone)]
pub struct RdsService {
    cache: Arc<ShardedCache>,
    handler: Arc<SotwHandler>,
}

impl RdsService {
    /// Build the service.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self { cache, handler }
    }
}

#[tonic::async_trait]
impl RouteDiscoveryService for RdsService {
    type StreamRoutesStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    async fn stream_routes(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamRoutesStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        spawn_stream(
            "rds",
            Arc::clone(&self.handler),
            Arc::clone(&self.cache),
            Some(TypeUrl::new(TypeUrl::ROUTE)),
            request.into_inner(),
            tx,
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
