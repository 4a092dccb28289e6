//! Endpoint Discovery Service (EDS).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use ecsmesh_cache::ShardedCache;
use ecsmesh_core::TypeUrl;
use ecsmesh_types::discovery::endpoint_discovery_service_server::EndpointDiscoveryService;
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::streaming::spawn_stream;

/// EDS implementation, pinned to the load-assignment type URL.
#[derive(Debug, Clone)]
pub struct EdsService {
    cache: Arc<ShardedCache>,
    handler: Arc<SotwHandler>,
}

impl EdsService {
    /// Build the service.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self { cache, handler }
    }
}

#[tonic::async_trait]
impl EndpointDiscoveryService for EdsService {
    type StreamEndpointsStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    async fn stream_endpoints(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamEndpointsStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        spawn_stream(
            "eds",
            Arc::clone(&self.handler),
            Arc::clone(&self.cache),
            Some(TypeUrl::new(TypeUrl::ENDPOINT)),
            request.into_inner(),
            tx,
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
