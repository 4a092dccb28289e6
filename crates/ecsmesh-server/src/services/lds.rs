//! Listener Discovery Service (LDS).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use ecsmesh_cache::ShardedCache;
use ecsmesh_core::TypeUrl;
use ecsmesh_types::discovery::listener_discovery_service_server::ListenerDiscoveryService;
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::streaming::spawn_stream;

/// LDS implementation, pinned to the listener type URL.
#[derive(Debug, Clone)]
pub struct LdsService {
    cache: Arc<ShardedCache>,
    handler: Arc<SotwHandler>,
}

impl LdsService {
    /// Build the service.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self { cache, handler }
    }
}

#[tonic::async_trait]
impl ListenerDiscoveryService for LdsService {
    type StreamListenersStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    async fn stream_listeners(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamListenersStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        spawn_stream(
            "lds",
            Arc::clone(&self.handler),
            Arc::clone(&self.cache),
            Some(TypeUrl::new(TypeUrl::LISTENER)),
            request.into_inner(),
            tx,
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
