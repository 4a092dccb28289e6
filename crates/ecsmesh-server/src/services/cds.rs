//! Cluster Discovery Service (CDS).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use ecsmesh_cache::ShardedCache;
use ecsmesh_core::TypeUrl;
use ecsmesh_types::discovery::cluster_discovery_service_server::ClusterDiscoveryService;
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::streaming::spawn_stream;

/// CDS implementation, pinned to the cluster type URL.
#[derive(Debug, Clone)]
pub struct CdsService {
    cache: Arc<ShardedCache>,
    handler: Arc<SotwHandler>,
}

impl CdsService {
    /// Build the service.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self { cache, handler }
    }
}

#[tonic::async_trait]
impl ClusterDiscoveryService for CdsService {
    type StreamClustersStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    async fn stream_clusters(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamClustersStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        spawn_stream(
            "cds",
            Arc::clone(&self.handler),
            Arc::clone(&self.cache),
            Some(TypeUrl::new(TypeUrl::CLUSTER)),
            request.into_inner(),
            tx,
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
