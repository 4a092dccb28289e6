//! Aggregated Discovery Service: every resource type on one stream, so
//! Envoy observes cluster/endpoint/route/listener updates in a consistent
//! order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use ecsmesh_cache::ShardedCache;
use ecsmesh_types::discovery::aggregated_discovery_service_server::AggregatedDiscoveryService;
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::streaming::spawn_stream;

/// ADS implementation.
#[derive(Debug, Clone)]
pub struct AdsService {
    cache: Arc<ShardedCache>,
    handler: Arc<SotwHandler>,
}

impl AdsService {
    /// Build the service.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self { cache, handler }
    }
}

#[tonic::async_trait]
impl AggregatedDiscoveryService for AdsService {
    type StreamAggregatedResourcesStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    async fn stream_aggregated_resources(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamAggregatedResourcesStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        spawn_stream(
            "ads",
            Arc::clone(&self.handler),
            Arc::clone(&self.cache),
            None,
            request.into_inner(),
            tx,
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
