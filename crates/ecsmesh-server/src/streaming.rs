//! The stream driver shared by all five discovery services.
//!
//! Each service spawns one driver task per client stream. The driver
//! multiplexes two event sources: requests arriving from the client, and
//! snapshot updates arriving on a cache watch. The watch is what turns a
//! reconciler publish into an immediate push to every connected Envoy.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tonic::{Status, Streaming};
use tracing::{error, info, warn};

use ecsmesh_cache::{ShardedCache, Snapshot, Watch};
use ecsmesh_core::{NodeHash, TypeUrl};
use ecsmesh_types::{DiscoveryRequest, DiscoveryResponse};

use crate::sotw::SotwHandler;
use crate::stream::StreamContext;

/// What the stream has asked for, per type URL.
#[derive(Debug, Default)]
struct Subscription {
    resource_names: Vec<String>,
    last_sent_version: String,
}

/// Spawn the driver task for one client stream.
///
/// `fixed_type` pins the stream to one resource type (the per-type
/// services); `None` accepts whatever type each request names (ADS).
pub(crate) fn spawn_stream(
    service: &'static str,
    handler: Arc<SotwHandler>,
    cache: Arc<ShardedCache>,
    fixed_type: Option<TypeUrl>,
    mut requests: Streaming<DiscoveryRequest>,
    tx: mpsc::Sender<Result<DiscoveryResponse, Status>>,
) {
    tokio::spawn(async move {
        let mut ctx = StreamContext::new();
        let mut watch: Option<Watch> = None;
        let mut subscriptions: HashMap<TypeUrl, Subscription> = HashMap::new();

        info!(stream = %ctx.id(), service, "stream started");

        loop {
            tokio::select! {
                request = requests.next() => {
                    let request = match request {
                        Some(Ok(request)) => request,
                        Some(Err(error)) => {
                            error!(stream = %ctx.id(), %error, "stream error");
                            break;
                        }
                        None => break,
                    };

                    if ctx.node_hash().is_none() {
                        if let Some(node) = &request.node {
                            let hash = NodeHash::from_id(&node.id);
                            ctx.set_node(node.id.clone(), hash);
                            watch = Some(cache.create_watch(hash));
                        }
                    }
                    let Some(node) = ctx.node_hash() else {
                        warn!(stream = %ctx.id(), "request without node identity");
                        continue;
                    };

                    let Some(type_url) = resolve_type(&ctx, &fixed_type, &request) else {
                        continue;
                    };

                    if let Some(detail) = &request.error_detail {
                        handler.handle_nack(
                            &ctx,
                            &type_url,
                            &request.version_info,
                            &request.response_nonce,
                            &detail.message,
                        );
                    } else if !request.response_nonce.is_empty() {
                        handler.handle_ack(
                            &ctx,
                            &type_url,
                            &request.version_info,
                            &request.response_nonce,
                        );
                    }

                    let subscription = subscriptions.entry(type_url.clone()).or_default();
                    subscription.resource_names = request.resource_names.clone();

                    if let Some(response) = handler.process_request(
                        &ctx,
                        &type_url,
                        &request.version_info,
                        &request.resource_names,
                        node,
                    ) {
                        subscription.last_sent_version = response.version_info.clone();
                        if tx.send(Ok(response.into_discovery_response())).await.is_err() {
                            break;
                        }
                    }
                }

                snapshot = next_snapshot(&mut watch) => {
                    let Some(snapshot) = snapshot else { break };
                    if push_snapshot(&handler, &ctx, &snapshot, &mut subscriptions, &tx)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }

        info!(
            stream = %ctx.id(),
            service,
            duration = ?ctx.duration(),
            requests = ctx.request_count(),
            responses = ctx.response_count(),
            "stream ended"
        );
    });
}

/// The stream's type URL for one request.
fn resolve_type(
    ctx: &StreamContext,
    fixed_type: &Option<TypeUrl>,
    request: &DiscoveryRequest,
) -> Option<TypeUrl> {
    match fixed_type {
        Some(fixed) => {
            if !request.type_url.is_empty() && request.type_url != fixed.as_str() {
                error!(
                    stream = %ctx.id(),
                    expected = %fixed,
                    got = %request.type_url,
                    "wrong type URL for this service"
                );
                return None;
            }
            Some(fixed.clone())
        }
        None => {
            if request.type_url.is_empty() {
                warn!(stream = %ctx.id(), "ADS request without a type URL");
                return None;
            }
            Some(TypeUrl::new(request.type_url.clone()))
        }
    }
}

/// Resolves to the next snapshot update, pending forever until the client
/// has identified itself and a watch exists.
async fn next_snapshot(watch: &mut Option<Watch>) -> Option<Arc<Snapshot>> {
    match watch {
        Some(watch) => watch.recv().await,
        None => std::future::pending().await,
    }
}

/// Push a fresh snapshot to every subscription on this stream, in the
/// cluster -> endpoint -> route -> listener order Envoy expects.
async fn push_snapshot(
    handler: &SotwHandler,
    ctx: &StreamContext,
    snapshot: &Snapshot,
    subscriptions: &mut HashMap<TypeUrl, Subscription>,
    tx: &mpsc::Sender<Result<DiscoveryResponse, Status>>,
) -> Result<(), ()> {
    for type_url in TypeUrl::ALL {
        let type_url = TypeUrl::new(type_url);
        let Some(subscription) = subscriptions.get_mut(&type_url) else {
            continue;
        };
        let Some(response) = handler.respond_from_snapshot(
            ctx,
            snapshot,
            &type_url,
            &subscription.last_sent_version,
            &subscription.resource_names,
        ) else {
            continue;
        };
        subscription.last_sent_version = response.version_info.clone();
        if tx.send(Ok(response.into_discovery_response())).await.is_err() {
            return Err(());
        }
    }
    Ok(())
}
