//! State-of-the-World request handling, shared by all five services.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use ecsmesh_cache::{Cache, ShardedCache, Snapshot};
use ecsmesh_core::{BoxResource, NodeHash, TypeUrl};
use ecsmesh_types::DiscoveryResponse;

use crate::stream::StreamContext;

/// Answers State-of-the-World requests from the latest snapshot.
#[derive(Debug)]
pub struct SotwHandler {
    cache: Arc<ShardedCache>,
}

impl SotwHandler {
    /// Create a handler over the cache.
    pub fn new(cache: Arc<ShardedCache>) -> Self {
        Self { cache }
    }

    /// The backing cache.
    #[inline]
    pub fn cache(&self) -> &ShardedCache {
        &self.cache
    }

    /// Answer one request. `None` when no snapshot exists for the node, the
    /// snapshot lacks the requested type, or the client already holds the
    /// current version.
    pub fn process_request(
        &self,
        ctx: &StreamContext,
        type_url: &TypeUrl,
        version_info: &str,
        resource_names: &[String],
        node: NodeHash,
    ) -> Option<SotwResponse> {
        ctx.record_request();
        trace!(
            stream = %ctx.id(),
            type_url = %type_url,
            version = %version_info,
            "processing request"
        );

        let snapshot = match self.cache.get_snapshot(node) {
            Some(snapshot) => snapshot,
            None => {
                debug!(stream = %ctx.id(), node = %node, "no snapshot for node");
                return None;
            }
        };
        self.respond_from_snapshot(ctx, &snapshot, type_url, version_info, resource_names)
    }

    /// Build a response for one type from a given snapshot, skipping it when
    /// the client already holds that version. Used both on the request path
    /// and when a watch delivers a new snapshot.
    pub fn respond_from_snapshot(
        &self,
        ctx: &StreamContext,
        snapshot: &Snapshot,
        type_url: &TypeUrl,
        have_version: &str,
        resource_names: &[String],
    ) -> Option<SotwResponse> {
        let resources = snapshot.get_resources(type_url)?;
        if !have_version.is_empty() && have_version == resources.version() {
            trace!(stream = %ctx.id(), version = %have_version, "client is current");
            return None;
        }

        let selected: Vec<BoxResource> = if resource_names.is_empty() {
            resources.to_vec()
        } else {
            resource_names
                .iter()
                .filter_map(|name| resources.get(name).cloned())
                .collect()
        };

        debug!(
            stream = %ctx.id(),
            type_url = %type_url,
            version = %resources.version(),
            count = selected.len(),
            "sending response"
        );
        ctx.record_response();

        Some(SotwResponse {
            version_info: resources.version().to_string(),
            resources: selected,
            type_url: type_url.clone(),
            nonce: generate_nonce(),
        })
    }

    /// Record a client ACK.
    pub fn handle_ack(&self, ctx: &StreamContext, type_url: &TypeUrl, version: &str, nonce: &str) {
        debug!(
            stream = %ctx.id(),
            type_url = %type_url,
            version = %version,
            nonce = %nonce,
            "ACK"
        );
    }

    /// Record a client NACK. The previous snapshot stays in place; the
    /// rejected version is simply never re-sent until a new one is built.
    pub fn handle_nack(
        &self,
        ctx: &StreamContext,
        type_url: &TypeUrl,
        version: &str,
        nonce: &str,
        error: &str,
    ) {
        warn!(
            stream = %ctx.id(),
            type_url = %type_url,
            version = %version,
            nonce = %nonce,
            error = %error,
            "NACK"
        );
    }
}

/// A response ready to be encoded onto a stream.
#[derive(Debug, Clone)]
pub struct SotwResponse {
    /// Version of the resource set.
    pub version_info: String,
    /// The resources to send.
    pub resources: Vec<BoxResource>,
    /// Their type URL.
    pub type_url: TypeUrl,
    /// Correlation nonce.
    pub nonce: String,
}

impl SotwResponse {
    /// Encode into the wire message. Resources that fail to encode are
    /// dropped with a warning rather than poisoning the stream.
    pub fn into_discovery_response(self) -> DiscoveryResponse {
        let resources = self
            .resources
            .iter()
            .filter_map(|resource| match resource.encode() {
                Ok(any) => Some(any),
                Err(error) => {
                    warn!(name = resource.name(), %error, "dropping unencodable resource");
                    None
                }
            })
            .collect();
        DiscoveryResponse {
            version_info: self.version_info,
            resources,
            canary: false,
            type_url: self.type_url.to_string(),
            nonce: self.nonce,
        }
    }
}

/// Nonces combine a timestamp with a counter so they stay unique under
/// concurrent streams.
fn generate_nonce() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{timestamp:x}-{count:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecsmesh_core::{MeshError, Resource};

    #[derive(Debug)]
    struct Named(&'static str);

    impl Resource for Named {
        fn type_url(&self) -> &str {
            TypeUrl::CLUSTER
        }
        fn name(&self) -> &str {
            self.0
        }
        fn encode(&self) -> Result<prost_types::Any, MeshError> {
            Ok(prost_types::Any {
                type_url: TypeUrl::CLUSTER.to_string(),
                value: self.0.as_bytes().to_vec(),
            })
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn handler_with_snapshot() -> (SotwHandler, NodeHash) {
        let cache = Arc::new(ShardedCache::new());
        let node = NodeHash::from_id("sidecar");
        cache.set_snapshot(
            node,
            Snapshot::builder()
                .version("v1")
                .resources(
                    TypeUrl::new(TypeUrl::CLUSTER),
                    [Arc::new(Named("svc-a")) as BoxResource],
                )
                .build(),
        );
        (SotwHandler::new(cache), node)
    }

    #[test]
    fn no_snapshot_no_response() {
        let handler = SotwHandler::new(Arc::new(ShardedCache::new()));
        let ctx = StreamContext::new();
        let response = handler.process_request(
            &ctx,
            &TypeUrl::new(TypeUrl::CLUSTER),
            "",
            &[],
            NodeHash::from_id("unknown"),
        );
        assert!(response.is_none());
    }

    #[test]
    fn current_version_elides_response() {
        let (handler, node) = handler_with_snapshot();
        let ctx = StreamContext::new();
        let type_url = TypeUrl::new(TypeUrl::CLUSTER);

        let first = handler
            .process_request(&ctx, &type_url, "", &[], node)
            .expect("initial response");
        assert_eq!(first.version_info, "v1");

        let ack = handler.process_request(&ctx, &type_url, "v1", &[], node);
        assert!(ack.is_none());
    }

    #[test]
    fn name_filter_selects_subset() {
        let (handler, node) = handler_with_snapshot();
        let ctx = StreamContext::new();
        let type_url = TypeUrl::new(TypeUrl::CLUSTER);

        let response = handler
            .process_request(&ctx, &type_url, "", &["svc-a".into()], node)
            .expect("response");
        assert_eq!(response.resources.len(), 1);

        let response = handler
            .process_request(&ctx, &type_url, "", &["absent".into()], node)
            .expect("response");
        assert!(response.resources.is_empty());
    }

    #[test]
    fn wire_conversion_encodes_resources() {
        let (handler, node) = handler_with_snapshot();
        let ctx = StreamContext::new();
        let response = handler
            .process_request(&ctx, &TypeUrl::new(TypeUrl::CLUSTER), "", &[], node)
            .expect("response")
            .into_discovery_response();
        assert_eq!(response.version_info, "v1");
        assert_eq!(response.resources.len(), 1);
        assert_eq!(response.type_url, TypeUrl::CLUSTER);
        assert!(!response.nonce.is_empty());
    }

    #[test]
    fn nonces_unique() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
