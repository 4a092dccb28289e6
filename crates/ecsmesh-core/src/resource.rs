//! The resource trait implemented by everything the control plane serves.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An xDS resource that can be stored in a snapshot and streamed to Envoy.
///
/// The concrete implementations live in `ecsmesh-types`, one per resource
/// kind (cluster, load assignment, route configuration, listener).
pub trait Resource: Send + Sync + fmt::Debug {
    /// The protobuf type URL of this resource.
    fn type_url(&self) -> &str;

    /// The resource name, unique within its type in one snapshot.
    fn name(&self) -> &str;

    /// Encode to the `Any` wrapper carried in discovery responses.
    fn encode(&self) -> Result<prost_types::Any, crate::MeshError>;

    /// Downcast support for callers that know the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A shared, immutable resource. `Arc` so that one resource can sit in a
/// snapshot while being streamed on any number of connections.
pub type BoxResource = Arc<dyn Resource>;
