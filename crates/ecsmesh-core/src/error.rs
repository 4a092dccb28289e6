//! Error types for the control plane.
//!
//! One enum covers the whole taxonomy: configuration problems are fatal at
//! startup, inventory and publish problems abort a single reconciliation
//! cycle, and invariant violations terminate the process. The conversion to
//! [`tonic::Status`] is used by the gRPC serving layer.

/// Control-plane error.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// Malformed or missing configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A cluster-inventory operation failed. Recoverable: the current
    /// reconciliation cycle is abandoned and the previous snapshot stays
    /// authoritative.
    #[error("inventory error during {operation}: {source}")]
    Inventory {
        /// The provider operation that failed, e.g. `DescribeTasks`.
        operation: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The snapshot cache rejected a publication. Recoverable, warn-logged.
    #[error("publish rejected: {0}")]
    Publish(String),

    /// A core invariant was broken. Indicates a logic defect; the process
    /// terminates with a diagnostic.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// A resource failed to encode to its wire form.
    #[error("encoding error for {type_url}: {message}")]
    Encoding {
        /// Type URL of the resource being encoded.
        type_url: String,
        /// What went wrong.
        message: String,
    },

    /// A watch subscription was closed by its consumer.
    #[error("watch closed: watch_id={watch_id}")]
    WatchClosed {
        /// Identifier of the closed watch.
        watch_id: u64,
    },
}

impl MeshError {
    /// Wrap a provider failure, naming the operation that produced it.
    pub fn inventory<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inventory {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Build an invariant violation from a diagnostic message.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Whether this error must terminate the process rather than the cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Invariant(_))
    }
}

impl From<MeshError> for tonic::Status {
    fn from(err: MeshError) -> Self {
        match &err {
            MeshError::Config(_) => tonic::Status::invalid_argument(err.to_string()),
            MeshError::Inventory { .. } => tonic::Status::unavailable(err.to_string()),
            MeshError::Publish(_) | MeshError::Invariant(_) => {
                tonic::Status::internal(err.to_string())
            }
            MeshError::Encoding { .. } => tonic::Status::invalid_argument(err.to_string()),
            MeshError::WatchClosed { .. } => tonic::Status::cancelled(err.to_string()),
        }
    }
}
