//! Snapshot: an immutable, versioned collection of xDS resources.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecsmesh_core::{BoxResource, TypeUrl};

/// Resources of one type within a snapshot.
///
/// Keyed by resource name in a `BTreeMap` so iteration order, and therefore
/// the wire order of responses, is deterministic for a given resource set.
#[derive(Debug, Clone, Default)]
pub struct SnapshotResources {
    version: String,
    resources: BTreeMap<String, BoxResource>,
}

impl SnapshotResources {
    /// Create an empty collection at a version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            resources: BTreeMap::new(),
        }
    }

    /// The version of this resource set.
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of resources.
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether there are no resources.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up a resource by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.resources.get(name)
    }

    /// All resource names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    /// All resources, sorted by name.
    pub fn to_vec(&self) -> Vec<BoxResource> {
        self.resources.values().cloned().collect()
    }
}

/// An immutable snapshot of xDS resources for one node.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: String,
    resources: BTreeMap<TypeUrl, SnapshotResources>,
}

impl Snapshot {
    /// Start building a snapshot.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// The snapshot version.
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resources of one type, if present.
    #[inline]
    pub fn get_resources(&self, type_url: &TypeUrl) -> Option<&SnapshotResources> {
        self.resources.get(type_url)
    }

    /// Whether the snapshot carries resources of a type.
    #[inline]
    pub fn contains_type(&self, type_url: &TypeUrl) -> bool {
        self.resources.contains_key(type_url)
    }

    /// Total resources across all types.
    pub fn total_resources(&self) -> usize {
        self.resources.values().map(SnapshotResources::len).sum()
    }

    /// Whether the snapshot carries no resources at all. An empty snapshot
    /// is still valid to publish; it drains every upstream pool.
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(SnapshotResources::is_empty)
    }
}

/// Builder for [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    version: String,
    resources: BTreeMap<TypeUrl, SnapshotResources>,
}

impl SnapshotBuilder {
    /// Set the snapshot version. All resource types share it.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add the resources of one type.
    pub fn resources(
        mut self,
        type_url: TypeUrl,
        resources: impl IntoIterator<Item = BoxResource>,
    ) -> Self {
        let mut set = SnapshotResources::new(self.version.clone());
        for resource in resources {
            set.resources.insert(resource.name().to_string(), resource);
        }
        self.resources.insert(type_url, set);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            version: self.version,
            resources: self.resources,
        }
    }
}

/// Convenience alias for the sharing unit handed to streams.
pub type SharedSnapshot = Arc<Snapshot>;
