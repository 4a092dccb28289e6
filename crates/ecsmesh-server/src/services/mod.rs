//! The five discovery service implementations.
//!
//! All of them delegate to the shared stream driver; the only difference is
//! the pinned resource type (or none, for ADS).

pub mod ads;
pub mod cds;
pub mod eds;
pub mod lds;
pub mod rds;

pub use ads::AdsService;
pub use cds::CdsService;
pub use eds::EdsService;
pub use lds::LdsService;
pub use rds::RdsService;

use std::sync::Arc;

use ecsmesh_cache::ShardedCache;

use crate::sotw::SotwHandler;

/// The full service set over one cache and one shared handler.
#[derive(Debug)]
pub struct DiscoveryServices {
    /// Aggregated discovery.
    pub ads: AdsService,
    /// Cluster discovery.
    pub cds: CdsService,
    /// Endpoint discovery.
    pub eds: EdsService,
    /// Route discovery.
    pub rds: RdsService,
    /// Listener discovery.
    pub lds: LdsService,
}

impl DiscoveryServices {
    /// Build all five services.
    pub fn new(cache: Arc<ShardedCache>, handler: Arc<SotwHandler>) -> Self {
        Self {
            ads: AdsService::new(Arc::clone(&cache), Arc::clone(&handler)),
            cds: CdsService::new(Arc::clone(&cache), Arc::clone(&handler)),
            eds: EdsService::new(Arc::clone(&cache), Arc::clone(&handler)),
            rds: RdsService::new(Arc::clone(&cache), Arc::clone(&handler)),
            lds: LdsService::new(cache, handler),
        }
    }
}
