//! # ecsmesh-core
//!
//! Core types shared by every ecsmesh crate:
//!
//! - [`MeshError`] - the error taxonomy for the whole control plane, with
//!   gRPC status code mapping
//! - [`NodeHash`] - Envoy node identification using FNV-1a hashing
//! - [`Resource`] - trait implemented by every xDS resource the plane emits
//! - [`TypeUrl`] - type URL handling and constants for the v2 resource family
//! - [`VersionSequence`] - monotonic snapshot version minting

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod node;
mod resource;
mod type_url;
mod version;

pub use error::MeshError;
pub use node::NodeHash;
pub use resource::{BoxResource, Resource};
pub use type_url::TypeUrl;
pub use version::VersionSequence;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;
