//! Spatial partitioning data structures
//!
//! Bounding volumes, the view frustum, and the octree that indexes scene
//! nodes for visibility queries.

mod aabb;
mod frustum;
mod octree;

pub use aabb::AABB;
pub use frustum::{Frustum, FrustumPlane, Plane};
pub use octree::{Element, NodeIndex, Octree, OctreeConfig, OctreeNode, QueryVolume};

use thiserror::Error;

/// Errors raised while building spatial structures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Octree root size must be positive and finite
    #[error("Invalid octree size: {0} (must be positive and finite)")]
    InvalidSize(f32),

    /// Octree thresholds that would never stop subdividing
    #[error("Invalid octree config: {0}")]
    InvalidConfig(String),
}
