//! Scene graph: node contract, node handles and the scene coordinator

pub mod scene_manager;
pub mod scene_node;

pub use scene_manager::{FrameStats, Scene, SceneConfig};
pub use scene_node::{NodeId, SceneNode, SceneNodeBase, UpdateContext};

use thiserror::Error;

use crate::config::ConfigError;
use crate::spatial::SpatialError;

/// Errors raised while building a scene
#[derive(Error, Debug)]
pub enum SceneError {
    /// The spatial index rejected the world size
    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),

    /// Scene settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
