//! # Scene Engine
//!
//! Scene management for a 3D renderer: scene nodes indexed in octrees,
//! frustum culling, and draw-call batching handed to a pluggable backend.
//!
//! ## Features
//!
//! - **Octree indexing**: separate static and dynamic trees with in-place
//!   re-homing of moving nodes
//! - **Frustum culling**: planes extracted from any view-projection matrix
//! - **Batching**: opaque draws grouped by shader and material, translucent
//!   draws sorted back to front
//! - **Picking**: optional off-screen id pass driven from the camera
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! let mut scene = Scene::new(
//!     |requests: &[MeshBatchRequest<'_>], context: &RenderContext<'_>| {
//!         println!("{} draws in {:?}", requests.len(), context.render_pass);
//!     },
//!     1024.0,
//! )?;
//!
//! let mut camera = Camera::default();
//! scene.update(1.0 / 60.0);
//! scene.render_with_camera(&mut camera, None);
//! # Ok::<(), SceneError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        render::{
            Camera, DrawCall, MaterialId, MeshBatchRequest, MeshCollection, PickingTarget, RenderContext, RenderPass,
            RenderableMesh, ShaderId,
        },
        scene::{FrameStats, NodeId, Scene, SceneConfig, SceneError, SceneNode, SceneNodeBase, UpdateContext},
        spatial::{Frustum, Octree, OctreeConfig, AABB},
    };
}
