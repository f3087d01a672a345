//! Rendering-side types consumed by the scene
//!
//! The scene never talks to a graphics backend. It hands grouped and
//! ordered [`MeshBatchRequest`]s to an injected batch renderer together
//! with a [`RenderContext`]; everything below that line belongs to the
//! backend.

mod camera;
mod draw_call;
mod render_queue;

pub use camera::{Camera, PickingTarget};
pub use draw_call::{DrawCall, MaterialId, MeshCollection, RenderableMesh, ShaderId};
pub use render_queue::{
    batches, group_by_shader_and_material, sort_back_to_front, MeshBatchRenderer,
    MeshBatchRequest, RenderBatch, RenderContext, RenderPass,
};
