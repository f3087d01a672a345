//! Draw calls and renderable meshes
//!
//! These are produced by the asset/material side of the system; the scene
//! only reads the pre-split opaque and blended draw-call lists.

use crate::spatial::AABB;

/// Unique identifier for shader programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Unique identifier for materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// One indexed draw of a mesh section with a single shader and material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    /// Shader program used for this call
    pub shader: ShaderId,
    /// Material bound for this call
    pub material: MaterialId,
    /// First index in the index buffer
    pub start_index: u32,
    /// Number of indices to draw
    pub index_count: u32,
}

impl DrawCall {
    /// Create a draw call over an index range
    pub fn new(shader: ShaderId, material: MaterialId, start_index: u32, index_count: u32) -> Self {
        Self {
            shader,
            material,
            start_index,
            index_count,
        }
    }
}

/// Mesh with its draw calls already partitioned by blending
#[derive(Debug, Clone)]
pub struct RenderableMesh {
    /// Local-space bounds of the mesh
    pub bounding_box: AABB,
    /// Draw calls rendered in the opaque pass
    pub draw_calls_opaque: Vec<DrawCall>,
    /// Draw calls rendered back-to-front in the translucent pass
    pub draw_calls_blended: Vec<DrawCall>,
    /// Index of this mesh within its owning model
    pub mesh_index: u32,
}

impl RenderableMesh {
    /// Create a mesh with no draw calls
    pub fn new(mesh_index: u32, bounding_box: AABB) -> Self {
        Self {
            bounding_box,
            draw_calls_opaque: Vec::new(),
            draw_calls_blended: Vec::new(),
            mesh_index,
        }
    }

    /// File a draw call into the opaque or blended list
    pub fn push_draw_call(&mut self, call: DrawCall, blended: bool) {
        if blended {
            self.draw_calls_blended.push(call);
        } else {
            self.draw_calls_opaque.push(call);
        }
    }

    /// Builder form of [`RenderableMesh::push_draw_call`]
    pub fn with_draw_call(mut self, call: DrawCall, blended: bool) -> Self {
        self.push_draw_call(call, blended);
        self
    }
}

/// Capability of scene nodes that expose batchable meshes
pub trait MeshCollection {
    /// Meshes whose draw calls the scene batches on the node's behalf
    fn renderable_meshes(&self) -> &[RenderableMesh];
}
