//! Draw-call requests, render context and batching helpers
//!
//! Opaque requests are grouped by shader then material so a backend can
//! bind state once per run. Translucent requests are ordered back to front
//! for correct alpha compositing.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::{Camera, DrawCall, MaterialId, RenderableMesh, ShaderId};
use crate::scene::NodeId;

bitflags! {
    /// Which geometry a render call is expected to draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderPass: u8 {
        /// Depth-tested, non-blended geometry
        const OPAQUE = 0b0000_0001;
        /// Alpha-blended geometry, submitted back to front
        const TRANSLUCENT = 0b0000_0010;
    }
}

/// One draw call of one mesh of one visible scene node
#[derive(Debug, Clone, Copy)]
pub struct MeshBatchRequest<'a> {
    /// Node world transform
    pub transform: Mat4,
    /// Mesh the call belongs to
    pub mesh: &'a RenderableMesh,
    /// The draw call itself
    pub call: &'a DrawCall,
    /// Squared distance from the camera to the node's bounds center
    pub distance_from_camera: f32,
    /// Owning scene node, written to the picking buffer
    pub node_id: NodeId,
    /// Mesh index within the node, written to the picking buffer
    pub mesh_id: u32,
}

/// State shared by every draw in a render call
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Camera being rendered from
    pub camera: &'a Camera,
    /// Scene light, if any; backends fall back to the camera location
    pub light_position: Option<Vec3>,
    /// Pass being drawn
    pub render_pass: RenderPass,
    /// Shader overriding every draw call's own shader (picking)
    pub replacement_shader: Option<ShaderId>,
    /// Draw tool/debug materials too
    pub show_debug: bool,
}

impl RenderContext<'_> {
    /// Shader a request is drawn with in this context
    pub fn effective_shader(&self, request: &MeshBatchRequest<'_>) -> ShaderId {
        self.replacement_shader.unwrap_or(request.call.shader)
    }

    /// Same context for a different pass
    pub fn with_pass(mut self, render_pass: RenderPass) -> Self {
        self.render_pass = render_pass;
        self
    }
}

/// Batch renderer injected into the scene
///
/// Called once with the grouped opaque requests and once per translucent
/// request, farthest first.
pub type MeshBatchRenderer = Box<dyn FnMut(&[MeshBatchRequest<'_>], &RenderContext<'_>)>;

/// A run of requests sharing one shader and one material
#[derive(Debug, Clone, Copy)]
pub struct RenderBatch<'r, 'a> {
    /// Shader bound for the run
    pub shader: ShaderId,
    /// Material bound for the run
    pub material: MaterialId,
    /// Requests in submission order
    pub requests: &'r [MeshBatchRequest<'a>],
}

impl RenderBatch<'_, '_> {
    /// Get the number of requests in this batch
    pub fn object_count(&self) -> usize {
        self.requests.len()
    }
}

/// Stable grouping of requests by shader, then by material
///
/// Groups appear in order of first appearance and requests keep their
/// relative order inside a group. With a replacement shader every request
/// shares one shader group.
pub fn group_by_shader_and_material(
    requests: &mut [MeshBatchRequest<'_>],
    replacement_shader: Option<ShaderId>,
) {
    let shader_of = |request: &MeshBatchRequest<'_>| replacement_shader.unwrap_or(request.call.shader);

    let mut shader_rank: HashMap<ShaderId, usize> = HashMap::new();
    let mut material_rank: HashMap<(ShaderId, MaterialId), usize> = HashMap::new();
    for request in requests.iter() {
        let shader = shader_of(request);
        let next = shader_rank.len();
        shader_rank.entry(shader).or_insert(next);
        let next = material_rank.len();
        material_rank.entry((shader, request.call.material)).or_insert(next);
    }

    requests.sort_by_key(|request| {
        let shader = shader_of(request);
        (shader_rank[&shader], material_rank[&(shader, request.call.material)])
    });
}

/// Split grouped requests into contiguous shader/material runs
pub fn batches<'r, 'a>(
    requests: &'r [MeshBatchRequest<'a>],
    replacement_shader: Option<ShaderId>,
) -> Vec<RenderBatch<'r, 'a>> {
    let key = |request: &MeshBatchRequest<'_>| {
        (replacement_shader.unwrap_or(request.call.shader), request.call.material)
    };

    let mut result = Vec::new();
    let mut start = 0;
    while start < requests.len() {
        let (shader, material) = key(&requests[start]);
        let len = requests[start..]
            .iter()
            .take_while(|request| key(*request) == (shader, material))
            .count();
        result.push(RenderBatch {
            shader,
            material,
            requests: &requests[start..start + len],
        });
        start += len;
    }
    result
}

/// Order requests farthest first, keeping ties in their original order
pub fn sort_back_to_front(requests: &mut [MeshBatchRequest<'_>]) {
    requests.sort_by(|a, b| b.distance_from_camera.total_cmp(&a.distance_from_camera));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::AABB;

    fn mesh() -> RenderableMesh {
        RenderableMesh::new(0, AABB::new(Vec3::zeros(), Vec3::repeat(1.0)))
    }

    fn request<'a>(mesh: &'a RenderableMesh, call: &'a DrawCall, distance: f32, node: u32) -> MeshBatchRequest<'a> {
        MeshBatchRequest {
            transform: Mat4::identity(),
            mesh,
            call,
            distance_from_camera: distance,
            node_id: NodeId::new(node).unwrap(),
            mesh_id: 0,
        }
    }

    #[test]
    fn test_grouping_is_stable_by_first_appearance() {
        let mesh = mesh();
        let a1 = DrawCall::new(ShaderId(1), MaterialId(10), 0, 3);
        let b = DrawCall::new(ShaderId(2), MaterialId(20), 0, 3);
        let a2 = DrawCall::new(ShaderId(1), MaterialId(11), 0, 3);

        let mut requests = vec![
            request(&mesh, &a1, 0.0, 1),
            request(&mesh, &b, 0.0, 2),
            request(&mesh, &a2, 0.0, 3),
            request(&mesh, &a1, 0.0, 4),
            request(&mesh, &b, 0.0, 5),
        ];
        group_by_shader_and_material(&mut requests, None);

        let order: Vec<u32> = requests.iter().map(|r| r.node_id.get()).collect();
        assert_eq!(order, vec![1, 4, 3, 2, 5]);

        let runs = batches(&requests, None);
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].shader, runs[0].material, runs[0].object_count()), (ShaderId(1), MaterialId(10), 2));
        assert_eq!((runs[1].shader, runs[1].material), (ShaderId(1), MaterialId(11)));
        assert_eq!((runs[2].shader, runs[2].material, runs[2].object_count()), (ShaderId(2), MaterialId(20), 2));
    }

    #[test]
    fn test_replacement_shader_groups_by_material_only() {
        let mesh = mesh();
        let a = DrawCall::new(ShaderId(1), MaterialId(10), 0, 3);
        let b = DrawCall::new(ShaderId(2), MaterialId(20), 0, 3);
        let c = DrawCall::new(ShaderId(3), MaterialId(10), 0, 3);

        let mut requests = vec![request(&mesh, &a, 0.0, 1), request(&mesh, &b, 0.0, 2), request(&mesh, &c, 0.0, 3)];
        group_by_shader_and_material(&mut requests, Some(ShaderId(99)));

        let order: Vec<u32> = requests.iter().map(|r| r.node_id.get()).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(batches(&requests, Some(ShaderId(99))).iter().all(|run| run.shader == ShaderId(99)));
    }

    #[test]
    fn test_sort_back_to_front() {
        let mesh = mesh();
        let call = DrawCall::new(ShaderId(1), MaterialId(1), 0, 3);
        let mut requests = vec![
            request(&mesh, &call, 4.0, 1),
            request(&mesh, &call, 25.0, 2),
            request(&mesh, &call, 4.0, 3),
            request(&mesh, &call, 9.0, 4),
        ];
        sort_back_to_front(&mut requests);

        let order: Vec<u32> = requests.iter().map(|r| r.node_id.get()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_render_pass_flags() {
        assert!((RenderPass::OPAQUE | RenderPass::TRANSLUCENT).contains(RenderPass::OPAQUE));
        assert!(!RenderPass::OPAQUE.contains(RenderPass::TRANSLUCENT));
    }

    #[test]
    fn test_batches_of_empty_queue() {
        assert!(batches(&[], None).is_empty());
    }
}
