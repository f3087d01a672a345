//! # Scene
//!
//! Owns every scene node, keeps them indexed in two octrees, and turns a
//! camera's view into draw requests for the injected batch renderer.
//!
//! ## Frame flow
//! 1. [`Scene::update`] advances every node and re-homes dynamic nodes whose
//!    bounds changed.
//! 2. [`Scene::render_with_camera`] optionally runs a picking pass, then
//!    culls both octrees against the frustum, batches opaque draw calls by
//!    shader and material, and submits translucent ones back to front.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::foundation::math::Vec3;
use crate::render::{
    group_by_shader_and_material, sort_back_to_front, Camera, MeshBatchRenderer, MeshBatchRequest, RenderContext,
    RenderPass, ShaderId,
};
use crate::scene::{NodeId, SceneError, SceneNode, UpdateContext};
use crate::spatial::{Frustum, Octree, OctreeConfig, QueryVolume, AABB};

/// Scene construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Edge length of both octree root cubes, centered on the origin
    pub size_hint: f32,
    /// Subdivision tuning shared by both octrees
    pub octree: OctreeConfig,
    /// Initial debug-drawing flag
    pub show_debug: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            size_hint: 32768.0,
            octree: OctreeConfig::default(),
            show_debug: false,
        }
    }
}

impl Config for SceneConfig {}

/// Counters from one render pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes that survived frustum culling
    pub visible_nodes: usize,
    /// Opaque draw requests handed to the batch renderer
    pub opaque_requests: usize,
    /// Translucent draw requests handed to the batch renderer
    pub blended_requests: usize,
    /// Nodes that rendered themselves
    pub loose_nodes: usize,
}

/// Scene coordinator
///
/// Static nodes are expected to keep their bounds; dynamic nodes may move
/// every frame and are tracked in their own octree.
pub struct Scene {
    static_octree: Octree<NodeId>,
    dynamic_octree: Octree<NodeId>,
    static_nodes: Vec<Box<dyn SceneNode>>,
    dynamic_nodes: Vec<Box<dyn SceneNode>>,
    /// Box each dynamic slot is filed under, `None` while unindexed
    dynamic_indexed: Vec<Option<AABB>>,
    mesh_batch_renderer: MeshBatchRenderer,
    /// Scene light passed to every render context
    pub light_position: Option<Vec3>,
    /// Draw tool/debug materials too
    pub show_debug: bool,
}

impl Scene {
    /// Create an empty scene whose octrees span `size_hint` around the origin
    pub fn new<F>(mesh_batch_renderer: F, size_hint: f32) -> Result<Self, SceneError>
    where
        F: FnMut(&[MeshBatchRequest<'_>], &RenderContext<'_>) + 'static,
    {
        Self::with_config(
            mesh_batch_renderer,
            &SceneConfig {
                size_hint,
                ..SceneConfig::default()
            },
        )
    }

    /// Create an empty scene from explicit settings
    pub fn with_config<F>(mesh_batch_renderer: F, config: &SceneConfig) -> Result<Self, SceneError>
    where
        F: FnMut(&[MeshBatchRequest<'_>], &RenderContext<'_>) + 'static,
    {
        let static_octree = Octree::new(config.size_hint, config.octree.clone())?;
        let dynamic_octree = Octree::new(config.size_hint, config.octree.clone())?;

        log::info!("Scene created with world size {}", config.size_hint);

        Ok(Self {
            static_octree,
            dynamic_octree,
            static_nodes: Vec::new(),
            dynamic_nodes: Vec::new(),
            dynamic_indexed: Vec::new(),
            mesh_batch_renderer: Box::new(mesh_batch_renderer),
            light_position: None,
            show_debug: config.show_debug,
        })
    }

    /// Create an empty scene from a `.toml` or `.ron` settings file
    pub fn from_config_file<F>(mesh_batch_renderer: F, path: impl AsRef<Path>) -> Result<Self, SceneError>
    where
        F: FnMut(&[MeshBatchRequest<'_>], &RenderContext<'_>) + 'static,
    {
        let config = SceneConfig::load_from_file(path)?;
        Self::with_config(mesh_batch_renderer, &config)
    }

    /// Take ownership of a node, index it, and return its handle
    pub fn add<N: SceneNode + 'static>(&mut self, node: N, dynamic: bool) -> NodeId {
        let mut node: Box<dyn SceneNode> = Box::new(node);
        let (id, nodes, octree) = if dynamic {
            (
                NodeId::dynamic_at(self.dynamic_nodes.len()),
                &mut self.dynamic_nodes,
                &mut self.dynamic_octree,
            )
        } else {
            (
                NodeId::static_at(self.static_nodes.len()),
                &mut self.static_nodes,
                &mut self.static_octree,
            )
        };

        node.base_mut().set_id(id);
        let bounds = *node.base().bounding_box();
        octree.insert(id, bounds);
        log::debug!("Added {} node {} '{}'", if dynamic { "dynamic" } else { "static" }, id, node.base().name);
        nodes.push(node);
        if dynamic {
            self.dynamic_indexed.push(Some(bounds));
        }
        id
    }

    /// Look a node up by raw id; zero and unknown ids yield `None`
    pub fn find(&self, id: u32) -> Option<&dyn SceneNode> {
        self.node(NodeId::new(id)?)
    }

    /// Mutable form of [`Scene::find`]
    ///
    /// Moving a dynamic node through this handle takes effect in the index
    /// on the next [`Scene::update`]. Static nodes are never re-indexed.
    pub fn find_mut(&mut self, id: u32) -> Option<&mut dyn SceneNode> {
        self.node_mut(NodeId::new(id)?)
    }

    /// Look a node up by handle
    pub fn node(&self, id: NodeId) -> Option<&dyn SceneNode> {
        lookup(&self.static_nodes, &self.dynamic_nodes, id)
    }

    /// Mutable form of [`Scene::node`]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut dyn SceneNode> {
        let nodes = if id.is_dynamic() { &mut self.dynamic_nodes } else { &mut self.static_nodes };
        nodes
            .get_mut(id.slot())
            .map(|node| node.as_mut() as &mut dyn SceneNode)
    }

    /// Every node, static first
    pub fn all_nodes(&self) -> impl Iterator<Item = &dyn SceneNode> {
        self.static_nodes
            .iter()
            .chain(self.dynamic_nodes.iter())
            .map(|node| node.as_ref())
    }

    /// Number of nodes in the scene
    pub fn node_count(&self) -> usize {
        self.static_nodes.len() + self.dynamic_nodes.len()
    }

    /// Handles of enabled nodes overlapping a volume, static first
    pub fn query<V: QueryVolume>(&self, volume: &V) -> Vec<NodeId> {
        let mut results = self.static_octree.query(volume);
        self.dynamic_octree.query_into(volume, &mut results);
        results
    }

    /// Advance every node by `timestep` seconds
    pub fn update(&mut self, timestep: f32) {
        let context = UpdateContext { timestep };

        for node in &mut self.static_nodes {
            node.update(&context);
        }

        for (slot, (node, indexed)) in self
            .dynamic_nodes
            .iter_mut()
            .zip(self.dynamic_indexed.iter_mut())
            .enumerate()
        {
            node.update(&context);
            let new_bounds = *node.base().bounding_box();

            let Some(old_bounds) = indexed.filter(|old| *old != new_bounds) else {
                continue;
            };
            let id = NodeId::dynamic_at(slot);
            if !self.dynamic_octree.update(id, &old_bounds, new_bounds) {
                log::warn!("Dynamic node {} was not indexed at {}", id, old_bounds);
            }
            *indexed = Some(new_bounds);
        }
    }

    /// Show only nodes whose layer is in `enabled_layers`
    ///
    /// Both octrees are rebuilt from scratch.
    pub fn set_enabled_layers(&mut self, enabled_layers: &HashSet<String>) {
        self.static_octree.clear();
        self.dynamic_octree.clear();

        let mut enabled = 0;
        for (slot, node) in self.static_nodes.iter_mut().enumerate() {
            if reindex(node.as_mut(), enabled_layers, &mut self.static_octree, NodeId::static_at(slot)).is_some() {
                enabled += 1;
            }
        }
        for (slot, (node, indexed)) in self
            .dynamic_nodes
            .iter_mut()
            .zip(self.dynamic_indexed.iter_mut())
            .enumerate()
        {
            *indexed = reindex(node.as_mut(), enabled_layers, &mut self.dynamic_octree, NodeId::dynamic_at(slot));
            if indexed.is_some() {
                enabled += 1;
            }
        }

        log::debug!(
            "Enabled layers {:?}: {} of {} nodes indexed",
            enabled_layers,
            enabled,
            self.node_count()
        );
    }

    /// Render the scene from `camera`
    ///
    /// Culls against `cull_frustum` when given, else the camera's own
    /// frustum. An active picker on the camera gets its own pass first.
    pub fn render_with_camera(&mut self, camera: &mut Camera, cull_frustum: Option<&Frustum>) -> FrameStats {
        let picking_shader = match camera.picker_mut() {
            Some(picker) if picker.is_active() => {
                picker.begin();
                Some(picker.shader())
            }
            _ => None,
        };

        if let Some(shader) = picking_shader {
            let stats = self.render_pass(camera, cull_frustum, Some(shader));
            log::trace!("Picking pass: {:?}", stats);
            if let Some(picker) = camera.picker_mut() {
                picker.finish();
            }
        }

        let replacement_shader = camera
            .picker()
            .filter(|picker| picker.is_debug())
            .map(|picker| picker.debug_shader());

        let stats = self.render_pass(camera, cull_frustum, replacement_shader);
        log::trace!("Render pass: {:?}", stats);
        stats
    }

    /// Drop every node and empty both octrees
    pub fn clear(&mut self) {
        self.static_octree.clear();
        self.dynamic_octree.clear();
        self.static_nodes.clear();
        self.dynamic_nodes.clear();
        self.dynamic_indexed.clear();
    }

    fn render_pass(
        &mut self,
        camera: &Camera,
        cull_frustum: Option<&Frustum>,
        replacement_shader: Option<ShaderId>,
    ) -> FrameStats {
        let frustum = cull_frustum.unwrap_or_else(|| camera.view_frustum());
        let visible = self.query(frustum);

        let Self {
            ref static_nodes,
            ref dynamic_nodes,
            ref mut mesh_batch_renderer,
            light_position,
            show_debug,
            ..
        } = *self;

        let location = camera.location();
        let mut opaque: Vec<MeshBatchRequest<'_>> = Vec::new();
        let mut blended: Vec<MeshBatchRequest<'_>> = Vec::new();
        let mut loose: Vec<(f32, &dyn SceneNode)> = Vec::new();

        for &id in &visible {
            let Some(node) = lookup(static_nodes, dynamic_nodes, id) else {
                continue;
            };
            let base = node.base();
            let distance_from_camera = (base.bounding_box().center() - location).magnitude_squared();

            let Some(collection) = node.as_mesh_collection() else {
                loose.push((distance_from_camera, node));
                continue;
            };

            for mesh in collection.renderable_meshes() {
                for (calls, requests) in [
                    (&mesh.draw_calls_opaque, &mut opaque),
                    (&mesh.draw_calls_blended, &mut blended),
                ] {
                    requests.extend(calls.iter().map(|call| MeshBatchRequest {
                        transform: *base.transform(),
                        mesh,
                        call,
                        distance_from_camera,
                        node_id: id,
                        mesh_id: mesh.mesh_index,
                    }));
                }
            }
        }

        loose.sort_by(|a, b| b.0.total_cmp(&a.0));

        let context = RenderContext {
            camera,
            light_position,
            render_pass: RenderPass::OPAQUE,
            replacement_shader,
            show_debug,
        };

        group_by_shader_and_material(&mut opaque, replacement_shader);
        mesh_batch_renderer(&opaque, &context);
        for (_, node) in &loose {
            node.render(&context);
        }

        let context = context.with_pass(RenderPass::TRANSLUCENT);
        sort_back_to_front(&mut blended);
        for request in &blended {
            mesh_batch_renderer(std::slice::from_ref(request), &context);
        }
        for (_, node) in &loose {
            node.render(&context);
        }

        FrameStats {
            visible_nodes: visible.len(),
            opaque_requests: opaque.len(),
            blended_requests: blended.len(),
            loose_nodes: loose.len(),
        }
    }
}

fn lookup<'n>(
    static_nodes: &'n [Box<dyn SceneNode>],
    dynamic_nodes: &'n [Box<dyn SceneNode>],
    id: NodeId,
) -> Option<&'n dyn SceneNode> {
    let nodes = if id.is_dynamic() { dynamic_nodes } else { static_nodes };
    nodes.get(id.slot()).map(|node| node.as_ref())
}

/// Apply the layer filter to one node, inserting it when enabled
///
/// Returns the box the node was filed under.
fn reindex(
    node: &mut dyn SceneNode,
    enabled_layers: &HashSet<String>,
    octree: &mut Octree<NodeId>,
    id: NodeId,
) -> Option<AABB> {
    let base = node.base_mut();
    base.layer_enabled = enabled_layers.contains(&base.layer_name);
    if !base.layer_enabled {
        return None;
    }
    let bounds = *base.bounding_box();
    octree.insert(id, bounds);
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Transform};
    use crate::render::{DrawCall, MaterialId, MeshCollection, PickingTarget, RenderableMesh};
    use crate::scene::SceneNodeBase;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// What the batch renderer saw: (pass, node ids, shaders)
    type Log = Rc<RefCell<Vec<(RenderPass, Vec<u32>, Vec<ShaderId>)>>>;

    fn recording_scene() -> (Scene, Log) {
        let log: Log = Rc::default();
        let sink = Rc::clone(&log);
        let scene = Scene::new(
            move |requests: &[MeshBatchRequest<'_>], context: &RenderContext<'_>| {
                sink.borrow_mut().push((
                    context.render_pass,
                    requests.iter().map(|r| r.node_id.get()).collect(),
                    requests.iter().map(|r| context.effective_shader(r)).collect(),
                ));
            },
            1024.0,
        )
        .unwrap();
        (scene, log)
    }

    fn unit_box() -> AABB {
        AABB::new(Vec3::repeat(-0.5), Vec3::repeat(0.5))
    }

    fn at(position: Vec3) -> Mat4 {
        Transform::from_position(position).to_matrix()
    }

    struct MeshNode {
        base: SceneNodeBase,
        meshes: Vec<RenderableMesh>,
        velocity: Vec3,
    }

    impl MeshNode {
        fn new(position: Vec3, call: DrawCall, blended: bool) -> Self {
            Self {
                base: SceneNodeBase::new(unit_box()).with_transform(at(position)),
                meshes: vec![RenderableMesh::new(0, unit_box()).with_draw_call(call, blended)],
                velocity: Vec3::zeros(),
            }
        }
    }

    impl SceneNode for MeshNode {
        fn base(&self) -> &SceneNodeBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut SceneNodeBase {
            &mut self.base
        }

        fn update(&mut self, context: &UpdateContext) {
            if self.velocity != Vec3::zeros() {
                let moved = self.base.transform().append_translation(&(self.velocity * context.timestep));
                self.base.set_transform(moved);
            }
        }

        fn as_mesh_collection(&self) -> Option<&dyn MeshCollection> {
            Some(self)
        }
    }

    impl MeshCollection for MeshNode {
        fn renderable_meshes(&self) -> &[RenderableMesh] {
            &self.meshes
        }
    }

    struct LooseNode {
        base: SceneNodeBase,
        rendered: Rc<RefCell<Vec<(RenderPass, String)>>>,
    }

    impl SceneNode for LooseNode {
        fn base(&self) -> &SceneNodeBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut SceneNodeBase {
            &mut self.base
        }

        fn update(&mut self, _context: &UpdateContext) {}

        fn render(&self, context: &RenderContext<'_>) {
            self.rendered
                .borrow_mut()
                .push((context.render_pass, self.base.name.clone()));
        }
    }

    fn camera_at_origin() -> Camera {
        let mut camera = Camera::perspective(Vec3::zeros(), 90.0, 1.0, 0.1, 1000.0);
        camera.set_target(Vec3::new(0.0, 0.0, -1.0));
        camera
    }

    fn call(shader: u32, material: u32) -> DrawCall {
        DrawCall::new(ShaderId(shader), MaterialId(material), 0, 36)
    }

    #[test]
    fn test_ids_follow_parity() {
        let (mut scene, _) = recording_scene();
        let a = scene.add(MeshNode::new(Vec3::zeros(), call(1, 1), false), false);
        let b = scene.add(MeshNode::new(Vec3::zeros(), call(1, 1), false), true);
        let c = scene.add(MeshNode::new(Vec3::zeros(), call(1, 1), false), false);

        assert_eq!((a.get(), b.get(), c.get()), (2, 1, 4));
        assert_eq!(scene.find(2).and_then(|n| n.base().id()), Some(a));
        assert_eq!(scene.find(1).and_then(|n| n.base().id()), Some(b));
        assert_eq!(scene.find(4).and_then(|n| n.base().id()), Some(c));
        assert_eq!(scene.node_count(), 3);
    }

    #[test]
    fn test_find_rejects_zero_and_unknown() {
        let (mut scene, _) = recording_scene();
        scene.add(MeshNode::new(Vec3::zeros(), call(1, 1), false), false);

        assert!(scene.find(0).is_none());
        assert!(scene.find(3).is_none());
        assert!(scene.find(100).is_none());
    }

    #[test]
    fn test_invalid_size_is_an_error() {
        let result = Scene::new(|_: &[MeshBatchRequest<'_>], _: &RenderContext<'_>| {}, 0.0);
        assert!(matches!(result, Err(SceneError::Spatial(_))));
    }

    #[test]
    fn test_blended_requests_far_to_near() {
        let (mut scene, log) = recording_scene();
        let near = scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -10.0), call(1, 1), true), false);
        let far = scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -50.0), call(1, 1), true), false);
        let middle = scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -30.0), call(1, 1), true), true);

        let stats = scene.render_with_camera(&mut camera_at_origin(), None);
        assert_eq!(stats.blended_requests, 3);

        let log = log.borrow();
        let translucent: Vec<u32> = log
            .iter()
            .filter(|(pass, ..)| *pass == RenderPass::TRANSLUCENT)
            .flat_map(|(_, ids, _)| {
                assert_eq!(ids.len(), 1);
                ids.clone()
            })
            .collect();
        assert_eq!(translucent, vec![far.get(), middle.get(), near.get()]);
    }

    #[test]
    fn test_opaque_requests_grouped_in_one_call() {
        let (mut scene, log) = recording_scene();
        scene.add(MeshNode::new(Vec3::new(-2.0, 0.0, -10.0), call(1, 1), false), false);
        scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -10.0), call(2, 1), false), false);
        scene.add(MeshNode::new(Vec3::new(2.0, 0.0, -10.0), call(1, 1), false), false);

        scene.render_with_camera(&mut camera_at_origin(), None);

        let log = log.borrow();
        let opaque: Vec<_> = log.iter().filter(|(pass, ..)| *pass == RenderPass::OPAQUE).collect();
        assert_eq!(opaque.len(), 1);

        let shaders = &opaque[0].2;
        assert_eq!(shaders.len(), 3);
        let runs = 1 + shaders.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert_eq!(runs, 2);
    }

    #[test]
    fn test_culled_nodes_are_not_submitted() {
        let (mut scene, log) = recording_scene();
        scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -10.0), call(1, 1), false), false);
        scene.add(MeshNode::new(Vec3::new(0.0, 0.0, 10.0), call(1, 1), false), false);

        let stats = scene.render_with_camera(&mut camera_at_origin(), None);

        assert_eq!(stats.visible_nodes, 1);
        assert_eq!(log.borrow()[0].1, vec![2]);
    }

    #[test]
    fn test_explicit_cull_frustum_overrides_camera() {
        let (mut scene, _) = recording_scene();
        scene.add(MeshNode::new(Vec3::new(0.0, 0.0, 10.0), call(1, 1), false), false);

        let stats = scene.render_with_camera(&mut camera_at_origin(), Some(&Frustum::permissive()));
        assert_eq!(stats.visible_nodes, 1);
    }

    #[test]
    fn test_loose_nodes_render_far_to_near_in_both_passes() {
        let (mut scene, _) = recording_scene();
        let rendered = Rc::new(RefCell::new(Vec::new()));
        for (name, z) in [("near", -5.0), ("far", -40.0), ("middle", -20.0)] {
            scene.add(
                LooseNode {
                    base: SceneNodeBase::new(unit_box())
                        .with_name(name)
                        .with_transform(at(Vec3::new(0.0, 0.0, z))),
                    rendered: Rc::clone(&rendered),
                },
                false,
            );
        }

        let stats = scene.render_with_camera(&mut camera_at_origin(), None);
        assert_eq!(stats.loose_nodes, 3);

        let rendered = rendered.borrow();
        let names: Vec<&str> = rendered.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(names, vec!["far", "middle", "near", "far", "middle", "near"]);
        assert!(rendered[..3].iter().all(|(pass, _)| *pass == RenderPass::OPAQUE));
        assert!(rendered[3..].iter().all(|(pass, _)| *pass == RenderPass::TRANSLUCENT));
    }

    #[test]
    fn test_layers_filter_visibility() {
        let (mut scene, _) = recording_scene();
        let mut terrain = MeshNode::new(Vec3::new(0.0, 0.0, -10.0), call(1, 1), false);
        terrain.base.layer_name = "terrain".into();
        let mut props = MeshNode::new(Vec3::new(1.0, 0.0, -10.0), call(1, 1), false);
        props.base.layer_name = "props".into();
        let terrain = scene.add(terrain, false);
        let props = scene.add(props, true);

        scene.set_enabled_layers(&HashSet::from(["terrain".to_string()]));

        let visible = scene.query(&Frustum::permissive());
        assert_eq!(visible, vec![terrain]);
        assert!(!scene.node(props).unwrap().base().layer_enabled);

        scene.set_enabled_layers(&HashSet::from(["terrain".to_string(), "props".to_string()]));
        assert_eq!(scene.query(&Frustum::permissive()).len(), 2);
    }

    #[test]
    fn test_update_rehomes_moving_nodes() {
        let (mut scene, _) = recording_scene();
        let mut mover = MeshNode::new(Vec3::new(100.0, 0.0, 0.0), call(1, 1), false);
        mover.velocity = Vec3::new(-400.0, 0.0, 0.0);
        let id = scene.add(mover, true);

        let east = AABB::new(Vec3::new(50.0, -10.0, -10.0), Vec3::new(150.0, 10.0, 10.0));
        let west = AABB::new(Vec3::new(-350.0, -10.0, -10.0), Vec3::new(-250.0, 10.0, 10.0));
        assert_eq!(scene.query(&east), vec![id]);

        scene.update(1.0);

        assert!(scene.query(&east).is_empty());
        assert_eq!(scene.query(&west), vec![id]);
    }

    #[test]
    fn test_update_rehomes_nodes_moved_through_find_mut() {
        let (mut scene, _) = recording_scene();
        let id = scene.add(MeshNode::new(Vec3::repeat(100.0), call(1, 1), false), true);

        scene
            .find_mut(id.get())
            .unwrap()
            .base_mut()
            .set_transform(at(Vec3::repeat(-200.0)));
        scene.update(1.0 / 60.0);

        let moved_to = *scene.node(id).unwrap().base().bounding_box();
        let old_spot = AABB::from_center_extents(Vec3::repeat(100.0), Vec3::repeat(1.0));
        assert_eq!(scene.query(&moved_to), vec![id]);
        assert!(scene.query(&old_spot).is_empty());
    }

    #[test]
    fn test_update_rehomes_indexed_nodes_flagged_disabled() {
        let (mut scene, _) = recording_scene();
        let mut mover = MeshNode::new(Vec3::new(100.0, 0.0, 0.0), call(1, 1), false);
        mover.velocity = Vec3::new(-400.0, 0.0, 0.0);
        mover.base.layer_enabled = false;
        let id = scene.add(mover, true);

        let east = AABB::new(Vec3::new(50.0, -10.0, -10.0), Vec3::new(150.0, 10.0, 10.0));
        let west = AABB::new(Vec3::new(-350.0, -10.0, -10.0), Vec3::new(-250.0, 10.0, 10.0));
        assert_eq!(scene.query(&east), vec![id]);

        scene.update(1.0);

        assert!(scene.query(&east).is_empty());
        assert_eq!(scene.query(&west), vec![id]);
    }

    #[test]
    fn test_hidden_dynamic_nodes_stay_unindexed_while_moving() {
        let (mut scene, _) = recording_scene();
        let mut mover = MeshNode::new(Vec3::new(100.0, 0.0, 0.0), call(1, 1), false);
        mover.velocity = Vec3::new(-400.0, 0.0, 0.0);
        mover.base.layer_name = "ships".into();
        scene.add(mover, true);

        scene.set_enabled_layers(&HashSet::from(["terrain".to_string()]));
        scene.update(1.0);
        assert!(scene.query(&Frustum::permissive()).is_empty());

        scene.set_enabled_layers(&HashSet::from(["ships".to_string()]));
        let west = AABB::new(Vec3::new(-350.0, -10.0, -10.0), Vec3::new(-250.0, 10.0, 10.0));
        assert_eq!(scene.query(&west).len(), 1);
    }

    struct RecordingPicker {
        active: bool,
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    impl PickingTarget for RecordingPicker {
        fn is_active(&self) -> bool {
            self.active
        }

        fn is_debug(&self) -> bool {
            false
        }

        fn shader(&self) -> ShaderId {
            ShaderId(99)
        }

        fn debug_shader(&self) -> ShaderId {
            ShaderId(98)
        }

        fn begin(&mut self) {
            self.events.borrow_mut().push("begin");
        }

        fn finish(&mut self) {
            self.events.borrow_mut().push("finish");
            self.active = false;
        }
    }

    #[test]
    fn test_active_picker_gets_its_own_pass() {
        let (mut scene, log) = recording_scene();
        scene.add(MeshNode::new(Vec3::new(0.0, 0.0, -10.0), call(1, 1), false), false);

        let events = Rc::new(RefCell::new(Vec::new()));
        let mut camera = camera_at_origin();
        camera.set_picker(Some(Box::new(RecordingPicker {
            active: true,
            events: Rc::clone(&events),
        })));

        scene.render_with_camera(&mut camera, None);
        assert_eq!(*events.borrow(), vec!["begin", "finish"]);

        let log = log.borrow();
        let opaque_shaders: Vec<ShaderId> = log
            .iter()
            .filter(|(pass, ..)| *pass == RenderPass::OPAQUE)
            .flat_map(|(_, _, shaders)| shaders.clone())
            .collect();
        assert_eq!(opaque_shaders, vec![ShaderId(99), ShaderId(1)]);

        drop(log);
        scene.render_with_camera(&mut camera, None);
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_clear_drops_everything() {
        let (mut scene, _) = recording_scene();
        scene.add(MeshNode::new(Vec3::zeros(), call(1, 1), false), true);
        scene.clear();

        assert_eq!(scene.node_count(), 0);
        assert!(scene.query(&Frustum::permissive()).is_empty());
        assert_eq!(scene.all_nodes().count(), 0);
    }
}
