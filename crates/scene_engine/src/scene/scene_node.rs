//! Scene node contract and shared node state

use std::fmt;
use std::num::NonZeroU32;

use crate::foundation::math::Mat4;
use crate::render::{MeshCollection, RenderContext};
use crate::spatial::AABB;

/// Handle of a node registered with a [`Scene`](crate::scene::Scene)
///
/// Odd values name dynamic nodes and even values name static nodes. Zero is
/// never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Wrap a raw id, rejecting zero
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw id value
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Whether the id belongs to the dynamic node list
    pub fn is_dynamic(self) -> bool {
        self.get() % 2 == 1
    }

    /// Position of the node in its list
    pub(crate) fn slot(self) -> usize {
        let raw = self.get() as usize;
        if self.is_dynamic() {
            (raw - 1) / 2
        } else {
            raw / 2 - 1
        }
    }

    /// Id of the dynamic node at `slot`
    pub(crate) fn dynamic_at(slot: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(Self::doubled(slot)))
    }

    /// Id of the static node at `slot`
    pub(crate) fn static_at(slot: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(Self::doubled(slot).saturating_add(1)))
    }

    fn doubled(slot: usize) -> u32 {
        u32::try_from(slot).unwrap_or(u32::MAX).saturating_mul(2)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

/// Per-frame update input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateContext {
    /// Seconds since the previous update
    pub timestep: f32,
}

/// State every scene node carries
///
/// The world bounding box is the local box transformed by the world
/// transform and is recomputed whenever either changes.
#[derive(Debug, Clone)]
pub struct SceneNodeBase {
    transform: Mat4,
    local_bounding_box: AABB,
    bounding_box: AABB,
    /// Display name
    pub name: String,
    /// Layer the node belongs to
    pub layer_name: String,
    /// Whether the node's layer is currently shown
    pub layer_enabled: bool,
    id: Option<NodeId>,
}

impl SceneNodeBase {
    /// Node at the origin with the given local bounds
    pub fn new(local_bounding_box: AABB) -> Self {
        Self {
            transform: Mat4::identity(),
            local_bounding_box,
            bounding_box: local_bounding_box,
            name: String::new(),
            layer_name: String::new(),
            layer_enabled: true,
            id: None,
        }
    }

    /// Builder: set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set the layer
    pub fn with_layer(mut self, layer_name: impl Into<String>) -> Self {
        self.layer_name = layer_name.into();
        self
    }

    /// Builder: set the world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.set_transform(transform);
        self
    }

    /// World transform
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Replace the world transform and refresh the world bounds
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.refresh_bounds();
    }

    /// Bounds in model space
    pub fn local_bounding_box(&self) -> &AABB {
        &self.local_bounding_box
    }

    /// Replace the model-space bounds and refresh the world bounds
    pub fn set_local_bounding_box(&mut self, local_bounding_box: AABB) {
        self.local_bounding_box = local_bounding_box;
        self.refresh_bounds();
    }

    /// Bounds in world space
    pub fn bounding_box(&self) -> &AABB {
        &self.bounding_box
    }

    /// Handle assigned by the scene, `None` until added
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    fn refresh_bounds(&mut self) {
        self.bounding_box = self.local_bounding_box.transform(&self.transform);
    }
}

/// Anything that can live in a scene
///
/// Nodes that expose meshes through [`SceneNode::as_mesh_collection`] are
/// drawn by the scene's batch renderer. All others are "loose" and draw
/// themselves through [`SceneNode::render`].
pub trait SceneNode {
    /// Shared node state
    fn base(&self) -> &SceneNodeBase;

    /// Shared node state, mutably
    fn base_mut(&mut self) -> &mut SceneNodeBase;

    /// Advance the node by one frame
    fn update(&mut self, context: &UpdateContext);

    /// Draw the node directly; only called for nodes without meshes
    fn render(&self, _context: &RenderContext<'_>) {}

    /// Mesh capability, if the node has one
    fn as_mesh_collection(&self) -> Option<&dyn MeshCollection> {
        None
    }
}
