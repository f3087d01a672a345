//! Octree spatial partitioning structure
//!
//! Divides a cube centered at the origin into hierarchical octants. Each
//! element lives in the deepest node whose region fully contains its
//! bounding box; elements straddling a child boundary stay in the parent.
//! Nodes subdivide once they hold enough elements and are large enough, and
//! are never merged back.
//!
//! Nodes are stored in a flat arena owned by the [`Octree`]. Child and
//! parent links are arena indices, so the parent link is a plain back
//! reference used only to walk upward.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::spatial::{Frustum, SpatialError, AABB};

/// Arena index of the root node
const ROOT: NodeIndex = NodeIndex(0);

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Element count at which a leaf subdivides before the next insert
    pub max_elements_before_subdivide: usize,

    /// Nodes whose edge is not larger than this never subdivide
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_elements_before_subdivide: 4,
            min_node_size: 64.0,
        }
    }
}

/// Volume an octree can be queried with
pub trait QueryVolume {
    /// Whether `bounds` may overlap this volume
    fn overlaps(&self, bounds: &AABB) -> bool;
}

impl QueryVolume for AABB {
    fn overlaps(&self, bounds: &AABB) -> bool {
        bounds.intersects(self)
    }
}

impl QueryVolume for Frustum {
    fn overlaps(&self, bounds: &AABB) -> bool {
        self.intersects(bounds)
    }
}

/// Index of a node inside an [`Octree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

/// Client object stored in the octree with the bounds it was filed under
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element<T> {
    /// Identity of the indexed object (not owned)
    pub client: T,
    /// Bounds snapshot taken at insert/update time
    pub bounding_box: AABB,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode<T> {
    region: AABB,
    parent: Option<NodeIndex>,
    children: Option<[NodeIndex; 8]>,
    elements: Vec<Element<T>>,
    depth: u32,
}

impl<T> OctreeNode<T> {
    fn new(region: AABB, parent: Option<NodeIndex>, depth: u32) -> Self {
        Self {
            region,
            parent,
            children: None,
            elements: Vec::new(),
            depth,
        }
    }

    /// World-space volume partitioned by this node
    pub fn region(&self) -> &AABB {
        &self.region
    }

    /// Enclosing node, `None` for the root
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// The 8 octants, present once subdivided
    ///
    /// Octant `i` sets bit 0 for the upper X half, bit 1 for upper Y and
    /// bit 2 for upper Z, so index 0 is the min-corner octant.
    pub fn children(&self) -> Option<&[NodeIndex; 8]> {
        self.children.as_ref()
    }

    /// Elements stored directly at this node
    pub fn elements(&self) -> &[Element<T>] {
        &self.elements
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Check if this node holds any elements of its own
    pub fn has_elements(&self) -> bool {
        !self.elements.is_empty()
    }
}

/// Octree spatial partitioning structure
///
/// Indexes client handles of type `T` by bounding box. The octree never
/// owns or validates clients; it compares them by equality only.
#[derive(Debug, Clone)]
pub struct Octree<T> {
    nodes: Vec<OctreeNode<T>>,
    config: OctreeConfig,
    subdivisions: usize,
}

impl<T> Octree<T>
where
    T: Copy + PartialEq + fmt::Debug,
{
    /// Create an octree covering a cube of edge `size` centered at the origin
    pub fn new(size: f32, config: OctreeConfig) -> Result<Self, SpatialError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(SpatialError::InvalidSize(size));
        }
        if !config.min_node_size.is_finite() || config.min_node_size < 0.0 {
            return Err(SpatialError::InvalidConfig(format!(
                "min_node_size must be finite and non-negative, got {}",
                config.min_node_size
            )));
        }

        let region = AABB::from_min_size(Vec3::repeat(-size * 0.5), Vec3::repeat(size));
        Ok(Self {
            nodes: vec![OctreeNode::new(region, None, 0)],
            config,
            subdivisions: 0,
        })
    }

    /// Create an octree with the default thresholds
    pub fn with_size(size: f32) -> Result<Self, SpatialError> {
        Self::new(size, OctreeConfig::default())
    }

    /// Thresholds this octree was built with
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Root node handle
    pub fn root(&self) -> NodeIndex {
        ROOT
    }

    /// Look up a node by handle
    pub fn node(&self, index: NodeIndex) -> Option<&OctreeNode<T>> {
        self.nodes.get(index.0)
    }

    /// Every node currently in the tree, root first
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &OctreeNode<T>)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeIndex(i), node))
    }

    /// Total number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of indexed elements
    pub fn element_count(&self) -> usize {
        self.nodes.iter().map(|node| node.elements.len()).sum()
    }

    /// Number of subdivisions since creation or the last [`Octree::clear`]
    pub fn subdivision_count(&self) -> usize {
        self.subdivisions
    }

    /// Insert a client with its current bounds
    pub fn insert(&mut self, client: T, bounds: AABB) {
        log::trace!("Octree insert {:?} at {}", client, bounds);
        self.insert_at(ROOT, Element { client, bounding_box: bounds });
    }

    /// Remove a client previously filed under `bounds`
    ///
    /// Returns `false` (and changes nothing) if the client is not found.
    pub fn remove(&mut self, client: T, bounds: &AABB) -> bool {
        match self.find(client, bounds) {
            Some((node, index)) => {
                self.nodes[node.0].elements.remove(index);
                true
            }
            None => {
                log::trace!("Octree remove: {:?} not found", client);
                false
            }
        }
    }

    /// Re-file a client whose bounds changed from `old_bounds` to `new_bounds`
    ///
    /// Climbs from the holding node to the nearest ancestor that contains the
    /// new bounds. If that is the holding node itself the element is pushed
    /// down into a child when one now contains it, otherwise updated in
    /// place. Returns `false` if the client is not found.
    pub fn update(&mut self, client: T, old_bounds: &AABB, new_bounds: AABB) -> bool {
        let Some((holder, index)) = self.find(client, old_bounds) else {
            log::trace!("Octree update: {:?} not found", client);
            return false;
        };

        let mut ancestor = holder;
        while let Some(parent) = self.nodes[ancestor.0].parent {
            if self.nodes[ancestor.0].region.contains(&new_bounds) {
                break;
            }
            ancestor = parent;
        }

        let element = Element { client, bounding_box: new_bounds };
        if ancestor == holder {
            match self.child_containing(holder, &new_bounds) {
                Some(child) => {
                    self.nodes[holder.0].elements.remove(index);
                    self.insert_at(child, element);
                }
                None => self.nodes[holder.0].elements[index] = element,
            }
        } else {
            self.nodes[holder.0].elements.remove(index);
            self.insert_at(ancestor, element);
        }

        true
    }

    /// Locate the node and slot holding `client`
    ///
    /// Descends only through children whose region contains `bounds`, so
    /// `bounds` must be the box the client was last filed under.
    pub fn find(&self, client: T, bounds: &AABB) -> Option<(NodeIndex, usize)> {
        let mut current = ROOT;
        loop {
            let node = &self.nodes[current.0];
            if let Some(index) = node.elements.iter().position(|e| e.client == client) {
                return Some((current, index));
            }
            current = self.child_containing(current, bounds)?;
        }
    }

    /// All clients whose bounds overlap `volume`, depth-first
    pub fn query<V: QueryVolume>(&self, volume: &V) -> Vec<T> {
        let mut results = Vec::new();
        self.query_into(volume, &mut results);
        results
    }

    /// Append all clients whose bounds overlap `volume` to `results`
    pub fn query_into<V: QueryVolume>(&self, volume: &V, results: &mut Vec<T>) {
        self.query_node(ROOT, volume, results);
    }

    /// Drop every element and child, leaving a single empty root
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT.0];
        root.children = None;
        root.elements.clear();
        self.subdivisions = 0;
        log::debug!("Octree cleared");
    }

    fn query_node<V: QueryVolume>(&self, index: NodeIndex, volume: &V, results: &mut Vec<T>) {
        let node = &self.nodes[index.0];

        results.extend(
            node.elements
                .iter()
                .filter(|element| volume.overlaps(&element.bounding_box))
                .map(|element| element.client),
        );

        if let Some(children) = node.children {
            for child in children {
                if volume.overlaps(&self.nodes[child.0].region) {
                    self.query_node(child, volume, results);
                }
            }
        }
    }

    fn insert_at(&mut self, index: NodeIndex, element: Element<T>) {
        let node = &self.nodes[index.0];
        let should_subdivide = node.is_leaf()
            && node.has_elements()
            && node.region.size().x > self.config.min_node_size
            && node.elements.len() >= self.config.max_elements_before_subdivide
            && splits_cleanly(&node.region);

        if should_subdivide {
            self.subdivide(index);
        }

        match self.child_containing(index, &element.bounding_box) {
            Some(child) => self.insert_at(child, element),
            None => self.nodes[index.0].elements.push(element),
        }
    }

    fn child_containing(&self, index: NodeIndex, bounds: &AABB) -> Option<NodeIndex> {
        self.nodes[index.0]
            .children?
            .into_iter()
            .find(|child| self.nodes[child.0].region.contains(bounds))
    }

    /// Subdivide a leaf into 8 children and push its elements down
    fn subdivide(&mut self, index: NodeIndex) {
        let node = &self.nodes[index.0];
        if node.children.is_some() {
            return; // Already subdivided
        }

        let region = node.region;
        let depth = node.depth + 1;
        let half_size = region.size() * 0.5;
        let center = region.min + half_size;

        let first_child = self.nodes.len();
        for octant in 0..8 {
            let min = Vec3::new(
                if octant & 1 != 0 { center.x } else { region.min.x },
                if octant & 2 != 0 { center.y } else { region.min.y },
                if octant & 4 != 0 { center.z } else { region.min.z },
            );
            self.nodes.push(OctreeNode::new(AABB::from_min_size(min, half_size), Some(index), depth));
        }
        self.nodes[index.0].children = Some(std::array::from_fn(|octant| NodeIndex(first_child + octant)));
        self.subdivisions += 1;

        log::debug!("Octree node at depth {} subdivided (region {})", depth - 1, region);

        let elements = std::mem::take(&mut self.nodes[index.0].elements);
        let mut remaining = Vec::new();
        for element in elements {
            match self.child_containing(index, &element.bounding_box) {
                Some(child) => self.insert_at(child, element),
                None => remaining.push(element),
            }
        }
        self.nodes[index.0].elements = remaining;
    }
}

/// Whether halving `region` yields strictly smaller octants in f32
fn splits_cleanly(region: &AABB) -> bool {
    let center = region.min + region.size() * 0.5;
    (0..3).all(|axis| region.min[axis] < center[axis] && center[axis] < region.max[axis])
}
