//! Axis-aligned bounding boxes

use std::fmt;

use crate::foundation::math::{utils, Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
///
/// Immutable value type: every operation returns a new box. Callers keep
/// `min <= max` component-wise; nothing here validates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from individual corner coordinates
    pub fn from_coords(min_x: f32, min_y: f32, min_z: f32, max_x: f32, max_y: f32, max_z: f32) -> Self {
        Self::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
    }

    /// Create an AABB from a min corner and a size
    pub fn from_min_size(min: Vec3, size: Vec3) -> Self {
        Self::new(min, min + size)
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Full edge lengths of the box
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Check if this AABB contains a point
    ///
    /// Closed on the min faces, open on the max faces, so a point on a shared
    /// face between two octants belongs to exactly one of them.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x < self.max.x &&
        point.y >= self.min.y && point.y < self.max.y &&
        point.z >= self.min.z && point.z < self.max.z
    }

    /// Check if `other` lies entirely inside this box (inclusive on every face)
    pub fn contains(&self, other: &AABB) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    ///
    /// Half-open per axis: boxes touching only at this box's max face do not
    /// intersect.
    pub fn intersects(&self, other: &AABB) -> bool {
        other.max.x >= self.min.x && other.min.x < self.max.x &&
        other.max.y >= self.min.y && other.min.y < self.max.y &&
        other.max.z >= self.min.z && other.min.z < self.max.z
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(
            utils::min_components(&self.min, &other.min),
            utils::max_components(&self.max, &other.max),
        )
    }

    /// Box moved by `offset`
    pub fn translate(&self, offset: Vec3) -> AABB {
        AABB::new(self.min + offset, self.max + offset)
    }

    /// Box enclosing all 8 transformed corners
    ///
    /// Grows under rotation, and the growth compounds when applied
    /// repeatedly; premultiply matrices and transform once.
    pub fn transform(&self, transform: &Mat4) -> AABB {
        let mut corners = self.corners().into_iter().map(|corner| {
            transform.transform_point(&Point3::from(corner)).coords
        });

        // corners() always yields 8 points
        let first = corners.next().unwrap_or(self.min);
        let (min, max) = corners.fold((first, first), |(min, max), point| {
            (utils::min_components(&min, &point), utils::max_components(&max, &point))
        });

        AABB::new(min, max)
    }

    /// The 8 corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }
}

impl fmt::Display for AABB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AABB [({}, {}, {}) -> ({}, {}, {})]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
