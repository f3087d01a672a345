//! View-frustum culling volume

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::spatial::AABB;

/// Normals shorter than this are treated as degenerate
const MIN_NORMAL_LENGTH: f32 = 1.0e-6;

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (unit length, or zero for a permissive plane)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// A plane that never rejects anything
    pub fn permissive() -> Self {
        Self {
            normal: Vec3::zeros(),
            distance: 0.0,
        }
    }

    /// Create a new plane from normal and distance
    ///
    /// Returns `None` when the normal is too short to normalize.
    pub fn new(normal: Vec3, distance: f32) -> Option<Self> {
        Self::from_coefficients(Vec4::new(normal.x, normal.y, normal.z, distance))
    }

    /// Create a plane from raw `(a, b, c, d)` coefficients, normalizing by
    /// the length of `(a, b, c)`
    pub fn from_coefficients(coefficients: Vec4) -> Option<Self> {
        let normal = coefficients.xyz();
        let length = normal.magnitude();
        if !length.is_finite() || length < MIN_NORMAL_LENGTH {
            return None;
        }

        Some(Self {
            normal: normal / length,
            distance: coefficients.w / length,
        })
    }

    /// Calculate signed distance from plane to point
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Whether this plane can reject anything at all
    pub fn is_permissive(&self) -> bool {
        self.normal == Vec3::zeros()
    }
}

/// Index of each plane within [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum FrustumPlane {
    /// x >= -w
    Left = 0,
    /// x <= w
    Right = 1,
    /// y >= -w
    Bottom = 2,
    /// y <= w
    Top = 3,
    /// z >= -w
    Near = 4,
    /// z <= w
    Far = 5,
}

/// Frustum for visibility culling
///
/// Six inward-facing planes in the fixed order left, right, bottom, top,
/// near, far. Rebuilt wholesale by [`Frustum::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// A frustum that culls nothing
    pub fn permissive() -> Self {
        Self::new([Plane::permissive(); 6])
    }

    /// Extract frustum planes from a view-projection matrix
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let mut frustum = Self::permissive();
        frustum.update(view_projection);
        frustum
    }

    /// Rebuild all six planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for column-vector matrices with clip depth
    /// in `-w..w`. A plane whose normal has zero length cannot be
    /// normalized; it is replaced by [`Plane::permissive`] so the frustum
    /// errs towards drawing rather than silently culling.
    pub fn update(&mut self, view_projection: &Mat4) {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        let coefficients = [w + x, w - x, w + y, w - y, w + z, w - z];
        for (index, plane_coefficients) in coefficients.iter().enumerate() {
            self.planes[index] = Plane::from_coefficients(*plane_coefficients).unwrap_or_else(|| {
                log::warn!("Degenerate frustum plane {index}; culling disabled for this plane");
                Plane::permissive()
            });
        }
    }

    /// All six planes
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// A single plane by name
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// Check if an AABB is inside or intersects the frustum
    ///
    /// Conservative: a box is rejected only when its most positive corner
    /// along some plane normal is behind that plane. Boxes fully outside
    /// near a frustum edge may still be reported as visible.
    pub fn intersects(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| {
            let positive_corner = Vec3::new(
                if plane.normal.x < 0.0 { aabb.min.x } else { aabb.max.x },
                if plane.normal.y < 0.0 { aabb.min.y } else { aabb.max.y },
                if plane.normal.z < 0.0 { aabb.min.z } else { aabb.max.z },
            );
            plane.signed_distance(positive_corner) >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn looking_down_negative_z() -> Frustum {
        let projection = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        let view = Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), Vec3::y());
        Frustum::from_matrix(&(projection * view))
    }

    #[test]
    fn test_identity_matrix_gives_clip_cube() {
        let frustum = Frustum::from_matrix(&Mat4::identity());

        let left = frustum.plane(FrustumPlane::Left);
        assert_relative_eq!(left.normal, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(left.distance, 1.0);

        let far = frustum.plane(FrustumPlane::Far);
        assert_relative_eq!(far.normal, Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(far.distance, 1.0);
    }

    #[test]
    fn test_box_inside_is_visible() {
        let frustum = looking_down_negative_z();
        let inside = AABB::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(frustum.intersects(&inside));
    }

    #[test]
    fn test_box_behind_camera_is_culled() {
        let frustum = looking_down_negative_z();
        let behind = AABB::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 1.0, 1.0));
        let beyond_far = AABB::from_center_extents(Vec3::new(0.0, 0.0, -200.0), Vec3::new(1.0, 1.0, 1.0));
        let far_left = AABB::from_center_extents(Vec3::new(-50.0, 0.0, -10.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(!frustum.intersects(&behind));
        assert!(!frustum.intersects(&beyond_far));
        assert!(!frustum.intersects(&far_left));
    }

    #[test]
    fn test_box_straddling_plane_is_visible() {
        let frustum = looking_down_negative_z();
        let straddling = AABB::from_center_extents(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.5, 0.5, 0.5));

        assert!(frustum.intersects(&straddling));
    }

    #[test]
    fn test_degenerate_matrix_culls_nothing() {
        let frustum = Frustum::from_matrix(&Mat4::zeros());

        assert!(frustum.planes().iter().all(Plane::is_permissive));
        assert!(frustum.intersects(&AABB::from_coords(1e6, 1e6, 1e6, 1e6 + 1.0, 1e6 + 1.0, 1e6 + 1.0)));
    }

    #[test]
    fn test_plane_rejects_zero_normal() {
        assert!(Plane::new(Vec3::zeros(), 3.0).is_none());
        let plane = Plane::new(Vec3::new(0.0, 2.0, 0.0), 4.0).unwrap();
        assert_relative_eq!(plane.signed_distance(Vec3::new(0.0, 1.0, 0.0)), 3.0);
    }
}
