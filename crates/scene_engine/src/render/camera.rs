//! # 3D Camera
//!
//! Perspective camera that owns the view frustum the scene culls against.
//!
//! ## Design Principles
//! - **Cached culling volume**: the view-projection matrix and frustum are
//!   rebuilt on every mutation, so per-frame reads are free
//! - **Optional picking**: an off-screen picking target can be attached and
//!   is driven by the scene's render pass

use std::fmt;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::ShaderId;
use crate::spatial::Frustum;

/// Off-screen object-id target used for mouse picking
///
/// When active, the scene renders one extra pass into this target with
/// [`PickingTarget::shader`] replacing every draw call's shader, then calls
/// [`PickingTarget::finish`] before the visible pass.
pub trait PickingTarget {
    /// A pick was requested for this frame
    fn is_active(&self) -> bool;

    /// Show the id buffer on screen instead of shading normally
    fn is_debug(&self) -> bool;

    /// Shader writing node and mesh ids
    fn shader(&self) -> ShaderId;

    /// Shader visualizing node and mesh ids
    fn debug_shader(&self) -> ShaderId;

    /// Bind the off-screen target before the picking pass
    fn begin(&mut self);

    /// Read back the result and deactivate
    fn finish(&mut self);
}

/// 3D Camera for perspective projections
///
/// Uses a right-handed Y-up coordinate system in view space with clip depth
/// in `-w..w`.
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view_projection: Mat4,
    frustum: Frustum,
    picker: Option<Box<dyn PickingTarget>>,
}

impl Camera {
    /// Create a new perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            view_projection: Mat4::identity(),
            frustum: Frustum::permissive(),
            picker: None,
        };
        camera.refresh();
        camera
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
        self.refresh();
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.refresh();
    }

    /// Look at a point with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        self.refresh();
    }

    /// Update camera aspect ratio for viewport changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
        self.refresh();
    }

    /// Eye position in world space
    pub fn location(&self) -> Vec3 {
        self.position
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined `projection * view` matrix
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Culling volume for the current view
    pub fn view_frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Attach or detach a picking target
    pub fn set_picker(&mut self, picker: Option<Box<dyn PickingTarget>>) {
        self.picker = picker;
    }

    /// Attached picking target, if any
    pub fn picker(&self) -> Option<&dyn PickingTarget> {
        self.picker.as_deref()
    }

    /// Attached picking target, mutably
    pub fn picker_mut(&mut self) -> Option<&mut dyn PickingTarget> {
        self.picker.as_deref_mut().map(|picker| picker as &mut dyn PickingTarget)
    }

    fn refresh(&mut self) {
        self.view_projection = self.projection_matrix() * self.view_matrix();
        self.frustum.update(&self.view_projection);
    }
}

impl Default for Camera {
    /// Camera above and behind the origin with a 45 degree field of view
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 3.0, 3.0), 45.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("position", &self.position)
            .field("target", &self.target)
            .field("up", &self.up)
            .field("fov", &self.fov)
            .field("aspect", &self.aspect)
            .field("near", &self.near)
            .field("far", &self.far)
            .field("has_picker", &self.picker.is_some())
            .finish()
    }
}
