#![warn(missing_docs)]
//! First-person camera for rendering outside an XR session.
//!
//! While a session renders, each eye's view is bound onto the camera so code
//! reading the camera (pseudo-pointer rays, desktop overlays) sees the eye that
//! was rendered last.

use glam::{Mat4, Vec3};

/// Default standing eye height in metres.
pub const EYE_HEIGHT: f32 = 1.6;

/// A view and projection borrowed from an XR eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundView {
    /// World to eye.
    pub view: Mat4,
    /// Eye projection.
    pub projection: Mat4,
}

/// First-person camera with position, orientation, and projection.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Horizontal rotation in radians (around Y axis).
    pub yaw: f32,
    /// Vertical rotation in radians (around local X axis).
    pub pitch: f32,

    /// Field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,

    bound: Option<BoundView>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, EYE_HEIGHT, 0.0),
            // Looking down -Z.
            yaw: 3.0 * std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fov: std::f32::consts::FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            bound: None,
        }
    }
}

impl Camera {
    /// Create a new camera with the given position.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov_degrees(mut self, degrees: f32) -> Self {
        self.fov = degrees.to_radians();
        self
    }

    /// Get the forward direction vector (where camera is looking).
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Horizontal right vector.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Get the up direction vector (camera's local Y axis).
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    /// World-to-camera matrix; the bound eye view while one is bound.
    pub fn view_matrix(&self) -> Mat4 {
        match self.bound {
            Some(bound) => bound.view,
            None => Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y),
        }
    }

    /// Projection matrix; the bound eye projection while one is bound.
    pub fn projection_matrix(&self) -> Mat4 {
        match self.bound {
            Some(bound) => bound.projection,
            None => Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far),
        }
    }

    /// Compute the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera-to-world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// Use an XR eye's matrices until [`Camera::unbind_view`].
    pub fn bind_view(&mut self, view: Mat4, projection: Mat4) {
        self.bound = Some(BoundView { view, projection });
    }

    /// Return to the camera's own pose and projection.
    pub fn unbind_view(&mut self) {
        self.bound = None;
    }

    /// The bound eye view, if any.
    pub fn bound_view(&self) -> Option<&BoundView> {
        self.bound.as_ref()
    }

    /// Move along the view direction.
    pub fn move_forward(&mut self, distance: f32) {
        let forward = self.forward();
        self.position += forward * distance;
    }

    /// Move the camera right by the given distance.
    pub fn move_right(&mut self, distance: f32) {
        let right = self.right();
        self.position += right * distance;
    }

    /// Move the camera up by the given distance (world Y axis).
    pub fn move_up(&mut self, distance: f32) {
        self.position.y += distance;
    }

    /// Rotate the camera (add to yaw and pitch).
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch += delta_pitch;

        const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = self.yaw.rem_euclid(std::f32::consts::TAU);
    }

    /// Update the aspect ratio (call when the surface resizes).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}
