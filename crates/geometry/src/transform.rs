//! Position + orientation transforms.

use glam::{Mat4, Quat, Vec3};
use std::ops::Mul;

/// A rigid transform: rotation followed by translation, no scale.
///
/// This is the shape of every pose an XR host reports, and of the origin offset
/// carried by a reference space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Translation component.
    pub position: Vec3,
    /// Unit quaternion orientation.
    pub orientation: Quat,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a transform, normalizing the orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation: orientation.normalize(),
        }
    }

    /// Pure translation.
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Decompose a homogeneous matrix into translation + rotation.
    ///
    /// Any scale in `matrix` is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (_scale, orientation, position) = matrix.to_scale_rotation_translation();
        Self::new(position, orientation)
    }

    /// Compose into a homogeneous matrix.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Self {
        let inv = self.orientation.inverse();
        Self {
            position: inv * -self.position,
            orientation: inv,
        }
    }

    /// Apply to a point.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation * point + self.position
    }

    /// Apply to a direction (rotation only).
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.orientation * direction
    }

    /// Component-wise comparison within `epsilon`.
    ///
    /// Quaternions `q` and `-q` describe the same rotation and compare equal.
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        let same_rotation = self.orientation.abs_diff_eq(other.orientation, epsilon)
            || self.orientation.abs_diff_eq(-other.orientation, epsilon);
        same_rotation && self.position.abs_diff_eq(other.position, epsilon)
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        RigidTransform {
            position: self.position + self.orientation * rhs.position,
            orientation: (self.orientation * rhs.orientation).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trip() {
        let t = RigidTransform::new(
            Vec3::new(1.0, 2.0, -3.0),
            Quat::from_euler(glam::EulerRot::YXZ, 0.4, -0.2, 0.1),
        );
        let back = RigidTransform::from_matrix(&t.to_matrix());
        assert!(back.abs_diff_eq(&t, 1.0e-5));
    }

    #[test]
    fn from_matrix_discards_scale() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_y(1.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let t = RigidTransform::from_matrix(&m);
        assert!(t.position.abs_diff_eq(Vec3::Y, 1.0e-5));
        assert!(t.orientation.abs_diff_eq(Quat::from_rotation_y(1.0), 1.0e-5));
    }

    #[test]
    fn inverse_cancels() {
        let t = RigidTransform::new(Vec3::new(0.5, -1.0, 4.0), Quat::from_rotation_x(0.7));
        let id = t * t.inverse();
        assert!(id.abs_diff_eq(&RigidTransform::IDENTITY, 1.0e-5));
        let p = Vec3::new(2.0, 3.0, 4.0);
        assert!(t.inverse().transform_point(t.transform_point(p)).abs_diff_eq(p, 1.0e-4));
    }

    #[test]
    fn composition_matches_matrix_product() {
        let a = RigidTransform::new(Vec3::X, Quat::from_rotation_z(0.3));
        let b = RigidTransform::new(Vec3::new(0.0, 2.0, 1.0), Quat::from_rotation_y(-0.6));
        let composed = (a * b).to_matrix();
        assert!(composed.abs_diff_eq(a.to_matrix() * b.to_matrix(), 1.0e-5));
    }
}
