//! Pointer rays derived from device poses.

use glam::{Mat4, Vec3};

use crate::RigidTransform;

/// A pointing ray: origin, unit direction, and the homogeneous transform it came from.
///
/// Rays point down the local -Z axis of their transform. They are rebuilt from a
/// pose every frame and never stored across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Transform mapping the canonical ray (origin, -Z) onto this ray.
    pub matrix: Mat4,
}

impl Ray {
    /// Canonical forward direction of a pose.
    pub const FORWARD: Vec3 = Vec3::NEG_Z;

    /// Build a ray from a pose.
    pub fn from_transform(transform: &RigidTransform) -> Self {
        Self {
            origin: transform.position,
            direction: transform.transform_direction(Self::FORWARD).normalize(),
            matrix: transform.to_matrix(),
        }
    }

    /// Build a ray from an arbitrary homogeneous matrix.
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(Vec3::ZERO),
            direction: matrix.transform_vector3(Self::FORWARD).normalize_or_zero(),
            matrix,
        }
    }

    /// Re-express the ray after applying `transform` on the left.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self::from_matrix(*transform * self.matrix)
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
