#![warn(missing_docs)]
//! Geometry utilities for spatial pointing.
//!
//! Rigid transforms (the pose representation reported by XR hosts), rays built
//! from those poses, bounding-volume intersection, and the view-matrix
//! correction used when rendering per-eye views.

mod bounds;
mod ray;
mod transform;
mod view;

pub use bounds::{intersect_shape, Aabb, BoundingSphere, Shape, ShapeHit};
pub use ray::Ray;
pub use transform::RigidTransform;
pub use view::{rotation_only, translate_view_matrix};

/// Tolerance used when comparing transforms that went through a decompose/compose cycle.
pub const TRANSFORM_EPSILON: f32 = 1.0e-4;
