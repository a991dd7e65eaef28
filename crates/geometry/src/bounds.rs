//! Bounding volumes and ray intersection.

use glam::{Mat4, Vec3};

use crate::Ray;

/// Axis-aligned bounding box in a node's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the box
    pub min: Vec3,
    /// Maximum corner of the box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from center position and size
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half_size = size * 0.5;
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// Test if a ray intersects this AABB.
    ///
    /// `ray_dir` need not be normalized; the returned parameter is in units of it.
    pub fn ray_intersection(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = ray_dir.recip();

        let t1 = (self.min - ray_origin) * inv_dir;
        let t2 = (self.max - ray_origin) * inv_dir;

        // A zero direction component yields inf/NaN slabs; NaN must not win min/max.
        let near = t1.min(t2);
        let far = t1.max(t2);
        let tmin = finite_or(near.x, f32::NEG_INFINITY)
            .max(finite_or(near.y, f32::NEG_INFINITY))
            .max(finite_or(near.z, f32::NEG_INFINITY));
        let tmax = finite_or(far.x, f32::INFINITY)
            .min(finite_or(far.y, f32::INFINITY))
            .min(finite_or(far.z, f32::INFINITY));

        // Box entirely behind the origin
        if tmax < 0.0 {
            return None;
        }

        if tmin > tmax {
            return None;
        }

        // Origin inside the box
        let distance = if tmin < 0.0 { tmax } else { tmin };

        if distance.is_finite() {
            Some(distance)
        } else {
            None
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}

/// Sphere in a node's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a sphere.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Nearest non-negative ray parameter hitting the sphere.
    pub fn ray_intersection(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let oc = ray_origin - self.center;
        let a = ray_dir.length_squared();
        if a <= f32::EPSILON {
            return None;
        }
        let half_b = oc.dot(ray_dir);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = (-half_b - sqrt_d) / a;
        if near >= 0.0 {
            return Some(near);
        }
        let far = (-half_b + sqrt_d) / a;
        if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}

/// Pickable shape attached to a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Box volume.
    Box(Aabb),
    /// Sphere volume.
    Sphere(BoundingSphere),
}

impl Shape {
    /// Unit cube centered on the origin.
    pub fn unit_cube() -> Self {
        Shape::Box(Aabb::from_center_size(Vec3::ZERO, Vec3::ONE))
    }

    /// Sphere of `radius` centered on the origin.
    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere(BoundingSphere::new(Vec3::ZERO, radius))
    }

    fn local_intersection(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match self {
            Shape::Box(aabb) => aabb.ray_intersection(origin, dir),
            Shape::Sphere(sphere) => sphere.ray_intersection(origin, dir),
        }
    }
}

/// Intersection of a ray with a shape placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Distance along the (unit-direction) world ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
}

/// Intersect `ray` with `shape` transformed by `world`.
///
/// The ray is carried into the shape's local frame without renormalizing, so the
/// local ray parameter equals the world distance along `ray`.
pub fn intersect_shape(shape: &Shape, world: &Mat4, ray: &Ray) -> Option<ShapeHit> {
    if world.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let inv = world.inverse();
    let local_origin = inv.transform_point3(ray.origin);
    let local_dir = inv.transform_vector3(ray.direction);
    let distance = shape.local_intersection(local_origin, local_dir)?;
    Some(ShapeHit {
        distance,
        point: ray.at(distance),
    })
}
