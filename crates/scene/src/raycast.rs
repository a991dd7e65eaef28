//! Nearest-first raycasting against pickable nodes.

use glam::{Mat4, Vec3};
use xrinteract_geometry::{intersect_shape, Ray};

use crate::{NodeId, Scene};

/// One ray/node intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    /// Node that was hit.
    pub node: NodeId,
    /// Distance from the ray origin.
    pub distance: f32,
    /// Hit point in scene world space.
    pub point: Vec3,
}

impl Scene {
    /// All intersections of `ray` with visible pickable nodes, nearest first.
    ///
    /// The ray is first carried through the root's world matrix, so a ray given
    /// in tracking space lands in the same frame as the node world matrices.
    /// Equal distances keep depth-first traversal order.
    pub fn raycast(&self, ray: &Ray) -> Vec<SceneHit> {
        let scene_ray = ray.transformed(&self.root_world_matrix());
        let mut hits = Vec::new();

        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !node.is_visible() {
                continue;
            }
            if let Some(shape) = node.shape() {
                if let Some(hit) = intersect_shape(shape, &node.world_matrix(), &scene_ray) {
                    hits.push(SceneHit {
                        node: id,
                        distance: hit.distance,
                        point: hit.point,
                    });
                }
            }
            stack.extend(node.children().iter().rev().copied());
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest intersection only.
    pub fn raycast_first(&self, ray: &Ray) -> Option<SceneHit> {
        self.raycast(ray).into_iter().next()
    }

    /// Ray in scene world space for a pointer matrix given in tracking space.
    pub fn scene_ray(&self, pointer: &Mat4) -> Ray {
        Ray::from_matrix(self.root_world_matrix() * *pointer)
    }
}
