#![warn(missing_docs)]
//! Arena scene graph used as the active scene for pointing.
//!
//! Nodes live in a generational arena and are addressed by [`NodeId`]. Each node
//! carries a position/rotation/scale, a local matrix, a cached world matrix, and
//! an optional pickable [`Shape`]. When a node's `matrix_auto_update` flag is
//! set, world-matrix refreshes recompose its local matrix from position,
//! rotation, and scale; when cleared, the local matrix is left as written.

mod graph;
mod raycast;

pub use graph::{Node, NodeDesc, NodeId, Scene, SceneError};
pub use raycast::SceneHit;

/// Access to whichever scene is currently active.
///
/// The interaction engine reads the scene to raycast and writes matrices back
/// onto dragged nodes; it never adds or removes nodes.
pub trait SceneAccessor {
    /// Currently active scene, if any.
    fn active_scene(&self) -> Option<&Scene>;

    /// Mutable access to the currently active scene.
    fn active_scene_mut(&mut self) -> Option<&mut Scene>;
}

impl SceneAccessor for Scene {
    fn active_scene(&self) -> Option<&Scene> {
        Some(self)
    }

    fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        Some(self)
    }
}

impl SceneAccessor for Option<Scene> {
    fn active_scene(&self) -> Option<&Scene> {
        self.as_ref()
    }

    fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        self.as_mut()
    }
}
