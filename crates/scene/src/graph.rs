//! Generational arena of scene nodes.

use glam::{Mat4, Quat, Vec3};
use std::fmt;
use thiserror::Error;
use xrinteract_geometry::Shape;

/// Identity of a node: arena slot plus generation.
///
/// A removed node's id never aliases a node later stored in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Arena slot.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// Scene graph errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The id does not name a live node.
    #[error("unknown {0}")]
    UnknownNode(NodeId),
    /// The root node cannot be removed.
    #[error("the scene root cannot be removed")]
    CannotRemoveRoot,
}

/// Description of a node to insert.
#[derive(Debug, Clone)]
pub struct NodeDesc {
    name: String,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    shape: Option<Shape>,
    visible: bool,
}

impl NodeDesc {
    /// Empty group node at the origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            shape: None,
            visible: true,
        }
    }

    /// Local position.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Local rotation.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Local scale.
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Pickable shape in local space.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Initial visibility.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    matrix: Mat4,
    world: Mat4,
    auto_update: bool,
    shape: Option<Shape>,
    visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn from_desc(desc: NodeDesc, parent: Option<NodeId>) -> Self {
        let matrix = Mat4::from_scale_rotation_translation(desc.scale, desc.rotation, desc.position);
        Self {
            name: desc.name,
            position: desc.position,
            rotation: desc.rotation,
            scale: desc.scale,
            matrix,
            world: matrix,
            auto_update: true,
            shape: desc.shape,
            visible: desc.visible,
            parent,
            children: Vec::new(),
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Local matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Cached world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// Whether world refreshes recompose the local matrix.
    pub fn matrix_auto_update(&self) -> bool {
        self.auto_update
    }

    /// Pickable shape.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Visibility; hidden nodes and their subtrees are not pickable.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn compose_local(&mut self) {
        self.matrix = Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A scene: an arena of nodes under a single root.
#[derive(Debug, Clone)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Scene containing only its root.
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::from_desc(NodeDesc::new("scene"), None)),
            }],
            free: Vec::new(),
            root,
        }
    }

    /// Root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// World matrix of the root.
    pub fn root_world_matrix(&self) -> Mat4 {
        self.node(self.root)
            .map(Node::world_matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Whether only the root exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(SceneError::UnknownNode(id))
    }

    /// Live node ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|_| NodeId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    /// Find the first node with `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.ids()
            .find(|id| self.node(*id).map(|n| n.name == name).unwrap_or(false))
    }

    /// Insert a node under `parent`, computing its world matrix.
    pub fn add(&mut self, parent: NodeId, desc: NodeDesc) -> Result<NodeId, SceneError> {
        let parent_world = self
            .node(parent)
            .ok_or(SceneError::UnknownNode(parent))?
            .world;
        let mut node = Node::from_desc(desc, Some(parent));
        node.world = parent_world * node.matrix;

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove a node and its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        let parent = self.node(id).ok_or(SceneError::UnknownNode(id))?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
        tracing::debug!(node = %id, "removed scene subtree");
        Ok(())
    }

    /// Set local position.
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Set local rotation.
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        self.node_mut(id)?.rotation = rotation;
        Ok(())
    }

    /// Set local scale.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.scale = scale;
        Ok(())
    }

    /// Show or hide a node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    /// Write the local matrix directly.
    ///
    /// Position, rotation, and scale are re-derived from it so that a later
    /// auto-update recomposes the same matrix.
    pub fn set_matrix(&mut self, id: NodeId, matrix: Mat4) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        node.matrix = matrix;
        node.position = position;
        node.rotation = rotation;
        node.scale = scale;
        Ok(())
    }

    /// Current auto-update flag.
    pub fn matrix_auto_update(&self, id: NodeId) -> Option<bool> {
        self.node(id).map(Node::matrix_auto_update)
    }

    /// Enable or suspend automatic local-matrix recomposition.
    pub fn set_matrix_auto_update(&mut self, id: NodeId, enabled: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.auto_update = enabled;
        Ok(())
    }

    /// Cached world matrix.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.node(id).map(Node::world_matrix)
    }

    /// Place a node so its world matrix becomes `world`, then refresh its subtree.
    pub fn set_world_matrix(&mut self, id: NodeId, world: Mat4) -> Result<(), SceneError> {
        let parent_world = match self.node(id).ok_or(SceneError::UnknownNode(id))?.parent {
            Some(parent) => self.world_matrix(parent).unwrap_or(Mat4::IDENTITY),
            None => Mat4::IDENTITY,
        };
        self.set_matrix(id, parent_world.inverse() * world)?;
        self.update_subtree(id, false)
    }

    /// Refresh world matrices of the whole graph.
    pub fn update_world_matrices(&mut self) {
        let root = self.root;
        if let Err(err) = self.update_subtree(root, true) {
            tracing::warn!(%err, "scene root missing during world-matrix refresh");
        }
    }

    /// Refresh the world matrix of `id` and its descendants.
    ///
    /// When `recompose` is false, the node's own local matrix is used as written
    /// even if its auto-update flag is set; descendants honor their flags.
    pub fn update_subtree(&mut self, id: NodeId, recompose: bool) -> Result<(), SceneError> {
        let parent_world = match self.node(id).ok_or(SceneError::UnknownNode(id))?.parent {
            Some(parent) => self.world_matrix(parent).unwrap_or(Mat4::IDENTITY),
            None => Mat4::IDENTITY,
        };

        let mut stack = vec![(id, parent_world, recompose)];
        while let Some((current, parent_world, recompose)) = stack.pop() {
            let node = self.node_mut(current)?;
            if recompose && node.auto_update {
                node.compose_local();
            }
            node.world = parent_world * node.matrix;
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|child| (*child, world, true)));
        }
        Ok(())
    }
}
