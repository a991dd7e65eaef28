//! Per-node interaction callbacks and the side table that holds them.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use xrinteract_scene::{NodeId, Scene, SceneError, SceneHit};

use crate::InputSource;

bitflags! {
    /// Which callbacks an [`Interactions`] implementation defines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u16 {
        /// Pointer started hovering the node.
        const HOVER_START = 1 << 0;
        /// Pointer is hovering the node this frame.
        const HOVER = 1 << 1;
        /// Pointer stopped hovering the node.
        const HOVER_END = 1 << 2;
        /// Trigger pressed on the node.
        const SELECT_START = 1 << 3;
        /// Trigger released on the node.
        const SELECT_END = 1 << 4;
        /// Combined click on the node.
        const SELECT = 1 << 5;
        /// Node supplies its own drag anchor.
        const DRAG_START = 1 << 6;
        /// Node applies drag transforms itself.
        const DRAG = 1 << 7;
        /// Node wants to know when a drag ends.
        const DRAG_END = 1 << 8;
        /// Any drag callback; its presence routes selection into drag mode.
        const ANY_DRAG = Self::DRAG_START.bits() | Self::DRAG.bits() | Self::DRAG_END.bits();
    }
}

/// A pointer hit delivered to callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Source that produced the hit.
    pub source: InputSource,
    /// Node that was hit.
    pub node: NodeId,
    /// Distance from the ray origin.
    pub distance: f32,
    /// Hit point in scene world space.
    pub point: Vec3,
}

impl Hit {
    pub(crate) fn new(source: InputSource, hit: &SceneHit) -> Self {
        Self {
            source,
            node: hit.node,
            distance: hit.distance,
            point: hit.point,
        }
    }
}

/// Everything a node's `drag` callback needs to move itself.
pub struct DragContext<'a> {
    /// Source doing the dragging.
    pub source: InputSource,
    /// Dragged node.
    pub node: NodeId,
    /// New world transform: pointer matrix × drag anchor.
    pub transform: Mat4,
    /// Scene the node lives in.
    pub scene: &'a mut Scene,
}

impl DragContext<'_> {
    /// Apply `transform` as the node's world matrix, the same way the engine
    /// does for nodes without a `drag` callback.
    pub fn apply(&mut self) -> Result<(), SceneError> {
        self.scene.set_world_matrix(self.node, self.transform)
    }
}

/// Anchor relating a grabbed node to the pointer at grab time.
pub fn default_anchor(pointer: &Mat4, node_world: &Mat4) -> Mat4 {
    pointer.inverse() * *node_world
}

/// Optional interaction callbacks for one scene node.
///
/// Only callbacks whose flag appears in [`Interactions::capabilities`] are ever
/// invoked; the default bodies are no-ops.
pub trait Interactions {
    /// Callbacks this node defines.
    fn capabilities(&self) -> Capabilities;

    /// Pointer started hovering.
    fn hover_start(&mut self, _hit: &Hit) {}

    /// Pointer hovers this frame.
    fn hover(&mut self, _hit: &Hit) {}

    /// Pointer left the node.
    fn hover_end(&mut self, _node: NodeId) {}

    /// Trigger pressed on the node (click-select mode only).
    fn select_start(&mut self, _hit: &Hit) {}

    /// Trigger released with the pointer on the node.
    fn select_end(&mut self, _hit: &Hit) {}

    /// Combined click.
    fn select(&mut self, _hit: &Hit) {}

    /// Drag begins; returns the anchor transform to use for the drag.
    fn drag_start(&mut self, _hit: &Hit, pointer: &Mat4, node_world: &Mat4) -> Mat4 {
        default_anchor(pointer, node_world)
    }

    /// New drag transform for this frame.
    fn drag(&mut self, _ctx: DragContext<'_>) {}

    /// Drag finished.
    fn drag_end(&mut self, _node: NodeId) {}
}

type HitCallback = Box<dyn FnMut(&Hit)>;
type NodeCallback = Box<dyn FnMut(NodeId)>;
type DragStartCallback = Box<dyn FnMut(&Hit, &Mat4, &Mat4) -> Mat4>;
type DragCallback = Box<dyn FnMut(DragContext<'_>)>;

/// Closure-backed [`Interactions`]; capabilities follow which closures are set.
#[derive(Default)]
pub struct InteractionBundle {
    hover_start: Option<HitCallback>,
    hover: Option<HitCallback>,
    hover_end: Option<NodeCallback>,
    select_start: Option<HitCallback>,
    select_end: Option<HitCallback>,
    select: Option<HitCallback>,
    drag_start: Option<DragStartCallback>,
    drag: Option<DragCallback>,
    drag_end: Option<NodeCallback>,
}

impl InteractionBundle {
    /// Bundle with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `hover_start`.
    pub fn on_hover_start(mut self, f: impl FnMut(&Hit) + 'static) -> Self {
        self.hover_start = Some(Box::new(f));
        self
    }

    /// Set `hover`.
    pub fn on_hover(mut self, f: impl FnMut(&Hit) + 'static) -> Self {
        self.hover = Some(Box::new(f));
        self
    }

    /// Set `hover_end`.
    pub fn on_hover_end(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.hover_end = Some(Box::new(f));
        self
    }

    /// Set `select_start`.
    pub fn on_select_start(mut self, f: impl FnMut(&Hit) + 'static) -> Self {
        self.select_start = Some(Box::new(f));
        self
    }

    /// Set `select_end`.
    pub fn on_select_end(mut self, f: impl FnMut(&Hit) + 'static) -> Self {
        self.select_end = Some(Box::new(f));
        self
    }

    /// Set `select`.
    pub fn on_select(mut self, f: impl FnMut(&Hit) + 'static) -> Self {
        self.select = Some(Box::new(f));
        self
    }

    /// Set `drag_start`.
    pub fn on_drag_start(mut self, f: impl FnMut(&Hit, &Mat4, &Mat4) -> Mat4 + 'static) -> Self {
        self.drag_start = Some(Box::new(f));
        self
    }

    /// Set `drag`.
    pub fn on_drag(mut self, f: impl FnMut(DragContext<'_>) + 'static) -> Self {
        self.drag = Some(Box::new(f));
        self
    }

    /// Set `drag_end`.
    pub fn on_drag_end(mut self, f: impl FnMut(NodeId) + 'static) -> Self {
        self.drag_end = Some(Box::new(f));
        self
    }
}

impl Interactions for InteractionBundle {
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::HOVER_START, self.hover_start.is_some());
        caps.set(Capabilities::HOVER, self.hover.is_some());
        caps.set(Capabilities::HOVER_END, self.hover_end.is_some());
        caps.set(Capabilities::SELECT_START, self.select_start.is_some());
        caps.set(Capabilities::SELECT_END, self.select_end.is_some());
        caps.set(Capabilities::SELECT, self.select.is_some());
        caps.set(Capabilities::DRAG_START, self.drag_start.is_some());
        caps.set(Capabilities::DRAG, self.drag.is_some());
        caps.set(Capabilities::DRAG_END, self.drag_end.is_some());
        caps
    }

    fn hover_start(&mut self, hit: &Hit) {
        if let Some(f) = self.hover_start.as_mut() {
            f(hit);
        }
    }

    fn hover(&mut self, hit: &Hit) {
        if let Some(f) = self.hover.as_mut() {
            f(hit);
        }
    }

    fn hover_end(&mut self, node: NodeId) {
        if let Some(f) = self.hover_end.as_mut() {
            f(node);
        }
    }

    fn select_start(&mut self, hit: &Hit) {
        if let Some(f) = self.select_start.as_mut() {
            f(hit);
        }
    }

    fn select_end(&mut self, hit: &Hit) {
        if let Some(f) = self.select_end.as_mut() {
            f(hit);
        }
    }

    fn select(&mut self, hit: &Hit) {
        if let Some(f) = self.select.as_mut() {
            f(hit);
        }
    }

    fn drag_start(&mut self, hit: &Hit, pointer: &Mat4, node_world: &Mat4) -> Mat4 {
        match self.drag_start.as_mut() {
            Some(f) => f(hit, pointer, node_world),
            None => default_anchor(pointer, node_world),
        }
    }

    fn drag(&mut self, ctx: DragContext<'_>) {
        if let Some(f) = self.drag.as_mut() {
            f(ctx);
        }
    }

    fn drag_end(&mut self, node: NodeId) {
        if let Some(f) = self.drag_end.as_mut() {
            f(node);
        }
    }
}

impl<T: Interactions + ?Sized> Interactions for Box<T> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn hover_start(&mut self, hit: &Hit) {
        (**self).hover_start(hit)
    }

    fn hover(&mut self, hit: &Hit) {
        (**self).hover(hit)
    }

    fn hover_end(&mut self, node: NodeId) {
        (**self).hover_end(node)
    }

    fn select_start(&mut self, hit: &Hit) {
        (**self).select_start(hit)
    }

    fn select_end(&mut self, hit: &Hit) {
        (**self).select_end(hit)
    }

    fn select(&mut self, hit: &Hit) {
        (**self).select(hit)
    }

    fn drag_start(&mut self, hit: &Hit, pointer: &Mat4, node_world: &Mat4) -> Mat4 {
        (**self).drag_start(hit, pointer, node_world)
    }

    fn drag(&mut self, ctx: DragContext<'_>) {
        (**self).drag(ctx)
    }

    fn drag_end(&mut self, node: NodeId) {
        (**self).drag_end(node)
    }
}

/// Side table mapping nodes to their interaction callbacks.
///
/// At most one entry per node; inserting again replaces the previous entry.
#[derive(Default)]
pub struct CapabilityTable {
    entries: HashMap<NodeId, Box<dyn Interactions>>,
}

impl CapabilityTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach callbacks to `node`, returning any entry it replaced.
    pub fn insert(
        &mut self,
        node: NodeId,
        interactions: impl Interactions + 'static,
    ) -> Option<Box<dyn Interactions>> {
        self.entries.insert(node, Box::new(interactions))
    }

    /// Detach the callbacks of `node`.
    pub fn remove(&mut self, node: NodeId) -> Option<Box<dyn Interactions>> {
        self.entries.remove(&node)
    }

    /// Whether `node` has callbacks attached.
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    /// Capabilities of `node`; empty when nothing is attached.
    pub fn capabilities(&self, node: NodeId) -> Capabilities {
        self.entries
            .get(&node)
            .map(|entry| entry.capabilities())
            .unwrap_or_default()
    }

    /// Mutable access to the callbacks of `node`.
    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut (dyn Interactions + 'static)> {
        self.entries.get_mut(&node).map(|entry| entry.as_mut())
    }

    /// Number of nodes with callbacks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no node has callbacks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `f` on the entry of `node` when it defines every flag in `required`.
    pub(crate) fn with<R>(
        &mut self,
        node: NodeId,
        required: Capabilities,
        f: impl FnOnce(&mut dyn Interactions) -> R,
    ) -> Option<R> {
        let entry = self.entries.get_mut(&node)?;
        if entry.capabilities().contains(required) {
            Some(f(entry.as_mut()))
        } else {
            None
        }
    }
}
