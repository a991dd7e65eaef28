//! Per-source hover/drag state machine.

use glam::Mat4;
use std::collections::HashMap;
use tracing::{debug, trace, warn};
use xrinteract_core::{InputSourceId, InputSourceInfo, ReferenceSpace, SelectPhase, SessionHandle, XrFrame};
use xrinteract_geometry::Ray;
use xrinteract_scene::{NodeId, Scene, SceneAccessor};

use crate::capability::{Capabilities, CapabilityTable, DragContext, Hit};
use crate::{create_ray, pseudo_ray, default_anchor, InputSource};

/// An open drag for one input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// Node being dragged.
    pub node: NodeId,
    /// Pointer-to-node anchor captured at drag start.
    pub anchor: Mat4,
    /// The node's auto-update flag before the drag suspended it.
    pub saved_auto_update: bool,
}

/// Hover/select/drag dispatcher.
///
/// Holds the capability side table, the tracked input sources of the session it
/// is attached to, and the hover and drag maps keyed by [`InputSource`].
#[derive(Default)]
pub struct InteractionEngine {
    table: CapabilityTable,
    sources: Vec<InputSourceInfo>,
    hovered: HashMap<InputSource, NodeId>,
    drags: HashMap<InputSource, DragState>,
    attached: Option<SessionHandle>,
}

impl InteractionEngine {
    /// Engine with no callbacks and no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability side table.
    pub fn interactions(&self) -> &CapabilityTable {
        &self.table
    }

    /// Mutable capability side table, for attaching and detaching callbacks.
    pub fn interactions_mut(&mut self) -> &mut CapabilityTable {
        &mut self.table
    }

    /// Start listening to `session`'s input events.
    pub fn attach(&mut self, session: SessionHandle, sources: Vec<InputSourceInfo>) {
        debug!(session = session.0, sources = sources.len(), "interaction listeners installed");
        self.attached = Some(session);
        self.sources = sources;
    }

    /// Stop listening; returns the session that was attached.
    pub fn detach(&mut self) -> Option<SessionHandle> {
        let session = self.attached.take();
        if let Some(session) = session {
            debug!(session = session.0, "interaction listeners removed");
        }
        self.sources.clear();
        session
    }

    /// Session whose events are currently accepted.
    pub fn attached_session(&self) -> Option<SessionHandle> {
        self.attached
    }

    /// Tracked input sources.
    pub fn input_sources(&self) -> &[InputSourceInfo] {
        &self.sources
    }

    /// Node currently hovered by `source`.
    pub fn hovered(&self, source: InputSource) -> Option<NodeId> {
        self.hovered.get(&source).copied()
    }

    /// Open drag of `source`.
    pub fn drag_state(&self, source: InputSource) -> Option<&DragState> {
        self.drags.get(&source)
    }

    /// Number of sources currently hovering something.
    pub fn hover_count(&self) -> usize {
        self.hovered.len()
    }

    /// Number of open drags.
    pub fn drag_count(&self) -> usize {
        self.drags.len()
    }

    /// Replace the tracked source set.
    ///
    /// Sources that disappeared lose their hover (`hover_end`) and drag. When
    /// real sources appear the pseudo-source stops existing and is closed too.
    pub fn set_input_sources(&mut self, sources: Vec<InputSourceInfo>, scene: &mut dyn SceneAccessor) {
        let mut gone: Vec<InputSource> = self
            .sources
            .iter()
            .filter(|old| !sources.iter().any(|new| new.id == old.id))
            .map(|old| InputSource::Real(old.id))
            .collect();
        if !sources.is_empty() {
            gone.push(InputSource::Pseudo);
        }
        debug!(count = sources.len(), "input sources changed");
        self.sources = sources;
        for source in gone {
            self.release_source(source, scene);
        }
    }

    /// Per-frame update for one source: drag first, then hover.
    ///
    /// `ray == None` (pose miss) leaves all state untouched.
    pub fn update_input_source(&mut self, source: InputSource, ray: Option<&Ray>, scene: &mut dyn SceneAccessor) {
        let Some(ray) = ray else {
            return;
        };
        let Some(scene) = scene.active_scene_mut() else {
            return;
        };

        if let Some(drag) = self.drags.get(&source).copied() {
            self.apply_drag(source, drag, ray.matrix * drag.anchor, scene);
        }

        let previous = self.hovered.get(&source).copied();
        match scene.raycast_first(ray) {
            Some(scene_hit) => {
                let hit = Hit::new(source, &scene_hit);
                if previous != Some(hit.node) {
                    if let Some(previous) = previous {
                        self.table
                            .with(previous, Capabilities::HOVER_END, |i| i.hover_end(previous));
                    }
                    trace!(%source, node = %hit.node, "hover target changed");
                    self.table
                        .with(hit.node, Capabilities::HOVER_START, |i| i.hover_start(&hit));
                    self.hovered.insert(source, hit.node);
                }
                self.table.with(hit.node, Capabilities::HOVER, |i| i.hover(&hit));
            }
            None => {
                if let Some(previous) = self.hovered.remove(&source) {
                    self.table
                        .with(previous, Capabilities::HOVER_END, |i| i.hover_end(previous));
                }
            }
        }
    }

    /// Dispatch a select gesture from `source`.
    pub fn handle_select(
        &mut self,
        phase: SelectPhase,
        source: InputSource,
        ray: Option<&Ray>,
        scene: &mut dyn SceneAccessor,
    ) {
        match phase {
            SelectPhase::Start => self.select_start(source, ray, scene),
            SelectPhase::End => self.select_end(source, ray, scene),
            SelectPhase::Click => self.select(source, ray, scene),
        }
    }

    /// Trigger pressed: open a drag on drag-capable nodes, else `select_start`.
    pub fn select_start(&mut self, source: InputSource, ray: Option<&Ray>, scene: &mut dyn SceneAccessor) {
        let Some(ray) = ray else {
            return;
        };
        let Some(scene) = scene.active_scene_mut() else {
            return;
        };
        let Some(scene_hit) = scene.raycast_first(ray) else {
            return;
        };
        let hit = Hit::new(source, &scene_hit);
        let caps = self.table.capabilities(hit.node);

        if caps.intersects(Capabilities::ANY_DRAG) {
            if let Some(open) = self.drags.get(&source) {
                debug!(%source, node = %open.node, "select start ignored, source already dragging");
                return;
            }
            let Some(node_world) = scene.world_matrix(hit.node) else {
                return;
            };
            // A node already held by another source keeps the flag saved by the first grab.
            let saved_auto_update = match self.drags.values().find(|open| open.node == hit.node) {
                Some(open) => open.saved_auto_update,
                None => scene.matrix_auto_update(hit.node).unwrap_or(true),
            };
            let anchor = self
                .table
                .with(hit.node, Capabilities::DRAG_START, |i| {
                    i.drag_start(&hit, &ray.matrix, &node_world)
                })
                .unwrap_or_else(|| default_anchor(&ray.matrix, &node_world));
            if let Err(err) = scene.set_matrix_auto_update(hit.node, false) {
                warn!(%err, "could not suspend auto-update for drag");
                return;
            }
            debug!(%source, node = %hit.node, "drag started");
            self.drags.insert(
                source,
                DragState {
                    node: hit.node,
                    anchor,
                    saved_auto_update,
                },
            );
        } else {
            self.table
                .with(hit.node, Capabilities::SELECT_START, |i| i.select_start(&hit));
        }
    }

    /// Trigger released: close any drag of `source`, then `select_end` on the hit node.
    ///
    /// The drag closes even without a ray; `select_end` needs one.
    pub fn select_end(&mut self, source: InputSource, ray: Option<&Ray>, scene: &mut dyn SceneAccessor) {
        if let Some(drag) = self.drags.remove(&source) {
            self.finish_drag(source, drag, scene.active_scene_mut());
        }

        let Some(ray) = ray else {
            return;
        };
        let Some(scene) = scene.active_scene() else {
            return;
        };
        if let Some(scene_hit) = scene.raycast_first(ray) {
            let hit = Hit::new(source, &scene_hit);
            self.table
                .with(hit.node, Capabilities::SELECT_END, |i| i.select_end(&hit));
        }
    }

    /// Combined click.
    pub fn select(&mut self, source: InputSource, ray: Option<&Ray>, scene: &mut dyn SceneAccessor) {
        let Some(ray) = ray else {
            return;
        };
        let Some(scene) = scene.active_scene() else {
            return;
        };
        if let Some(scene_hit) = scene.raycast_first(ray) {
            let hit = Hit::new(source, &scene_hit);
            self.table.with(hit.node, Capabilities::SELECT, |i| i.select(&hit));
        }
    }

    /// Route a host select event for a real device.
    ///
    /// Events from a session other than the attached one, and from unknown
    /// devices, are dropped.
    pub fn handle_select_event(
        &mut self,
        session: SessionHandle,
        device: InputSourceId,
        phase: SelectPhase,
        frame: &XrFrame,
        space: Option<&ReferenceSpace>,
        scene: &mut dyn SceneAccessor,
    ) {
        if self.attached != Some(session) {
            trace!(session = session.0, "select event for detached session dropped");
            return;
        }
        let Some(info) = self.sources.iter().find(|info| info.id == device).copied() else {
            debug!(device = device.0, "select event from unknown input source");
            return;
        };
        let ray = space.and_then(|space| create_ray(&info, frame, space));
        self.handle_select(phase, InputSource::Real(device), ray.as_ref(), scene);
    }

    /// Per-frame pass over every tracked source, or the pseudo-source when none are tracked.
    ///
    /// `pseudo_world` is the world matrix of the last rendered eye.
    pub fn handle_frame(
        &mut self,
        frame: &XrFrame,
        space: Option<&ReferenceSpace>,
        pseudo_world: &Mat4,
        scene: &mut dyn SceneAccessor,
    ) {
        if self.sources.is_empty() {
            self.update_pseudo_source(pseudo_world, scene);
            return;
        }
        let sources = self.sources.clone();
        for info in &sources {
            let ray = space.and_then(|space| create_ray(info, frame, space));
            self.update_input_source(InputSource::Real(info.id), ray.as_ref(), scene);
        }
    }

    /// Per-frame update of the pseudo-source from a camera world matrix.
    pub fn update_pseudo_source(&mut self, camera_world: &Mat4, scene: &mut dyn SceneAccessor) {
        let ray = pseudo_ray(camera_world);
        self.update_input_source(InputSource::Pseudo, Some(&ray), scene);
    }

    /// Session teardown: `hover_end` once for every hovered node, then force-close drags.
    pub fn close(&mut self, scene: &mut dyn SceneAccessor) {
        let mut hovered: Vec<(InputSource, NodeId)> = self.hovered.drain().collect();
        hovered.sort_by_key(|(source, _)| *source);
        for (_, node) in hovered {
            self.table.with(node, Capabilities::HOVER_END, |i| i.hover_end(node));
        }

        let mut drags: Vec<(InputSource, DragState)> = self.drags.drain().collect();
        drags.sort_by_key(|(source, _)| *source);
        for (source, drag) in drags {
            self.finish_drag(source, drag, scene.active_scene_mut());
        }
    }

    fn release_source(&mut self, source: InputSource, scene: &mut dyn SceneAccessor) {
        if let Some(node) = self.hovered.remove(&source) {
            self.table.with(node, Capabilities::HOVER_END, |i| i.hover_end(node));
        }
        if let Some(drag) = self.drags.remove(&source) {
            self.finish_drag(source, drag, scene.active_scene_mut());
        }
    }

    fn apply_drag(&mut self, source: InputSource, drag: DragState, transform: Mat4, scene: &mut Scene) {
        let node = drag.node;
        if !scene.contains(node) {
            warn!(%source, %node, "dragged node vanished, dropping drag");
            self.drags.remove(&source);
            return;
        }
        let handled = self.table.with(node, Capabilities::DRAG, |i| {
            i.drag(DragContext {
                source,
                node,
                transform,
                scene: &mut *scene,
            })
        });
        if handled.is_none() {
            if let Err(err) = scene.set_world_matrix(node, transform) {
                warn!(%err, %source, "dragged node vanished, dropping drag");
                self.drags.remove(&source);
            }
        }
    }

    /// `drag` must already be removed from the drag map.
    fn finish_drag(&mut self, source: InputSource, drag: DragState, scene: Option<&mut Scene>) {
        let still_held = self.drags.values().any(|open| open.node == drag.node);
        if let Some(scene) = scene.filter(|_| !still_held) {
            if let Err(err) = scene.set_matrix_auto_update(drag.node, drag.saved_auto_update) {
                debug!(%err, "dragged node gone before drag end");
            }
        }
        debug!(%source, node = %drag.node, "drag ended");
        self.table
            .with(drag.node, Capabilities::DRAG_END, |i| i.drag_end(drag.node));
    }
}
