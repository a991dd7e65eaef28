use glam::{Mat4, Vec3};
use tracing::trace;
use xrinteract_camera::Camera;
use xrinteract_core::{Eye, FrameHandle, Viewport, XrFrame, XrHost};
use xrinteract_geometry::translate_view_matrix;
use xrinteract_interaction::InteractionEngine;
use xrinteract_scene::Scene;
use xrinteract_session::SessionManager;

use crate::{FrameRenderer, SceneContent, ViewParams};

/// Everything one tick touches, borrowed for the duration of the callback.
pub struct FrameContext<'a> {
    /// Host to reschedule on.
    pub host: &'a mut dyn XrHost,
    /// Session state (scheduler, reference space, base layer).
    pub session: &'a SessionManager,
    /// Interaction engine updated once per tick.
    pub engine: &'a mut InteractionEngine,
    /// Scene to animate and draw.
    pub scene: &'a mut Scene,
    /// Drawing backend.
    pub renderer: &'a mut dyn FrameRenderer,
    /// Desktop camera; eye views are bound onto it while a session renders.
    pub camera: &'a mut Camera,
    /// Scene animation hook.
    pub content: &'a mut dyn SceneContent,
}

/// What a callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Handle did not match the pending one; nothing happened.
    Stale,
    /// Driver is stopped; no new callback was scheduled.
    Stopped,
    /// Views were drawn.
    Rendered {
        /// Number of views drawn.
        views: usize,
    },
    /// Session is live but has no frame data or reference space yet.
    AwaitingFrame,
    /// Frame data arrived without a viewer pose.
    NoViewerPose,
}

/// Owns one scene's animation callback.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    active: bool,
    pending: Option<FrameHandle>,
    view_offset: Vec3,
    last_eye_world: Mat4,
    frames_rendered: u64,
}

impl FrameDriver {
    /// Create a stopped driver; `view_offset` shifts every eye view.
    pub fn new(view_offset: Vec3) -> Self {
        Self {
            active: false,
            pending: None,
            view_offset,
            last_eye_world: Mat4::IDENTITY,
            frames_rendered: 0,
        }
    }

    /// Whether the loop is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Callback currently in flight.
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// View offset applied to every eye.
    pub fn view_offset(&self) -> Vec3 {
        self.view_offset
    }

    /// World matrix of the last eye rendered.
    pub fn last_eye_world(&self) -> Mat4 {
        self.last_eye_world
    }

    /// Ticks that drew at least one view.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Start the loop with the scheduler matching the session state.
    pub fn start(&mut self, host: &mut dyn XrHost, session: &SessionManager) {
        self.active = true;
        if self.pending.is_none() {
            self.schedule(host, session);
        }
    }

    /// Cancel the callback in flight and schedule a fresh one.
    ///
    /// Called on every restart signal so a loop never survives on a scheduler
    /// that no longer matches the session.
    pub fn restart(&mut self, host: &mut dyn XrHost, session: &SessionManager) {
        if let Some(handle) = self.pending.take() {
            host.cancel_animation_frame(handle);
        }
        if self.active {
            self.schedule(host, session);
        }
    }

    /// Stop the loop and cancel the callback in flight.
    pub fn stop(&mut self, host: &mut dyn XrHost) {
        self.active = false;
        if let Some(handle) = self.pending.take() {
            host.cancel_animation_frame(handle);
        }
    }

    /// Handle one animation callback.
    pub fn on_frame(
        &mut self,
        ctx: FrameContext<'_>,
        handle: FrameHandle,
        timestamp: f64,
        frame: Option<&XrFrame>,
    ) -> FrameOutcome {
        if self.pending != Some(handle) {
            trace!(?handle, pending = ?self.pending, "stale frame callback");
            return FrameOutcome::Stale;
        }
        self.pending = None;
        if !self.active {
            return FrameOutcome::Stopped;
        }

        let FrameContext {
            host,
            session,
            engine,
            scene,
            renderer,
            camera,
            content,
        } = ctx;

        content.animate(timestamp, scene);

        let outcome = match session.active_session() {
            None => {
                self.render_without_session(scene, renderer, camera);
                engine.update_pseudo_source(&camera.world_matrix(), scene);
                FrameOutcome::Rendered { views: 1 }
            }
            Some(_) => match (frame, session.reference_space()) {
                (Some(frame), Some(space)) => {
                    let outcome = match frame.viewer_pose(space) {
                        Some(pose) => {
                            scene.update_world_matrices();
                            let layer = session.base_layer();
                            renderer.bind_framebuffer(layer);
                            renderer.clear();
                            let (width, height) = renderer.surface_size();
                            for view in &pose.views {
                                let viewport = match layer {
                                    Some(layer) => layer.viewport(view.eye),
                                    None => Viewport::full(width, height),
                                };
                                let view_matrix = translate_view_matrix(&view.view_matrix, self.view_offset);
                                renderer.set_viewport(viewport);
                                camera.bind_view(view_matrix, view.projection);
                                renderer.render(
                                    scene,
                                    &ViewParams {
                                        eye: view.eye,
                                        view_matrix,
                                        projection: view.projection,
                                        viewport,
                                    },
                                );
                                renderer.clear_depth();
                                self.last_eye_world = view_matrix.inverse();
                            }
                            FrameOutcome::Rendered { views: pose.views.len() }
                        }
                        None => {
                            trace!("no viewer pose this tick");
                            FrameOutcome::NoViewerPose
                        }
                    };
                    engine.handle_frame(frame, Some(space), &self.last_eye_world, scene);
                    outcome
                }
                _ => {
                    trace!("session not ready for rendering");
                    FrameOutcome::AwaitingFrame
                }
            },
        };

        if matches!(outcome, FrameOutcome::Rendered { .. }) {
            self.frames_rendered += 1;
        }
        self.schedule(host, session);
        outcome
    }

    fn render_without_session(&mut self, scene: &mut Scene, renderer: &mut dyn FrameRenderer, camera: &mut Camera) {
        scene.update_world_matrices();
        camera.unbind_view();
        let (width, height) = renderer.surface_size();
        camera.set_aspect(width, height);
        let viewport = Viewport::full(width, height);
        renderer.bind_framebuffer(None);
        renderer.set_viewport(viewport);
        renderer.clear();
        let view_matrix = camera.view_matrix();
        renderer.render(
            scene,
            &ViewParams {
                eye: Eye::None,
                view_matrix,
                projection: camera.projection_matrix(),
                viewport,
            },
        );
        self.last_eye_world = camera.world_matrix();
    }

    fn schedule(&mut self, host: &mut dyn XrHost, session: &SessionManager) {
        let scheduler = session.frame_scheduler();
        let handle = host.request_animation_frame(scheduler);
        trace!(?handle, ?scheduler, "frame scheduled");
        self.pending = Some(handle);
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}
