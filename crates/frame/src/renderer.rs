//! Seams between the frame loop and whatever draws the scene.

use glam::Mat4;
use xrinteract_core::{Eye, FramebufferLayer, Viewport};
use xrinteract_scene::Scene;

/// Matrices and target rectangle for one rendered view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    /// Eye being drawn.
    pub eye: Eye,
    /// World to eye, after view-offset correction.
    pub view_matrix: Mat4,
    /// Eye projection.
    pub projection: Mat4,
    /// Target rectangle.
    pub viewport: Viewport,
}

/// Drawing backend driven by the frame loop.
pub trait FrameRenderer {
    /// Size of the default surface in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Target the session framebuffer, or the default surface when `None`.
    fn bind_framebuffer(&mut self, layer: Option<&FramebufferLayer>);

    /// Set the active viewport.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear colour and depth.
    fn clear(&mut self);

    /// Clear depth only (between eyes).
    fn clear_depth(&mut self);

    /// Draw the scene for one view.
    fn render(&mut self, scene: &Scene, view: &ViewParams);
}

/// Per-scene animation hook run once per live tick before rendering.
pub trait SceneContent {
    /// Advance animations; `timestamp` is the host clock in milliseconds.
    fn animate(&mut self, timestamp: f64, scene: &mut Scene);
}

/// Content with nothing to animate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticContent;

impl SceneContent for StaticContent {
    fn animate(&mut self, _timestamp: f64, _scene: &mut Scene) {}
}
