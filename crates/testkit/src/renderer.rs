//! Renderer that records draw commands instead of drawing.

use glam::Mat4;
use xrinteract_core::{Eye, FramebufferLayer, Viewport};
use xrinteract_frame::{FrameRenderer, ViewParams};
use xrinteract_scene::Scene;

/// A recorded renderer command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderOp {
    /// `bind_framebuffer`.
    BindFramebuffer(Option<FramebufferLayer>),
    /// `set_viewport`.
    Viewport(Viewport),
    /// `clear`.
    Clear,
    /// `clear_depth`.
    ClearDepth,
    /// `render`.
    Render {
        /// Eye drawn.
        eye: Eye,
        /// View matrix used.
        view_matrix: Mat4,
        /// Visible nodes in the scene at draw time.
        visible_nodes: usize,
    },
}

/// [`FrameRenderer`] that records every command.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    surface: (u32, u32),
    ops: Vec<RenderOp>,
}

impl RecordingRenderer {
    /// Renderer with a default surface of `width` x `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { surface: (width, height), ops: Vec::new() }
    }

    /// Commands recorded so far.
    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Drain recorded commands.
    pub fn take_ops(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }

    /// Views drawn so far.
    pub fn renders(&self) -> Vec<(Eye, Mat4)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Render { eye, view_matrix, .. } => Some((*eye, *view_matrix)),
                _ => None,
            })
            .collect()
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl FrameRenderer for RecordingRenderer {
    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn bind_framebuffer(&mut self, layer: Option<&FramebufferLayer>) {
        self.ops.push(RenderOp::BindFramebuffer(layer.copied()));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.ops.push(RenderOp::Viewport(viewport));
    }

    fn clear(&mut self) {
        self.ops.push(RenderOp::Clear);
    }

    fn clear_depth(&mut self) {
        self.ops.push(RenderOp::ClearDepth);
    }

    fn render(&mut self, scene: &Scene, view: &ViewParams) {
        let visible_nodes = scene
            .ids()
            .filter(|id| scene.node(*id).is_some_and(|node| node.is_visible()))
            .count();
        self.ops.push(RenderOp::Render { eye: view.eye, view_matrix: view.view_matrix, visible_nodes });
    }
}
