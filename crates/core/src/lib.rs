#![warn(missing_docs)]
//! Host-facing primitives shared across the workspace.
//!
//! Everything the interaction and session layers need to talk to an XR host:
//! session modes and handles, reference spaces, input-source descriptors,
//! per-tick frame snapshots, framebuffer layers, and the [`XrHost`] trait with
//! the [`HostEvent`]s it emits.

mod frame;
mod host;
mod space;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use frame::{Eye, NativeView, View, ViewerPose, XrFrame};
pub use host::{HostError, HostEvent, RenderState, SelectPhase, XrHost};
pub use space::{ReferenceSpace, ReferenceSpaceKind};

/// Kind of spatial session a host can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Head-mounted stereo presentation ("immersive-vr").
    ImmersiveVr,
    /// Non-immersive page-embedded view ("inline", a.k.a. magic window).
    Inline,
}

impl SessionMode {
    /// Keyword the host API uses for this mode.
    pub fn keyword(self) -> &'static str {
        match self {
            SessionMode::ImmersiveVr => "immersive-vr",
            SessionMode::Inline => "inline",
        }
    }

    /// Whether this mode renders one view per eye.
    pub fn is_immersive(self) -> bool {
        matches!(self, SessionMode::ImmersiveVr)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Opaque handle to a host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(pub u64);

/// Opaque handle to a host-tracked space (reference space or input target-ray space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(pub u64);

/// Opaque handle to a presentation canvas owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(pub u64);

/// What a canvas is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanvasRole {
    /// Mirrors the immersive presentation on the desktop.
    Mirror,
    /// Full-window surface for an inline session.
    MagicWindow,
}

/// Handle returned by an animation-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Which scheduler an animation callback is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameScheduler {
    /// Generic host scheduler (no session, 2D viewport).
    Host,
    /// The session's own frame loop.
    Session(SessionHandle),
}

/// Stable identity of a tracked pointing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(pub u32);

/// Hand a tracked device is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    /// Not associated with a hand (gaze, screen).
    #[default]
    None,
    /// Left hand.
    Left,
    /// Right hand.
    Right,
}

/// Descriptor of one tracked input source as enumerated by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSourceInfo {
    /// Device identity.
    pub id: InputSourceId,
    /// Hand the device is held in.
    pub handedness: Handedness,
    /// Space whose pose yields the pointing ray. Absent devices cannot point.
    pub target_ray_space: Option<SpaceId>,
}

/// Pixel rectangle inside a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: u32,
    /// Bottom edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole surface.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Framebuffer layer attached to a session's render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferLayer {
    /// Session that owns the layer.
    pub session: SessionHandle,
    /// Framebuffer width in pixels.
    pub framebuffer_width: u32,
    /// Framebuffer height in pixels.
    pub framebuffer_height: u32,
}

impl FramebufferLayer {
    /// Sub-region of the framebuffer a view renders into.
    ///
    /// Stereo eyes split the framebuffer side by side; a mono view covers all of it.
    pub fn viewport(&self, eye: Eye) -> Viewport {
        let half = self.framebuffer_width / 2;
        match eye {
            Eye::Left => Viewport {
                x: 0,
                y: 0,
                width: half,
                height: self.framebuffer_height,
            },
            Eye::Right => Viewport {
                x: half,
                y: 0,
                width: self.framebuffer_width - half,
                height: self.framebuffer_height,
            },
            Eye::None => Viewport::full(self.framebuffer_width, self.framebuffer_height),
        }
    }
}
