//! The host session API consumed by the core, and the events it emits.

use thiserror::Error;

use crate::{
    CanvasId, CanvasRole, FrameHandle, FrameScheduler, FramebufferLayer, InputSourceId,
    InputSourceInfo, ReferenceSpaceKind, SessionHandle, SessionMode, SpaceId, XrFrame,
};

/// Failure reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host exposes no XR API at all.
    #[error("XR API unavailable on this host")]
    Unavailable,
    /// The host does not support the requested session mode.
    #[error("session mode {0} is not supported")]
    Unsupported(SessionMode),
    /// The host refused an otherwise supported request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The rendering context could not be made device compatible.
    #[error("rendering context not compatible: {0}")]
    NotCompatible(String),
    /// The session ended before the request completed.
    #[error("session ended before the request completed")]
    SessionEnded,
}

/// Which half of a select gesture a device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectPhase {
    /// Trigger pressed (`selectstart`).
    Start,
    /// Trigger released (`selectend`).
    End,
    /// Combined click some devices emit instead of a start/end pair (`select`).
    Click,
}

/// Render state pushed to a session once its render target is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    /// Framebuffer layer the session presents.
    pub base_layer: FramebufferLayer,
    /// Canvas mirroring the output, if any.
    pub output_canvas: Option<CanvasId>,
}

/// Notifications the host delivers asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A `request_session` call succeeded.
    SessionGranted {
        /// Mode that was requested.
        mode: SessionMode,
        /// New session.
        session: SessionHandle,
    },
    /// A `request_session` call failed.
    SessionRejected {
        /// Mode that was requested.
        mode: SessionMode,
        /// Why.
        reason: HostError,
    },
    /// A `make_compatible` call resolved.
    CompatibilityResolved(Result<(), HostError>),
    /// A `request_reference_space` call succeeded.
    ReferenceSpaceGranted {
        /// Session the space belongs to.
        session: SessionHandle,
        /// Native space identity.
        space: SpaceId,
    },
    /// A `request_reference_space` call failed.
    ReferenceSpaceRejected {
        /// Session the space was requested for.
        session: SessionHandle,
        /// Why.
        reason: HostError,
    },
    /// A session ended (by the user, the device, or `end_session`).
    SessionEnded {
        /// The session that ended.
        session: SessionHandle,
    },
    /// XR hardware was plugged in or removed.
    DeviceChange,
    /// The set of tracked input sources of a session changed.
    InputSourcesChanged {
        /// Session whose sources changed.
        session: SessionHandle,
    },
    /// A select gesture transition.
    Select {
        /// Session the device belongs to.
        session: SessionHandle,
        /// Device that fired.
        source: InputSourceId,
        /// Gesture phase.
        phase: SelectPhase,
        /// Poses at the time of the event.
        frame: XrFrame,
    },
    /// An animation callback fired.
    AnimationFrame {
        /// Handle returned by the matching request.
        handle: FrameHandle,
        /// Host timestamp in milliseconds.
        timestamp: f64,
        /// Frame data; only session schedulers deliver one.
        frame: Option<XrFrame>,
    },
}

/// Host session API.
///
/// Queries answer immediately. `request_session`, `make_compatible`, and
/// `request_reference_space` only issue the request; completion arrives later
/// as a [`HostEvent`] from [`XrHost::poll_events`].
pub trait XrHost {
    /// Whether the host exposes an XR API at all.
    fn is_available(&self) -> bool;

    /// Capability query for a session mode.
    fn supports_session(&self, mode: SessionMode) -> Result<(), HostError>;

    /// Begin negotiating a session.
    fn request_session(&mut self, mode: SessionMode);

    /// Ask the host to end a session; `SessionEnded` follows.
    fn end_session(&mut self, session: SessionHandle);

    /// Currently tracked input sources of a session.
    fn input_sources(&self, session: SessionHandle) -> Vec<InputSourceInfo>;

    /// Begin marking the rendering context as device compatible.
    fn make_compatible(&mut self);

    /// Construct a framebuffer layer for a session.
    fn create_base_layer(&mut self, session: SessionHandle) -> FramebufferLayer;

    /// Push render state to a session.
    fn update_render_state(&mut self, session: SessionHandle, state: RenderState);

    /// Begin acquiring a reference space for a session.
    fn request_reference_space(&mut self, session: SessionHandle, kind: ReferenceSpaceKind);

    /// Create a presentation canvas.
    fn create_canvas(&mut self, role: CanvasRole) -> CanvasId;

    /// Show a canvas.
    fn attach_canvas(&mut self, canvas: CanvasId);

    /// Remove a canvas wherever it is attached.
    fn detach_canvas(&mut self, canvas: CanvasId);

    /// Show or hide the regular (non-XR) rendering canvas.
    fn set_main_canvas_visible(&mut self, visible: bool);

    /// Schedule an animation callback.
    fn request_animation_frame(&mut self, scheduler: FrameScheduler) -> FrameHandle;

    /// Cancel a scheduled animation callback.
    fn cancel_animation_frame(&mut self, handle: FrameHandle);

    /// Drain pending notifications.
    fn poll_events(&mut self) -> Vec<HostEvent>;
}
