use std::collections::VecDeque;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use xrinteract_core::{
    CanvasId, CanvasRole, FrameScheduler, FramebufferLayer, HostError, HostEvent,
    ReferenceSpace, ReferenceSpaceKind, RenderState, SessionHandle, SessionMode, SpaceId, XrHost,
};
use xrinteract_geometry::RigidTransform;
use xrinteract_interaction::InteractionEngine;
use xrinteract_scene::SceneAccessor;

use crate::{
    ActivePhase, ControlFallback, NegotiationFailure, NegotiationStage, SessionSignal,
    SessionState,
};

/// Session negotiation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Reference space requested for every session.
    pub reference_space: ReferenceSpaceKind,
}

/// Owns the one live session and drives its negotiation.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    state: SessionState,
    reference_space: Option<ReferenceSpace>,
    /// Origin offset carried across reference-space replacement.
    origin_offset: Mat4,
    /// Offset captured when the replacement space was requested.
    pending_offset: Option<Mat4>,
    base_layer: Option<FramebufferLayer>,
    mirror_canvas: Option<CanvasId>,
    magic_window_canvas: Option<CanvasId>,
    entry_offered: bool,
    fallback: ControlFallback,
    pending_immersive: bool,
    fall_back_on_end: bool,
    last_failure: Option<NegotiationFailure>,
    signals: VecDeque<SessionSignal>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionManager {
    /// Create a manager with no session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Unvalidated,
            reference_space: None,
            origin_offset: Mat4::IDENTITY,
            pending_offset: None,
            base_layer: None,
            mirror_canvas: None,
            magic_window_canvas: None,
            entry_offered: false,
            fallback: ControlFallback::None,
            pending_immersive: false,
            fall_back_on_end: false,
            last_failure: None,
            signals: VecDeque::new(),
        }
    }

    /// Negotiation settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Live session handle, including one that is ending.
    pub fn active_session(&self) -> Option<SessionHandle> {
        self.state.session()
    }

    /// Mode of the live or requested session.
    pub fn mode(&self) -> Option<SessionMode> {
        self.state.mode()
    }

    /// Whether the live session has finished setup.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Active { phase: ActivePhase::Ready, .. })
    }

    /// Reference space of the live session.
    pub fn reference_space(&self) -> Option<&ReferenceSpace> {
        self.reference_space.as_ref()
    }

    /// Framebuffer layer bound to the live session.
    pub fn base_layer(&self) -> Option<&FramebufferLayer> {
        self.base_layer.as_ref()
    }

    /// Whether the immersive entry affordance is shown.
    pub fn entry_offered(&self) -> bool {
        self.entry_offered
    }

    /// Control scheme selected by the fallback chain.
    pub fn fallback(&self) -> ControlFallback {
        self.fallback
    }

    /// Most recent negotiation failure.
    pub fn last_failure(&self) -> Option<&NegotiationFailure> {
        self.last_failure.as_ref()
    }

    /// Scheduler frame drivers should use right now.
    pub fn frame_scheduler(&self) -> FrameScheduler {
        self.state.frame_scheduler()
    }

    /// Drain queued signals.
    pub fn take_signals(&mut self) -> Vec<SessionSignal> {
        self.signals.drain(..).collect()
    }

    /// Current origin offset, read from the live reference space when present.
    pub fn offset_matrix(&self) -> Mat4 {
        match &self.reference_space {
            Some(space) => space.offset_matrix(),
            None => self.origin_offset,
        }
    }

    /// Move the virtual origin (teleport or user recentring).
    pub fn set_offset_matrix(&mut self, matrix: Mat4) {
        match &mut self.reference_space {
            Some(space) => {
                space.set_offset_matrix(&matrix);
                self.origin_offset = space.offset_matrix();
            }
            None => self.origin_offset = RigidTransform::from_matrix(&matrix).to_matrix(),
        }
    }

    /// Probe host capabilities, offer immersive entry, and start inline
    /// negotiation when nothing is running.
    pub fn validate(&mut self, host: &mut dyn XrHost) {
        if !host.is_available() {
            info!("XR API unavailable; using manual pointer controls");
            self.entry_offered = false;
            self.fallback = ControlFallback::ManualPointer;
            self.record_failure(SessionMode::Inline, NegotiationStage::Capability, HostError::Unavailable);
            return;
        }

        match host.supports_session(SessionMode::ImmersiveVr) {
            Ok(()) => {
                if !self.entry_offered {
                    info!("immersive sessions supported; offering entry");
                }
                self.entry_offered = true;
            }
            Err(reason) => {
                info!(%reason, "immersive sessions not supported");
                self.entry_offered = false;
            }
        }

        if self.state.is_busy() {
            debug!(state = ?self.state, "session in progress; only the entry affordance was refreshed");
            return;
        }

        match host.supports_session(SessionMode::Inline) {
            Ok(()) => {
                self.fallback = ControlFallback::TouchControls;
                self.negotiate(host, SessionMode::Inline);
            }
            Err(reason) => {
                info!(%reason, "inline sessions not supported; using manual pointer controls");
                self.fallback = ControlFallback::ManualPointer;
                self.record_failure(SessionMode::Inline, NegotiationStage::Capability, reason);
            }
        }
    }

    /// Entry affordance: switch to an immersive session.
    ///
    /// A live session is ended first; the immersive request follows its
    /// teardown so two sessions never overlap. An inline request still in
    /// flight is ended as soon as it is granted.
    pub fn enter_immersive(&mut self, host: &mut dyn XrHost) {
        match self.state {
            SessionState::Unvalidated => self.negotiate(host, SessionMode::ImmersiveVr),
            SessionState::Active { mode: SessionMode::ImmersiveVr, .. } => {
                debug!("already immersive");
            }
            SessionState::Active { .. } => {
                self.pending_immersive = true;
                self.end_session(host);
            }
            SessionState::Ending { .. } => self.pending_immersive = true,
            SessionState::Negotiating(SessionMode::ImmersiveVr) => {
                debug!("immersive negotiation already in flight");
            }
            SessionState::Negotiating(SessionMode::Inline) => {
                debug!("inline negotiation in flight; immersive follows once it settles");
                self.pending_immersive = true;
            }
        }
    }

    /// Request a session of `mode`; refused while another session exists.
    pub fn request_session(&mut self, host: &mut dyn XrHost, mode: SessionMode) -> bool {
        if self.state.is_busy() {
            warn!(%mode, state = ?self.state, "session request refused; one session at a time");
            return false;
        }
        self.negotiate(host, mode);
        true
    }

    /// Ask the host to end the live session.
    pub fn end_session(&mut self, host: &mut dyn XrHost) {
        if let SessionState::Active { mode, session, .. } = self.state {
            info!(%mode, ?session, "ending session");
            self.state = SessionState::Ending { mode, session };
            host.end_session(session);
        }
    }

    /// Route one host event to the matching transition or interaction handler.
    ///
    /// Animation frames belong to frame drivers and are not consumed here.
    pub fn handle_event(
        &mut self,
        host: &mut dyn XrHost,
        event: HostEvent,
        engine: &mut InteractionEngine,
        scene: &mut dyn SceneAccessor,
    ) {
        match event {
            HostEvent::SessionGranted { mode, session } => {
                self.on_session_granted(host, engine, mode, session)
            }
            HostEvent::SessionRejected { mode, reason } => self.on_session_rejected(host, mode, reason),
            HostEvent::CompatibilityResolved(result) => self.on_compatibility_resolved(host, result),
            HostEvent::ReferenceSpaceGranted { session, space } => {
                self.on_reference_space_granted(session, space)
            }
            HostEvent::ReferenceSpaceRejected { session, reason } => {
                self.on_reference_space_rejected(host, session, reason)
            }
            HostEvent::SessionEnded { session } => self.on_session_ended(host, engine, scene, session),
            HostEvent::DeviceChange => {
                debug!("device change; revalidating");
                self.validate(host);
            }
            HostEvent::InputSourcesChanged { session } => {
                if engine.attached_session() == Some(session) {
                    engine.set_input_sources(host.input_sources(session), scene);
                }
            }
            HostEvent::Select { session, source, phase, frame } => {
                engine.handle_select_event(
                    session,
                    source,
                    phase,
                    &frame,
                    self.reference_space.as_ref(),
                    scene,
                );
            }
            HostEvent::AnimationFrame { handle, .. } => {
                debug!(?handle, "animation frame delivered to the session manager; ignoring");
            }
        }
    }

    fn negotiate(&mut self, host: &mut dyn XrHost, mode: SessionMode) {
        let role = match mode {
            SessionMode::ImmersiveVr => CanvasRole::Mirror,
            SessionMode::Inline => CanvasRole::MagicWindow,
        };
        let canvas = host.create_canvas(role);
        match mode {
            SessionMode::ImmersiveVr => self.mirror_canvas = Some(canvas),
            SessionMode::Inline => self.magic_window_canvas = Some(canvas),
        }
        info!(%mode, "requesting session");
        self.state = SessionState::Negotiating(mode);
        host.request_session(mode);
    }

    fn on_session_granted(
        &mut self,
        host: &mut dyn XrHost,
        engine: &mut InteractionEngine,
        mode: SessionMode,
        session: SessionHandle,
    ) {
        if self.state != SessionState::Negotiating(mode) {
            warn!(%mode, ?session, state = ?self.state, "unexpected session grant; ending it");
            host.end_session(session);
            return;
        }
        info!(%mode, ?session, "session started");

        if mode == SessionMode::Inline && self.pending_immersive {
            debug!(?session, "immersive entry pending; ending the inline session");
            self.state = SessionState::Ending { mode, session };
            host.end_session(session);
            return;
        }

        match mode {
            SessionMode::ImmersiveVr => {
                if let Some(canvas) = self.mirror_canvas {
                    host.attach_canvas(canvas);
                }
            }
            SessionMode::Inline => {
                host.set_main_canvas_visible(false);
                if let Some(canvas) = self.magic_window_canvas {
                    host.attach_canvas(canvas);
                }
            }
        }

        self.state = SessionState::Active { mode, session, phase: ActivePhase::BindingRenderTarget };
        engine.attach(session, host.input_sources(session));
        host.make_compatible();
    }

    fn on_session_rejected(&mut self, host: &mut dyn XrHost, mode: SessionMode, reason: HostError) {
        if self.state != SessionState::Negotiating(mode) {
            debug!(%mode, "stale session rejection");
            return;
        }
        error!(%mode, %reason, "error initializing XR session");
        self.record_failure(mode, NegotiationStage::SessionRequest, reason);
        match mode {
            SessionMode::ImmersiveVr => self.mirror_canvas = None,
            SessionMode::Inline => self.magic_window_canvas = None,
        }
        self.state = SessionState::Unvalidated;
        if mode == SessionMode::Inline && std::mem::take(&mut self.pending_immersive) {
            self.negotiate(host, SessionMode::ImmersiveVr);
            return;
        }
        self.fall_back_from(host, mode);
    }

    fn on_compatibility_resolved(&mut self, host: &mut dyn XrHost, result: Result<(), HostError>) {
        let SessionState::Active { mode, session, phase: ActivePhase::BindingRenderTarget } = self.state
        else {
            debug!(state = ?self.state, "stale compatibility result");
            return;
        };
        if let Err(reason) = result {
            warn!(%mode, %reason, "rendering context not compatible; continuing");
            self.record_failure(mode, NegotiationStage::Compatibility, reason);
        }

        let layer = host.create_base_layer(session);
        let output_canvas = match mode {
            SessionMode::ImmersiveVr => self.mirror_canvas,
            SessionMode::Inline => self.magic_window_canvas,
        };
        host.update_render_state(session, RenderState { base_layer: layer, output_canvas });
        self.base_layer = Some(layer);

        self.pending_offset = Some(self.offset_matrix());
        self.state = SessionState::Active { mode, session, phase: ActivePhase::AcquiringReferenceSpace };
        host.request_reference_space(session, self.config.reference_space);
    }

    fn on_reference_space_granted(&mut self, session: SessionHandle, space: SpaceId) {
        let SessionState::Active { mode, session: live, phase: ActivePhase::AcquiringReferenceSpace } =
            self.state
        else {
            debug!(?session, "stale reference space grant");
            return;
        };
        if live != session {
            debug!(?session, "reference space for another session");
            return;
        }

        let mut reference = ReferenceSpace::new(space, self.config.reference_space);
        let offset = self.pending_offset.take().unwrap_or(self.origin_offset);
        reference.set_offset_matrix(&offset);
        self.origin_offset = reference.offset_matrix();
        self.reference_space = Some(reference);

        self.state = SessionState::Active { mode, session, phase: ActivePhase::Ready };
        info!(%mode, kind = %self.config.reference_space, "session ready");
        self.signals.push_back(SessionSignal::RestartFrameLoop);
    }

    fn on_reference_space_rejected(
        &mut self,
        host: &mut dyn XrHost,
        session: SessionHandle,
        reason: HostError,
    ) {
        let SessionState::Active { mode, session: live, .. } = self.state else {
            debug!(?session, "stale reference space rejection");
            return;
        };
        if live != session {
            return;
        }
        error!(%mode, %reason, "no reference space; ending session");
        self.record_failure(mode, NegotiationStage::ReferenceSpace, reason);
        self.pending_offset = None;
        self.fall_back_on_end = true;
        self.end_session(host);
    }

    fn on_session_ended(
        &mut self,
        host: &mut dyn XrHost,
        engine: &mut InteractionEngine,
        scene: &mut dyn SceneAccessor,
        session: SessionHandle,
    ) {
        if engine.attached_session() == Some(session) {
            engine.close(scene);
            engine.detach();
        }

        let Some(mode) = self.state.mode().filter(|_| self.state.session() == Some(session)) else {
            debug!(?session, "end of an unknown session");
            return;
        };
        info!(%mode, ?session, "session ended");

        if let Some(space) = self.reference_space.take() {
            self.origin_offset = space.offset_matrix();
        }
        self.pending_offset = None;
        self.base_layer = None;
        match mode {
            SessionMode::ImmersiveVr => {
                if let Some(canvas) = self.mirror_canvas.take() {
                    host.detach_canvas(canvas);
                }
            }
            SessionMode::Inline => {
                if let Some(canvas) = self.magic_window_canvas.take() {
                    host.detach_canvas(canvas);
                }
                host.set_main_canvas_visible(true);
            }
        }
        self.state = SessionState::Unvalidated;
        self.signals.push_back(SessionSignal::RestartFrameLoop);

        let fall_back = std::mem::take(&mut self.fall_back_on_end) || mode.is_immersive();
        if std::mem::take(&mut self.pending_immersive) {
            self.negotiate(host, SessionMode::ImmersiveVr);
        } else if fall_back {
            self.fall_back_from(host, mode);
        }
    }

    fn fall_back_from(&mut self, host: &mut dyn XrHost, mode: SessionMode) {
        match mode {
            SessionMode::ImmersiveVr => {
                info!("falling back to inline session");
                self.fallback = ControlFallback::TouchControls;
                self.negotiate(host, SessionMode::Inline);
            }
            SessionMode::Inline => {
                info!("no inline session; using manual pointer controls");
                self.fallback = ControlFallback::ManualPointer;
            }
        }
    }

    fn record_failure(&mut self, mode: SessionMode, stage: NegotiationStage, reason: HostError) {
        self.last_failure = Some(NegotiationFailure::new(mode, stage, reason));
    }
}
