//! Scripted in-process XR host.

use std::collections::{BTreeMap, HashMap, VecDeque};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xrinteract_core::{
    CanvasId, CanvasRole, Eye, FrameHandle, FrameScheduler, FramebufferLayer, Handedness,
    HostError, HostEvent, InputSourceId, InputSourceInfo, NativeView, ReferenceSpaceKind,
    RenderState, SelectPhase, SessionHandle, SessionMode, SpaceId, XrFrame, XrHost,
};
use xrinteract_geometry::RigidTransform;

/// Interpupillary distance used for simulated stereo views.
pub const SIMULATED_IPD: f32 = 0.064;

/// What the simulated device supports and grants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    /// An XR API exists at all.
    pub available: bool,
    /// Immersive sessions are reported as supported.
    pub immersive: bool,
    /// Inline sessions are reported as supported.
    pub inline: bool,
    /// Immersive session requests are granted.
    pub grant_immersive: bool,
    /// Inline session requests are granted.
    pub grant_inline: bool,
    /// `make_compatible` succeeds.
    pub compatible: bool,
    /// Reference space requests are granted.
    pub grant_reference_space: bool,
    /// Framebuffer size handed out for base layers.
    pub framebuffer_size: (u32, u32),
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            available: true,
            immersive: true,
            inline: true,
            grant_immersive: true,
            grant_inline: true,
            compatible: true,
            grant_reference_space: true,
            framebuffer_size: (2048, 1024),
        }
    }
}

impl HostProfile {
    /// Desktop browser without any XR API.
    pub fn no_xr() -> Self {
        Self { available: false, immersive: false, inline: false, ..Self::default() }
    }

    /// Phone-style host: inline only.
    pub fn inline_only() -> Self {
        Self { immersive: false, ..Self::default() }
    }
}

/// A call the code under test made on the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCall {
    /// `request_session`.
    RequestSession(SessionMode),
    /// `end_session`.
    EndSession(SessionHandle),
    /// `make_compatible`.
    MakeCompatible,
    /// `create_base_layer`.
    CreateBaseLayer(SessionHandle),
    /// `update_render_state`.
    UpdateRenderState(SessionHandle, RenderState),
    /// `request_reference_space`.
    RequestReferenceSpace(SessionHandle, ReferenceSpaceKind),
    /// `create_canvas`.
    CreateCanvas(CanvasRole, CanvasId),
    /// `attach_canvas`.
    AttachCanvas(CanvasId),
    /// `detach_canvas`.
    DetachCanvas(CanvasId),
    /// `set_main_canvas_visible`.
    SetMainCanvasVisible(bool),
    /// `request_animation_frame`.
    RequestAnimationFrame(FrameScheduler, FrameHandle),
    /// `cancel_animation_frame`.
    CancelAnimationFrame(FrameHandle),
}

/// Deterministic [`XrHost`] whose requests resolve on the next
/// [`XrHost::poll_events`] and whose clock advances only on [`ScriptedHost::tick`].
#[derive(Debug)]
pub struct ScriptedHost {
    profile: HostProfile,
    calls: Vec<HostCall>,
    events: VecDeque<HostEvent>,
    next_id: u64,
    sessions: BTreeMap<SessionHandle, SessionMode>,
    sources: Vec<InputSourceInfo>,
    frame_requests: Vec<(FrameHandle, FrameScheduler)>,
    head: RigidTransform,
    device_poses: HashMap<InputSourceId, RigidTransform>,
    tracking: bool,
    clock: f64,
    main_canvas_visible: bool,
    attached_canvases: Vec<CanvasId>,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new(HostProfile::default())
    }
}

impl ScriptedHost {
    /// Host with the given capabilities, head at standing eye height.
    pub fn new(profile: HostProfile) -> Self {
        Self {
            profile,
            calls: Vec::new(),
            events: VecDeque::new(),
            next_id: 1,
            sessions: BTreeMap::new(),
            sources: Vec::new(),
            frame_requests: Vec::new(),
            head: RigidTransform::from_translation(Vec3::new(0.0, 1.6, 0.0)),
            device_poses: HashMap::new(),
            tracking: true,
            clock: 0.0,
            main_canvas_visible: true,
            attached_canvases: Vec::new(),
        }
    }

    /// Current capabilities.
    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    /// Swap capabilities and emit `DeviceChange`.
    pub fn change_device(&mut self, profile: HostProfile) {
        self.profile = profile;
        self.events.push_back(HostEvent::DeviceChange);
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Drain recorded calls.
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// Queue an arbitrary event.
    pub fn push_event(&mut self, event: HostEvent) {
        self.events.push_back(event);
    }

    /// Whether events are waiting.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// The single live session, if any.
    pub fn live_session(&self) -> Option<(SessionHandle, SessionMode)> {
        self.sessions.iter().next().map(|(handle, mode)| (*handle, *mode))
    }

    /// Number of live sessions.
    pub fn live_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Animation callbacks waiting for the next tick.
    pub fn pending_frame_requests(&self) -> &[(FrameHandle, FrameScheduler)] {
        &self.frame_requests
    }

    /// Whether the regular canvas is shown.
    pub fn main_canvas_visible(&self) -> bool {
        self.main_canvas_visible
    }

    /// Canvases currently attached.
    pub fn attached_canvases(&self) -> &[CanvasId] {
        &self.attached_canvases
    }

    /// Host clock in milliseconds.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// The device ends a session on its own (headset removed, user exit).
    pub fn end_session_from_device(&mut self, session: SessionHandle) {
        if self.sessions.remove(&session).is_some() {
            self.events.push_back(HostEvent::SessionEnded { session });
        }
    }

    /// Start tracking a new controller.
    pub fn connect_controller(&mut self, handedness: Handedness) -> InputSourceInfo {
        let id = InputSourceId(self.allocate() as u32);
        let space = SpaceId(self.allocate());
        let info = InputSourceInfo { id, handedness, target_ray_space: Some(space) };
        self.sources.push(info);
        self.notify_sources_changed();
        info
    }

    /// Stop tracking a controller.
    pub fn disconnect_controller(&mut self, id: InputSourceId) {
        self.sources.retain(|info| info.id != id);
        self.device_poses.remove(&id);
        self.notify_sources_changed();
    }

    /// Head pose in native space.
    pub fn set_head_pose(&mut self, pose: RigidTransform) {
        self.head = pose;
    }

    /// Target-ray pose of a controller in native space.
    pub fn set_controller_pose(&mut self, id: InputSourceId, pose: RigidTransform) {
        self.device_poses.insert(id, pose);
    }

    /// Controller loses tracking until a new pose is set.
    pub fn lose_controller_pose(&mut self, id: InputSourceId) {
        self.device_poses.remove(&id);
    }

    /// Whether session frames carry pose data.
    pub fn set_tracking(&mut self, tracking: bool) {
        self.tracking = tracking;
    }

    /// Emit a select gesture for a controller of the live session.
    pub fn select(&mut self, id: InputSourceId, phase: SelectPhase) {
        let Some((session, mode)) = self.live_session() else {
            return;
        };
        let frame = self.build_frame(mode);
        self.events.push_back(HostEvent::Select { session, source: id, phase, frame });
    }

    /// Advance the clock and fire every pending animation callback.
    ///
    /// Host-scheduled callbacks carry no frame; session-scheduled ones carry
    /// the current poses while the session lives.
    pub fn tick(&mut self, dt_ms: f64) {
        self.clock += dt_ms;
        let requests = std::mem::take(&mut self.frame_requests);
        for (handle, scheduler) in requests {
            let frame = match scheduler {
                FrameScheduler::Host => None,
                FrameScheduler::Session(session) => match self.sessions.get(&session) {
                    Some(mode) if self.tracking => Some(self.build_frame(*mode)),
                    Some(_) => None,
                    None => {
                        debug!(?handle, ?session, "dropping callback of ended session");
                        continue;
                    }
                },
            };
            self.events.push_back(HostEvent::AnimationFrame { handle, timestamp: self.clock, frame });
        }
    }

    /// Current native poses for a session of `mode`.
    pub fn build_frame(&self, mode: SessionMode) -> XrFrame {
        let views = match mode {
            SessionMode::ImmersiveVr => {
                let (width, height) = self.profile.framebuffer_size;
                let aspect = (width as f32 / 2.0) / height.max(1) as f32;
                let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, aspect, 0.1, 1000.0);
                let half = SIMULATED_IPD / 2.0;
                vec![
                    NativeView {
                        eye: Eye::Left,
                        transform: self.head * RigidTransform::from_translation(Vec3::new(-half, 0.0, 0.0)),
                        projection,
                    },
                    NativeView {
                        eye: Eye::Right,
                        transform: self.head * RigidTransform::from_translation(Vec3::new(half, 0.0, 0.0)),
                        projection,
                    },
                ]
            }
            SessionMode::Inline => vec![NativeView {
                eye: Eye::None,
                transform: self.head,
                projection: Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 1000.0),
            }],
        };
        let mut frame = XrFrame::new().with_viewer(self.head, views);
        for info in &self.sources {
            if let (Some(space), Some(pose)) = (info.target_ray_space, self.device_poses.get(&info.id)) {
                frame = frame.with_space_pose(space, *pose);
            }
        }
        frame
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn notify_sources_changed(&mut self) {
        if let Some((session, _)) = self.live_session() {
            self.events.push_back(HostEvent::InputSourcesChanged { session });
        }
    }

    fn grants(&self, mode: SessionMode) -> bool {
        match mode {
            SessionMode::ImmersiveVr => self.profile.grant_immersive,
            SessionMode::Inline => self.profile.grant_inline,
        }
    }
}

impl XrHost for ScriptedHost {
    fn is_available(&self) -> bool {
        self.profile.available
    }

    fn supports_session(&self, mode: SessionMode) -> Result<(), HostError> {
        if !self.profile.available {
            return Err(HostError::Unavailable);
        }
        let supported = match mode {
            SessionMode::ImmersiveVr => self.profile.immersive,
            SessionMode::Inline => self.profile.inline,
        };
        if supported {
            Ok(())
        } else {
            Err(HostError::Unsupported(mode))
        }
    }

    fn request_session(&mut self, mode: SessionMode) {
        self.calls.push(HostCall::RequestSession(mode));
        let event = match self.supports_session(mode) {
            Err(reason) => HostEvent::SessionRejected { mode, reason },
            Ok(()) if !self.grants(mode) => HostEvent::SessionRejected {
                mode,
                reason: HostError::Rejected(format!("{mode} request denied")),
            },
            Ok(()) => {
                let session = SessionHandle(self.allocate());
                self.sessions.insert(session, mode);
                HostEvent::SessionGranted { mode, session }
            }
        };
        self.events.push_back(event);
    }

    fn end_session(&mut self, session: SessionHandle) {
        self.calls.push(HostCall::EndSession(session));
        if self.sessions.remove(&session).is_some() {
            self.events.push_back(HostEvent::SessionEnded { session });
        }
    }

    fn input_sources(&self, session: SessionHandle) -> Vec<InputSourceInfo> {
        if self.sessions.contains_key(&session) {
            self.sources.clone()
        } else {
            Vec::new()
        }
    }

    fn make_compatible(&mut self) {
        self.calls.push(HostCall::MakeCompatible);
        let result = if self.profile.compatible {
            Ok(())
        } else {
            Err(HostError::NotCompatible("context lost".into()))
        };
        self.events.push_back(HostEvent::CompatibilityResolved(result));
    }

    fn create_base_layer(&mut self, session: SessionHandle) -> FramebufferLayer {
        self.calls.push(HostCall::CreateBaseLayer(session));
        let (framebuffer_width, framebuffer_height) = self.profile.framebuffer_size;
        FramebufferLayer { session, framebuffer_width, framebuffer_height }
    }

    fn update_render_state(&mut self, session: SessionHandle, state: RenderState) {
        self.calls.push(HostCall::UpdateRenderState(session, state));
    }

    fn request_reference_space(&mut self, session: SessionHandle, kind: ReferenceSpaceKind) {
        self.calls.push(HostCall::RequestReferenceSpace(session, kind));
        let event = if !self.sessions.contains_key(&session) {
            HostEvent::ReferenceSpaceRejected { session, reason: HostError::SessionEnded }
        } else if !self.profile.grant_reference_space {
            HostEvent::ReferenceSpaceRejected {
                session,
                reason: HostError::Rejected(format!("{kind} space unavailable")),
            }
        } else {
            HostEvent::ReferenceSpaceGranted { session, space: SpaceId(self.allocate()) }
        };
        self.events.push_back(event);
    }

    fn create_canvas(&mut self, role: CanvasRole) -> CanvasId {
        let canvas = CanvasId(self.allocate());
        self.calls.push(HostCall::CreateCanvas(role, canvas));
        canvas
    }

    fn attach_canvas(&mut self, canvas: CanvasId) {
        self.calls.push(HostCall::AttachCanvas(canvas));
        if !self.attached_canvases.contains(&canvas) {
            self.attached_canvases.push(canvas);
        }
    }

    fn detach_canvas(&mut self, canvas: CanvasId) {
        self.calls.push(HostCall::DetachCanvas(canvas));
        self.attached_canvases.retain(|attached| *attached != canvas);
    }

    fn set_main_canvas_visible(&mut self, visible: bool) {
        self.calls.push(HostCall::SetMainCanvasVisible(visible));
        self.main_canvas_visible = visible;
    }

    fn request_animation_frame(&mut self, scheduler: FrameScheduler) -> FrameHandle {
        let handle = FrameHandle(self.allocate());
        self.calls.push(HostCall::RequestAnimationFrame(scheduler, handle));
        self.frame_requests.push((handle, scheduler));
        handle
    }

    fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        self.calls.push(HostCall::CancelAnimationFrame(handle));
        self.frame_requests.retain(|(pending, _)| *pending != handle);
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }
}
