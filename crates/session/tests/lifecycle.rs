use glam::{Mat4, Quat, Vec3};
use xrinteract_core::{
    CanvasRole, Handedness, HostEvent, SelectPhase, SessionMode, XrHost,
};
use xrinteract_geometry::{RigidTransform, Shape};
use xrinteract_interaction::{Capabilities, InputSource, InteractionEngine};
use xrinteract_scene::{NodeDesc, NodeId, Scene};
use xrinteract_session::{
    ActivePhase, ControlFallback, NegotiationStage, SessionConfig, SessionManager, SessionSignal,
    SessionState,
};
use xrinteract_testkit::{recording_bundle, CallLog, HostCall, HostProfile, ScriptedHost};

struct Harness {
    host: ScriptedHost,
    manager: SessionManager,
    engine: InteractionEngine,
    scene: Scene,
    max_live_sessions: usize,
}

impl Harness {
    fn new(profile: HostProfile) -> Self {
        Self {
            host: ScriptedHost::new(profile),
            manager: SessionManager::new(SessionConfig::default()),
            engine: InteractionEngine::new(),
            scene: Scene::new(),
            max_live_sessions: 0,
        }
    }

    fn pump(&mut self) {
        for _ in 0..64 {
            let events = self.host.poll_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                if matches!(event, HostEvent::AnimationFrame { .. }) {
                    continue;
                }
                self.manager
                    .handle_event(&mut self.host, event, &mut self.engine, &mut self.scene);
                self.max_live_sessions = self.max_live_sessions.max(self.host.live_session_count());
            }
        }
        panic!("host events never settled");
    }

    fn validate(&mut self) {
        self.manager.validate(&mut self.host);
        self.pump();
    }

    fn enter_immersive(&mut self) {
        self.manager.enter_immersive(&mut self.host);
        self.pump();
    }

    fn requested_modes(&self) -> Vec<SessionMode> {
        self.host
            .calls()
            .iter()
            .filter_map(|call| match call {
                HostCall::RequestSession(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }
}

fn ready(mode: SessionMode, state: SessionState) -> bool {
    matches!(state, SessionState::Active { mode: m, phase: ActivePhase::Ready, .. } if m == mode)
}

#[test]
fn validate_negotiates_inline_session_to_ready() {
    let mut h = Harness::new(HostProfile::default());
    h.validate();

    assert!(ready(SessionMode::Inline, h.manager.state()));
    assert!(h.manager.entry_offered());
    assert_eq!(h.manager.fallback(), ControlFallback::TouchControls);
    assert!(h.manager.reference_space().is_some());
    assert!(h.manager.base_layer().is_some());
    assert!(!h.host.main_canvas_visible());
    assert_eq!(h.host.attached_canvases().len(), 1);
    assert_eq!(h.manager.take_signals(), vec![SessionSignal::RestartFrameLoop]);

    let session = h.manager.active_session().expect("session");
    assert_eq!(h.engine.attached_session(), Some(session));

    let calls = h.host.take_calls();
    assert!(matches!(calls[0], HostCall::CreateCanvas(CanvasRole::MagicWindow, _)));
    assert_eq!(calls[1], HostCall::RequestSession(SessionMode::Inline));
    assert_eq!(calls[2], HostCall::SetMainCanvasVisible(false));
    assert!(matches!(calls[3], HostCall::AttachCanvas(_)));
    assert_eq!(calls[4], HostCall::MakeCompatible);
    assert_eq!(calls[5], HostCall::CreateBaseLayer(session));
    assert!(matches!(calls[6], HostCall::UpdateRenderState(s, _) if s == session));
    assert!(matches!(calls[7], HostCall::RequestReferenceSpace(s, _) if s == session));
}

#[test]
fn immersive_rejection_falls_back_to_inline() {
    let profile = HostProfile {
        grant_immersive: false,
        ..HostProfile::default()
    };
    let mut h = Harness::new(profile);
    h.validate();
    assert!(ready(SessionMode::Inline, h.manager.state()));

    h.enter_immersive();

    assert!(ready(SessionMode::Inline, h.manager.state()));
    assert!(h.manager.entry_offered());
    let failure = h.manager.last_failure().expect("failure recorded");
    assert_eq!(failure.mode, SessionMode::ImmersiveVr);
    assert_eq!(failure.stage, NegotiationStage::SessionRequest);
    assert_eq!(
        h.requested_modes(),
        vec![SessionMode::Inline, SessionMode::ImmersiveVr, SessionMode::Inline]
    );
    assert_eq!(h.max_live_sessions, 1);
}

#[test]
fn immersive_entry_ends_inline_first_and_keeps_origin_offset() {
    let mut h = Harness::new(HostProfile::default());
    h.validate();

    let offset = Mat4::from_rotation_translation(Quat::from_rotation_y(0.75), Vec3::new(1.0, 0.0, -2.0));
    h.manager.set_offset_matrix(offset);
    let inline_session = h.manager.active_session().expect("inline session");

    h.enter_immersive();

    assert!(ready(SessionMode::ImmersiveVr, h.manager.state()));
    assert_ne!(h.manager.active_session(), Some(inline_session));
    assert_eq!(h.max_live_sessions, 1);
    assert!(h.host.main_canvas_visible());
    let space = h.manager.reference_space().expect("reference space");
    assert!(space.offset_matrix().abs_diff_eq(offset, 1.0e-5));

    // Leaving immersive returns to inline, still at the same virtual origin.
    h.manager.end_session(&mut h.host);
    h.pump();
    assert!(ready(SessionMode::Inline, h.manager.state()));
    assert!(h.manager.offset_matrix().abs_diff_eq(offset, 1.0e-5));
}

#[test]
fn immersive_entry_during_inline_negotiation_is_honoured() {
    let mut h = Harness::new(HostProfile::default());
    h.manager.validate(&mut h.host);
    assert_eq!(h.manager.state(), SessionState::Negotiating(SessionMode::Inline));

    h.enter_immersive();

    assert!(ready(SessionMode::ImmersiveVr, h.manager.state()));
    assert_eq!(
        h.requested_modes(),
        vec![SessionMode::Inline, SessionMode::ImmersiveVr]
    );
    assert_eq!(h.max_live_sessions, 1);
    assert!(h.host.main_canvas_visible());
    assert_eq!(h.engine.attached_session(), h.manager.active_session());
}

#[test]
fn immersive_entry_after_rejected_inline_still_requests_immersive() {
    let profile = HostProfile {
        grant_inline: false,
        ..HostProfile::default()
    };
    let mut h = Harness::new(profile);
    h.manager.validate(&mut h.host);
    h.enter_immersive();

    assert!(ready(SessionMode::ImmersiveVr, h.manager.state()));
    assert_eq!(
        h.requested_modes(),
        vec![SessionMode::Inline, SessionMode::ImmersiveVr]
    );
}

#[test]
fn restart_signals_follow_every_context_switch() {
    let mut h = Harness::new(HostProfile::default());
    h.validate();
    h.manager.take_signals();

    h.enter_immersive();
    // One for the inline teardown, one when immersive is ready.
    assert_eq!(
        h.manager.take_signals(),
        vec![SessionSignal::RestartFrameLoop, SessionSignal::RestartFrameLoop]
    );
}

#[test]
fn missing_xr_api_selects_manual_pointer() {
    let mut h = Harness::new(HostProfile::no_xr());
    h.validate();

    assert_eq!(h.manager.state(), SessionState::Unvalidated);
    assert_eq!(h.manager.fallback(), ControlFallback::ManualPointer);
    assert!(!h.manager.entry_offered());
    assert!(h.requested_modes().is_empty());
    assert_eq!(
        h.manager.last_failure().map(|failure| failure.stage),
        Some(NegotiationStage::Capability)
    );
}

#[test]
fn inline_only_host_offers_no_immersive_entry() {
    let mut h = Harness::new(HostProfile::inline_only());
    h.validate();
    assert!(!h.manager.entry_offered());
    assert!(ready(SessionMode::Inline, h.manager.state()));
    assert_eq!(h.manager.fallback(), ControlFallback::TouchControls);
}

#[test]
fn compatibility_failure_is_logged_and_session_continues() {
    let profile = HostProfile {
        compatible: false,
        ..HostProfile::default()
    };
    let mut h = Harness::new(profile);
    h.validate();
    assert!(ready(SessionMode::Inline, h.manager.state()));
    assert_eq!(
        h.manager.last_failure().map(|failure| failure.stage),
        Some(NegotiationStage::Compatibility)
    );
}

#[test]
fn rejected_reference_space_walks_the_whole_fallback_chain() {
    let profile = HostProfile {
        grant_reference_space: false,
        ..HostProfile::default()
    };
    let mut h = Harness::new(profile);
    h.enter_immersive();

    assert_eq!(h.manager.state(), SessionState::Unvalidated);
    assert_eq!(h.manager.fallback(), ControlFallback::ManualPointer);
    assert_eq!(h.requested_modes(), vec![SessionMode::ImmersiveVr, SessionMode::Inline]);
    let failure = h.manager.last_failure().expect("failure");
    assert_eq!(failure.stage, NegotiationStage::ReferenceSpace);
    assert_eq!(failure.mode, SessionMode::Inline);
    assert_eq!(h.host.live_session_count(), 0);
    assert!(h.host.main_canvas_visible());
}

#[test]
fn revalidation_during_a_session_only_refreshes_the_entry() {
    let mut h = Harness::new(HostProfile::default());
    h.validate();
    h.host.change_device(HostProfile::inline_only());
    h.pump();

    assert!(!h.manager.entry_offered());
    assert_eq!(h.requested_modes(), vec![SessionMode::Inline]);
    assert!(ready(SessionMode::Inline, h.manager.state()));
}

#[test]
fn device_change_starts_negotiation_once_xr_appears() {
    let mut h = Harness::new(HostProfile::no_xr());
    h.validate();
    assert_eq!(h.manager.fallback(), ControlFallback::ManualPointer);

    h.host.change_device(HostProfile::default());
    h.pump();
    assert!(h.manager.entry_offered());
    assert!(ready(SessionMode::Inline, h.manager.state()));
}

#[test]
fn second_session_request_is_refused_while_one_is_live() {
    let mut h = Harness::new(HostProfile::default());
    h.validate();
    assert!(!h.manager.request_session(&mut h.host, SessionMode::ImmersiveVr));
    h.pump();
    assert_eq!(h.requested_modes(), vec![SessionMode::Inline]);
}

fn hoverable_cube(h: &mut Harness, log: &CallLog) -> NodeId {
    let node = h
        .scene
        .add(
            h.scene.root(),
            NodeDesc::new("cube")
                .position(Vec3::new(0.0, 1.6, -3.0))
                .shape(Shape::unit_cube()),
        )
        .expect("root exists");
    let caps = Capabilities::HOVER_START | Capabilities::HOVER_END | Capabilities::SELECT;
    h.engine
        .interactions_mut()
        .insert(node, Box::new(recording_bundle("cube", log, caps)));
    node
}

#[test]
fn session_end_closes_hovers_once_and_detaches() {
    let log = CallLog::new();
    let mut h = Harness::new(HostProfile::inline_only());
    hoverable_cube(&mut h, &log);
    h.validate();

    let eye = Mat4::from_translation(Vec3::new(0.0, 1.6, 0.0));
    h.engine.update_pseudo_source(&eye, &mut h.scene);
    assert_eq!(h.engine.hover_count(), 1);

    let session = h.manager.active_session().expect("session");
    h.host.end_session_from_device(session);
    h.pump();

    assert_eq!(log.count("cube.hover_end"), 1);
    assert_eq!(h.engine.hover_count(), 0);
    assert_eq!(h.engine.attached_session(), None);
    assert!(h.host.main_canvas_visible());
    assert!(h.host.attached_canvases().is_empty());
    // Inline ending on its own does not retry.
    assert_eq!(h.manager.state(), SessionState::Unvalidated);
}

#[test]
fn controller_select_is_routed_through_the_manager() {
    let log = CallLog::new();
    let mut h = Harness::new(HostProfile::default());
    hoverable_cube(&mut h, &log);
    h.validate();

    let controller = h.host.connect_controller(Handedness::Right);
    h.pump();
    assert_eq!(h.engine.input_sources().len(), 1);

    h.host.set_controller_pose(
        controller.id,
        RigidTransform::from_translation(Vec3::new(0.0, 1.6, 0.0)),
    );
    h.host.select(controller.id, SelectPhase::Click);
    h.pump();
    assert_eq!(log.labels(), vec!["cube.select"]);
    assert_eq!(h.engine.hovered(InputSource::Real(controller.id)), None);
}
