use glam::Vec3;
use xrinteract_camera::Camera;
use xrinteract_core::{Eye, FrameHandle, FrameScheduler, HostEvent, Viewport, XrFrame, XrHost};
use xrinteract_frame::{FrameContext, FrameDriver, FrameOutcome, SceneContent};
use xrinteract_geometry::Shape;
use xrinteract_interaction::{Capabilities, InteractionEngine};
use xrinteract_scene::{NodeDesc, Scene};
use xrinteract_session::{SessionManager, SessionSignal};
use xrinteract_testkit::{
    recording_bundle, CallLog, HostCall, HostProfile, RecordingRenderer, RenderOp, ScriptedHost,
};

#[derive(Default)]
struct CountingContent {
    ticks: usize,
    last_timestamp: f64,
}

impl SceneContent for CountingContent {
    fn animate(&mut self, timestamp: f64, _scene: &mut Scene) {
        self.ticks += 1;
        self.last_timestamp = timestamp;
    }
}

struct Harness {
    host: ScriptedHost,
    manager: SessionManager,
    engine: InteractionEngine,
    scene: Scene,
    renderer: RecordingRenderer,
    camera: Camera,
    content: CountingContent,
    driver: FrameDriver,
}

impl Harness {
    fn new(profile: HostProfile, view_offset: Vec3) -> Self {
        Self {
            host: ScriptedHost::new(profile),
            manager: SessionManager::default(),
            engine: InteractionEngine::new(),
            scene: Scene::new(),
            renderer: RecordingRenderer::new(1280, 720),
            camera: Camera::default(),
            content: CountingContent::default(),
            driver: FrameDriver::new(view_offset),
        }
    }

    fn frame(&mut self, handle: FrameHandle, timestamp: f64, frame: Option<&XrFrame>) -> FrameOutcome {
        let ctx = FrameContext {
            host: &mut self.host,
            session: &self.manager,
            engine: &mut self.engine,
            scene: &mut self.scene,
            renderer: &mut self.renderer,
            camera: &mut self.camera,
            content: &mut self.content,
        };
        self.driver.on_frame(ctx, handle, timestamp, frame)
    }

    /// Deliver queued host events; returns frame outcomes in order.
    fn pump(&mut self) -> Vec<FrameOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..64 {
            let events = self.host.poll_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    HostEvent::AnimationFrame { handle, timestamp, frame } => {
                        outcomes.push(self.frame(handle, timestamp, frame.as_ref()));
                    }
                    other => {
                        self.manager
                            .handle_event(&mut self.host, other, &mut self.engine, &mut self.scene)
                    }
                }
            }
            for signal in self.manager.take_signals() {
                match signal {
                    SessionSignal::RestartFrameLoop => self.driver.restart(&mut self.host, &self.manager),
                }
            }
        }
        outcomes
    }

    fn tick(&mut self) -> Vec<FrameOutcome> {
        self.host.tick(16.0);
        self.pump()
    }
}

#[test]
fn without_session_renders_one_full_surface_view() {
    let mut h = Harness::new(HostProfile::no_xr(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    assert!(matches!(
        h.host.calls(),
        [HostCall::RequestAnimationFrame(FrameScheduler::Host, _)]
    ));

    assert_eq!(h.tick(), vec![FrameOutcome::Rendered { views: 1 }]);
    let ops = h.renderer.take_ops();
    assert_eq!(ops[0], RenderOp::BindFramebuffer(None));
    assert_eq!(ops[1], RenderOp::Viewport(Viewport::full(1280, 720)));
    assert_eq!(ops[2], RenderOp::Clear);
    assert!(matches!(ops[3], RenderOp::Render { eye: Eye::None, .. }));
    assert_eq!(h.content.ticks, 1);
    assert_eq!(h.host.pending_frame_requests().len(), 1);
}

#[test]
fn stale_callbacks_are_ignored() {
    let mut h = Harness::new(HostProfile::no_xr(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    assert_eq!(h.frame(FrameHandle(9_999), 0.0, None), FrameOutcome::Stale);
    assert!(h.renderer.ops().is_empty());
    assert_eq!(h.content.ticks, 0);
}

#[test]
fn restart_keeps_a_single_callback_in_flight() {
    let mut h = Harness::new(HostProfile::no_xr(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    h.driver.start(&mut h.host, &h.manager);
    h.driver.restart(&mut h.host, &h.manager);
    h.driver.restart(&mut h.host, &h.manager);
    assert_eq!(h.host.pending_frame_requests().len(), 1);
    assert_eq!(h.tick().len(), 1);
}

#[test]
fn stopped_driver_does_not_reschedule() {
    let mut h = Harness::new(HostProfile::no_xr(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    h.driver.stop(&mut h.host);
    assert!(h.host.pending_frame_requests().is_empty());
    assert!(h.tick().is_empty());
    assert!(!h.driver.is_active());
}

#[test]
fn immersive_session_renders_both_eyes_into_split_viewports() {
    let mut h = Harness::new(HostProfile::default(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    h.manager.enter_immersive(&mut h.host);
    h.pump();
    assert!(h.manager.is_ready());
    assert!(matches!(
        h.host.pending_frame_requests(),
        [(_, FrameScheduler::Session(_))]
    ));
    h.renderer.take_ops();

    assert_eq!(h.tick(), vec![FrameOutcome::Rendered { views: 2 }]);
    let layer = *h.manager.base_layer().expect("layer");
    let ops = h.renderer.take_ops();
    assert_eq!(ops[0], RenderOp::BindFramebuffer(Some(layer)));
    assert_eq!(ops[1], RenderOp::Clear);
    assert_eq!(ops[2], RenderOp::Viewport(layer.viewport(Eye::Left)));
    assert!(matches!(ops[3], RenderOp::Render { eye: Eye::Left, .. }));
    assert_eq!(ops[4], RenderOp::ClearDepth);
    assert_eq!(ops[5], RenderOp::Viewport(layer.viewport(Eye::Right)));
    assert!(matches!(ops[6], RenderOp::Render { eye: Eye::Right, .. }));
    assert_eq!(ops[7], RenderOp::ClearDepth);
    assert!(h.camera.bound_view().is_some());
}

#[test]
fn view_offset_shifts_every_eye() {
    let offset = Vec3::new(0.0, 0.0, 5.0);
    let mut h = Harness::new(HostProfile::default(), offset);
    h.driver.start(&mut h.host, &h.manager);
    h.manager.enter_immersive(&mut h.host);
    h.pump();
    h.tick();

    let eye = h.driver.last_eye_world().w_axis.truncate();
    assert!(eye.abs_diff_eq(Vec3::new(0.032, 1.6, -5.0), 1.0e-4), "eye at {eye}");
}

#[test]
fn session_without_frame_data_waits_and_keeps_scheduling() {
    let mut h = Harness::new(HostProfile::inline_only(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    h.manager.validate(&mut h.host);
    h.pump();
    h.host.set_tracking(false);

    assert_eq!(h.tick(), vec![FrameOutcome::AwaitingFrame]);
    assert_eq!(h.host.pending_frame_requests().len(), 1);
    assert_eq!(h.driver.frames_rendered(), 0);

    h.host.set_tracking(true);
    assert_eq!(h.tick(), vec![FrameOutcome::Rendered { views: 1 }]);
}

#[test]
fn session_end_moves_the_loop_back_to_the_host_scheduler() {
    let mut h = Harness::new(HostProfile::inline_only(), Vec3::ZERO);
    h.driver.start(&mut h.host, &h.manager);
    h.manager.validate(&mut h.host);
    h.pump();
    let session = h.manager.active_session().expect("session");

    h.host.end_session_from_device(session);
    h.pump();
    assert!(matches!(
        h.host.pending_frame_requests(),
        [(_, FrameScheduler::Host)]
    ));
    assert_eq!(h.tick(), vec![FrameOutcome::Rendered { views: 1 }]);
}

#[test]
fn interactions_run_once_per_tick_from_the_last_eye() {
    let log = CallLog::new();
    let mut h = Harness::new(HostProfile::inline_only(), Vec3::ZERO);
    let cube = h
        .scene
        .add(
            h.scene.root(),
            NodeDesc::new("cube")
                .position(Vec3::new(0.0, 1.6, -3.0))
                .shape(Shape::unit_cube()),
        )
        .expect("root exists");
    let caps = Capabilities::HOVER_START | Capabilities::HOVER;
    h.engine
        .interactions_mut()
        .insert(cube, Box::new(recording_bundle("cube", &log, caps)));

    h.driver.start(&mut h.host, &h.manager);
    h.manager.validate(&mut h.host);
    h.pump();
    log.clear();

    h.tick();
    h.tick();
    assert_eq!(log.labels(), vec!["cube.hover_start", "cube.hover", "cube.hover"]);
    assert_eq!(h.content.ticks, h.driver.frames_rendered() as usize);
}
