use crate::config::XrConfig;
use crate::scripted_input::{ControllerStep, PointerFrame, ScriptedPointerPlayer};
use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;
use xrinteract_camera::Camera;
use xrinteract_core::{HostEvent, InputSourceId, SelectPhase, XrHost};
use xrinteract_frame::{FrameContext, FrameDriver, FrameOutcome, SceneContent};
use xrinteract_geometry::Shape;
use xrinteract_input::{InputState, ManualPointer};
use xrinteract_interaction::{Capabilities, InteractionEngine};
use xrinteract_scene::{NodeDesc, NodeId, Scene};
use xrinteract_session::{ControlFallback, SessionManager, SessionSignal};
use xrinteract_testkit::{
    recording_bundle, CallLog, InteractionRecord, JsonlSink, RecordingRenderer, ScriptedHost,
};

/// Simulated display refresh.
const TICK_MS: f64 = 1000.0 / 60.0;
/// Upper bound on event rounds drained per tick.
const MAX_PUMP_ROUNDS: usize = 64;

pub struct HeadlessConfig {
    pub config: XrConfig,
    pub script: Option<PathBuf>,
    pub frames: u64,
    pub enter_immersive_at: Option<u64>,
    pub trace: Option<PathBuf>,
}

/// End-of-run report printed by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub frames_rendered: u64,
    pub views_rendered: u64,
    pub interactions: u64,
    pub mode: Option<&'static str>,
    pub ready: bool,
    pub entry_offered: bool,
    pub fallback: String,
    pub last_failure: Option<String>,
}

pub fn run(cfg: HeadlessConfig) -> Result<HeadlessSummary> {
    let mut player = match &cfg.script {
        Some(path) => Some(
            ScriptedPointerPlayer::from_path(path)
                .with_context(|| format!("loading pointer script {}", path.display()))?,
        ),
        None => None,
    };
    let sink = match &cfg.trace {
        Some(path) => Some(
            JsonlSink::create(path)
                .with_context(|| format!("creating interaction trace {}", path.display()))?,
        ),
        None => None,
    };

    let mut sim = Simulation::new(&cfg.config, sink)?;
    sim.start();

    for frame in 0..cfg.frames {
        if cfg.enter_immersive_at == Some(frame) {
            info!(frame, "entering immersive");
            sim.manager.enter_immersive(&mut sim.host);
        }
        let input = match player.as_mut() {
            Some(player) => player.advance((TICK_MS / 1000.0) as f32),
            None => PointerFrame::default(),
        };
        sim.step(&input)?;
    }

    let summary = sim.summary(cfg.frames);
    info!(?summary, "headless run finished");
    Ok(summary)
}

/// Spins one node around Y.
struct DemoContent {
    spinner: NodeId,
}

impl SceneContent for DemoContent {
    fn animate(&mut self, timestamp: f64, scene: &mut Scene) {
        let angle = (timestamp * 0.001) as f32;
        if let Err(err) = scene.set_rotation(self.spinner, Quat::from_rotation_y(angle)) {
            debug!(%err, "spinner missing");
        }
    }
}

fn build_demo_scene(engine: &mut InteractionEngine, log: &CallLog) -> Result<(Scene, DemoContent)> {
    let mut scene = Scene::new();
    let root = scene.root();

    let crate_node = scene.add(
        root,
        NodeDesc::new("crate")
            .position(Vec3::new(0.0, 1.6, -3.0))
            .shape(Shape::unit_cube()),
    )?;
    let orb = scene.add(
        root,
        NodeDesc::new("orb")
            .position(Vec3::new(1.5, 1.6, -3.0))
            .shape(Shape::sphere(0.3)),
    )?;
    let spinner = scene.add(
        root,
        NodeDesc::new("spinner")
            .position(Vec3::new(-1.5, 1.6, -3.0))
            .scale(Vec3::splat(0.5))
            .shape(Shape::unit_cube()),
    )?;
    scene.update_world_matrices();

    let table = engine.interactions_mut();
    table.insert(
        crate_node,
        recording_bundle(
            "crate",
            log,
            Capabilities::HOVER_START
                | Capabilities::HOVER_END
                | Capabilities::DRAG_START
                | Capabilities::DRAG
                | Capabilities::DRAG_END,
        ),
    );
    table.insert(
        orb,
        recording_bundle(
            "orb",
            log,
            Capabilities::HOVER_START
                | Capabilities::HOVER_END
                | Capabilities::SELECT_START
                | Capabilities::SELECT_END
                | Capabilities::SELECT,
        ),
    );
    table.insert(
        spinner,
        recording_bundle("spinner", log, Capabilities::HOVER_START | Capabilities::HOVER_END),
    );

    Ok((scene, DemoContent { spinner }))
}

struct Simulation {
    host: ScriptedHost,
    manager: SessionManager,
    engine: InteractionEngine,
    scene: Scene,
    renderer: RecordingRenderer,
    camera: Camera,
    content: DemoContent,
    driver: FrameDriver,
    input: InputState,
    pointer: ManualPointer,
    log: CallLog,
    sink: Option<JsonlSink>,
    controller: Option<InputSourceId>,
    trigger_down: bool,
    frame_index: u64,
    views_rendered: u64,
    interactions: u64,
}

impl Simulation {
    fn new(config: &XrConfig, sink: Option<JsonlSink>) -> Result<Self> {
        let log = CallLog::new();
        let mut engine = InteractionEngine::new();
        let (scene, content) = build_demo_scene(&mut engine, &log).context("building demo scene")?;
        let (width, height) = config.resolution;
        let mut camera = Camera::default().with_fov_degrees(config.fov_degrees);
        camera.set_aspect(width, height);

        Ok(Self {
            host: ScriptedHost::new(config.host),
            manager: SessionManager::new(config.session),
            engine,
            scene,
            renderer: RecordingRenderer::new(width, height),
            camera,
            content,
            driver: FrameDriver::new(Vec3::from_array(config.view_offset)),
            input: InputState::new(),
            pointer: ManualPointer::new(config.pointer),
            log,
            sink,
            controller: None,
            trigger_down: false,
            frame_index: 0,
            views_rendered: 0,
            interactions: 0,
        })
    }

    fn start(&mut self) {
        self.manager.validate(&mut self.host);
        self.driver.start(&mut self.host, &self.manager);
        self.pump();
    }

    fn step(&mut self, input: &PointerFrame) -> Result<()> {
        if let Some(head) = input.head {
            self.host.set_head_pose(head);
        }
        self.apply_controller(input.controller);
        self.apply_desktop_input(input);

        if self.manager.fallback() == ControlFallback::ManualPointer {
            self.pointer.drive(
                &self.input,
                &mut self.camera,
                (TICK_MS / 1000.0) as f32,
                &mut self.engine,
                &mut self.scene,
            );
        }
        self.input.begin_frame();

        self.host.tick(TICK_MS);
        self.pump();
        self.flush_interactions()?;
        self.frame_index += 1;
        Ok(())
    }

    fn apply_controller(&mut self, step: Option<ControllerStep>) {
        let Some(step) = step else {
            if let Some(id) = self.controller.take() {
                debug!(source = id.0, "controller disconnected");
                self.host.disconnect_controller(id);
                self.trigger_down = false;
            }
            return;
        };

        let id = match self.controller {
            Some(id) => id,
            None => {
                let info = self.host.connect_controller(step.hand);
                debug!(source = info.id.0, hand = ?step.hand, "controller connected");
                self.controller = Some(info.id);
                info.id
            }
        };
        self.host.set_controller_pose(id, step.pose.to_transform());

        match (self.trigger_down, step.trigger) {
            (false, true) => self.host.select(id, SelectPhase::Start),
            (true, false) => {
                self.host.select(id, SelectPhase::Click);
                self.host.select(id, SelectPhase::End);
            }
            _ => {}
        }
        self.trigger_down = step.trigger;
    }

    fn apply_desktop_input(&mut self, input: &PointerFrame) {
        let (dx, dy) = input.look_delta;
        self.input.add_mouse_motion(dx as f64, dy as f64);
        for (button, held) in [(MouseButton::Left, input.mouse_left), (MouseButton::Right, input.mouse_right)] {
            if held {
                self.input.press_mouse(button);
            } else {
                self.input.release_mouse(button);
            }
        }
        if input.walk_forward {
            self.input.press_key(KeyCode::KeyW);
        } else {
            self.input.release_key(KeyCode::KeyW);
        }
    }

    fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let events = self.host.poll_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    HostEvent::AnimationFrame { handle, timestamp, frame } => {
                        let ctx = FrameContext {
                            host: &mut self.host,
                            session: &self.manager,
                            engine: &mut self.engine,
                            scene: &mut self.scene,
                            renderer: &mut self.renderer,
                            camera: &mut self.camera,
                            content: &mut self.content,
                        };
                        let outcome = self.driver.on_frame(ctx, handle, timestamp, frame.as_ref());
                        if let FrameOutcome::Rendered { views } = outcome {
                            self.views_rendered += views as u64;
                        }
                        self.renderer.take_ops();
                    }
                    other => self.manager.handle_event(
                        &mut self.host,
                        other,
                        &mut self.engine,
                        &mut self.scene,
                    ),
                }
            }
            for signal in self.manager.take_signals() {
                match signal {
                    SessionSignal::RestartFrameLoop => self.driver.restart(&mut self.host, &self.manager),
                }
            }
        }
    }

    fn flush_interactions(&mut self) -> Result<()> {
        for call in self.log.take_calls() {
            info!(frame = self.frame_index, node = %call.node, event = call.event, "interaction");
            self.interactions += 1;
            if let Some(sink) = self.sink.as_mut() {
                sink.write(&InteractionRecord {
                    frame: self.frame_index,
                    kind: call.event,
                    node: &call.node,
                })?;
            }
        }
        Ok(())
    }

    fn summary(&self, frames: u64) -> HeadlessSummary {
        HeadlessSummary {
            frames,
            frames_rendered: self.driver.frames_rendered(),
            views_rendered: self.views_rendered,
            interactions: self.interactions,
            mode: self.manager.mode().map(|mode| mode.keyword()),
            ready: self.manager.is_ready(),
            entry_offered: self.manager.entry_offered(),
            fallback: format!("{:?}", self.manager.fallback()),
            last_failure: self.manager.last_failure().map(ToString::to_string),
        }
    }
}
