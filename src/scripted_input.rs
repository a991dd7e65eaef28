use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;
use std::{fs, path::Path};
use xrinteract_core::Handedness;
use xrinteract_geometry::RigidTransform;

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

/// A pose given as a position plus yaw/pitch in degrees; yaw 0 faces -Z.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct PoseStep {
    pub position: [f32; 3],
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
}

impl PoseStep {
    pub fn to_transform(self) -> RigidTransform {
        let orientation = Quat::from_euler(
            EulerRot::YXZ,
            self.yaw_degrees.to_radians(),
            self.pitch_degrees.to_radians(),
            0.0,
        );
        RigidTransform::new(Vec3::from_array(self.position), orientation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
pub struct ControllerStep {
    #[serde(default)]
    pub hand: Handedness,
    #[serde(flatten)]
    pub pose: PoseStep,
    #[serde(default)]
    pub trigger: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    duration: f32,
    #[serde(default)]
    head: Option<PoseStep>,
    #[serde(default)]
    controller: Option<ControllerStep>,
    #[serde(default)]
    look_x: f32,
    #[serde(default)]
    look_y: f32,
    #[serde(default)]
    mouse_left: bool,
    #[serde(default)]
    mouse_right: bool,
    #[serde(default)]
    walk_forward: bool,
}

/// Inputs for one simulated tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerFrame {
    /// Native head pose, if the step moves the head.
    pub head: Option<RigidTransform>,
    /// Tracked controller; `None` means no controller is connected.
    pub controller: Option<ControllerStep>,
    /// Mouse motion in pixels for this tick.
    pub look_delta: (f32, f32),
    pub mouse_left: bool,
    pub mouse_right: bool,
    pub walk_forward: bool,
}

/// Plays back a JSON script of timed steps; the last step is held once reached.
pub struct ScriptedPointerPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
}

impl ScriptedPointerPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            time_in_step: 0.0,
        })
    }

    /// Index of the step currently playing.
    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn advance(&mut self, dt: f32) -> PointerFrame {
        if self.steps.is_empty() {
            return PointerFrame::default();
        }

        self.time_in_step += dt;
        while self.index < self.steps.len() && self.time_in_step >= self.steps[self.index].duration
        {
            self.time_in_step -= self.steps[self.index].duration;
            if self.index + 1 < self.steps.len() {
                self.index += 1;
            } else {
                self.time_in_step = 0.0;
                break;
            }
        }

        let step = self.steps.get(self.index).cloned().unwrap_or_default();
        step.into_pointer_frame()
    }
}

impl ScriptedStep {
    fn into_pointer_frame(self) -> PointerFrame {
        PointerFrame {
            head: self.head.map(PoseStep::to_transform),
            controller: self.controller,
            look_delta: (self.look_x, self.look_y),
            mouse_left: self.mouse_left,
            mouse_right: self.mouse_right,
            walk_forward: self.walk_forward,
        }
    }
}
