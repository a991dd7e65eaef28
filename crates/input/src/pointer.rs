//! Manual pointer: the desktop camera doubles as the pseudo-source.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;
use xrinteract_camera::Camera;
use xrinteract_core::SelectPhase;
use xrinteract_interaction::{pseudo_ray, InputSource, InteractionEngine};
use xrinteract_scene::SceneAccessor;

/// Look and movement tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerSettings {
    /// Radians of rotation per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    /// Metres per second.
    pub move_speed: f32,
    /// Flip vertical look.
    pub invert_y: bool,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.003,
            move_speed: 2.0,
            invert_y: false,
        }
    }
}

/// Keyboard/mouse fallback driving the pseudo input source.
///
/// Looking happens while the cursor is locked or the right button is held.
/// The left button (or Enter) is the trigger.
#[derive(Debug, Clone, Default)]
pub struct ManualPointer {
    settings: PointerSettings,
}

impl ManualPointer {
    /// Pointer with the given tuning.
    pub fn new(settings: PointerSettings) -> Self {
        Self { settings }
    }

    /// Current tuning.
    pub fn settings(&self) -> &PointerSettings {
        &self.settings
    }

    /// Apply this frame's look and walk input to the camera.
    pub fn update_camera(&self, input: &crate::InputState, camera: &mut Camera, dt: f32) {
        if input.cursor_locked || input.mouse_button_pressed(MouseButton::Right) {
            let (dx, dy) = input.mouse_delta;
            let pitch_sign = if self.settings.invert_y { 1.0 } else { -1.0 };
            camera.rotate(
                dx as f32 * self.settings.mouse_sensitivity,
                pitch_sign * dy as f32 * self.settings.mouse_sensitivity,
            );
        }

        let (forward, right) = input.movement_input();
        if forward == 0.0 && right == 0.0 {
            return;
        }
        let ahead = camera.forward();
        let flat = Vec3::new(ahead.x, 0.0, ahead.z).normalize_or_zero();
        let step = (flat * forward + camera.right() * right).normalize_or_zero();
        camera.position += step * self.settings.move_speed * dt;
    }

    /// Trigger transitions this frame, press before release.
    pub fn select_phases(&self, input: &crate::InputState) -> Vec<SelectPhase> {
        let mut phases = Vec::new();
        if input.mouse_button_just_pressed(MouseButton::Left) || input.key_just_pressed(KeyCode::Enter) {
            phases.push(SelectPhase::Start);
        }
        if input.mouse_button_just_released(MouseButton::Left) || input.key_just_released(KeyCode::Enter) {
            phases.push(SelectPhase::End);
        }
        phases
    }

    /// Move the camera, then feed trigger edges to the engine as the pseudo-source.
    ///
    /// Hover for the pseudo-source runs in the frame loop, not here.
    pub fn drive(
        &self,
        input: &crate::InputState,
        camera: &mut Camera,
        dt: f32,
        engine: &mut InteractionEngine,
        scene: &mut dyn SceneAccessor,
    ) {
        self.update_camera(input, camera, dt);
        let phases = self.select_phases(input);
        if phases.is_empty() {
            return;
        }
        let ray = pseudo_ray(&camera.world_matrix());
        for phase in phases {
            debug!(?phase, "manual pointer select");
            engine.handle_select(phase, InputSource::Pseudo, Some(&ray), scene);
        }
    }
}
