//! Input-source identities and ray construction.

use glam::Mat4;
use std::fmt;
use xrinteract_core::{InputSourceId, InputSourceInfo, ReferenceSpace, XrFrame};
use xrinteract_geometry::{Ray, RigidTransform};

/// Who is pointing: a tracked device or the implicit pseudo-pointer.
///
/// The pseudo-source stands in for gaze (or the desktop camera) while the
/// session tracks no real devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputSource {
    /// A tracked controller or hand.
    Real(InputSourceId),
    /// Gaze pointer derived from the last rendered eye.
    Pseudo,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Real(id) => write!(f, "source#{}", id.0),
            InputSource::Pseudo => f.write_str("pseudo"),
        }
    }
}

/// Pointing ray of a tracked device for this frame.
///
/// `None` when the device has no target-ray space or its pose could not be
/// resolved; callers treat that as no input this tick.
pub fn create_ray(info: &InputSourceInfo, frame: &XrFrame, space: &ReferenceSpace) -> Option<Ray> {
    let target = info.target_ray_space?;
    let pose = frame.pose(target, space)?;
    Some(Ray::from_transform(&pose))
}

/// Gaze ray along the -Z axis of a camera world matrix.
///
/// Scale in `camera_world` is ignored.
pub fn pseudo_ray(camera_world: &Mat4) -> Ray {
    Ray::from_transform(&RigidTransform::from_matrix(camera_world))
}
