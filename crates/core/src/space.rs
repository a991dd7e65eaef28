//! Reference spaces and their adjustable origin offset.

use std::fmt;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use xrinteract_geometry::RigidTransform;

use crate::SpaceId;

/// Reference-space keywords understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceKind {
    /// Origin locked to the viewer.
    Viewer,
    /// Origin near the viewer at session start.
    Local,
    /// Like `Local` with the origin on the floor.
    LocalFloor,
    /// Stationary space at eye level.
    #[default]
    StationaryEyeLevel,
    /// Room-scale space with known bounds.
    BoundedFloor,
    /// World-scale tracking.
    Unbounded,
}

impl ReferenceSpaceKind {
    /// Keyword the host API uses for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            ReferenceSpaceKind::Viewer => "viewer",
            ReferenceSpaceKind::Local => "local",
            ReferenceSpaceKind::LocalFloor => "local-floor",
            ReferenceSpaceKind::StationaryEyeLevel => "stationary-eye-level",
            ReferenceSpaceKind::BoundedFloor => "bounded-floor",
            ReferenceSpaceKind::Unbounded => "unbounded",
        }
    }
}

impl fmt::Display for ReferenceSpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A granted reference space plus the origin offset applied on top of it.
///
/// The origin offset describes where the virtual origin sits inside the native
/// space. Poses reported against this space are re-expressed relative to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSpace {
    /// Host identity of the native space.
    pub id: SpaceId,
    /// Keyword it was requested with.
    pub kind: ReferenceSpaceKind,
    origin_offset: RigidTransform,
}

impl ReferenceSpace {
    /// Space with no origin offset.
    pub fn new(id: SpaceId, kind: ReferenceSpaceKind) -> Self {
        Self {
            id,
            kind,
            origin_offset: RigidTransform::IDENTITY,
        }
    }

    /// Current origin offset.
    pub fn origin_offset(&self) -> RigidTransform {
        self.origin_offset
    }

    /// Replace the origin offset.
    pub fn set_origin_offset(&mut self, offset: RigidTransform) {
        self.origin_offset = offset;
    }

    /// Origin offset as a matrix.
    pub fn offset_matrix(&self) -> Mat4 {
        self.origin_offset.to_matrix()
    }

    /// Set the origin offset from a matrix, decomposing it into translation + rotation.
    pub fn set_offset_matrix(&mut self, matrix: &Mat4) {
        self.origin_offset = RigidTransform::from_matrix(matrix);
    }

    /// Re-express a pose given in the native space relative to this space.
    pub fn relative_pose(&self, native: &RigidTransform) -> RigidTransform {
        self.origin_offset.inverse() * *native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn default_offset_is_identity() {
        let space = ReferenceSpace::new(SpaceId(3), ReferenceSpaceKind::Local);
        assert_eq!(space.offset_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn offset_matrix_round_trip() {
        let mut space = ReferenceSpace::new(SpaceId(1), ReferenceSpaceKind::default());
        let m = Mat4::from_rotation_translation(Quat::from_rotation_y(0.5), Vec3::new(1.0, 0.0, -2.0));
        space.set_offset_matrix(&m);
        assert!(space.offset_matrix().abs_diff_eq(m, 1.0e-5));
    }

    #[test]
    fn relative_pose_subtracts_offset() {
        let mut space = ReferenceSpace::new(SpaceId(1), ReferenceSpaceKind::default());
        space.set_origin_offset(RigidTransform::from_translation(Vec3::new(0.0, 0.0, -1.0)));
        let native = RigidTransform::from_translation(Vec3::new(0.0, 1.6, -1.0));
        let rel = space.relative_pose(&native);
        assert!(rel.position.abs_diff_eq(Vec3::new(0.0, 1.6, 0.0), 1.0e-6));
    }

    #[test]
    fn default_kind_is_stationary_eye_level() {
        assert_eq!(ReferenceSpaceKind::default(), ReferenceSpaceKind::StationaryEyeLevel);
        assert_eq!(ReferenceSpaceKind::LocalFloor.to_string(), "local-floor");
    }
}
