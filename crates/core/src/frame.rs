//! Per-tick pose snapshots.

use glam::Mat4;
use std::collections::HashMap;
use xrinteract_geometry::RigidTransform;

use crate::{ReferenceSpace, SpaceId};

/// Which eye a view belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Left eye of a stereo pair.
    Left,
    /// Right eye of a stereo pair.
    Right,
    /// Monocular view.
    None,
}

/// A view as sampled by the host, before any reference-space adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeView {
    /// Eye tag.
    pub eye: Eye,
    /// Eye pose in the native tracking space.
    pub transform: RigidTransform,
    /// Projection matrix.
    pub projection: Mat4,
}

/// A view resolved against a reference space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Eye tag.
    pub eye: Eye,
    /// Eye pose relative to the reference space.
    pub transform: RigidTransform,
    /// Inverse of `transform`.
    pub view_matrix: Mat4,
    /// Projection matrix.
    pub projection: Mat4,
}

/// Viewer pose with one view per logical eye.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPose {
    /// Head pose relative to the reference space.
    pub transform: RigidTransform,
    /// Views to render this frame.
    pub views: Vec<View>,
}

/// Snapshot of everything the host tracked for one frame tick.
///
/// Poses are stored in the host's native tracking space. Queries take a
/// [`ReferenceSpace`] and apply its origin offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrFrame {
    viewer: Option<(RigidTransform, Vec<NativeView>)>,
    poses: HashMap<SpaceId, RigidTransform>,
}

impl XrFrame {
    /// Empty frame: no viewer pose, no device poses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the viewer pose and its views.
    pub fn with_viewer(mut self, head: RigidTransform, views: Vec<NativeView>) -> Self {
        self.viewer = Some((head, views));
        self
    }

    /// Attach the native pose of a tracked space.
    pub fn with_space_pose(mut self, space: SpaceId, pose: RigidTransform) -> Self {
        self.poses.insert(space, pose);
        self
    }

    /// Pose of `space` relative to `base`, if the host tracked it this frame.
    pub fn pose(&self, space: SpaceId, base: &ReferenceSpace) -> Option<RigidTransform> {
        self.poses
            .get(&space)
            .map(|native| base.relative_pose(native))
    }

    /// Viewer pose relative to `base`, if available.
    pub fn viewer_pose(&self, base: &ReferenceSpace) -> Option<ViewerPose> {
        let (head, views) = self.viewer.as_ref()?;
        let views = views
            .iter()
            .map(|native| {
                let transform = base.relative_pose(&native.transform);
                View {
                    eye: native.eye,
                    transform,
                    view_matrix: transform.inverse().to_matrix(),
                    projection: native.projection,
                }
            })
            .collect();
        Some(ViewerPose {
            transform: base.relative_pose(head),
            views,
        })
    }
}
