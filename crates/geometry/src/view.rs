//! View-matrix helpers for per-eye rendering.

use glam::{Mat4, Vec3, Vec4};

/// Copy of `view` with its translation column cleared.
pub fn rotation_only(view: &Mat4) -> Mat4 {
    let mut rotation = *view;
    rotation.w_axis = Vec4::W;
    rotation
}

/// Apply a fixed positional correction to a view matrix.
///
/// `position` is re-expressed in the view's rotation-only frame, then the view is
/// left-multiplied by a pure translation built from it. The corrected point stays
/// fixed in view space regardless of head rotation.
pub fn translate_view_matrix(view: &Mat4, position: Vec3) -> Mat4 {
    let in_view = rotation_only(view).transform_point3(position);
    Mat4::from_translation(in_view) * *view
}
