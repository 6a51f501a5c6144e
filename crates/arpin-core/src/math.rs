//! Matrix conventions shared by the runtime and the renderers.
//!
//! All 3-D math is `glam`. Matrices are column-major with OpenGL clip-space
//! depth in `[-1, 1]`; they only become `[f32; 16]` arrays at the graphics
//! boundary, via [`Mat4::to_cols_array`].
//!
//! ```
//! use arpin_core::math::{model_view_projection, Mat4, Vec3};
//!
//! let m = Mat4::from_scale(Vec3::splat(2.0));
//! assert_eq!(model_view_projection(&Mat4::IDENTITY, &Mat4::IDENTITY, &m), m);
//! ```

pub use glam::{Mat4, Quat, Vec3, Vec4};

/// Compose `projection × view × model`.
///
/// The view-model product is formed first, matching the order a vertex
/// shader would see them applied.
pub fn model_view_projection(projection: &Mat4, view: &Mat4, model: &Mat4) -> Mat4 {
    projection.mul_mat4(&view.mul_mat4(model))
}

/// Right-handed perspective projection with depth in `[-1, 1]`.
///
/// `fov_y` is the full vertical field of view in radians.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y, aspect, near, far)
}
