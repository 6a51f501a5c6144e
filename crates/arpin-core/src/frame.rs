//! Per-tick frame snapshots produced by `ArSession::update`.
//!
//! A [`Frame`] is immutable and only valid for the draw cycle that produced
//! it. It carries everything the renderers need from the camera: tracking
//! state, view/projection matrices, and the display transform used to map
//! screen-space NDC onto the camera texture.

use serde::{Deserialize, Serialize};

use crate::math::{perspective, Mat4};
use crate::pose::Pose;
use crate::trackable::TrackingState;
use crate::ArError;

// ---------------------------------------------------------------------------
// Display geometry
// ---------------------------------------------------------------------------

/// Display rotation relative to the device's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayRotation {
    /// Natural orientation.
    #[default]
    Rotation0,
    /// 90 degrees counter-clockwise.
    Rotation90,
    /// 180 degrees.
    Rotation180,
    /// 270 degrees counter-clockwise.
    Rotation270,
}

/// Size and rotation of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayGeometry {
    /// Display rotation.
    pub rotation: DisplayRotation,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
}

impl DisplayGeometry {
    /// Width / height, or `1.0` for a degenerate surface.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayTransform
// ---------------------------------------------------------------------------

/// Affine map from OpenGL normalized device coordinates to normalized
/// texture coordinates: `uv = [a b; c d] * ndc + [tx ty]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    /// Row-major 2x2 linear part `[a, b, c, d]`.
    pub linear: [f32; 4],
    /// Translation `[tx, ty]`.
    pub offset: [f32; 2],
}

impl DisplayTransform {
    /// Transform for a display in the given rotation. Texture `v` grows
    /// downward while NDC `y` grows upward, so the unrotated map flips `y`.
    pub fn for_rotation(rotation: DisplayRotation) -> Self {
        let linear = match rotation {
            DisplayRotation::Rotation0 => [0.5, 0.0, 0.0, -0.5],
            DisplayRotation::Rotation90 => [0.0, -0.5, -0.5, 0.0],
            DisplayRotation::Rotation180 => [-0.5, 0.0, 0.0, 0.5],
            DisplayRotation::Rotation270 => [0.0, 0.5, 0.5, 0.0],
        };
        Self {
            linear,
            offset: [0.5, 0.5],
        }
    }

    /// Map one NDC point to texture space.
    pub fn apply(&self, x: f32, y: f32) -> [f32; 2] {
        let [a, b, c, d] = self.linear;
        [a * x + b * y + self.offset[0], c * x + d * y + self.offset[1]]
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// The camera's state within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera tracking state.
    pub tracking_state: TrackingState,
    /// Camera-to-world pose. The camera looks down its local `-z` axis.
    pub pose: Pose,
    /// Full vertical field of view in radians.
    pub fov_y: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
}

impl Camera {
    /// The world-to-camera view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.pose.inverse().to_matrix()
    }

    /// The projection matrix for the given clip planes.
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        perspective(self.fov_y, self.aspect, near, far)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// An immutable snapshot of one tracked camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Runtime timestamp in nanoseconds.
    pub timestamp_ns: i64,
    /// Camera state for this frame.
    pub camera: Camera,
    /// `true` if the display geometry changed since the previous frame.
    pub display_geometry_changed: bool,
    /// NDC -> texture mapping; `None` while the runtime cannot provide one.
    pub display_transform: Option<DisplayTransform>,
}

impl Frame {
    /// Whether the display geometry changed since the previous frame.
    pub fn has_display_geometry_changed(&self) -> bool {
        self.display_geometry_changed
    }

    /// Map a flat list of NDC `(x, y)` pairs into normalized texture
    /// coordinates. The output has the same length as the input.
    ///
    /// # Errors
    ///
    /// Returns [`ArError::TransformFailure`] when the frame has no display
    /// transform or the input is not a whole number of pairs.
    pub fn transform_coordinates_2d(&self, ndc: &[f32]) -> Result<Vec<f32>, ArError> {
        let transform = self
            .display_transform
            .ok_or_else(|| ArError::TransformFailure("no display transform available".to_owned()))?;
        if ndc.len() % 2 != 0 {
            return Err(ArError::TransformFailure(format!(
                "coordinate buffer length {} is not a multiple of 2",
                ndc.len()
            )));
        }
        let mut out = Vec::with_capacity(ndc.len());
        for pair in ndc.chunks_exact(2) {
            out.extend_from_slice(&transform.apply(pair[0], pair[1]));
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(transform: Option<DisplayTransform>) -> Frame {
        Frame {
            timestamp_ns: 0,
            camera: Camera {
                tracking_state: TrackingState::Tracking,
                pose: Pose::IDENTITY,
                fov_y: 1.0,
                aspect: 1.0,
            },
            display_geometry_changed: true,
            display_transform: transform,
        }
    }

    #[test]
    fn unrotated_transform_maps_ndc_corners_to_full_texture() {
        let f = frame(Some(DisplayTransform::for_rotation(DisplayRotation::Rotation0)));
        let uv = f
            .transform_coordinates_2d(&[-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(uv, vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn missing_transform_is_a_transform_failure() {
        let f = frame(None);
        let err = f.transform_coordinates_2d(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, ArError::TransformFailure(_)));
    }

    #[test]
    fn odd_length_input_is_rejected() {
        let f = frame(Some(DisplayTransform::for_rotation(DisplayRotation::Rotation0)));
        assert!(f.transform_coordinates_2d(&[0.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn view_matrix_of_identity_camera_is_identity() {
        let f = frame(None);
        assert_eq!(f.camera.view_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn degenerate_geometry_has_unit_aspect() {
        let g = DisplayGeometry {
            rotation: DisplayRotation::Rotation0,
            width: 0,
            height: 1080,
        };
        assert_eq!(g.aspect(), 1.0);
    }
}
