//! Application configuration.
//!
//! [`AppConfig`] gathers every constant the demo draws with: which variant
//! runs, clear color, clip planes, overlay colors, marker size, and the tap
//! queue bound. All fields default to the values the demo ships with, so a
//! JSON document only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use arpin_core::runtime::{PlaneFindingMode, SessionConfig};

// ---------------------------------------------------------------------------
// DemoVariant
// ---------------------------------------------------------------------------

/// Which feature set the demo runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoVariant {
    /// Camera background, plane overlay, markers, and tap-to-place.
    #[default]
    Full,
    /// Camera background only.
    CameraOnly,
    /// Clear the screen every frame and nothing else.
    ClearOnly,
}

impl DemoVariant {
    /// Whether the camera background is drawn.
    pub fn draws_camera(self) -> bool {
        !matches!(self, Self::ClearOnly)
    }

    /// Whether planes, markers, and taps are handled.
    pub fn draws_scene(self) -> bool {
        matches!(self, Self::Full)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating an [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input was not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the demo cannot run with.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for [`ArApp`](crate::app::ArApp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Feature set.
    pub variant: DemoVariant,
    /// Color the framebuffer is cleared to each frame.
    pub clear_color: [f32; 4],
    /// Near clip plane in meters.
    pub near_clip: f32,
    /// Far clip plane in meters.
    pub far_clip: f32,
    /// Fill color of tracked planes.
    pub plane_color: [f32; 4],
    /// Wireframe color of placed markers.
    pub marker_color: [f32; 4],
    /// Half the edge length of the marker cube, in meters.
    pub marker_half_extent: f32,
    /// Taps buffered between render ticks before new ones are dropped.
    pub tap_queue_capacity: usize,
    /// Plane detection mode requested from the runtime.
    pub plane_finding: PlaneFindingMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: DemoVariant::Full,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            near_clip: 0.1,
            far_clip: 100.0,
            plane_color: [0.0, 1.0, 0.0, 0.3],
            marker_color: [1.0, 0.0, 0.0, 1.0],
            marker_half_extent: 0.1,
            tap_queue_capacity: 16,
            plane_finding: PlaneFindingMode::Horizontal,
        }
    }
}

impl AppConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed input, [`ConfigError::Invalid`]
    /// for values that fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field for a usable value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.near_clip.is_finite() && self.near_clip > 0.0) {
            return Err(invalid("near_clip", format!("must be positive, got {}", self.near_clip)));
        }
        if !(self.far_clip.is_finite() && self.far_clip > self.near_clip) {
            return Err(invalid(
                "far_clip",
                format!("must exceed near_clip ({}), got {}", self.near_clip, self.far_clip),
            ));
        }
        if !(self.marker_half_extent.is_finite() && self.marker_half_extent > 0.0) {
            return Err(invalid(
                "marker_half_extent",
                format!("must be positive, got {}", self.marker_half_extent),
            ));
        }
        if self.tap_queue_capacity == 0 {
            return Err(invalid("tap_queue_capacity", "must be at least 1".to_owned()));
        }
        let colors = [
            ("clear_color", self.clear_color),
            ("plane_color", self.plane_color),
            ("marker_color", self.marker_color),
        ];
        for (field, color) in colors {
            if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(invalid(field, format!("components must lie in [0, 1], got {color:?}")));
            }
        }
        Ok(())
    }

    /// The session configuration this app requests.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            plane_finding: self.plane_finding,
        }
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
