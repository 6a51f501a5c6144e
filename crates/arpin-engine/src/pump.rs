//! Per-tick frame acquisition.

use arpin_core::frame::Frame;
use arpin_core::runtime::ArSession;
use arpin_core::ArError;
use arpin_gfx::TextureId;

/// Pushes the camera texture into the session and pulls one frame per tick.
///
/// Update failures never escape: a camera that dropped out this tick, or a
/// session that is not resumed, simply yields no frame.
#[derive(Debug, Default)]
pub struct FramePump {
    frames: u64,
    skipped: u64,
    last_error: Option<ArError>,
}

impl FramePump {
    /// A pump with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `camera_texture` (if any) and request the next frame.
    pub fn pump<S: ArSession + ?Sized>(
        &mut self,
        session: &mut S,
        camera_texture: Option<TextureId>,
    ) -> Option<Frame> {
        if let Some(texture) = camera_texture {
            session.set_camera_texture(texture.raw());
        }
        match session.update() {
            Ok(frame) => {
                self.frames += 1;
                self.last_error = None;
                Some(frame)
            }
            Err(err) => {
                self.skipped += 1;
                match err {
                    ArError::CameraUnavailable => tracing::trace!("camera unavailable, frame skipped"),
                    ref other => tracing::debug!(error = %other, "session update failed, frame skipped"),
                }
                self.last_error = Some(err);
                None
            }
        }
    }

    /// Frames acquired so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Ticks that produced no frame.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// The error from the most recent tick, if it failed.
    pub fn last_error(&self) -> Option<&ArError> {
        self.last_error.as_ref()
    }
}
