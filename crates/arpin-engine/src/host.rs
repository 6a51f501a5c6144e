//! The host application collaborator.
//!
//! The demo does not own a window, a permission dialog, or a toast widget.
//! It asks the [`Host`] for camera permission state and hands it
//! [`Notice`]s to show the user. [`ScriptedHost`] is a cloneable in-memory
//! host for headless runs and tests.

use std::sync::Arc;

use parking_lot::Mutex;

use arpin_core::ArError;

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A short user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A session was created and configured.
    SessionCreated,
    /// The user refused camera access.
    CameraPermissionRequired,
    /// A tap placed a marker.
    MarkerPlaced,
    /// Markers are drawn as the built-in wireframe cube; no model asset is
    /// loaded.
    PlaceholderModel,
    /// Session setup or resume failed.
    Failure(ArError),
}

impl Notice {
    /// The text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::SessionCreated => "AR session created successfully".to_owned(),
            Self::CameraPermissionRequired => "Camera permission is required for AR".to_owned(),
            Self::MarkerPlaced => "Model placed!".to_owned(),
            Self::PlaceholderModel => {
                "GLB model loading not yet implemented, showing cube".to_owned()
            }
            Self::Failure(err) => err.user_message(),
        }
    }

    /// Whether the host should keep the message on screen longer.
    pub fn is_long(&self) -> bool {
        !matches!(self, Self::SessionCreated | Self::MarkerPlaced)
    }
}

impl From<ArError> for Notice {
    fn from(err: ArError) -> Self {
        Self::Failure(err)
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Services the surrounding application provides.
///
/// The lifecycle manager holding the host is shared between the main and
/// render threads, so hosts must be [`Send`].
pub trait Host: Send {
    /// Whether the camera permission is currently granted.
    fn camera_permission_granted(&self) -> bool;

    /// Ask the user for camera permission. The answer arrives later as
    /// [`LifecycleEvent::PermissionResult`](crate::lifecycle::LifecycleEvent::PermissionResult).
    fn request_camera_permission(&mut self);

    /// Show a notice to the user.
    fn notify(&mut self, notice: Notice);
}

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HostState {
    permission_granted: bool,
    permission_requests: u32,
    notices: Vec<Notice>,
}

/// In-memory [`Host`]. Clones share state, so a test can keep one clone
/// after moving another into the app.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    state: Arc<Mutex<HostState>>,
}

impl ScriptedHost {
    /// A host whose camera permission starts as `granted`.
    pub fn new(granted: bool) -> Self {
        let host = Self::default();
        host.set_permission(granted);
        host
    }

    /// Change the permission state.
    pub fn set_permission(&self, granted: bool) {
        self.state.lock().permission_granted = granted;
    }

    /// How many times permission was requested.
    pub fn permission_requests(&self) -> u32 {
        self.state.lock().permission_requests
    }

    /// Notices delivered so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.state.lock().notices.clone()
    }

    /// Forget delivered notices.
    pub fn clear_notices(&self) {
        self.state.lock().notices.clear();
    }
}

impl Host for ScriptedHost {
    fn camera_permission_granted(&self) -> bool {
        self.state.lock().permission_granted
    }

    fn request_camera_permission(&mut self) {
        self.state.lock().permission_requests += 1;
    }

    fn notify(&mut self, notice: Notice) {
        tracing::info!(message = %notice.message(), "notice");
        self.state.lock().notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_notices_use_error_wording() {
        assert_eq!(Notice::from(ArError::CameraUnavailable).message(), "Camera not available");
        assert_eq!(
            Notice::from(ArError::Unclassified("no GPU".to_owned())).message(),
            "AR session creation failed: no GPU"
        );
        assert!(Notice::from(ArError::InstallDeclined).is_long());
        assert!(!Notice::MarkerPlaced.is_long());
        assert!(Notice::PlaceholderModel.is_long());
        assert!(Notice::PlaceholderModel.message().ends_with("showing cube"));
    }

    #[test]
    fn clones_share_state() {
        let host = ScriptedHost::new(false);
        let mut moved = host.clone();
        moved.request_camera_permission();
        moved.notify(Notice::SessionCreated);
        host.set_permission(true);
        assert!(moved.camera_permission_granted());
        assert_eq!(host.permission_requests(), 1);
        assert_eq!(host.notices(), vec![Notice::SessionCreated]);
    }
}
