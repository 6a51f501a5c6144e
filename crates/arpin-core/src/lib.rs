//! arpin core -- AR runtime contracts, tracking data model, and pose math.
//!
//! This crate defines what the application consumes from the host AR
//! runtime: per-tick [`Frame`](frame::Frame) snapshots, [`Trackable`]s
//! (planes and everything else), hit results, and anchors. The runtime
//! itself is an opaque collaborator behind the [`ArRuntime`] and
//! [`ArSession`] traits; [`sim`] provides a deterministic scripted
//! implementation for headless runs and tests.
//!
//! # Quick Start
//!
//! ```
//! use arpin_core::prelude::*;
//! use arpin_core::sim::{ScriptedRuntime, SimScene};
//!
//! let mut runtime = ScriptedRuntime::new(SimScene::default());
//! assert_eq!(runtime.request_install(true).unwrap(), InstallStatus::Installed);
//!
//! let mut session = runtime.create_session().unwrap();
//! session.configure(&SessionConfig::default()).unwrap();
//! session.resume().unwrap();
//! let frame = session.update().unwrap();
//! assert!(frame.camera.tracking_state.is_tracking());
//! ```

#![deny(unsafe_code)]

pub mod anchor;
pub mod frame;
pub mod math;
pub mod pose;
pub mod runtime;
pub mod sim;
pub mod trackable;

pub use runtime::{ArRuntime, ArSession};
pub use trackable::Trackable;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors reported by the AR runtime.
///
/// The availability kinds (`RuntimeNotInstalled` through `HostTooOld`) are
/// terminal for one setup attempt. `CameraUnavailable` is terminal for a
/// session when it happens on resume and transient when it happens on
/// update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArError {
    /// The AR runtime package is not installed.
    #[error("AR runtime is not installed")]
    RuntimeNotInstalled,

    /// The user declined the installation prompt.
    #[error("user declined AR runtime installation")]
    InstallDeclined,

    /// The installed runtime is older than this application requires.
    #[error("installed AR runtime is too old")]
    RuntimeTooOld,

    /// The host OS or SDK is too old for the runtime.
    #[error("host OS is too old for the AR runtime")]
    HostTooOld,

    /// Another process holds the camera, or it dropped out.
    #[error("camera is not available")]
    CameraUnavailable,

    /// A coordinate-space transform could not be computed.
    #[error("coordinate transform failed: {0}")]
    TransformFailure(String),

    /// The session was asked for a frame while not resumed.
    #[error("session is paused")]
    SessionPaused,

    /// A session was requested before the user granted camera access.
    #[error("camera permission has not been granted")]
    PermissionDenied,

    /// Anything the runtime did not classify.
    #[error("AR runtime failure: {0}")]
    Unclassified(String),
}

impl ArError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::RuntimeNotInstalled => "AR runtime not installed".to_owned(),
            Self::InstallDeclined => "AR runtime installation declined".to_owned(),
            Self::RuntimeTooOld => "AR runtime too old".to_owned(),
            Self::HostTooOld => "OS version too old for AR".to_owned(),
            Self::CameraUnavailable => "Camera not available".to_owned(),
            Self::TransformFailure(_) => "Display transform unavailable".to_owned(),
            Self::SessionPaused => "AR session paused".to_owned(),
            Self::PermissionDenied => "Camera permission is required for AR".to_owned(),
            Self::Unclassified(msg) => format!("AR session creation failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::anchor::{Anchor, AnchorArena, AnchorHandle, AnchorId};
    pub use crate::frame::{Camera, DisplayGeometry, DisplayRotation, DisplayTransform, Frame};
    pub use crate::math::{Mat4, Quat, Vec3};
    pub use crate::pose::Pose;
    pub use crate::runtime::{
        ArRuntime, ArSession, InstallStatus, PlaneFindingMode, SessionConfig,
    };
    pub use crate::trackable::{
        Hit, OtherTrackable, Plane, Trackable, TrackableId, TrackingState,
    };
    pub use crate::ArError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclassified_message_includes_detail() {
        let err = ArError::Unclassified("boom".to_owned());
        assert_eq!(err.user_message(), "AR session creation failed: boom");
        assert_eq!(err.to_string(), "AR runtime failure: boom");
    }

    #[test]
    fn availability_messages_are_distinct() {
        let kinds = [
            ArError::RuntimeNotInstalled,
            ArError::InstallDeclined,
            ArError::RuntimeTooOld,
            ArError::HostTooOld,
        ];
        let mut messages: Vec<String> = kinds.iter().map(ArError::user_message).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }
}
