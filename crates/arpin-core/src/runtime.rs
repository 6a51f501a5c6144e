//! Contracts for the host-provided AR runtime.
//!
//! The runtime does all tracking, pose estimation, plane detection and
//! hit testing. The application only drives it through these two traits:
//!
//! - [`ArRuntime`]: installation checks and session construction.
//! - [`ArSession`]: one camera session; configured, resumed, pumped for
//!   frames, queried for trackables and hit tests, paused, and closed.
//!
//! Sessions are moved between the host main thread (lifecycle transitions)
//! and the render thread (frame pumping) behind a lock, so they must be
//! [`Send`].

use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, AnchorHandle};
use crate::frame::{DisplayGeometry, Frame};
use crate::trackable::{Hit, Trackable};
use crate::ArError;

// ---------------------------------------------------------------------------
// Install status
// ---------------------------------------------------------------------------

/// Outcome of asking the runtime to make itself available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallStatus {
    /// The runtime is not present and no installation is underway.
    NotInstalled,
    /// An installation prompt was shown; retry once the user returns.
    InstallRequested,
    /// The runtime is present and ready.
    Installed,
}

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

/// Which plane orientations the runtime should detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneFindingMode {
    /// No plane detection.
    Disabled,
    /// Horizontal surfaces only (floors, tables).
    #[default]
    Horizontal,
    /// Horizontal and vertical surfaces.
    HorizontalAndVertical,
}

/// Session configuration applied with [`ArSession::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Plane detection mode.
    pub plane_finding: PlaneFindingMode,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Entry point into the host AR runtime.
pub trait ArRuntime: Send {
    /// The session type this runtime produces.
    type Session: ArSession;

    /// Ensure the runtime is installed.
    ///
    /// `user_requested_install` is `true` the first time the application
    /// asks in its lifetime; the runtime may then prompt the user and return
    /// [`InstallStatus::InstallRequested`]. Later calls pass `false` and
    /// must not prompt again.
    ///
    /// # Errors
    ///
    /// [`ArError::InstallDeclined`] if the user refused, or any availability
    /// error the runtime reports.
    fn request_install(&mut self, user_requested_install: bool) -> Result<InstallStatus, ArError>;

    /// Create a new, paused session. Requires camera permission.
    ///
    /// # Errors
    ///
    /// One of the availability kinds ([`ArError::RuntimeNotInstalled`],
    /// [`ArError::RuntimeTooOld`], [`ArError::HostTooOld`]) or
    /// [`ArError::Unclassified`].
    fn create_session(&mut self) -> Result<Self::Session, ArError>;
}

/// A live AR camera session.
pub trait ArSession: Send {
    /// Apply a configuration.
    ///
    /// # Errors
    ///
    /// [`ArError::Unclassified`] if the configuration is unsupported.
    fn configure(&mut self, config: &SessionConfig) -> Result<(), ArError>;

    /// Start or restart the camera.
    ///
    /// # Errors
    ///
    /// [`ArError::CameraUnavailable`] when another process holds the camera.
    fn resume(&mut self) -> Result<(), ArError>;

    /// Stop the camera. Idempotent.
    fn pause(&mut self);

    /// Release all native resources. The session must not be used again.
    fn close(&mut self);

    /// Tell the runtime the surface size and rotation.
    fn set_display_geometry(&mut self, geometry: DisplayGeometry);

    /// The GL texture name the runtime should stream camera images into.
    fn set_camera_texture(&mut self, texture_name: u32);

    /// Acquire the latest frame.
    ///
    /// # Errors
    ///
    /// [`ArError::CameraUnavailable`] if the camera dropped out this tick,
    /// [`ArError::SessionPaused`] if the session is not resumed.
    fn update(&mut self) -> Result<Frame, ArError>;

    /// Every trackable the runtime currently knows about.
    fn all_trackables(&self) -> Vec<Trackable>;

    /// Cast a ray through screen pixel `(x, y)` for `frame` and return hits
    /// ordered by the runtime's ranking (nearest first).
    fn hit_test(&self, frame: &Frame, x: f32, y: f32) -> Vec<Hit>;

    /// Create a runtime anchor at a hit.
    ///
    /// # Errors
    ///
    /// [`ArError::Unclassified`] if the runtime refuses (e.g. resource limit).
    fn create_anchor(&mut self, hit: &Hit) -> Result<AnchorHandle, ArError>;

    /// Current pose and tracking state of an anchor, or `None` once detached.
    fn anchor(&self, handle: AnchorHandle) -> Option<Anchor>;

    /// Stop tracking an anchor and release it.
    fn detach_anchor(&mut self, handle: AnchorHandle);
}
