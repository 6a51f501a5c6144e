//! Session lifecycle state machine.
//!
//! [`SessionManager`] owns the AR runtime, the host, and at most one live
//! session. Host lifecycle callbacks arrive as [`LifecycleEvent`]s and are
//! applied by [`SessionManager::handle`], which moves between the
//! [`LifecycleState`]s below:
//!
//! ```text
//! Uninitialized --SurfaceCreated--> AwaitingPermission --PermissionResult(true)--+
//!       |                                                                         |
//!       +--SurfaceCreated (permission held)---------------------------------------+
//!                                                                                 v
//!                     AwaitingInstall <--install prompt shown-- setup --created--> Ready / Suspended
//!                            |                                                    ^      |
//!                            +--Foreground (retry)--> setup                       |      |
//!                                                      Foreground (resume) -------+      |
//!                                                      Background (pause) <--------------+
//! any --Destroyed--> Closed
//! ```
//!
//! The manager is shared between the host main thread and the render thread
//! through a [`LifecycleHandle`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use arpin_core::frame::DisplayGeometry;
use arpin_core::runtime::{ArRuntime, ArSession, InstallStatus, SessionConfig};
use arpin_core::ArError;

use crate::host::{Host, Notice};

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Where the manager is in its setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No session and no setup attempt in flight.
    Uninitialized,
    /// Waiting for the user to answer the camera permission request.
    AwaitingPermission,
    /// The runtime is being installed; setup retries on the next foreground.
    AwaitingInstall,
    /// A session exists and is resumed.
    Ready,
    /// A session exists and is paused.
    Suspended,
    /// The host is gone. Terminal.
    Closed,
}

/// Host lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The GL surface exists and the renderers have been initialized.
    SurfaceCreated,
    /// The user answered the camera permission request.
    PermissionResult(bool),
    /// The host came to the foreground.
    Foreground,
    /// The host went to the background.
    Background,
    /// The host is being destroyed.
    Destroyed,
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns the session and drives it through the host lifecycle.
pub struct SessionManager<R: ArRuntime, H: Host> {
    runtime: R,
    host: H,
    session: Option<R::Session>,
    session_config: SessionConfig,
    state: LifecycleState,
    install_requested: bool,
    surface_created: bool,
    foreground: bool,
    display_geometry: Option<DisplayGeometry>,
    session_epoch: u64,
}

impl<R: ArRuntime, H: Host> SessionManager<R, H> {
    /// A manager that will configure sessions with `session_config`.
    pub fn new(runtime: R, host: H, session_config: SessionConfig) -> Self {
        Self {
            runtime,
            host,
            session: None,
            session_config,
            state: LifecycleState::Uninitialized,
            install_requested: false,
            surface_created: false,
            foreground: false,
            display_geometry: None,
            session_epoch: 0,
        }
    }

    // -- event handling -----------------------------------------------------

    /// Apply one lifecycle event and return the resulting state.
    pub fn handle(&mut self, event: LifecycleEvent) -> LifecycleState {
        if self.state == LifecycleState::Closed {
            tracing::warn!(?event, "lifecycle event after close ignored");
            return self.state;
        }
        let before = self.state;
        match event {
            LifecycleEvent::SurfaceCreated => {
                self.surface_created = true;
                self.setup_if_permitted();
            }
            LifecycleEvent::PermissionResult(true) => self.setup(),
            LifecycleEvent::PermissionResult(false) => {
                self.host.notify(Notice::CameraPermissionRequired);
                self.state = LifecycleState::AwaitingPermission;
            }
            LifecycleEvent::Foreground => {
                self.foreground = true;
                if self.session.is_some() {
                    if self.surface_created {
                        if let Err(err) = self.resume() {
                            self.host.notify(Notice::Failure(err));
                        }
                    }
                } else if self.surface_created
                    && matches!(
                        self.state,
                        LifecycleState::Uninitialized | LifecycleState::AwaitingInstall
                    )
                {
                    self.setup_if_permitted();
                }
            }
            LifecycleEvent::Background => {
                self.foreground = false;
                self.pause();
            }
            LifecycleEvent::Destroyed => {
                self.close();
                self.state = LifecycleState::Closed;
            }
        }
        if self.state != before {
            tracing::info!(?event, from = ?before, to = ?self.state, "lifecycle transition");
        }
        self.state
    }

    fn setup_if_permitted(&mut self) {
        if self.session.is_some() {
            return;
        }
        if self.host.camera_permission_granted() {
            self.setup();
        } else {
            self.host.request_camera_permission();
            self.state = LifecycleState::AwaitingPermission;
        }
    }

    /// One setup attempt: install check, then session creation. Errors are
    /// reported to the host and end the attempt.
    fn setup(&mut self) {
        if self.session.is_some() {
            return;
        }
        match self.ensure_installed() {
            Ok(InstallStatus::InstallRequested) => {
                self.state = LifecycleState::AwaitingInstall;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                self.fail_setup(err);
                return;
            }
        }
        if let Err(err) = self.create_session() {
            self.fail_setup(err);
            return;
        }
        self.host.notify(Notice::SessionCreated);
        if self.foreground && self.surface_created {
            if let Err(err) = self.resume() {
                self.host.notify(Notice::Failure(err));
            }
        }
    }

    fn fail_setup(&mut self, err: ArError) {
        tracing::warn!(error = %err, "session setup failed");
        self.host.notify(Notice::Failure(err));
        self.state = LifecycleState::Uninitialized;
    }

    // -- operations ---------------------------------------------------------

    /// Ask the runtime to make itself available. Only the first request in
    /// the manager's lifetime may prompt the user.
    ///
    /// # Errors
    ///
    /// Whatever availability error the runtime reports.
    pub fn ensure_installed(&mut self) -> Result<InstallStatus, ArError> {
        let status = self.runtime.request_install(!self.install_requested)?;
        if status == InstallStatus::InstallRequested {
            self.install_requested = true;
        }
        tracing::debug!(?status, "install check");
        Ok(status)
    }

    /// Create and configure a session. The new session starts paused
    /// ([`LifecycleState::Suspended`]). No-op if one already exists.
    ///
    /// # Errors
    ///
    /// [`ArError::PermissionDenied`] without camera permission, otherwise
    /// whatever the runtime reports from creation or configuration.
    pub fn create_session(&mut self) -> Result<(), ArError> {
        if self.session.is_some() {
            return Ok(());
        }
        if !self.host.camera_permission_granted() {
            return Err(ArError::PermissionDenied);
        }
        let mut session = self.runtime.create_session()?;
        if let Err(err) = session.configure(&self.session_config) {
            session.close();
            return Err(err);
        }
        if let Some(geometry) = self.display_geometry {
            session.set_display_geometry(geometry);
        }
        self.session = Some(session);
        self.session_epoch += 1;
        self.state = LifecycleState::Suspended;
        tracing::info!(
            epoch = self.session_epoch,
            plane_finding = ?self.session_config.plane_finding,
            "AR session created"
        );
        Ok(())
    }

    /// Resume the session. No-op without one.
    ///
    /// # Errors
    ///
    /// [`ArError::CameraUnavailable`] discards the session; it is recreated
    /// at the next opportunity. Other errors leave it paused.
    pub fn resume(&mut self) -> Result<(), ArError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        match session.resume() {
            Ok(()) => {
                self.state = LifecycleState::Ready;
                Ok(())
            }
            Err(ArError::CameraUnavailable) => {
                tracing::warn!("camera unavailable on resume, discarding session");
                self.close();
                self.state = LifecycleState::Uninitialized;
                Err(ArError::CameraUnavailable)
            }
            Err(err) => {
                self.state = LifecycleState::Suspended;
                Err(err)
            }
        }
    }

    /// Pause the session. No-op without one.
    pub fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pause();
            self.state = LifecycleState::Suspended;
        }
    }

    /// Close and drop the session. No-op without one.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            tracing::info!(epoch = self.session_epoch, "AR session closed");
        }
    }

    /// Remember the surface geometry and forward it to a live session.
    pub fn set_display_geometry(&mut self, geometry: DisplayGeometry) {
        self.display_geometry = Some(geometry);
        if let Some(session) = self.session.as_mut() {
            session.set_display_geometry(geometry);
        }
    }

    /// Deliver a notice through the host.
    pub fn notify(&mut self, notice: Notice) {
        self.host.notify(notice);
    }

    // -- accessors ----------------------------------------------------------

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&R::Session> {
        self.session.as_ref()
    }

    /// The live session, mutably.
    pub fn session_mut(&mut self) -> Option<&mut R::Session> {
        self.session.as_mut()
    }

    /// Whether a session exists.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Incremented every time a session is created. Anchors from an older
    /// epoch belong to a closed session.
    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    /// Whether an install prompt has been shown.
    pub fn install_requested(&self) -> bool {
        self.install_requested
    }

    /// The last display geometry reported by the surface.
    pub fn display_geometry(&self) -> Option<DisplayGeometry> {
        self.display_geometry
    }
}

// ---------------------------------------------------------------------------
// LifecycleHandle
// ---------------------------------------------------------------------------

/// Cloneable, thread-safe handle to a [`SessionManager`].
pub struct LifecycleHandle<R: ArRuntime, H: Host> {
    inner: Arc<Mutex<SessionManager<R, H>>>,
}

impl<R: ArRuntime, H: Host> Clone for LifecycleHandle<R, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: ArRuntime, H: Host> LifecycleHandle<R, H> {
    /// Wrap a manager.
    pub fn new(manager: SessionManager<R, H>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Apply an event. See [`SessionManager::handle`].
    pub fn handle(&self, event: LifecycleEvent) -> LifecycleState {
        self.inner.lock().handle(event)
    }

    /// See [`SessionManager::set_display_geometry`].
    pub fn set_display_geometry(&self, geometry: DisplayGeometry) {
        self.inner.lock().set_display_geometry(geometry);
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.inner.lock().state()
    }

    /// Whether a session exists.
    pub fn has_session(&self) -> bool {
        self.inner.lock().has_session()
    }

    /// Lock the manager for direct access.
    pub fn lock(&self) -> MutexGuard<'_, SessionManager<R, H>> {
        self.inner.lock()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
