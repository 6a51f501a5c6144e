//! Deterministic scripted AR runtime.
//!
//! [`ScriptedRuntime`] implements [`ArRuntime`] over a static [`SimScene`]:
//! a camera pose plus a handful of planes and other trackables. Hit tests
//! cast real rays against the scene, so tap handling can be exercised end to
//! end without a device.
//!
//! Everything that a real runtime decides on its own (installation prompts,
//! camera availability, tracking loss) is scripted through a [`SimControl`]
//! handle that stays valid after the runtime and its sessions have been
//! moved into the application. Every session call is logged as a
//! [`SimCall`] for assertions.
//!
//! ```
//! use arpin_core::prelude::*;
//! use arpin_core::sim::{ScriptedRuntime, SimCall, SimScene};
//!
//! let mut runtime = ScriptedRuntime::new(SimScene::default());
//! let control = runtime.control();
//! control.require_install();
//!
//! assert_eq!(runtime.request_install(true).unwrap(), InstallStatus::InstallRequested);
//! control.complete_install();
//! assert_eq!(runtime.request_install(false).unwrap(), InstallStatus::Installed);
//!
//! let mut session = runtime.create_session().unwrap();
//! session.configure(&SessionConfig::default()).unwrap();
//! assert_eq!(control.calls(), vec![SimCall::Configure(PlaneFindingMode::Horizontal)]);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, AnchorHandle};
use crate::frame::{Camera, DisplayGeometry, DisplayTransform, Frame};
use crate::math::Vec3;
use crate::pose::Pose;
use crate::runtime::{ArRuntime, ArSession, InstallStatus, PlaneFindingMode, SessionConfig};
use crate::trackable::{Hit, OtherTrackable, Plane, Trackable, TrackableId, TrackingState};
use crate::ArError;

/// Nominal frame period used for frame timestamps (30 fps).
const FRAME_PERIOD_NS: i64 = 33_333_333;

/// A ray passing within this distance of a non-plane trackable hits it.
const POINT_HIT_RADIUS: f32 = 0.05;

// ---------------------------------------------------------------------------
// SimScene
// ---------------------------------------------------------------------------

/// The static world a [`ScriptedRuntime`] tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimScene {
    /// Camera-to-world pose.
    pub camera_pose: Pose,
    /// Full vertical field of view in radians.
    pub fov_y: f32,
    /// Detected planes.
    pub planes: Vec<Plane>,
    /// Non-plane trackables.
    pub others: Vec<OtherTrackable>,
}

impl Default for SimScene {
    /// A camera 1.5 m above the floor, pitched 30 degrees down, looking at a
    /// 2 m x 2 m floor plane centered 2.5 m ahead.
    fn default() -> Self {
        Self {
            camera_pose: Pose::from_axis_angle(
                [0.0, 1.5, 0.0],
                [1.0, 0.0, 0.0],
                -std::f32::consts::FRAC_PI_6,
            ),
            fov_y: 1.0,
            planes: vec![Plane {
                id: TrackableId(1),
                tracking_state: TrackingState::Tracking,
                center_pose: Pose::from_translation([0.0, 0.0, -2.5]),
                polygon: vec![-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0],
            }],
            others: Vec::new(),
        }
    }
}

impl SimScene {
    /// Parse a scene from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// SimCall
// ---------------------------------------------------------------------------

/// A session call observed by the scripted runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimCall {
    /// `configure` with the requested plane mode.
    Configure(PlaneFindingMode),
    /// `resume` (logged whether or not it succeeded).
    Resume,
    /// `pause`.
    Pause,
    /// `close`.
    Close,
    /// `set_display_geometry`.
    SetDisplayGeometry(DisplayGeometry),
    /// `create_anchor` that succeeded.
    CreateAnchor(AnchorHandle),
    /// `detach_anchor`.
    DetachAnchor(AnchorHandle),
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SimState {
    scene: SimScene,
    installed: bool,
    install_prompted: bool,
    install_declined: bool,
    install_error: Option<ArError>,
    session_error: Option<ArError>,
    anchor_error: Option<ArError>,
    sessions_created: u32,
    camera_available: bool,
    camera_drops: u32,
    camera_tracking: TrackingState,
    transform_available: bool,
    geometry: Option<DisplayGeometry>,
    geometry_dirty: bool,
    camera_texture: Option<u32>,
    frames: i64,
    anchors: BTreeMap<u64, Anchor>,
    next_anchor: u64,
    scripted_hits: Vec<Hit>,
    calls: Vec<SimCall>,
}

impl SimState {
    fn new(scene: SimScene) -> Self {
        Self {
            scene,
            installed: true,
            install_prompted: false,
            install_declined: false,
            install_error: None,
            session_error: None,
            anchor_error: None,
            sessions_created: 0,
            camera_available: true,
            camera_drops: 0,
            camera_tracking: TrackingState::Tracking,
            transform_available: true,
            geometry: None,
            geometry_dirty: false,
            camera_texture: None,
            frames: 0,
            anchors: BTreeMap::new(),
            next_anchor: 1,
            scripted_hits: Vec::new(),
            calls: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimControl
// ---------------------------------------------------------------------------

/// Scripting and inspection handle for a [`ScriptedRuntime`].
#[derive(Debug, Clone)]
pub struct SimControl {
    state: Arc<Mutex<SimState>>,
}

impl SimControl {
    /// Make the runtime absent; the next prompted install request returns
    /// [`InstallStatus::InstallRequested`].
    pub fn require_install(&self) {
        let mut s = self.state.lock();
        s.installed = false;
        s.install_prompted = false;
        s.install_declined = false;
    }

    /// The user finished installing.
    pub fn complete_install(&self) {
        self.state.lock().installed = true;
    }

    /// The user backed out of the install prompt.
    pub fn decline_install(&self) {
        self.state.lock().install_declined = true;
    }

    /// Make every install request fail with `error` (`None` clears it).
    pub fn fail_install_with(&self, error: Option<ArError>) {
        self.state.lock().install_error = error;
    }

    /// Make every session creation fail with `error` (`None` clears it).
    pub fn fail_session_creation_with(&self, error: Option<ArError>) {
        self.state.lock().session_error = error;
    }

    /// Make every anchor creation fail with `error` (`None` clears it).
    pub fn fail_anchor_creation_with(&self, error: Option<ArError>) {
        self.state.lock().anchor_error = error;
    }

    /// Whether `resume` can acquire the camera.
    pub fn set_camera_available(&self, available: bool) {
        self.state.lock().camera_available = available;
    }

    /// The next `count` updates fail with [`ArError::CameraUnavailable`].
    pub fn drop_camera_frames(&self, count: u32) {
        self.state.lock().camera_drops = count;
    }

    /// Set the camera tracking state reported in frames.
    pub fn set_camera_tracking(&self, state: TrackingState) {
        self.state.lock().camera_tracking = state;
    }

    /// Move the camera.
    pub fn set_camera_pose(&self, pose: Pose) {
        self.state.lock().scene.camera_pose = pose;
    }

    /// Whether frames carry a display transform.
    pub fn set_transform_available(&self, available: bool) {
        self.state.lock().transform_available = available;
    }

    /// Add a plane to the scene.
    pub fn add_plane(&self, plane: Plane) {
        self.state.lock().scene.planes.push(plane);
    }

    /// Change a plane's tracking state. Returns `false` for unknown ids.
    pub fn set_plane_tracking(&self, id: TrackableId, state: TrackingState) -> bool {
        let mut s = self.state.lock();
        match s.scene.planes.iter_mut().find(|p| p.id == id) {
            Some(plane) => {
                plane.tracking_state = state;
                true
            }
            None => false,
        }
    }

    /// Add a non-plane trackable to the scene.
    pub fn add_other(&self, other: OtherTrackable) {
        self.state.lock().scene.others.push(other);
    }

    /// Hits merged into every hit test result (sorted by distance along
    /// with the ray-cast hits).
    pub fn set_scripted_hits(&self, hits: Vec<Hit>) {
        self.state.lock().scripted_hits = hits;
    }

    /// Change an anchor's tracking state. Returns `false` for unknown handles.
    pub fn set_anchor_tracking(&self, handle: AnchorHandle, state: TrackingState) -> bool {
        match self.state.lock().anchors.get_mut(&handle.0) {
            Some(anchor) => {
                anchor.tracking_state = state;
                true
            }
            None => false,
        }
    }

    /// Session calls observed so far.
    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of sessions successfully created.
    pub fn sessions_created(&self) -> u32 {
        self.state.lock().sessions_created
    }

    /// Anchors the runtime is still tracking.
    pub fn live_anchor_count(&self) -> usize {
        self.state.lock().anchors.len()
    }

    /// The texture name most recently bound with `set_camera_texture`.
    pub fn camera_texture(&self) -> Option<u32> {
        self.state.lock().camera_texture
    }

    /// Frames produced so far.
    pub fn frames_produced(&self) -> i64 {
        self.state.lock().frames
    }
}

// ---------------------------------------------------------------------------
// ScriptedRuntime
// ---------------------------------------------------------------------------

/// An [`ArRuntime`] driven by a [`SimScene`] and a [`SimControl`] script.
#[derive(Debug)]
pub struct ScriptedRuntime {
    state: Arc<Mutex<SimState>>,
}

impl ScriptedRuntime {
    /// A runtime that is installed, has a free camera, and tracks `scene`.
    pub fn new(scene: SimScene) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(scene))),
        }
    }

    /// A scripting handle sharing this runtime's state.
    pub fn control(&self) -> SimControl {
        SimControl {
            state: Arc::clone(&self.state),
        }
    }
}

impl ArRuntime for ScriptedRuntime {
    type Session = ScriptedSession;

    fn request_install(&mut self, user_requested_install: bool) -> Result<InstallStatus, ArError> {
        let mut s = self.state.lock();
        if let Some(err) = s.install_error.clone() {
            return Err(err);
        }
        if s.installed {
            return Ok(InstallStatus::Installed);
        }
        if s.install_prompted && s.install_declined {
            return Err(ArError::InstallDeclined);
        }
        if user_requested_install {
            s.install_prompted = true;
            return Ok(InstallStatus::InstallRequested);
        }
        Ok(InstallStatus::NotInstalled)
    }

    fn create_session(&mut self) -> Result<ScriptedSession, ArError> {
        let mut s = self.state.lock();
        if let Some(err) = s.session_error.clone() {
            return Err(err);
        }
        if !s.installed {
            return Err(ArError::RuntimeNotInstalled);
        }
        s.sessions_created += 1;
        Ok(ScriptedSession {
            state: Arc::clone(&self.state),
            config: SessionConfig::default(),
            resumed: false,
            closed: false,
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedSession
// ---------------------------------------------------------------------------

/// A session produced by [`ScriptedRuntime`].
#[derive(Debug)]
pub struct ScriptedSession {
    state: Arc<Mutex<SimState>>,
    config: SessionConfig,
    resumed: bool,
    closed: bool,
}

impl ScriptedSession {
    /// Whether the session is currently resumed.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }
}

impl ArSession for ScriptedSession {
    fn configure(&mut self, config: &SessionConfig) -> Result<(), ArError> {
        if self.closed {
            return Err(ArError::Unclassified("session is closed".to_owned()));
        }
        self.config = *config;
        self.state
            .lock()
            .calls
            .push(SimCall::Configure(config.plane_finding));
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ArError> {
        let mut s = self.state.lock();
        s.calls.push(SimCall::Resume);
        if self.closed {
            return Err(ArError::Unclassified("session is closed".to_owned()));
        }
        if !s.camera_available {
            return Err(ArError::CameraUnavailable);
        }
        self.resumed = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.resumed = false;
        self.state.lock().calls.push(SimCall::Pause);
    }

    fn close(&mut self) {
        self.resumed = false;
        self.closed = true;
        let mut s = self.state.lock();
        tracing::debug!(anchors = s.anchors.len(), "scripted session closed");
        s.anchors.clear();
        s.calls.push(SimCall::Close);
    }

    fn set_display_geometry(&mut self, geometry: DisplayGeometry) {
        let mut s = self.state.lock();
        if s.geometry != Some(geometry) {
            s.geometry = Some(geometry);
            s.geometry_dirty = true;
        }
        s.calls.push(SimCall::SetDisplayGeometry(geometry));
    }

    fn set_camera_texture(&mut self, texture_name: u32) {
        self.state.lock().camera_texture = Some(texture_name);
    }

    fn update(&mut self) -> Result<Frame, ArError> {
        if self.closed || !self.resumed {
            return Err(ArError::SessionPaused);
        }
        let mut s = self.state.lock();
        if s.camera_drops > 0 {
            s.camera_drops -= 1;
            return Err(ArError::CameraUnavailable);
        }
        s.frames += 1;
        let changed = std::mem::take(&mut s.geometry_dirty);
        let aspect = s.geometry.map_or(1.0, |g| g.aspect());
        let display_transform = if s.transform_available {
            Some(DisplayTransform::for_rotation(
                s.geometry.map(|g| g.rotation).unwrap_or_default(),
            ))
        } else {
            None
        };
        Ok(Frame {
            timestamp_ns: s.frames * FRAME_PERIOD_NS,
            camera: Camera {
                tracking_state: s.camera_tracking,
                pose: s.scene.camera_pose,
                fov_y: s.scene.fov_y,
                aspect,
            },
            display_geometry_changed: changed,
            display_transform,
        })
    }

    fn all_trackables(&self) -> Vec<Trackable> {
        let s = self.state.lock();
        let planes = s
            .scene
            .planes
            .iter()
            .filter(|_| self.config.plane_finding != PlaneFindingMode::Disabled)
            .cloned()
            .map(Trackable::Plane);
        let others = s.scene.others.iter().cloned().map(Trackable::Other);
        planes.chain(others).collect()
    }

    fn hit_test(&self, frame: &Frame, x: f32, y: f32) -> Vec<Hit> {
        let s = self.state.lock();
        let Some(geometry) = s.geometry else {
            return Vec::new();
        };
        if geometry.width == 0 || geometry.height == 0 {
            return Vec::new();
        }

        // Screen pixel -> NDC -> camera-space ray -> world-space ray.
        let ndc_x = 2.0 * x / geometry.width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / geometry.height as f32;
        let half_tan = (frame.camera.fov_y / 2.0).tan();
        let dir_cam = Vec3::new(ndc_x * half_tan * frame.camera.aspect, ndc_y * half_tan, -1.0);
        let dir = frame.camera.pose.rotate_vector(dir_cam);
        let dir_len = dir.length();
        let origin = frame.camera.pose.translation;

        let mut hits: Vec<Hit> = s.scripted_hits.clone();

        if self.config.plane_finding != PlaneFindingMode::Disabled {
            for plane in s.scene.planes.iter().filter(|p| p.tracking_state.is_tracking()) {
                let normal = plane.center_pose.rotate_vector(Vec3::Y);
                let denom = dir.dot(normal);
                if denom.abs() < 1e-6 {
                    continue;
                }
                let t = (plane.center_pose.translation - origin).dot(normal) / denom;
                if t <= 0.0 {
                    continue;
                }
                hits.push(Hit {
                    pose: Pose {
                        translation: origin + dir * t,
                        rotation: plane.center_pose.rotation,
                    },
                    distance: t * dir_len,
                    trackable: Trackable::Plane(plane.clone()),
                });
            }
        }

        let unit = dir / dir_len;
        for other in s.scene.others.iter().filter(|o| o.tracking_state.is_tracking()) {
            let to_point = other.pose.translation - origin;
            let along = to_point.dot(unit);
            if along <= 0.0 {
                continue;
            }
            let off_ray = to_point - unit * along;
            if off_ray.length() <= POINT_HIT_RADIUS {
                hits.push(Hit {
                    pose: other.pose,
                    distance: along,
                    trackable: Trackable::Other(other.clone()),
                });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn create_anchor(&mut self, hit: &Hit) -> Result<AnchorHandle, ArError> {
        if self.closed {
            return Err(ArError::Unclassified("session is closed".to_owned()));
        }
        let mut s = self.state.lock();
        if let Some(err) = &s.anchor_error {
            tracing::debug!(error = %err, "scripted anchor creation refused");
            return Err(err.clone());
        }
        let handle = AnchorHandle(s.next_anchor);
        s.next_anchor += 1;
        s.anchors.insert(
            handle.0,
            Anchor {
                pose: hit.pose,
                tracking_state: TrackingState::Tracking,
            },
        );
        s.calls.push(SimCall::CreateAnchor(handle));
        tracing::debug!(handle = handle.0, distance = hit.distance, "scripted anchor created");
        Ok(handle)
    }

    fn anchor(&self, handle: AnchorHandle) -> Option<Anchor> {
        self.state.lock().anchors.get(&handle.0).copied()
    }

    fn detach_anchor(&mut self, handle: AnchorHandle) {
        let mut s = self.state.lock();
        s.anchors.remove(&handle.0);
        s.calls.push(SimCall::DetachAnchor(handle));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
