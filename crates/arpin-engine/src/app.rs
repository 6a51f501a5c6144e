//! The render-loop driver.
//!
//! [`ArApp`] is what a host's GL surface callbacks talk to. It owns the
//! graphics context, the three renderers, the frame pump, the tap queue,
//! and the anchor arena, and shares the [`SessionManager`] with the host
//! main thread through a [`LifecycleHandle`].
//!
//! One call to [`ArApp::on_draw_frame`] is one tick:
//!
//! 1. Clear the framebuffer.
//! 2. Under the session lock: pump a frame, resolve queued taps against
//!    it, refresh anchor states, and collect planes.
//! 3. With the lock released: draw the background, then planes and markers
//!    if the camera is tracking.

use serde::{Deserialize, Serialize};

use arpin_core::anchor::AnchorArena;
use arpin_core::frame::DisplayGeometry;
use arpin_core::runtime::{ArRuntime, ArSession};
use arpin_core::trackable::{Plane, Trackable};
use arpin_gfx::prelude::*;

use crate::config::{AppConfig, ConfigError};
use crate::host::{Host, Notice};
use crate::input::{TapOutcome, TapSender, TouchHandler};
use crate::lifecycle::{LifecycleEvent, LifecycleHandle, SessionManager};
use crate::pump::FramePump;
use crate::render::{BackgroundRenderer, MarkerRenderer, PlaneRenderer};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// A frame was acquired from the session.
    pub frame_acquired: bool,
    /// The frame's camera was tracking.
    pub camera_tracking: bool,
    /// The camera background was drawn.
    pub background_drawn: bool,
    /// Planes drawn.
    pub planes_drawn: usize,
    /// Markers drawn.
    pub markers_drawn: usize,
    /// Taps that created an anchor.
    pub anchors_placed: usize,
    /// Taps that did not.
    pub taps_ignored: usize,
}

/// Totals accumulated over every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Ticks run.
    pub ticks: u64,
    /// Ticks that acquired a frame.
    pub frames: u64,
    /// Ticks that had a session but no frame.
    pub frames_skipped: u64,
    /// Plane draws.
    pub planes_drawn: u64,
    /// Marker draws.
    pub markers_drawn: u64,
    /// Anchors placed.
    pub anchors_placed: u64,
    /// Taps ignored.
    pub taps_ignored: u64,
}

impl FrameStats {
    fn record(&mut self, report: &TickReport, had_session: bool) {
        self.ticks += 1;
        if report.frame_acquired {
            self.frames += 1;
        } else if had_session {
            self.frames_skipped += 1;
        }
        self.planes_drawn += report.planes_drawn as u64;
        self.markers_drawn += report.markers_drawn as u64;
        self.anchors_placed += report.anchors_placed as u64;
        self.taps_ignored += report.taps_ignored as u64;
    }
}

// ---------------------------------------------------------------------------
// ArApp
// ---------------------------------------------------------------------------

/// The AR demo application, driven from the render thread.
pub struct ArApp<R: ArRuntime, H: Host, G: GlContext> {
    config: AppConfig,
    lifecycle: LifecycleHandle<R, H>,
    gl: G,
    background: BackgroundRenderer,
    planes: PlaneRenderer,
    markers: MarkerRenderer,
    pump: FramePump,
    touch: TouchHandler,
    tap_sender: TapSender,
    anchors: AnchorArena,
    anchor_epoch: u64,
    stats: FrameStats,
}

impl<R: ArRuntime, H: Host, G: GlContext> ArApp<R, H, G> {
    /// Build the app. No GPU or session work happens until the surface
    /// callbacks run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `config` fails validation.
    pub fn new(config: AppConfig, runtime: R, host: H, gl: G) -> Result<Self, ConfigError> {
        config.validate()?;
        let manager = SessionManager::new(runtime, host, config.session_config());
        let (tap_sender, touch) = TouchHandler::channel(config.tap_queue_capacity);
        tracing::info!(variant = ?config.variant, "AR app created");
        Ok(Self {
            background: BackgroundRenderer::new(),
            planes: PlaneRenderer::new(config.plane_color),
            markers: MarkerRenderer::new(config.marker_color, config.marker_half_extent),
            lifecycle: LifecycleHandle::new(manager),
            gl,
            pump: FramePump::new(),
            touch,
            tap_sender,
            anchors: AnchorArena::new(),
            anchor_epoch: 0,
            stats: FrameStats::default(),
            config,
        })
    }

    // -- surface callbacks --------------------------------------------------

    /// The GL surface was (re)created: set the clear color, build the
    /// renderers this variant needs, then start session setup. Once the
    /// marker renderer is up the host is told markers fall back to the
    /// wireframe cube.
    ///
    /// Session setup runs even if renderer initialization fails; drawing is
    /// skipped until the next successful surface creation.
    ///
    /// # Errors
    ///
    /// The first [`GfxError`] hit while building renderers.
    pub fn on_surface_created(&mut self) -> Result<(), GfxError> {
        self.gl.clear_color(self.config.clear_color);
        let result = self.initialize_renderers();
        match &result {
            Ok(()) if self.markers.is_initialized() => {
                self.lifecycle.lock().notify(Notice::PlaceholderModel);
            }
            Ok(()) => {}
            Err(err) => {
                tracing::error!(error = %err, "renderer initialization failed, drawing disabled");
            }
        }
        self.lifecycle.handle(LifecycleEvent::SurfaceCreated);
        result
    }

    fn initialize_renderers(&mut self) -> Result<(), GfxError> {
        let result = self.build_renderers();
        if result.is_err() {
            self.release_gpu_resources();
        }
        result
    }

    fn build_renderers(&mut self) -> Result<(), GfxError> {
        let variant = self.config.variant;
        if variant.draws_camera() {
            self.background.initialize(&mut self.gl)?;
        }
        if variant.draws_scene() {
            self.planes.initialize(&mut self.gl)?;
            self.markers.initialize(&mut self.gl)?;
        }
        Ok(())
    }

    /// The surface was resized or rotated.
    pub fn on_surface_changed(&mut self, geometry: DisplayGeometry) {
        let width = i32::try_from(geometry.width).unwrap_or(i32::MAX);
        let height = i32::try_from(geometry.height).unwrap_or(i32::MAX);
        self.gl.viewport(0, 0, width, height);
        self.lifecycle.set_display_geometry(geometry);
        tracing::debug!(
            width = geometry.width,
            height = geometry.height,
            rotation = ?geometry.rotation,
            "surface changed"
        );
    }

    /// Run one render tick.
    pub fn on_draw_frame(&mut self) -> TickReport {
        let mut report = TickReport::default();
        self.gl.clear(true, true);
        let taps = self.touch.drain();

        if !self.config.variant.draws_camera() {
            report.taps_ignored = taps.len();
            self.stats.record(&report, false);
            return report;
        }
        let scene = self.config.variant.draws_scene();

        let (frame, planes, placed) = {
            let mut manager = self.lifecycle.lock();
            let epoch = manager.session_epoch();
            if !manager.has_session() || epoch != self.anchor_epoch {
                if !self.anchors.is_empty() {
                    let stale = self.anchors.drain_handles();
                    tracing::debug!(count = stale.len(), "dropped anchors of a closed session");
                }
                self.anchor_epoch = epoch;
            }

            let Some(session) = manager.session_mut() else {
                report.taps_ignored = taps.len();
                self.stats.record(&report, false);
                return report;
            };

            let frame = self.pump.pump(session, self.background.texture());

            let mut placed = 0;
            if scene {
                for tap in taps {
                    match TouchHandler::resolve(session, frame.as_ref(), &mut self.anchors, tap) {
                        TapOutcome::Placed { .. } => placed += 1,
                        _ => report.taps_ignored += 1,
                    }
                }
                self.anchors.refresh(|handle| session.anchor(handle));
            } else {
                report.taps_ignored = taps.len();
            }

            let tracking = frame
                .as_ref()
                .is_some_and(|f| f.camera.tracking_state.is_tracking());
            let planes: Vec<Plane> = if scene && tracking {
                session
                    .all_trackables()
                    .into_iter()
                    .filter_map(|t| match t {
                        Trackable::Plane(plane) => Some(plane),
                        Trackable::Other(_) => None,
                    })
                    .collect()
            } else {
                Vec::new()
            };

            for _ in 0..placed {
                manager.notify(Notice::MarkerPlaced);
            }
            (frame, planes, placed)
        };
        report.anchors_placed = placed;

        let Some(frame) = frame else {
            self.stats.record(&report, true);
            return report;
        };
        report.frame_acquired = true;
        report.background_drawn = self.background.render(&mut self.gl, &frame) > 0;

        if frame.camera.tracking_state.is_tracking() {
            report.camera_tracking = true;
            if scene {
                let projection = frame
                    .camera
                    .projection_matrix(self.config.near_clip, self.config.far_clip);
                let view = frame.camera.view_matrix();
                report.planes_drawn = self.planes.render(&mut self.gl, &planes, &view, &projection);
                report.markers_drawn = self.markers.render(
                    &mut self.gl,
                    self.anchors.iter().map(|(_, _, anchor)| anchor),
                    &view,
                    &projection,
                );
            }
        }

        self.stats.record(&report, true);
        report
    }

    /// Tear down: detach anchors, close the session, and refuse further
    /// lifecycle events.
    pub fn on_destroy(&mut self) {
        self.clear_anchors();
        self.lifecycle.handle(LifecycleEvent::Destroyed);
    }

    // -- explicit resource release -----------------------------------------

    /// Delete every GPU resource the renderers own, then the context's own
    /// streaming state. Drawing stops until the next
    /// [`on_surface_created`](Self::on_surface_created).
    pub fn release_gpu_resources(&mut self) {
        self.background.release(&mut self.gl);
        self.planes.release(&mut self.gl);
        self.markers.release(&mut self.gl);
        self.gl.release_transient();
    }

    /// Detach every placed anchor from the runtime and empty the arena.
    /// Returns how many anchors were removed.
    pub fn clear_anchors(&mut self) -> usize {
        let handles = self.anchors.drain_handles();
        let mut manager = self.lifecycle.lock();
        if let Some(session) = manager.session_mut() {
            for handle in &handles {
                session.detach_anchor(*handle);
            }
        }
        tracing::debug!(count = handles.len(), "anchors cleared");
        handles.len()
    }

    // -- accessors ----------------------------------------------------------

    /// A handle for the host main thread.
    pub fn lifecycle(&self) -> LifecycleHandle<R, H> {
        self.lifecycle.clone()
    }

    /// A tap sender for the UI thread.
    pub fn tap_sender(&self) -> TapSender {
        self.tap_sender.clone()
    }

    /// Placed anchors.
    pub fn anchors(&self) -> &AnchorArena {
        &self.anchors
    }

    /// Accumulated totals.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The background renderer.
    pub fn background(&self) -> &BackgroundRenderer {
        &self.background
    }

    /// The frame pump.
    pub fn pump(&self) -> &FramePump {
        &self.pump
    }

    /// The graphics context.
    pub fn gl(&self) -> &G {
        &self.gl
    }

    /// The graphics context, mutably.
    pub fn gl_mut(&mut self) -> &mut G {
        &mut self.gl
    }
}
