//! arpin engine -- session lifecycle, frame pump, renderers, and
//! tap-to-place for a minimal AR camera demo.
//!
//! This crate builds on [`arpin_core`] (runtime contracts and tracking data)
//! and [`arpin_gfx`] (the graphics-context seam) to provide the application
//! itself:
//!
//! - [`lifecycle`]: the session state machine driven by host callbacks.
//! - [`pump`]: one frame per display refresh.
//! - [`render`]: camera background, plane overlay, and marker cubes.
//! - [`input`]: bounded tap queue and hit-test-to-anchor resolution.
//! - [`app`]: [`ArApp`](app::ArApp), the render-loop driver tying it all
//!   together.
//!
//! # Quick Start
//!
//! ```
//! use arpin_engine::prelude::*;
//! use arpin_core::sim::{ScriptedRuntime, SimScene};
//! use arpin_gfx::recording::RecordingContext;
//!
//! let runtime = ScriptedRuntime::new(SimScene::default());
//! let host = ScriptedHost::new(true);
//! let mut app = ArApp::new(AppConfig::default(), runtime, host, RecordingContext::new()).unwrap();
//!
//! app.lifecycle().handle(LifecycleEvent::Foreground);
//! app.on_surface_created().unwrap();
//! app.on_surface_changed(DisplayGeometry { rotation: DisplayRotation::Rotation0, width: 1080, height: 1920 });
//!
//! app.tap_sender().submit(TouchEvent::down(540.0, 1300.0));
//! let report = app.on_draw_frame();
//! assert!(report.frame_acquired);
//! assert_eq!(report.planes_drawn, 1);
//! assert_eq!(report.anchors_placed, 1);
//! ```

#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod host;
pub mod input;
pub mod lifecycle;
pub mod pump;
pub mod render;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use arpin_core;

/// Re-export the graphics crate for convenience.
pub use arpin_gfx;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use arpin_core::prelude::*;

    pub use crate::app::{ArApp, FrameStats, TickReport};
    pub use crate::config::{AppConfig, ConfigError, DemoVariant};
    pub use crate::host::{Host, Notice, ScriptedHost};
    pub use crate::input::{
        select_hit, Submission, Tap, TapOutcome, TapSender, TouchAction, TouchEvent, TouchHandler,
    };
    pub use crate::lifecycle::{LifecycleEvent, LifecycleHandle, LifecycleState, SessionManager};
    pub use crate::pump::FramePump;
    pub use crate::render::{BackgroundRenderer, MarkerRenderer, PlaneRenderer};
}
