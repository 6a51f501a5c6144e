//! Headless AR session -- drives the demo against the scripted runtime and
//! the recording graphics context, printing one report per tick.
//!
//! Run with:
//!   cargo run --example headless_session -p arpin-engine
//!   RUST_LOG=arpin_engine=debug cargo run --example headless_session -p arpin-engine
//!
//! An optional first argument names a JSON `AppConfig` file.

use anyhow::Context;
use arpin_core::sim::{ScriptedRuntime, SimScene};
use arpin_engine::prelude::*;
use arpin_gfx::recording::RecordingContext;
use tracing_subscriber::EnvFilter;

const GEOMETRY: DisplayGeometry = DisplayGeometry {
    rotation: DisplayRotation::Rotation0,
    width: 1080,
    height: 1920,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            AppConfig::from_json_str(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => AppConfig::default(),
    };

    let runtime = ScriptedRuntime::new(SimScene::default());
    let control = runtime.control();
    let host = ScriptedHost::new(false);
    let mut app = ArApp::new(config, runtime, host.clone(), RecordingContext::new())?;
    let lifecycle = app.lifecycle();

    // Start without camera permission, then grant it.
    lifecycle.handle(LifecycleEvent::Foreground);
    app.on_surface_created()?;
    app.on_surface_changed(GEOMETRY);
    host.set_permission(true);
    lifecycle.handle(LifecycleEvent::PermissionResult(true));

    let script: [(&str, Option<(f32, f32)>); 6] = [
        ("warm-up", None),
        ("tap on the floor", Some((540.0, 1300.0))),
        ("tap on the floor again", Some((480.0, 1200.0))),
        ("tap at the horizon", Some((540.0, 100.0))),
        ("camera dropout", None),
        ("steady", None),
    ];
    for (tick, (label, tap)) in script.into_iter().enumerate() {
        if let Some((x, y)) = tap {
            app.tap_sender().submit(TouchEvent::down(x, y));
        }
        if label == "camera dropout" {
            control.drop_camera_frames(1);
        }
        let report = app.on_draw_frame();
        println!("tick {tick} ({label}): {}", serde_json::to_string(&report)?);
    }

    // Background and back: the session pauses and resumes, anchors survive.
    lifecycle.handle(LifecycleEvent::Background);
    lifecycle.handle(LifecycleEvent::Foreground);
    let report = app.on_draw_frame();
    println!("after resume: {}", serde_json::to_string(&report)?);

    println!("cleared {} anchors", app.clear_anchors());
    app.release_gpu_resources();
    app.on_destroy();

    for notice in host.notices() {
        println!("notice: {}", notice.message());
    }
    println!("stats: {}", serde_json::to_string_pretty(app.stats())?);
    println!("gl digest: {}", app.gl().digest());
    Ok(())
}
