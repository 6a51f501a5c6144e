//! End-to-end render-loop tests: the scripted runtime, the scripted host,
//! and the recording graphics context driven through `ArApp`.

use arpin_core::sim::{ScriptedRuntime, SimCall, SimControl, SimScene};
use arpin_engine::prelude::*;
use arpin_gfx::prelude::*;
use arpin_gfx::recording::{GlCall, RecordingContext};

type App = ArApp<ScriptedRuntime, ScriptedHost, RecordingContext>;

const PORTRAIT: DisplayGeometry = DisplayGeometry {
    rotation: DisplayRotation::Rotation0,
    width: 1080,
    height: 1920,
};

/// Screen point that lands well inside the default floor plane.
const ON_FLOOR: (f32, f32) = (540.0, 1300.0);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn started(config: AppConfig) -> (App, SimControl, ScriptedHost) {
    let runtime = ScriptedRuntime::new(SimScene::default());
    let control = runtime.control();
    let host = ScriptedHost::new(true);
    let mut app = ArApp::new(config, runtime, host.clone(), RecordingContext::new()).unwrap();
    app.lifecycle().handle(LifecycleEvent::Foreground);
    app.on_surface_created().unwrap();
    app.on_surface_changed(PORTRAIT);
    (app, control, host)
}

fn tap(app: &App, (x, y): (f32, f32)) {
    assert_eq!(app.tap_sender().submit(TouchEvent::down(x, y)), Submission::Queued);
}

fn primitives(gl: &RecordingContext) -> Vec<Primitive> {
    gl.draws().iter().map(|d| d.primitive).collect()
}

fn only_handle(app: &App) -> AnchorHandle {
    let handles: Vec<AnchorHandle> = app.anchors().iter().map(|(_, handle, _)| handle).collect();
    assert_eq!(handles.len(), 1);
    handles[0]
}

// ---------------------------------------------------------------------------
// Tick flow
// ---------------------------------------------------------------------------

#[test]
fn tick_draws_background_then_planes_then_markers() {
    let (mut app, control, host) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    app.gl_mut().clear_log();

    let report = app.on_draw_frame();
    assert!(report.frame_acquired);
    assert!(report.camera_tracking);
    assert!(report.background_drawn);
    assert_eq!(report.planes_drawn, 1);
    assert_eq!(report.anchors_placed, 1);
    assert_eq!(report.markers_drawn, 1);

    use Primitive::*;
    assert_eq!(
        primitives(app.gl()),
        vec![TriangleStrip, TriangleFan, LineLoop, LineLoop, LineLoop, LineLoop]
    );
    assert_eq!(
        app.gl().calls().first(),
        Some(&GlCall::Clear { color: true, depth: true })
    );
    assert_eq!(control.live_anchor_count(), 1);
    assert_eq!(
        host.notices(),
        vec![Notice::PlaceholderModel, Notice::SessionCreated, Notice::MarkerPlaced]
    );
    assert_eq!(host.notices()[2].message(), "Model placed!");
}

#[test]
fn surface_creation_announces_the_cube_marker_once_per_surface() {
    let (mut app, _, host) = started(AppConfig::default());
    let first = &host.notices()[0];
    assert_eq!(*first, Notice::PlaceholderModel);
    assert!(first.is_long());
    assert_eq!(first.message(), "GLB model loading not yet implemented, showing cube");

    host.clear_notices();
    app.on_surface_created().unwrap();
    assert_eq!(host.notices(), vec![Notice::PlaceholderModel]);
}

#[test]
fn camera_texture_is_bound_before_each_update() {
    let (mut app, control, _) = started(AppConfig::default());
    app.on_draw_frame();
    let texture = app.background().texture().unwrap();
    assert_eq!(control.camera_texture(), Some(texture.raw()));
}

#[test]
fn no_session_means_no_draws() {
    let runtime = ScriptedRuntime::new(SimScene::default());
    let host = ScriptedHost::new(false);
    let mut app: App =
        ArApp::new(AppConfig::default(), runtime, host.clone(), RecordingContext::new()).unwrap();
    app.on_surface_created().unwrap();
    tap(&app, ON_FLOOR);
    app.gl_mut().clear_log();

    let report = app.on_draw_frame();
    assert!(!report.frame_acquired);
    assert_eq!(report.taps_ignored, 1);
    assert!(app.gl().draws().is_empty());
    assert_eq!(host.permission_requests(), 1);
    assert_eq!(host.notices(), vec![Notice::PlaceholderModel]);
    assert_eq!(app.lifecycle().state(), LifecycleState::AwaitingPermission);
    assert_eq!(app.stats().frames_skipped, 0);
}

#[test]
fn camera_dropout_skips_the_tick_without_drawing() {
    let (mut app, control, _) = started(AppConfig::default());
    control.drop_camera_frames(1);
    app.gl_mut().clear_log();

    let dropped = app.on_draw_frame();
    assert!(!dropped.frame_acquired);
    assert!(!dropped.background_drawn);
    assert!(app.gl().draws().is_empty());
    assert_eq!(app.pump().last_error(), Some(&ArError::CameraUnavailable));

    let next = app.on_draw_frame();
    assert!(next.frame_acquired);
    assert_eq!(app.stats().frames_skipped, 1);
    assert_eq!(app.stats().frames, 1);
}

#[test]
fn lost_tracking_draws_only_the_background() {
    let (mut app, control, _) = started(AppConfig::default());
    control.set_camera_tracking(TrackingState::Paused);
    app.gl_mut().clear_log();

    let report = app.on_draw_frame();
    assert!(report.frame_acquired);
    assert!(!report.camera_tracking);
    assert_eq!(report.planes_drawn, 0);
    assert_eq!(primitives(app.gl()), vec![Primitive::TriangleStrip]);
}

// ---------------------------------------------------------------------------
// Taps
// ---------------------------------------------------------------------------

#[test]
fn tap_while_not_tracking_creates_nothing() {
    let (mut app, control, host) = started(AppConfig::default());
    control.set_camera_tracking(TrackingState::Paused);
    tap(&app, ON_FLOOR);

    let report = app.on_draw_frame();
    assert_eq!(report.anchors_placed, 0);
    assert_eq!(report.taps_ignored, 1);
    assert!(app.anchors().is_empty());
    assert_eq!(control.live_anchor_count(), 0);
    assert!(!host.notices().contains(&Notice::MarkerPlaced));
}

#[test]
fn refused_anchor_is_counted_as_an_ignored_tap() {
    let (mut app, control, host) = started(AppConfig::default());
    control.fail_anchor_creation_with(Some(ArError::Unclassified("anchor limit reached".to_owned())));
    tap(&app, ON_FLOOR);

    let report = app.on_draw_frame();
    assert_eq!(report.anchors_placed, 0);
    assert_eq!(report.taps_ignored, 1);
    assert_eq!(report.markers_drawn, 0);
    assert!(app.anchors().is_empty());
    assert_eq!(control.live_anchor_count(), 0);
    assert!(!host.notices().contains(&Notice::MarkerPlaced));
    assert_eq!(app.stats().taps_ignored, 1);
}

#[test]
fn tap_off_every_plane_creates_nothing() {
    let (mut app, control, _) = started(AppConfig::default());
    tap(&app, (540.0, 100.0));
    let report = app.on_draw_frame();
    assert_eq!(report.anchors_placed, 0);
    assert_eq!(report.taps_ignored, 1);
    assert_eq!(control.live_anchor_count(), 0);
}

#[test]
fn tap_anchors_at_first_hit_inside_a_plane_polygon() {
    let (mut app, control, _) = started(AppConfig::default());
    // Level camera, tap near the top: the ray itself misses the floor.
    control.set_camera_pose(Pose::from_translation([0.0, 1.5, 0.0]));

    let floor = SimScene::default().planes[0].clone();
    let on_floor = |translation: [f32; 3], distance: f32| Hit {
        pose: Pose::from_translation(translation),
        distance,
        trackable: Trackable::Plane(floor.clone()),
    };
    control.set_scripted_hits(vec![
        Hit {
            pose: Pose::from_translation([0.0, 0.5, -0.5]),
            distance: 0.5,
            trackable: Trackable::Other(OtherTrackable {
                id: TrackableId(9),
                tracking_state: TrackingState::Tracking,
                pose: Pose::from_translation([0.0, 0.5, -0.5]),
            }),
        },
        on_floor([3.0, 0.0, -2.5], 1.0),
        on_floor([0.2, 0.0, -2.3], 2.0),
        on_floor([-0.4, 0.0, -2.0], 3.0),
    ]);

    tap(&app, (540.0, 100.0));
    let report = app.on_draw_frame();
    assert_eq!(report.anchors_placed, 1);
    assert_eq!(control.live_anchor_count(), 1);

    let anchors = app.anchors().snapshot();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].pose.translation, Vec3::new(0.2, 0.0, -2.3));
    assert_eq!(anchors[0].tracking_state, TrackingState::Tracking);
}

#[test]
fn several_taps_in_one_tick_each_place_an_anchor() {
    let (mut app, control, host) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    tap(&app, (500.0, 1250.0));
    let report = app.on_draw_frame();
    assert_eq!(report.anchors_placed, 2);
    assert_eq!(report.markers_drawn, 2);
    assert_eq!(control.live_anchor_count(), 2);
    let placed = host
        .notices()
        .into_iter()
        .filter(|n| *n == Notice::MarkerPlaced)
        .count();
    assert_eq!(placed, 2);
}

#[test]
fn anchor_tracking_loss_hides_its_marker() {
    let (mut app, control, _) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    let handle = only_handle(&app);

    assert!(control.set_anchor_tracking(handle, TrackingState::Paused));
    let report = app.on_draw_frame();
    assert_eq!(report.markers_drawn, 0);
    assert_eq!(app.anchors().len(), 1);

    assert!(control.set_anchor_tracking(handle, TrackingState::Tracking));
    assert_eq!(app.on_draw_frame().markers_drawn, 1);
}

#[test]
fn clear_anchors_detaches_from_the_runtime() {
    let (mut app, control, _) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    let handle = only_handle(&app);

    assert_eq!(app.clear_anchors(), 1);
    assert!(app.anchors().is_empty());
    assert_eq!(control.live_anchor_count(), 0);
    assert!(control.calls().contains(&SimCall::DetachAnchor(handle)));
    assert_eq!(app.on_draw_frame().markers_drawn, 0);
}

#[test]
fn replaced_session_drops_old_anchors() {
    let (mut app, control, _) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    assert_eq!(app.anchors().len(), 1);

    // Camera taken away while backgrounded: the session is discarded.
    let lifecycle = app.lifecycle();
    lifecycle.handle(LifecycleEvent::Background);
    control.set_camera_available(false);
    assert_eq!(
        lifecycle.handle(LifecycleEvent::Foreground),
        LifecycleState::Uninitialized
    );
    app.on_draw_frame();
    assert!(app.anchors().is_empty());

    control.set_camera_available(true);
    lifecycle.handle(LifecycleEvent::Background);
    assert_eq!(lifecycle.handle(LifecycleEvent::Foreground), LifecycleState::Ready);
    let report = app.on_draw_frame();
    assert!(report.frame_acquired);
    assert_eq!(report.markers_drawn, 0);
    assert_eq!(control.sessions_created(), 2);
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[test]
fn camera_only_variant_draws_no_overlays() {
    let config = AppConfig {
        variant: DemoVariant::CameraOnly,
        ..AppConfig::default()
    };
    let (mut app, control, host) = started(config);
    tap(&app, ON_FLOOR);
    app.gl_mut().clear_log();

    let report = app.on_draw_frame();
    assert!(!host.notices().contains(&Notice::PlaceholderModel));
    assert!(report.background_drawn);
    assert_eq!(report.planes_drawn, 0);
    assert_eq!(report.taps_ignored, 1);
    assert_eq!(primitives(app.gl()), vec![Primitive::TriangleStrip]);
    assert_eq!(control.live_anchor_count(), 0);
    assert_eq!(app.gl().live_programs().len(), 1);
}

#[test]
fn clear_only_variant_only_clears() {
    let config = AppConfig {
        variant: DemoVariant::ClearOnly,
        ..AppConfig::default()
    };
    let (mut app, control, _) = started(config);
    tap(&app, ON_FLOOR);
    app.gl_mut().clear_log();

    let report = app.on_draw_frame();
    assert!(!report.frame_acquired);
    assert_eq!(report.taps_ignored, 1);
    assert!(app.gl().draws().is_empty());
    assert!(app.gl().live_programs().is_empty());
    assert_eq!(control.frames_produced(), 0);
    assert_eq!(
        app.gl().calls(),
        &[GlCall::Clear { color: true, depth: true }]
    );
}

#[test]
fn invalid_config_is_rejected() {
    let config = AppConfig {
        near_clip: 10.0,
        far_clip: 1.0,
        ..AppConfig::default()
    };
    let result = ArApp::new(
        config,
        ScriptedRuntime::new(SimScene::default()),
        ScriptedHost::new(true),
        RecordingContext::new(),
    );
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

// ---------------------------------------------------------------------------
// Resources and teardown
// ---------------------------------------------------------------------------

#[test]
fn release_gpu_resources_deletes_everything() {
    let (mut app, _, _) = started(AppConfig::default());
    app.on_draw_frame();
    assert!(!app.gl().live_programs().is_empty());
    assert!(!app.gl().live_vertex_streams().is_empty());

    app.release_gpu_resources();
    assert!(app.gl().live_programs().is_empty());
    assert!(app.gl().live_textures().is_empty());
    assert!(app.gl().live_shaders().is_empty());
    assert!(app.gl().live_vertex_streams().is_empty());
    assert_eq!(app.gl().live_uniform_values(), 0);
    assert_eq!(app.gl().calls().last(), Some(&GlCall::ReleaseTransient));

    let report = app.on_draw_frame();
    assert!(report.frame_acquired);
    assert!(!report.background_drawn);
}

#[test]
fn oversized_surface_clamps_the_viewport() {
    let (mut app, _, _) = started(AppConfig::default());
    app.gl_mut().clear_log();
    app.on_surface_changed(DisplayGeometry {
        rotation: DisplayRotation::Rotation90,
        width: u32::MAX,
        height: 1080,
    });
    assert_eq!(
        app.gl().calls(),
        &[GlCall::Viewport { x: 0, y: 0, width: i32::MAX, height: 1080 }]
    );
}

#[test]
fn renderer_failure_still_creates_the_session() {
    let runtime = ScriptedRuntime::new(SimScene::default());
    let control = runtime.control();
    let mut gl = RecordingContext::new();
    gl.fail_compile_containing("u_Color");
    let host = ScriptedHost::new(true);
    let mut app: App = ArApp::new(AppConfig::default(), runtime, host.clone(), gl).unwrap();
    app.lifecycle().handle(LifecycleEvent::Foreground);

    let err = app.on_surface_created().unwrap_err();
    assert_eq!(host.notices(), vec![Notice::SessionCreated], "no cube notice without markers");
    assert!(matches!(err, GfxError::ShaderCompile { .. }));
    assert!(app.gl().live_programs().is_empty());
    assert!(app.gl().live_textures().is_empty());
    assert_eq!(control.sessions_created(), 1);
    assert_eq!(app.lifecycle().state(), LifecycleState::Ready);

    let report = app.on_draw_frame();
    assert!(report.frame_acquired);
    assert!(!report.background_drawn);
}

#[test]
fn destroy_detaches_anchors_then_closes() {
    let (mut app, control, _) = started(AppConfig::default());
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    let handle = only_handle(&app);
    control.clear_calls();

    app.on_destroy();
    assert_eq!(
        control.calls(),
        vec![SimCall::DetachAnchor(handle), SimCall::Close]
    );
    assert_eq!(app.lifecycle().state(), LifecycleState::Closed);
    assert!(!app.on_draw_frame().frame_acquired);
}

// ---------------------------------------------------------------------------
// Determinism and stats
// ---------------------------------------------------------------------------

fn scripted_run() -> (String, FrameStats) {
    let (mut app, control, _) = started(AppConfig::default());
    app.on_draw_frame();
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    control.drop_camera_frames(1);
    app.on_draw_frame();
    control.set_camera_tracking(TrackingState::Paused);
    tap(&app, ON_FLOOR);
    app.on_draw_frame();
    (app.gl().digest(), *app.stats())
}

#[test]
fn identical_scripts_produce_identical_gl_streams() {
    let (a, _) = scripted_run();
    let (b, _) = scripted_run();
    assert_eq!(a, b);
}

#[test]
fn stats_accumulate_over_ticks() {
    let (_, stats) = scripted_run();
    assert_eq!(
        stats,
        FrameStats {
            ticks: 4,
            frames: 3,
            frames_skipped: 1,
            planes_drawn: 2,
            markers_drawn: 1,
            anchors_placed: 1,
            taps_ignored: 1,
        }
    );
}
