//! Per-frame math cost: MVP composition and plane polygon packing.
//!
//! A busy scene carries a few dozen planes with polygons of 10-60 vertices.
//! Both operations run once per plane or anchor per frame, so they need to
//! stay far below a 16.67 ms frame budget.
//!
//! Run with: `cargo bench --bench math_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arpin_core::math::{model_view_projection, perspective};
use arpin_core::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A regular polygon with `vertex_count` vertices and radius 1.
fn circle_plane(vertex_count: usize) -> Plane {
    let mut polygon = Vec::with_capacity(vertex_count * 2);
    for i in 0..vertex_count {
        let a = i as f32 / vertex_count as f32 * std::f32::consts::TAU;
        polygon.push(a.cos());
        polygon.push(a.sin());
    }
    Plane {
        id: TrackableId(1),
        tracking_state: TrackingState::Tracking,
        center_pose: Pose::from_axis_angle([0.3, -1.0, -2.0], [0.0, 1.0, 0.0], 0.4),
        polygon,
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_mvp(c: &mut Criterion) {
    let projection = perspective(1.0, 0.5625, 0.1, 100.0);
    let view = Pose::from_axis_angle([0.0, 1.5, 0.0], [1.0, 0.0, 0.0], -0.5)
        .inverse()
        .to_matrix();
    let model = Pose::from_translation([0.0, 0.0, -2.0]).to_matrix();

    c.bench_function("mvp_compose", |b| {
        b.iter(|| model_view_projection(black_box(&projection), black_box(&view), black_box(&model)))
    });
}

fn bench_plane_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("plane_world_vertices");
    for &n in &[8usize, 32, 128] {
        let plane = circle_plane(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &plane, |b, plane| {
            b.iter(|| black_box(plane).world_vertices())
        });
    }
    group.finish();
}

fn bench_point_in_polygon(c: &mut Criterion) {
    let plane = circle_plane(64);
    let inside = Pose::from_translation([0.3, -1.0, -2.0]);
    c.bench_function("is_pose_in_polygon_64", |b| {
        b.iter(|| black_box(&plane).is_pose_in_polygon(black_box(&inside)))
    });
}

criterion_group!(benches, bench_mvp, bench_plane_packing, bench_point_in_polygon);
criterion_main!(benches);
