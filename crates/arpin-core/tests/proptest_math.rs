//! Property tests for pose math, polygon packing, and the anchor arena.
//!
//! These tests use `proptest` to generate random poses, polygons, and arena
//! operation sequences and check that invariants hold for all of them.

use arpin_core::math::model_view_projection;
use arpin_core::prelude::*;
use proptest::prelude::*;

fn finite(range: f32) -> impl Strategy<Value = f32> {
    -range..range
}

fn pose_strategy() -> impl Strategy<Value = Pose> {
    (
        [finite(10.0), finite(10.0), finite(10.0)],
        [finite(1.0), finite(1.0), finite(1.0)],
        finite(std::f32::consts::PI),
    )
        .prop_map(|(t, axis, angle)| Pose::from_axis_angle(t, axis, angle))
}

fn point_strategy() -> impl Strategy<Value = Vec3> {
    [finite(5.0), finite(5.0), finite(5.0)].prop_map(Vec3::from)
}

#[derive(Debug, Clone)]
enum ArenaOp {
    Insert,
    Remove(usize),
}

fn arena_op_strategy() -> impl Strategy<Value = ArenaOp> {
    prop_oneof![
        3 => Just(ArenaOp::Insert),
        1 => (0..32usize).prop_map(ArenaOp::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// The pose matrix and `transform_point` agree on every point.
    #[test]
    fn pose_matrix_matches_transform_point(pose in pose_strategy(), p in point_strategy()) {
        let m = pose.to_matrix().transform_point3(p);
        prop_assert!(m.abs_diff_eq(pose.transform_point(p), 1e-3));
    }

    /// `inverse` round-trips points.
    #[test]
    fn pose_inverse_round_trips(pose in pose_strategy(), p in point_strategy()) {
        let back = pose.inverse().transform_point(pose.transform_point(p));
        prop_assert!(back.abs_diff_eq(p, 1e-3));
    }

    /// The identity model leaves `projection × view` unchanged.
    #[test]
    fn identity_model_is_neutral(view in pose_strategy(), fov in 0.3f32..2.5, aspect in 0.3f32..3.0) {
        let projection = arpin_core::math::perspective(fov, aspect, 0.1, 100.0);
        let view = view.inverse().to_matrix();
        let mvp = model_view_projection(&projection, &view, &Mat4::IDENTITY);
        prop_assert!(mvp.abs_diff_eq(projection * view, 1e-4));
    }

    /// Plane packing emits three floats per complete `(x, z)` pair, and every
    /// packed vertex lies on the plane's surface.
    #[test]
    fn plane_packing_stays_on_plane(
        center in pose_strategy(),
        polygon in prop::collection::vec(finite(3.0), 0..40),
    ) {
        let plane = Plane {
            id: TrackableId(1),
            tracking_state: TrackingState::Tracking,
            center_pose: center,
            polygon: polygon.clone(),
        };
        let verts = plane.world_vertices();
        prop_assert_eq!(verts.len(), (polygon.len() / 2) * 3);
        let inv = center.inverse();
        for v in verts.chunks_exact(3) {
            let local = inv.transform_point(Vec3::new(v[0], v[1], v[2]));
            prop_assert!(local.y.abs() < 1e-3, "local y should be 0, got {}", local.y);
        }
    }

    /// Arena length always equals the number of ids that still resolve, and
    /// removed ids never resolve again.
    #[test]
    fn arena_len_matches_live_ids(ops in prop::collection::vec(arena_op_strategy(), 1..64)) {
        let mut arena = AnchorArena::new();
        let mut live: Vec<AnchorId> = Vec::new();
        let mut dead: Vec<AnchorId> = Vec::new();
        let anchor = Anchor { pose: Pose::IDENTITY, tracking_state: TrackingState::Tracking };

        for (n, op) in ops.iter().enumerate() {
            match op {
                ArenaOp::Insert => live.push(arena.insert(AnchorHandle(n as u64), anchor)),
                ArenaOp::Remove(i) => {
                    if !live.is_empty() {
                        let id = live.remove(i % live.len());
                        prop_assert!(arena.remove(id).is_some());
                        dead.push(id);
                    }
                }
            }
            prop_assert_eq!(arena.len(), live.len());
            prop_assert_eq!(arena.iter().count(), live.len());
        }
        for id in &live {
            prop_assert!(arena.contains(*id));
        }
        for id in &dead {
            prop_assert!(!arena.contains(*id));
        }
    }
}
