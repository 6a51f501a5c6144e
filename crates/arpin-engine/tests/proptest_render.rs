//! Property tests for the overlay passes: draw counts follow tracking state
//! and polygon size for any mix of planes and anchors.

use arpin_core::math::perspective;
use arpin_core::prelude::*;
use arpin_engine::render::{MarkerRenderer, PlaneRenderer};
use arpin_gfx::prelude::*;
use arpin_gfx::recording::RecordingContext;
use proptest::prelude::*;

fn state_strategy() -> impl Strategy<Value = TrackingState> {
    prop_oneof![
        2 => Just(TrackingState::Tracking),
        1 => Just(TrackingState::Paused),
        1 => Just(TrackingState::Stopped),
    ]
}

fn plane_strategy() -> impl Strategy<Value = Plane> {
    (state_strategy(), 0..8usize, -5.0f32..5.0).prop_map(|(state, vertices, z)| Plane {
        id: TrackableId(0),
        tracking_state: state,
        center_pose: Pose::from_translation([0.0, 0.0, z]),
        polygon: (0..vertices)
            .flat_map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / vertices.max(1) as f32;
                [angle.cos(), angle.sin()]
            })
            .collect(),
    })
}

fn anchor_strategy() -> impl Strategy<Value = Anchor> {
    (state_strategy(), -5.0f32..5.0).prop_map(|(state, x)| Anchor {
        pose: Pose::from_translation([x, 0.0, -2.0]),
        tracking_state: state,
    })
}

proptest! {
    #[test]
    fn one_fan_per_visible_plane(planes in prop::collection::vec(plane_strategy(), 0..12)) {
        let mut gl = RecordingContext::new();
        let mut renderer = PlaneRenderer::new([0.0, 1.0, 0.0, 0.3]);
        renderer.initialize(&mut gl).unwrap();
        let projection = perspective(1.0, 0.75, 0.1, 100.0);

        let drawn = renderer.render(&mut gl, &planes, &Mat4::IDENTITY, &projection);

        let visible: Vec<&Plane> = planes
            .iter()
            .filter(|p| p.tracking_state.is_tracking() && p.vertex_count() > 0)
            .collect();
        prop_assert_eq!(drawn, visible.len());
        prop_assert_eq!(gl.draws().len(), visible.len());
        for (draw, plane) in gl.draws().iter().zip(&visible) {
            prop_assert_eq!(draw.primitive, Primitive::TriangleFan);
            prop_assert_eq!(draw.count as usize, plane.vertex_count());
        }
        prop_assert!(!gl.is_enabled(Capability::Blend));
    }

    #[test]
    fn four_loops_per_tracking_anchor(anchors in prop::collection::vec(anchor_strategy(), 0..12)) {
        let mut gl = RecordingContext::new();
        let mut renderer = MarkerRenderer::new([1.0, 0.0, 0.0, 1.0], 0.1);
        renderer.initialize(&mut gl).unwrap();
        let projection = perspective(1.0, 0.75, 0.1, 100.0);

        let drawn = renderer.render(&mut gl, &anchors, &Mat4::IDENTITY, &projection);

        let tracking = anchors.iter().filter(|a| a.tracking_state.is_tracking()).count();
        prop_assert_eq!(drawn, tracking);
        prop_assert_eq!(gl.draws_of(Primitive::LineLoop).len(), tracking * 4);
    }
}
