//! Trackables reported by the AR runtime: detected planes and everything
//! else.
//!
//! The set of trackable kinds this demo consumes is fixed, so trackables are
//! a closed sum type ([`Trackable`]) rather than something inspected at
//! runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::pose::Pose;

// ---------------------------------------------------------------------------
// TrackingState
// ---------------------------------------------------------------------------

/// Runtime-reported tracking confidence for a camera, plane, or anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingState {
    /// Currently tracked; poses are valid this frame.
    Tracking,
    /// Temporarily lost; may resume tracking later.
    #[default]
    Paused,
    /// Will never be tracked again.
    Stopped,
}

impl TrackingState {
    /// `true` only for [`TrackingState::Tracking`].
    #[inline]
    pub fn is_tracking(self) -> bool {
        self == Self::Tracking
    }
}

// ---------------------------------------------------------------------------
// TrackableId
// ---------------------------------------------------------------------------

/// Stable identifier the runtime assigns to a trackable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackableId(pub u64);

impl fmt::Debug for TrackableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackableId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Plane
// ---------------------------------------------------------------------------

/// A detected planar surface.
///
/// `polygon` is a flat list of `(x, z)` pairs in the plane's local frame,
/// where the plane's surface is the local `y = 0` plane and the center pose
/// maps local coordinates into world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Runtime identifier.
    pub id: TrackableId,
    /// Current tracking state.
    pub tracking_state: TrackingState,
    /// Local-to-world transform of the plane's center.
    pub center_pose: Pose,
    /// Boundary as flat `[x0, z0, x1, z1, ...]`.
    pub polygon: Vec<f32>,
}

impl Plane {
    /// Number of boundary vertices (trailing odd coordinates are ignored).
    pub fn vertex_count(&self) -> usize {
        self.polygon.len() / 2
    }

    /// Transform the local boundary into world space, producing a flat
    /// `[x, y, z, ...]` list with three floats per vertex.
    ///
    /// Each local `(x, z)` is lifted to the homogeneous point `(x, 0, z, 1)`
    /// and multiplied by the center pose matrix.
    pub fn world_vertices(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertex_count() * 3);
        for pair in self.polygon.chunks_exact(2) {
            let world = self.center_pose.transform_point(Vec3::new(pair[0], 0.0, pair[1]));
            out.extend_from_slice(&world.to_array());
        }
        out
    }

    /// Whether `pose` (projected onto the plane) lies inside the boundary.
    ///
    /// Uses the even-odd rule on the local `(x, z)` coordinates, so concave
    /// outlines are handled. Points exactly on an edge may land either side.
    pub fn is_pose_in_polygon(&self, pose: &Pose) -> bool {
        if self.vertex_count() < 3 {
            return false;
        }
        let local = self.center_pose.inverse().transform_point(pose.translation);
        point_in_polygon(local.x, local.z, &self.polygon)
    }
}

/// Even-odd point-in-polygon test over a flat `(x, z)` list.
pub fn point_in_polygon(px: f32, pz: f32, polygon: &[f32]) -> bool {
    let n = polygon.len() / 2;
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, zi) = (polygon[2 * i], polygon[2 * i + 1]);
        let (xj, zj) = (polygon[2 * j], polygon[2 * j + 1]);
        if (zi > pz) != (zj > pz) {
            let x_cross = (xj - xi) * (pz - zi) / (zj - zi) + xi;
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

// ---------------------------------------------------------------------------
// Trackable
// ---------------------------------------------------------------------------

/// Any other trackable kind (feature points, images, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherTrackable {
    /// Runtime identifier.
    pub id: TrackableId,
    /// Current tracking state.
    pub tracking_state: TrackingState,
    /// World pose.
    pub pose: Pose,
}

/// A trackable as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trackable {
    /// A detected plane.
    Plane(Plane),
    /// Anything that is not a plane.
    Other(OtherTrackable),
}

impl Trackable {
    /// The runtime identifier.
    pub fn id(&self) -> TrackableId {
        match self {
            Self::Plane(p) => p.id,
            Self::Other(o) => o.id,
        }
    }

    /// The current tracking state.
    pub fn tracking_state(&self) -> TrackingState {
        match self {
            Self::Plane(p) => p.tracking_state,
            Self::Other(o) => o.tracking_state,
        }
    }

    /// The plane, if this trackable is one.
    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            Self::Plane(p) => Some(p),
            Self::Other(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Hit
// ---------------------------------------------------------------------------

/// One result of a screen-space hit test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// World pose of the intersection.
    pub pose: Pose,
    /// Distance from the camera along the ray, in meters.
    pub distance: f32,
    /// The trackable that was hit.
    pub trackable: Trackable,
}

impl Hit {
    /// `true` if the hit landed on a plane and inside its boundary.
    pub fn is_inside_plane(&self) -> bool {
        self.trackable
            .as_plane()
            .is_some_and(|plane| plane.is_pose_in_polygon(&self.pose))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn square_plane(center: [f32; 3], half: f32) -> Plane {
        Plane {
            id: TrackableId(1),
            tracking_state: TrackingState::Tracking,
            center_pose: Pose::from_translation(center),
            polygon: vec![-half, -half, half, -half, half, half, -half, half],
        }
    }

    #[test]
    fn world_vertices_lift_local_xz_through_center_pose() {
        let plane = square_plane([1.0, -0.5, 2.0], 0.5);
        let verts = plane.world_vertices();
        assert_eq!(verts.len(), 12, "4 vertices x 3 components");
        assert_eq!(&verts[0..3], &[0.5, -0.5, 1.5]);
        assert_eq!(&verts[6..9], &[1.5, -0.5, 2.5]);
    }

    #[test]
    fn world_vertices_ignore_trailing_odd_coordinate() {
        let mut plane = square_plane([0.0; 3], 1.0);
        plane.polygon.push(9.0);
        assert_eq!(plane.world_vertices().len(), 12);
    }

    #[test]
    fn empty_polygon_yields_no_vertices() {
        let mut plane = square_plane([0.0; 3], 1.0);
        plane.polygon.clear();
        assert!(plane.world_vertices().is_empty());
        assert!(!plane.is_pose_in_polygon(&Pose::IDENTITY));
    }

    #[test]
    fn pose_inside_and_outside_square() {
        let plane = square_plane([0.0, 0.0, -1.0], 0.5);
        assert!(plane.is_pose_in_polygon(&Pose::from_translation([0.2, 0.0, -1.1])));
        assert!(!plane.is_pose_in_polygon(&Pose::from_translation([0.7, 0.0, -1.0])));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // An L-shape: the upper-right quadrant is missing.
        let polygon = vec![0.0, 0.0, 2.0, 0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.0, 2.0];
        assert!(point_in_polygon(0.5, 1.5, &polygon));
        assert!(!point_in_polygon(1.5, 1.5, &polygon));
    }

    #[test]
    fn hit_on_other_trackable_is_never_inside_plane() {
        let hit = Hit {
            pose: Pose::IDENTITY,
            distance: 1.0,
            trackable: Trackable::Other(OtherTrackable {
                id: TrackableId(7),
                tracking_state: TrackingState::Tracking,
                pose: Pose::IDENTITY,
            }),
        };
        assert!(!hit.is_inside_plane());
    }

    #[test]
    fn tracking_state_default_is_paused() {
        assert_eq!(TrackingState::default(), TrackingState::Paused);
        assert!(TrackingState::Tracking.is_tracking());
        assert!(!TrackingState::Stopped.is_tracking());
    }
}
