//! Rigid transforms (rotation + translation) reported by the AR runtime.
//!
//! A [`Pose`] maps points from an object's local frame into world space.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transform from a local frame into world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation in meters.
    pub translation: Vec3,
    /// Unit rotation.
    pub rotation: Quat,
}

impl Pose {
    /// The identity pose (origin, no rotation).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Build a pose from a translation and a rotation. The rotation is
    /// normalized; a degenerate one becomes the identity.
    pub fn new(translation: impl Into<Vec3>, rotation: Quat) -> Self {
        let len = rotation.length();
        let rotation = if len.is_finite() && len > f32::EPSILON {
            rotation / len
        } else {
            Quat::IDENTITY
        };
        Self {
            translation: translation.into(),
            rotation,
        }
    }

    /// A pure translation.
    pub fn from_translation(translation: impl Into<Vec3>) -> Self {
        Self {
            translation: translation.into(),
            rotation: Quat::IDENTITY,
        }
    }

    /// A rotation of `angle` radians about `axis`, then a translation. A
    /// zero axis means no rotation.
    pub fn from_axis_angle(translation: impl Into<Vec3>, axis: impl Into<Vec3>, angle: f32) -> Self {
        match axis.into().try_normalize() {
            Some(axis) => Self::new(translation, Quat::from_axis_angle(axis, angle)),
            None => Self::from_translation(translation),
        }
    }

    /// Rotate a direction vector (translation is not applied).
    pub fn rotate_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Map a local point into world space.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// The inverse transform (world -> local).
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            translation: self.transform_point(other.translation),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    /// The model matrix for this pose.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
