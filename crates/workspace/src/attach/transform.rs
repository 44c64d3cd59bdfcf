//! Rigid transforms and edge-to-edge alignment

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::state::polygon::Edge;

/// Rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DQuat::IDENTITY,
            translation,
        }
    }

    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }

    pub fn apply_vector(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// `self` first, then `next`
    pub fn then(&self, next: &RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: (next.rotation * self.rotation).normalize(),
            translation: next.rotation * self.translation + next.translation,
        }
    }
}

/// Transform that lays `moving` onto `target`.
///
/// The moving edge is placed midpoint-to-midpoint on the target with its
/// direction reversed, its face normal matched to the target's and its
/// in-plane outward normal pointing back across the edge, so the two polygons
/// sit side by side. The result is then rotated by `fold_angle` about the
/// shared edge (right-hand rule around the target edge direction).
pub fn compute_transform(moving: &Edge, target: &Edge, fold_angle: f64) -> RigidTransform {
    let moving_frame = DMat3::from_cols(moving.direction(), moving.normal, moving.face_normal);
    let target_frame = DMat3::from_cols(-target.direction(), -target.normal, target.face_normal);
    let align = DQuat::from_mat3(&(target_frame * moving_frame.transpose())).normalize();

    let axis = target.direction();
    let fold = if axis.length_squared() > 0.0 {
        DQuat::from_axis_angle(axis, fold_angle)
    } else {
        DQuat::IDENTITY
    };

    let laid = target.midpoint - align * moving.midpoint;
    RigidTransform {
        rotation: (fold * align).normalize(),
        translation: fold * (laid - target.midpoint) + target.midpoint,
    }
}
