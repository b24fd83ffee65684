use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::animate::Animator;

/// Lets players drag a mesh around the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoveBehavior {
    /// Distance under which a dropped mesh snaps onto a target.
    pub snap_distance: f32,
    /// Height a mesh is lifted to while being dragged.
    pub elevation: f32,
    #[serde(skip)]
    pub(crate) animator: Animator,
}

impl Default for MoveBehavior {
    fn default() -> Self {
        Self {
            snap_distance: 0.25,
            elevation: 0.5,
            animator: Animator::default(),
        }
    }
}

/// Turns a mesh face down or face up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlipBehavior {
    pub is_flipped: bool,
    #[serde(skip)]
    pub(crate) animator: Animator,
}

impl FlipBehavior {
    /// Toggles the flip state and returns the rotation the mesh ends at.
    pub fn flip(&mut self, rotation: Vec3) -> Vec3 {
        self.is_flipped = !self.is_flipped;
        self.resting_rotation(rotation)
    }

    /// Rotation matching the current flip state.
    pub fn resting_rotation(&self, rotation: Vec3) -> Vec3 {
        let z = if self.is_flipped { PI } else { 0.0 };
        Vec3::new(rotation.x, rotation.y, z)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }
}

/// Rotates a mesh by quarter turns around the vertical axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotateBehavior {
    /// Current angle in radians, always within `[0, 2π)`.
    pub angle: f32,
    #[serde(skip)]
    pub(crate) animator: Animator,
}

impl RotateBehavior {
    /// Advances by a quarter turn and returns the rotation the mesh ends at.
    ///
    /// The returned Y angle is not wrapped so the animation always turns the
    /// same way; `angle` itself is kept normalized.
    pub fn rotate(&mut self, rotation: Vec3) -> Vec3 {
        let target = self.angle + FRAC_PI_2;
        self.angle = target.rem_euclid(TAU);
        Vec3::new(rotation.x, target, rotation.z)
    }

    pub fn resting_rotation(&self, rotation: Vec3) -> Vec3 {
        Vec3::new(rotation.x, self.angle, rotation.z)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_toggles_between_faces() {
        let mut flip = FlipBehavior::default();
        let rotation = flip.flip(Vec3::ZERO);
        assert!(flip.is_flipped);
        assert_eq!(rotation.z, PI);
        let rotation = flip.flip(rotation);
        assert!(!flip.is_flipped);
        assert_eq!(rotation.z, 0.0);
    }

    #[test]
    fn rotate_wraps_angle() {
        let mut rotate = RotateBehavior::default();
        for _ in 0..4 {
            rotate.rotate(Vec3::ZERO);
        }
        assert!(rotate.angle.abs() < 1e-5 || (rotate.angle - TAU).abs() < 1e-5);
    }

    #[test]
    fn movable_defaults_survive_partial_documents() {
        let behavior: MoveBehavior = serde_json::from_str(r#"{"elevation": 1.5}"#).unwrap();
        assert_eq!(behavior.elevation, 1.5);
        assert_eq!(behavior.snap_distance, 0.25);
    }
}
