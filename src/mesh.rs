use std::fmt;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::behaviors::{Animator, Behavior, BehaviorKind, BehaviorSet, StackBehavior};

/// Shape family of a tabletop object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshKind {
    #[default]
    Card,
    Die,
    Token,
    Pawn,
    Piece,
    Board,
}

impl MeshKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "card" => MeshKind::Card,
            "die" => MeshKind::Die,
            "token" => MeshKind::Token,
            "pawn" => MeshKind::Pawn,
            "piece" => MeshKind::Piece,
            "board" => MeshKind::Board,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            MeshKind::Card => "card",
            MeshKind::Die => "die",
            MeshKind::Token => "token",
            MeshKind::Pawn => "pawn",
            MeshKind::Piece => "piece",
            MeshKind::Board => "board",
        }
    }

    /// Width, height and depth used when a document does not give any.
    pub fn default_dimensions(self) -> Vec3 {
        match self {
            MeshKind::Card => Vec3::new(3.0, 0.01, 4.25),
            MeshKind::Die => Vec3::splat(1.0),
            MeshKind::Token => Vec3::new(1.0, 0.1, 1.0),
            MeshKind::Pawn => Vec3::new(0.9, 0.3, 0.9),
            MeshKind::Piece => Vec3::new(0.8, 1.5, 0.8),
            MeshKind::Board => Vec3::new(10.0, 0.1, 10.0),
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("{0} behavior attached twice")]
    DuplicateBehavior(BehaviorKind),
    #[error("a mesh with id {0} is already in the scene")]
    DuplicateId(String),
}

/// Renderable tabletop object with its behaviors.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: String,
    pub kind: MeshKind,
    pub texture: Option<String>,
    pub position: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub dimensions: Vec3,
    behaviors: BehaviorSet,
}

impl Mesh {
    pub fn new(
        id: impl Into<String>,
        kind: MeshKind,
        behaviors: Vec<Behavior>,
    ) -> Result<Self, MeshError> {
        Ok(Self {
            id: id.into(),
            kind,
            texture: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            dimensions: kind.default_dimensions(),
            behaviors: BehaviorSet::new(behaviors)?,
        })
    }

    /// Builds a mesh from its document.
    ///
    /// The rotation follows the flip and rotate state carried by the
    /// behaviors, so a mesh stored face down comes back face down.
    pub fn from_spec(spec: MeshSpec) -> Result<Self, MeshError> {
        let dimensions = spec
            .dimensions
            .unwrap_or_else(|| spec.kind.default_dimensions());
        let behaviors = BehaviorSet::new(spec.behaviors)?;
        let mut rotation = spec.rotation;
        if let Some(flip) = behaviors.flip() {
            rotation = flip.resting_rotation(rotation);
        }
        if let Some(rotate) = behaviors.rotate() {
            rotation = rotate.resting_rotation(rotation);
        }
        Ok(Self {
            id: spec.id,
            kind: spec.kind,
            texture: spec.texture,
            position: spec.position,
            rotation,
            dimensions,
            behaviors,
        })
    }

    pub fn to_spec(&self) -> MeshSpec {
        MeshSpec {
            id: self.id.clone(),
            kind: self.kind,
            texture: self.texture.clone(),
            position: self.position,
            rotation: self.rotation,
            dimensions: Some(self.dimensions),
            behaviors: self.behaviors.clone().into_vec(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn height(&self) -> f32 {
        self.dimensions.y
    }

    pub fn behaviors(&self) -> &BehaviorSet {
        &self.behaviors
    }

    /// Mutable access to behavior state; the set itself cannot grow or shrink.
    pub fn behaviors_mut(&mut self) -> &mut BehaviorSet {
        &mut self.behaviors
    }

    pub fn has_behavior(&self, kind: BehaviorKind) -> bool {
        self.behaviors.contains(kind)
    }

    pub fn is_animating(&self) -> bool {
        self.behaviors
            .iter()
            .filter_map(Behavior::animator)
            .any(Animator::is_animating)
    }

    /// Where the mesh stands once its running move, if any, completes.
    pub fn resting_position(&self) -> Vec3 {
        self.behaviors
            .iter()
            .filter_map(Behavior::animator)
            .find_map(Animator::target_position)
            .unwrap_or(self.position)
    }

    /// Rotation the mesh has once its running rotation, if any, completes.
    pub fn resting_rotation(&self) -> Vec3 {
        self.behaviors
            .iter()
            .filter_map(Behavior::animator)
            .find_map(Animator::target_rotation)
            .unwrap_or(self.rotation)
    }

    /// Steps every running animation and reports whether one is still going.
    ///
    /// Ended signals fire after the mesh reached its final transform.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let mut animating = false;
        let mut ended = Vec::new();
        for behavior in self.behaviors.iter_mut() {
            let Some(animator) = behavior.animator_mut() else {
                continue;
            };
            let Some(frame) = animator.advance(elapsed) else {
                continue;
            };
            if let Some(position) = frame.position {
                self.position = position;
            }
            if let Some(rotation) = frame.rotation {
                self.rotation = rotation;
            }
            ended.extend(frame.ended);
            animating |= animator.is_animating();
        }
        for mut signal in ended {
            signal.fire();
        }
        animating
    }
}

/// Document form of a mesh, as stored in game states.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshSpec {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "shape", default)]
    pub kind: MeshKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec3>,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
}

impl MeshSpec {
    pub fn new(id: impl Into<String>, kind: MeshKind) -> Self {
        Self {
            id: id.into(),
            kind,
            texture: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            dimensions: None,
            behaviors: Vec::new(),
        }
    }

    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_default_behaviors(mut self, kinds: &[BehaviorKind]) -> Self {
        self.behaviors
            .extend(kinds.iter().copied().map(Behavior::default_for));
        self
    }

    pub fn stack_mut(&mut self) -> Option<&mut StackBehavior> {
        self.behaviors.iter_mut().find_map(|behavior| match behavior {
            Behavior::Stack(stack) => Some(stack),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_document_fills_defaults() {
        let spec: MeshSpec = serde_json::from_str(
            r#"{
                "id": "die-1",
                "shape": "die",
                "position": [1.0, 0.5, -2.0],
                "behaviors": [
                    {"kind": "movable"},
                    {"kind": "randomizable", "max": 8}
                ]
            }"#,
        )
        .unwrap();
        let mesh = Mesh::from_spec(spec).unwrap();
        assert_eq!(mesh.id(), "die-1");
        assert_eq!(mesh.kind, MeshKind::Die);
        assert_eq!(mesh.position, Vec3::new(1.0, 0.5, -2.0));
        assert_eq!(mesh.dimensions, Vec3::ONE);
        assert!(mesh.has_behavior(BehaviorKind::Movable));
        assert!(mesh.has_behavior(BehaviorKind::Randomizable));
        assert!(!mesh.has_behavior(BehaviorKind::Flippable));
    }

    #[test]
    fn snapshot_keeps_behavior_state() {
        let mut mesh = Mesh::new(
            "card-1",
            MeshKind::Card,
            vec![Behavior::default_for(BehaviorKind::Flippable)],
        )
        .unwrap();
        mesh.behaviors_mut().flip_mut().unwrap().is_flipped = true;
        let spec = mesh.to_spec();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""kind":"flippable""#));
        assert!(json.contains(r#""isFlipped":true"#));
        let restored = Mesh::from_spec(serde_json::from_str(&json).unwrap()).unwrap();
        assert!(restored.behaviors().flip().unwrap().is_flipped);
    }

    #[test]
    fn unknown_shapes_are_not_kinds() {
        assert_eq!(MeshKind::from_name("pawn"), Some(MeshKind::Pawn));
        assert_eq!(MeshKind::from_name("teapot"), None);
    }

    #[test]
    fn stored_flip_and_rotation_set_the_rotation() {
        let spec: MeshSpec = serde_json::from_str(
            r#"{
                "id": "card-1",
                "rotation": [0.25, 0.0, 0.0],
                "behaviors": [
                    {"kind": "flippable", "isFlipped": true},
                    {"kind": "rotatable", "angle": 1.5}
                ]
            }"#,
        )
        .unwrap();
        let mesh = Mesh::from_spec(spec).unwrap();
        assert_eq!(mesh.rotation, Vec3::new(0.25, 1.5, std::f32::consts::PI));

        let plain = Mesh::from_spec(MeshSpec::new("card-2", MeshKind::Card)).unwrap();
        assert_eq!(plain.rotation, Vec3::ZERO);
    }

    #[test]
    fn resting_transform_follows_running_motions() {
        let mut mesh = Mesh::new(
            "card-1",
            MeshKind::Card,
            vec![Behavior::default_for(BehaviorKind::Movable)],
        )
        .unwrap();
        assert_eq!(mesh.resting_position(), Vec3::ZERO);
        if let Some(animator) = mesh
            .behaviors_mut()
            .get_mut(BehaviorKind::Movable)
            .and_then(Behavior::animator_mut)
        {
            animator.move_to(Vec3::ZERO, Vec3::X * 2.0, Duration::from_millis(100));
        }
        mesh.advance(Duration::from_millis(30));
        assert!(mesh.position.x > 0.0 && mesh.position.x < 2.0);
        assert_eq!(mesh.resting_position(), Vec3::X * 2.0);
        assert_eq!(mesh.resting_rotation(), Vec3::ZERO);
        mesh.advance(Duration::from_millis(100));
        assert_eq!(mesh.resting_position(), mesh.position);
    }
}
