//! Interactive capabilities attached to tabletop meshes.
//!
//! Every capability is a variant of [`Behavior`]. A mesh receives its
//! behaviors once, at construction, through a [`BehaviorSet`]; afterwards only
//! the state carried by each behavior changes.

pub mod animate;
pub mod faces;
pub mod motion;
pub mod stacking;

use std::fmt;
use std::time::Duration;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::mesh::{Mesh, MeshError};

pub use animate::{AnimationFrame, Animator, OnceSignal};
pub use faces::{Detail, DetailBehavior, RandomizeBehavior};
pub use motion::{FlipBehavior, MoveBehavior, RotateBehavior};
pub use stacking::{
    footprint_contains, Anchor, AnchorBehavior, DropZone, StackBehavior, TargetBehavior,
};

/// Known behavior kinds, named as they appear in game documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    Movable,
    Flippable,
    Rotatable,
    Stackable,
    Anchorable,
    Targetable,
    Randomizable,
    Detailable,
}

impl BehaviorKind {
    pub const ALL: [BehaviorKind; 8] = [
        BehaviorKind::Movable,
        BehaviorKind::Flippable,
        BehaviorKind::Rotatable,
        BehaviorKind::Stackable,
        BehaviorKind::Anchorable,
        BehaviorKind::Targetable,
        BehaviorKind::Randomizable,
        BehaviorKind::Detailable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BehaviorKind::Movable => "movable",
            BehaviorKind::Flippable => "flippable",
            BehaviorKind::Rotatable => "rotatable",
            BehaviorKind::Stackable => "stackable",
            BehaviorKind::Anchorable => "anchorable",
            BehaviorKind::Targetable => "targetable",
            BehaviorKind::Randomizable => "randomizable",
            BehaviorKind::Detailable => "detailable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A capability attached to a mesh, with its state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Behavior {
    #[serde(rename = "movable")]
    Move(MoveBehavior),
    #[serde(rename = "flippable")]
    Flip(FlipBehavior),
    #[serde(rename = "rotatable")]
    Rotate(RotateBehavior),
    #[serde(rename = "stackable")]
    Stack(StackBehavior),
    #[serde(rename = "anchorable")]
    Anchor(AnchorBehavior),
    #[serde(rename = "targetable")]
    Target(TargetBehavior),
    #[serde(rename = "randomizable")]
    Randomize(RandomizeBehavior),
    #[serde(rename = "detailable")]
    Detail(DetailBehavior),
}

impl Behavior {
    /// Behavior of the given kind with default state.
    pub fn default_for(kind: BehaviorKind) -> Self {
        match kind {
            BehaviorKind::Movable => Behavior::Move(MoveBehavior::default()),
            BehaviorKind::Flippable => Behavior::Flip(FlipBehavior::default()),
            BehaviorKind::Rotatable => Behavior::Rotate(RotateBehavior::default()),
            BehaviorKind::Stackable => Behavior::Stack(StackBehavior::default()),
            BehaviorKind::Anchorable => Behavior::Anchor(AnchorBehavior::default()),
            BehaviorKind::Targetable => Behavior::Target(TargetBehavior::default()),
            BehaviorKind::Randomizable => Behavior::Randomize(RandomizeBehavior::default()),
            BehaviorKind::Detailable => Behavior::Detail(DetailBehavior::default()),
        }
    }

    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Move(_) => BehaviorKind::Movable,
            Behavior::Flip(_) => BehaviorKind::Flippable,
            Behavior::Rotate(_) => BehaviorKind::Rotatable,
            Behavior::Stack(_) => BehaviorKind::Stackable,
            Behavior::Anchor(_) => BehaviorKind::Anchorable,
            Behavior::Target(_) => BehaviorKind::Targetable,
            Behavior::Randomize(_) => BehaviorKind::Randomizable,
            Behavior::Detail(_) => BehaviorKind::Detailable,
        }
    }

    /// Animator of the behaviors that move or turn their mesh.
    pub fn animator(&self) -> Option<&Animator> {
        match self {
            Behavior::Move(behavior) => Some(&behavior.animator),
            Behavior::Flip(behavior) => Some(&behavior.animator),
            Behavior::Rotate(behavior) => Some(&behavior.animator),
            Behavior::Stack(_)
            | Behavior::Anchor(_)
            | Behavior::Target(_)
            | Behavior::Randomize(_)
            | Behavior::Detail(_) => None,
        }
    }

    pub fn animator_mut(&mut self) -> Option<&mut Animator> {
        match self {
            Behavior::Move(behavior) => Some(&mut behavior.animator),
            Behavior::Flip(behavior) => Some(&mut behavior.animator),
            Behavior::Rotate(behavior) => Some(&mut behavior.animator),
            Behavior::Stack(_)
            | Behavior::Anchor(_)
            | Behavior::Target(_)
            | Behavior::Randomize(_)
            | Behavior::Detail(_) => None,
        }
    }
}

/// Behaviors of one mesh, at most one per kind.
#[derive(Debug, Clone, Default)]
pub struct BehaviorSet {
    behaviors: Vec<Behavior>,
}

impl BehaviorSet {
    /// Fails when two behaviors share a kind.
    pub fn new(behaviors: Vec<Behavior>) -> Result<Self, MeshError> {
        let mut seen = Vec::with_capacity(behaviors.len());
        for behavior in &behaviors {
            let kind = behavior.kind();
            if seen.contains(&kind) {
                return Err(MeshError::DuplicateBehavior(kind));
            }
            seen.push(kind);
        }
        Ok(Self { behaviors })
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Whether a behavior of `kind` is attached.
    pub fn contains(&self, kind: BehaviorKind) -> bool {
        self.get(kind).is_some()
    }

    /// Behavior of `kind`, if attached.
    pub fn get(&self, kind: BehaviorKind) -> Option<&Behavior> {
        self.behaviors.iter().find(|behavior| behavior.kind() == kind)
    }

    pub fn get_mut(&mut self, kind: BehaviorKind) -> Option<&mut Behavior> {
        self.behaviors
            .iter_mut()
            .find(|behavior| behavior.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Behavior> {
        self.behaviors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Behavior> {
        self.behaviors.iter_mut()
    }

    /// Attached kinds, in attachment order.
    pub fn kinds(&self) -> impl Iterator<Item = BehaviorKind> + '_ {
        self.behaviors.iter().map(Behavior::kind)
    }

    /// Move behavior when attached, flip behavior otherwise.
    pub fn moveable(&self) -> Option<&Behavior> {
        self.get(BehaviorKind::Movable)
            .or_else(|| self.get(BehaviorKind::Flippable))
    }

    /// Mutable form of [`BehaviorSet::moveable`].
    pub fn moveable_mut(&mut self) -> Option<&mut Behavior> {
        let kind = self.moveable()?.kind();
        self.get_mut(kind)
    }

    /// Stack behavior when attached, target behavior otherwise.
    pub fn targetable(&self) -> Option<&Behavior> {
        self.get(BehaviorKind::Stackable)
            .or_else(|| self.get(BehaviorKind::Targetable))
    }

    /// Pile membership, when the mesh is stackable.
    pub fn stack(&self) -> Option<&StackBehavior> {
        match self.get(BehaviorKind::Stackable) {
            Some(Behavior::Stack(stack)) => Some(stack),
            _ => None,
        }
    }

    pub fn stack_mut(&mut self) -> Option<&mut StackBehavior> {
        match self.get_mut(BehaviorKind::Stackable) {
            Some(Behavior::Stack(stack)) => Some(stack),
            _ => None,
        }
    }

    /// Anchors offered by the mesh, when it has any.
    pub fn anchors(&self) -> Option<&AnchorBehavior> {
        match self.get(BehaviorKind::Anchorable) {
            Some(Behavior::Anchor(anchors)) => Some(anchors),
            _ => None,
        }
    }

    pub fn anchors_mut(&mut self) -> Option<&mut AnchorBehavior> {
        match self.get_mut(BehaviorKind::Anchorable) {
            Some(Behavior::Anchor(anchors)) => Some(anchors),
            _ => None,
        }
    }

    /// Face-up/face-down state, when the mesh can be flipped.
    pub fn flip(&self) -> Option<&FlipBehavior> {
        match self.get(BehaviorKind::Flippable) {
            Some(Behavior::Flip(flip)) => Some(flip),
            _ => None,
        }
    }

    pub fn flip_mut(&mut self) -> Option<&mut FlipBehavior> {
        match self.get_mut(BehaviorKind::Flippable) {
            Some(Behavior::Flip(flip)) => Some(flip),
            _ => None,
        }
    }

    /// Quarter-turn state, when the mesh can be rotated.
    pub fn rotate(&self) -> Option<&RotateBehavior> {
        match self.get(BehaviorKind::Rotatable) {
            Some(Behavior::Rotate(rotate)) => Some(rotate),
            _ => None,
        }
    }

    pub fn rotate_mut(&mut self) -> Option<&mut RotateBehavior> {
        match self.get_mut(BehaviorKind::Rotatable) {
            Some(Behavior::Rotate(rotate)) => Some(rotate),
            _ => None,
        }
    }

    /// Face state of a die-like mesh.
    pub fn randomize_mut(&mut self) -> Option<&mut RandomizeBehavior> {
        match self.get_mut(BehaviorKind::Randomizable) {
            Some(Behavior::Randomize(randomize)) => Some(randomize),
            _ => None,
        }
    }

    /// Images shown on inspection, when the mesh has any.
    pub fn detail(&self) -> Option<&DetailBehavior> {
        match self.get(BehaviorKind::Detailable) {
            Some(Behavior::Detail(detail)) => Some(detail),
            _ => None,
        }
    }

    /// Drop zones, when the mesh accepts dropped meshes.
    pub fn target(&self) -> Option<&TargetBehavior> {
        match self.get(BehaviorKind::Targetable) {
            Some(Behavior::Target(target)) => Some(target),
            _ => None,
        }
    }

    pub(crate) fn into_vec(self) -> Vec<Behavior> {
        self.behaviors
    }
}

/// Behavior able to move `mesh`, if any.
pub fn get_moveable_behavior(mesh: &Mesh) -> Option<&Behavior> {
    mesh.behaviors().moveable()
}

/// Behavior able to receive meshes dropped on `mesh`, if any.
pub fn get_targetable_behavior(mesh: &Mesh) -> Option<&Behavior> {
    mesh.behaviors().targetable()
}

/// Moves `mesh` to `target`, animated by its moveable behavior.
///
/// The move happens synchronously (and `on_end` runs before returning) while
/// the scene is loading, when the mesh cannot move by itself, or when
/// `duration` is zero. Otherwise `on_end` runs once, on the frame the motion
/// completes.
pub fn animate_move(
    mesh: &mut Mesh,
    scene_loading: bool,
    target: Vec3,
    duration: Duration,
    on_end: impl FnOnce() + 'static,
) {
    if !scene_loading && !duration.is_zero() {
        let from = mesh.position;
        if let Some(animator) = mesh
            .behaviors_mut()
            .moveable_mut()
            .and_then(Behavior::animator_mut)
        {
            animator.move_to(from, target, duration).subscribe(on_end);
            return;
        }
    }
    mesh.set_position(target);
    on_end();
}

/// Turns `mesh` to `target`, animated by the behavior of `kind`.
///
/// Falls back to an immediate rotation like [`animate_move`] does.
pub fn animate_rotation(
    mesh: &mut Mesh,
    kind: BehaviorKind,
    scene_loading: bool,
    target: Vec3,
    duration: Duration,
    on_end: impl FnOnce() + 'static,
) {
    if !scene_loading && !duration.is_zero() {
        let from = mesh.rotation;
        if let Some(animator) = mesh
            .behaviors_mut()
            .get_mut(kind)
            .and_then(Behavior::animator_mut)
        {
            animator.rotate_to(from, target, duration).subscribe(on_end);
            return;
        }
        debug!("{} has no animated {kind} behavior", mesh.id());
    }
    mesh.rotation = target;
    on_end();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshKind;
    use std::cell::Cell;
    use std::rc::Rc;

    fn mesh_with(kinds: &[BehaviorKind]) -> Mesh {
        let behaviors = kinds.iter().copied().map(Behavior::default_for).collect();
        Mesh::new("card-1", MeshKind::Card, behaviors).unwrap()
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn move_wins_over_flip() {
        let mesh = mesh_with(&[BehaviorKind::Flippable, BehaviorKind::Movable]);
        assert!(matches!(get_moveable_behavior(&mesh), Some(Behavior::Move(_))));
    }

    #[test]
    fn flip_is_the_moveable_fallback() {
        let mesh = mesh_with(&[BehaviorKind::Flippable, BehaviorKind::Stackable]);
        assert!(matches!(get_moveable_behavior(&mesh), Some(Behavior::Flip(_))));
    }

    #[test]
    fn no_moveable_behavior() {
        let mesh = mesh_with(&[BehaviorKind::Stackable, BehaviorKind::Detailable]);
        assert!(get_moveable_behavior(&mesh).is_none());
    }

    #[test]
    fn stack_wins_over_target() {
        let mesh = mesh_with(&[BehaviorKind::Targetable, BehaviorKind::Stackable]);
        assert!(matches!(get_targetable_behavior(&mesh), Some(Behavior::Stack(_))));
        let mesh = mesh_with(&[BehaviorKind::Targetable]);
        assert!(matches!(get_targetable_behavior(&mesh), Some(Behavior::Target(_))));
        let mesh = mesh_with(&[BehaviorKind::Movable]);
        assert!(get_targetable_behavior(&mesh).is_none());
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let result = BehaviorSet::new(vec![
            Behavior::default_for(BehaviorKind::Movable),
            Behavior::default_for(BehaviorKind::Movable),
        ]);
        assert!(matches!(
            result,
            Err(MeshError::DuplicateBehavior(BehaviorKind::Movable))
        ));
    }

    #[test]
    fn zero_duration_moves_synchronously() {
        let mut mesh = mesh_with(&[BehaviorKind::Movable]);
        let (count, on_end) = counter();
        let target = Vec3::new(1.0, 0.0, 2.0);
        animate_move(&mut mesh, false, target, Duration::ZERO, on_end);
        assert_eq!(mesh.position, target);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn loading_scene_moves_synchronously() {
        let mut mesh = mesh_with(&[BehaviorKind::Movable]);
        let (count, on_end) = counter();
        let target = Vec3::new(-3.0, 0.0, 0.0);
        animate_move(&mut mesh, true, target, Duration::from_secs(2), on_end);
        assert_eq!(mesh.position, target);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn mesh_without_moveable_behavior_moves_synchronously() {
        let mut mesh = mesh_with(&[BehaviorKind::Stackable]);
        let (count, on_end) = counter();
        animate_move(&mut mesh, false, Vec3::Z, Duration::from_millis(300), on_end);
        assert_eq!(mesh.position, Vec3::Z);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn animated_move_ends_on_a_later_frame() {
        let mut mesh = mesh_with(&[BehaviorKind::Movable]);
        let (count, on_end) = counter();
        let target = Vec3::new(4.0, 0.0, 0.0);
        animate_move(&mut mesh, false, target, Duration::from_millis(100), on_end);
        assert_eq!(mesh.position, Vec3::ZERO);
        assert_eq!(count.get(), 0);

        assert!(mesh.advance(Duration::from_millis(40)));
        assert_eq!(count.get(), 0);
        assert!(!mesh.advance(Duration::from_millis(80)));
        assert_eq!(mesh.position, target);
        assert_eq!(count.get(), 1);
        assert!(!mesh.advance(Duration::from_millis(16)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn rotation_uses_requested_behavior() {
        let mut mesh = mesh_with(&[BehaviorKind::Rotatable]);
        let (count, on_end) = counter();
        let target = Vec3::new(0.0, 1.0, 0.0);
        animate_rotation(
            &mut mesh,
            BehaviorKind::Rotatable,
            false,
            target,
            Duration::from_millis(50),
            on_end,
        );
        mesh.advance(Duration::from_millis(60));
        assert_eq!(mesh.rotation, target);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn flip_fallback_moves_and_turns_at_once() {
        let mut mesh = mesh_with(&[BehaviorKind::Flippable]);
        let (moved, on_move) = counter();
        let target = Vec3::new(4.0, 0.0, 0.0);
        animate_move(&mut mesh, false, target, Duration::from_millis(100), on_move);
        mesh.advance(Duration::from_millis(20));
        animate_rotation(
            &mut mesh,
            BehaviorKind::Flippable,
            false,
            Vec3::new(0.0, 0.0, std::f32::consts::PI),
            Duration::from_millis(100),
            || {},
        );
        assert_eq!(moved.get(), 0);
        while mesh.advance(Duration::from_millis(16)) {}
        assert_eq!(mesh.position, target);
        assert_eq!(mesh.rotation.z, std::f32::consts::PI);
        assert_eq!(moved.get(), 1);
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in BehaviorKind::ALL {
            assert_eq!(BehaviorKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BehaviorKind::from_name("teleportable"), None);
    }
}
