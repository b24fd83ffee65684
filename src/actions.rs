//! Operations spanning several meshes: piles, anchors and drops.
//!
//! Every local operation returns the [`MeshAction`] describing it so the
//! engine can forward it to peers, and [`apply_action`] replays an action
//! received from a peer.

use std::collections::HashSet;
use std::time::Duration;

use glam::Vec3;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::behaviors::{
    self, footprint_contains, BehaviorKind, Detail, StackBehavior,
};
use crate::config::EngineConfig;
use crate::mesh::Mesh;
use crate::scene::Scene;

/// Mesh mutation, as exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MeshAction {
    Move { id: String, position: Vec3 },
    Flip { id: String },
    Rotate { id: String },
    Push { base_id: String, id: String },
    Pop { base_id: String, count: usize },
    Shuffle { base_id: String, order: Vec<String> },
    Snap { owner_id: String, anchor_id: String, id: String },
    Unsnap { id: String },
    Randomize { id: String, face: u8 },
}

impl MeshAction {
    /// Id of the mesh the action is about.
    pub fn mesh_id(&self) -> &str {
        match self {
            MeshAction::Move { id, .. }
            | MeshAction::Flip { id }
            | MeshAction::Rotate { id }
            | MeshAction::Push { id, .. }
            | MeshAction::Snap { id, .. }
            | MeshAction::Unsnap { id }
            | MeshAction::Randomize { id, .. } => id,
            MeshAction::Pop { base_id, .. } | MeshAction::Shuffle { base_id, .. } => base_id,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("no mesh with id {0}")]
    UnknownMesh(String),
    #[error("{id} is not {kind}")]
    MissingBehavior { id: String, kind: BehaviorKind },
    #[error("{id} already belongs to the pile of {base_id}")]
    SamePile { base_id: String, id: String },
    #[error("{owner_id} has no anchor {anchor_id}")]
    UnknownAnchor { owner_id: String, anchor_id: String },
    #[error("anchor {anchor_id} of {owner_id} already holds {snapped_id}")]
    AnchorOccupied {
        owner_id: String,
        anchor_id: String,
        snapped_id: String,
    },
    #[error("{id} cannot be snapped onto itself")]
    SelfSnap { id: String },
    #[error("{id} has no face {face}")]
    InvalidFace { id: String, face: u8 },
    #[error("order does not match the pile of {base_id}")]
    InvalidOrder { base_id: String },
}

pub type ActionResult<T> = Result<T, ActionError>;

fn mesh<'a>(scene: &'a Scene, id: &str) -> ActionResult<&'a Mesh> {
    scene
        .get_mesh_by_id(id)
        .ok_or_else(|| ActionError::UnknownMesh(id.to_string()))
}

fn mesh_mut<'a>(scene: &'a mut Scene, id: &str) -> ActionResult<&'a mut Mesh> {
    scene
        .get_mesh_by_id_mut(id)
        .ok_or_else(|| ActionError::UnknownMesh(id.to_string()))
}

fn missing(id: &str, kind: BehaviorKind) -> ActionError {
    ActionError::MissingBehavior {
        id: id.to_string(),
        kind,
    }
}

fn stack_of<'a>(scene: &'a Scene, id: &str) -> ActionResult<&'a StackBehavior> {
    mesh(scene, id)?
        .behaviors()
        .stack()
        .ok_or_else(|| missing(id, BehaviorKind::Stackable))
}

fn stack_mut<'a>(scene: &'a mut Scene, id: &str) -> ActionResult<&'a mut StackBehavior> {
    mesh_mut(scene, id)?
        .behaviors_mut()
        .stack_mut()
        .ok_or_else(|| missing(id, BehaviorKind::Stackable))
}

/// Base of the pile `id` belongs to (`id` itself when it is a base).
pub fn pile_base(scene: &Scene, id: &str) -> ActionResult<String> {
    Ok(stack_of(scene, id)?
        .base_id
        .clone()
        .unwrap_or_else(|| id.to_string()))
}

/// Ids of the pile rooted at `base_id`, bottom first.
pub fn pile(scene: &Scene, base_id: &str) -> ActionResult<Vec<String>> {
    let stack = stack_of(scene, base_id)?;
    let mut ids = Vec::with_capacity(stack.pile_len());
    ids.push(base_id.to_string());
    ids.extend(stack.stack_ids.iter().cloned());
    Ok(ids)
}

/// Makes `id` the base of its own pile, taking the meshes above it along.
fn detach(scene: &mut Scene, id: &str) -> ActionResult<()> {
    let Some(base_id) = scene
        .get_mesh_by_id(id)
        .and_then(|mesh| mesh.behaviors().stack())
        .and_then(|stack| stack.base_id.clone())
    else {
        return Ok(());
    };
    let base = stack_mut(scene, &base_id)?;
    let Some(position) = base.stack_ids.iter().position(|member| member == id) else {
        return Ok(());
    };
    let mut carried = base.stack_ids.split_off(position);
    carried.remove(0);
    for member in &carried {
        stack_mut(scene, member)?.base_id = Some(id.to_string());
    }
    let stack = stack_mut(scene, id)?;
    stack.base_id = None;
    stack.stack_ids = carried;
    Ok(())
}

/// Meshes that travel with `id`: its pile when it is a base, and whatever is
/// snapped onto its anchors.
fn passengers(scene: &Scene, id: &str) -> Vec<String> {
    let mut seen = HashSet::from([id.to_string()]);
    let mut pending = vec![id.to_string()];
    let mut found = Vec::new();
    while let Some(current) = pending.pop() {
        let Some(mesh) = scene.get_mesh_by_id(&current) else {
            continue;
        };
        let mut riders: Vec<String> = Vec::new();
        if let Some(stack) = mesh.behaviors().stack().filter(|stack| stack.is_base()) {
            riders.extend(stack.stack_ids.iter().cloned());
        }
        if let Some(anchors) = mesh.behaviors().anchors() {
            riders.extend(anchors.snapped_ids().map(str::to_string));
        }
        for rider in riders {
            if seen.insert(rider.clone()) {
                found.push(rider.clone());
                pending.push(rider);
            }
        }
    }
    found
}

/// Moves `id` to `target` and shifts its passengers by the same offset.
///
/// Offsets are taken between resting positions, so meshes still on their
/// way somewhere keep their place relative to `id`.
fn carry(scene: &mut Scene, id: &str, target: Vec3, duration: Duration) -> ActionResult<()> {
    let delta = target - mesh(scene, id)?.resting_position();
    let riders = passengers(scene, id);
    scene.animate_move(id, target, duration, || {});
    for rider in riders {
        let Some(position) = scene.get_mesh_by_id(&rider).map(Mesh::resting_position) else {
            continue;
        };
        scene.animate_move(&rider, position + delta, duration, || {});
    }
    Ok(())
}

/// Lays a pile out vertically, starting at `origin`.
fn restack(scene: &mut Scene, ids: &[String], origin: Vec3, config: &EngineConfig) -> ActionResult<()> {
    let mut position = origin;
    let mut previous_height: Option<f32> = None;
    for id in ids {
        let height = mesh(scene, id)?.height();
        if let Some(previous) = previous_height {
            position.y += (previous + height) / 2.0 + config.stack_gap;
        }
        carry(scene, id, position, config.move_duration())?;
        previous_height = Some(height);
    }
    Ok(())
}

/// Position on top of the pile rooted at `base_id` for a mesh of `height`.
fn top_of_pile(scene: &Scene, base_id: &str, height: f32, gap: f32) -> ActionResult<Vec3> {
    let base = mesh(scene, base_id)?;
    let top_id = base
        .behaviors()
        .stack()
        .and_then(|stack| stack.stack_ids.last().cloned())
        .unwrap_or_else(|| base_id.to_string());
    let top = mesh(scene, &top_id)?;
    let base_position = base.resting_position();
    Ok(Vec3::new(
        base_position.x,
        top.resting_position().y + (top.height() + height) / 2.0 + gap,
        base_position.z,
    ))
}

/// Owner and anchor currently holding `id`.
fn find_anchor_of(scene: &Scene, id: &str) -> Option<(String, String)> {
    scene.meshes().find_map(|owner| {
        let anchor = owner.behaviors().anchors()?.anchor_of(id)?;
        Some((owner.id().to_string(), anchor.id.clone()))
    })
}

pub fn move_mesh(
    scene: &mut Scene,
    id: &str,
    position: Vec3,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    mesh(scene, id)?;
    detach(scene, id)?;
    release(scene, id);
    carry(scene, id, position, config.move_duration())?;
    Ok(MeshAction::Move {
        id: id.to_string(),
        position,
    })
}

pub fn flip(scene: &mut Scene, id: &str, config: &EngineConfig) -> ActionResult<MeshAction> {
    let loading = scene.is_loading();
    let mesh = mesh_mut(scene, id)?;
    let rotation = mesh.resting_rotation();
    let target = mesh
        .behaviors_mut()
        .flip_mut()
        .ok_or_else(|| missing(id, BehaviorKind::Flippable))?
        .flip(rotation);
    behaviors::animate_rotation(
        mesh,
        BehaviorKind::Flippable,
        loading,
        target,
        config.flip_duration(),
        || {},
    );
    Ok(MeshAction::Flip { id: id.to_string() })
}

pub fn rotate(scene: &mut Scene, id: &str, config: &EngineConfig) -> ActionResult<MeshAction> {
    let loading = scene.is_loading();
    let mesh = mesh_mut(scene, id)?;
    let rotation = mesh.resting_rotation();
    let target = mesh
        .behaviors_mut()
        .rotate_mut()
        .ok_or_else(|| missing(id, BehaviorKind::Rotatable))?
        .rotate(rotation);
    behaviors::animate_rotation(
        mesh,
        BehaviorKind::Rotatable,
        loading,
        target,
        config.rotate_duration(),
        || {},
    );
    Ok(MeshAction::Rotate { id: id.to_string() })
}

/// Puts `id` (with its own pile, if it has one) on top of `base_id`'s pile.
pub fn push(
    scene: &mut Scene,
    base_id: &str,
    id: &str,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    let base_id = pile_base(scene, base_id)?;
    stack_of(scene, id)?;
    if pile(scene, &base_id)?.iter().any(|member| member == id) {
        return Err(ActionError::SamePile {
            base_id,
            id: id.to_string(),
        });
    }

    detach(scene, id)?;
    release(scene, id);
    let moving = pile(scene, id)?;
    let start = top_of_pile(scene, &base_id, mesh(scene, id)?.height(), config.stack_gap)?;
    for member in &moving {
        let stack = stack_mut(scene, member)?;
        stack.base_id = Some(base_id.clone());
        stack.stack_ids.clear();
    }
    stack_mut(scene, &base_id)?
        .stack_ids
        .extend(moving.iter().cloned());
    restack(scene, &moving, start, config)?;
    debug!("pushed {} mesh(es) onto {base_id}", moving.len());

    Ok(MeshAction::Push {
        base_id,
        id: id.to_string(),
    })
}

/// Takes up to `count` meshes off the top of a pile, topmost first.
pub fn pop(scene: &mut Scene, base_id: &str, count: usize) -> ActionResult<Vec<String>> {
    let base_id = pile_base(scene, base_id)?;
    let base = stack_mut(scene, &base_id)?;
    let keep = base.stack_ids.len().saturating_sub(count);
    let mut popped = base.stack_ids.split_off(keep);
    popped.reverse();
    for id in &popped {
        stack_mut(scene, id)?.base_id = None;
    }
    Ok(popped)
}

/// Shuffles a whole pile, base included.
pub fn shuffle<R: Rng + ?Sized>(
    scene: &mut Scene,
    base_id: &str,
    rng: &mut R,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    let base_id = pile_base(scene, base_id)?;
    let mut order = pile(scene, &base_id)?;
    order.shuffle(rng);
    apply_order(scene, &base_id, order, config)
}

/// Reorders the pile rooted at `base_id`; the first id becomes the new base.
pub fn apply_order(
    scene: &mut Scene,
    base_id: &str,
    order: Vec<String>,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    let base_id = pile_base(scene, base_id)?;
    let current = pile(scene, &base_id)?;
    let expected: HashSet<&String> = current.iter().collect();
    let given: HashSet<&String> = order.iter().collect();
    if order.len() != current.len() || expected != given {
        return Err(ActionError::InvalidOrder { base_id });
    }

    let origin = mesh(scene, &base_id)?.resting_position();
    let new_base = order[0].clone();
    for (rank, id) in order.iter().enumerate() {
        let stack = stack_mut(scene, id)?;
        if rank == 0 {
            stack.base_id = None;
            stack.stack_ids = order[1..].to_vec();
        } else {
            stack.base_id = Some(new_base.clone());
            stack.stack_ids.clear();
        }
    }
    // Each mesh is moved on its own: the pile was rebuilt just above.
    let mut position = origin;
    let mut previous_height: Option<f32> = None;
    for id in &order {
        let height = mesh(scene, id)?.height();
        if let Some(previous) = previous_height {
            position.y += (previous + height) / 2.0 + config.stack_gap;
        }
        scene.animate_move(id, position, config.move_duration(), || {});
        previous_height = Some(height);
    }

    Ok(MeshAction::Shuffle { base_id, order })
}

/// Attaches `id` to an anchor of `owner_id`.
pub fn snap(
    scene: &mut Scene,
    owner_id: &str,
    anchor_id: &str,
    id: &str,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    if owner_id == id {
        return Err(ActionError::SelfSnap { id: id.to_string() });
    }
    let height = mesh(scene, id)?.height();
    let owner = mesh(scene, owner_id)?;
    let anchor = owner
        .behaviors()
        .anchors()
        .ok_or_else(|| missing(owner_id, BehaviorKind::Anchorable))?
        .anchor(anchor_id)
        .ok_or_else(|| ActionError::UnknownAnchor {
            owner_id: owner_id.to_string(),
            anchor_id: anchor_id.to_string(),
        })?;
    if let Some(snapped_id) = anchor.snapped_id.as_deref().filter(|snapped| *snapped != id) {
        return Err(ActionError::AnchorOccupied {
            owner_id: owner_id.to_string(),
            anchor_id: anchor_id.to_string(),
            snapped_id: snapped_id.to_string(),
        });
    }
    let target = owner.resting_position()
        + anchor.offset
        + Vec3::Y * ((owner.height() + height) / 2.0);

    detach(scene, id)?;
    release(scene, id);
    if let Some(anchor) = mesh_mut(scene, owner_id)?
        .behaviors_mut()
        .anchors_mut()
        .and_then(|anchors| anchors.anchor_mut(anchor_id))
    {
        anchor.snapped_id = Some(id.to_string());
    }
    carry(scene, id, target, config.move_duration())?;

    Ok(MeshAction::Snap {
        owner_id: owner_id.to_string(),
        anchor_id: anchor_id.to_string(),
        id: id.to_string(),
    })
}

/// Frees `id` from the anchor holding it, if any.
pub fn unsnap(scene: &mut Scene, id: &str) -> ActionResult<MeshAction> {
    mesh(scene, id)?;
    release(scene, id);
    Ok(MeshAction::Unsnap { id: id.to_string() })
}

fn release(scene: &mut Scene, id: &str) -> Option<(String, String)> {
    let (owner_id, anchor_id) = find_anchor_of(scene, id)?;
    let anchor = scene
        .get_mesh_by_id_mut(&owner_id)?
        .behaviors_mut()
        .anchors_mut()?
        .anchor_mut(&anchor_id)?;
    anchor.snapped_id = None;
    Some((owner_id, anchor_id))
}

pub fn randomize<R: Rng + ?Sized>(scene: &mut Scene, id: &str, rng: &mut R) -> ActionResult<MeshAction> {
    let face = mesh_mut(scene, id)?
        .behaviors_mut()
        .randomize_mut()
        .ok_or_else(|| missing(id, BehaviorKind::Randomizable))?
        .randomize(rng);
    Ok(MeshAction::Randomize {
        id: id.to_string(),
        face,
    })
}

fn set_face(scene: &mut Scene, id: &str, face: u8) -> ActionResult<()> {
    let randomize = mesh_mut(scene, id)?
        .behaviors_mut()
        .randomize_mut()
        .ok_or_else(|| missing(id, BehaviorKind::Randomizable))?;
    if randomize.set_face(face) {
        Ok(())
    } else {
        Err(ActionError::InvalidFace {
            id: id.to_string(),
            face,
        })
    }
}

/// Image to show when a player inspects `id`.
pub fn detail(scene: &Scene, id: &str) -> Option<Detail> {
    let mesh = scene.get_mesh_by_id(id)?;
    let detail = mesh.behaviors().detail()?;
    let flipped = mesh
        .behaviors()
        .flip()
        .map(|flip| flip.is_flipped)
        .unwrap_or(false);
    Some(Detail {
        mesh_id: id.to_string(),
        image: detail.visible_face(flipped).to_string(),
    })
}

enum DropTarget {
    Anchor { owner_id: String, anchor_id: String },
    Pile { base_id: String },
    Zone { position: Vec3 },
    Table,
}

/// Releases a dragged mesh at `point`, snapping or stacking it when it lands
/// on something that accepts it.
///
/// Landing on the pile the mesh already belongs to is a plain move.
pub fn drop_mesh(
    scene: &mut Scene,
    id: &str,
    point: Vec3,
    config: &EngineConfig,
) -> ActionResult<MeshAction> {
    let dropped = mesh(scene, id)?;
    let kind = dropped.kind;
    let height = dropped.height();
    let stackable = dropped.has_behavior(BehaviorKind::Stackable);
    let mut excluded: HashSet<String> = passengers(scene, id).into_iter().collect();
    excluded.insert(id.to_string());
    if stackable {
        excluded.extend(pile(scene, &pile_base(scene, id)?)?);
    }

    let candidates = scene
        .meshes()
        .filter(|mesh| !mesh.id().is_empty() && !excluded.contains(mesh.id()));
    let mut target = DropTarget::Table;
    for candidate in candidates {
        if let Some(anchor) = candidate
            .behaviors()
            .anchors()
            .and_then(|anchors| anchors.free_anchor_at(candidate.resting_position(), point))
        {
            target = DropTarget::Anchor {
                owner_id: candidate.id().to_string(),
                anchor_id: anchor.id.clone(),
            };
            break;
        }
        match behaviors::get_targetable_behavior(candidate) {
            Some(behaviors::Behavior::Stack(_))
                if stackable
                    && matches!(target, DropTarget::Table)
                    && footprint_contains(
                        candidate.resting_position(),
                        candidate.dimensions.x,
                        candidate.dimensions.z,
                        point,
                    ) =>
            {
                target = DropTarget::Pile {
                    base_id: candidate.id().to_string(),
                };
            }
            Some(behaviors::Behavior::Target(zones)) if matches!(target, DropTarget::Table) => {
                let origin = candidate.resting_position();
                if let Some(zone) = zones.zone_at(origin, point, kind) {
                    let mut position = origin + zone.offset;
                    position.y += (candidate.height() + height) / 2.0;
                    target = DropTarget::Zone { position };
                }
            }
            _ => {}
        }
    }

    match target {
        DropTarget::Anchor {
            owner_id,
            anchor_id,
        } => snap(scene, &owner_id, &anchor_id, id, config),
        DropTarget::Pile { base_id } => push(scene, &base_id, id, config),
        DropTarget::Zone { position } => move_mesh(scene, id, position, config),
        DropTarget::Table => move_mesh(scene, id, point, config),
    }
}

/// Replays an action produced by [`move_mesh`], [`push`] and friends.
pub fn apply_action(scene: &mut Scene, action: &MeshAction, config: &EngineConfig) -> ActionResult<()> {
    match action {
        MeshAction::Move { id, position } => move_mesh(scene, id, *position, config).map(drop),
        MeshAction::Flip { id } => flip(scene, id, config).map(drop),
        MeshAction::Rotate { id } => rotate(scene, id, config).map(drop),
        MeshAction::Push { base_id, id } => push(scene, base_id, id, config).map(drop),
        MeshAction::Pop { base_id, count } => pop(scene, base_id, *count).map(drop),
        MeshAction::Shuffle { base_id, order } => {
            apply_order(scene, base_id, order.clone(), config).map(drop)
        }
        MeshAction::Snap {
            owner_id,
            anchor_id,
            id,
        } => snap(scene, owner_id, anchor_id, id, config).map(drop),
        MeshAction::Unsnap { id } => unsnap(scene, id).map(drop),
        MeshAction::Randomize { id, face } => set_face(scene, id, *face),
    }
}
