use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::mesh::MeshKind;

/// Pile membership of a stackable mesh.
///
/// Only the base of a pile carries `stack_ids` (bottom to top, base
/// excluded). Every other member points back to the base through `base_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StackBehavior {
    pub stack_ids: Vec<String>,
    pub base_id: Option<String>,
}

impl StackBehavior {
    pub fn is_base(&self) -> bool {
        self.base_id.is_none()
    }

    /// Number of meshes in the pile rooted here, base included.
    pub fn pile_len(&self) -> usize {
        self.stack_ids.len() + 1
    }
}

/// Labeled attachment point on a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Anchor {
    pub id: String,
    /// Position relative to the owning mesh.
    pub offset: Vec3,
    pub width: f32,
    pub depth: f32,
    pub snapped_id: Option<String>,
}

impl Anchor {
    pub fn new(id: impl Into<String>, offset: Vec3, width: f32, depth: f32) -> Self {
        Self {
            id: id.into(),
            offset,
            width,
            depth,
            snapped_id: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.snapped_id.is_none()
    }

    pub fn contains(&self, owner: Vec3, point: Vec3) -> bool {
        footprint_contains(owner + self.offset, self.width, self.depth, point)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnchorBehavior {
    pub anchors: Vec<Anchor>,
}

impl AnchorBehavior {
    pub fn anchor(&self, id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|anchor| anchor.id == id)
    }

    pub fn anchor_mut(&mut self, id: &str) -> Option<&mut Anchor> {
        self.anchors.iter_mut().find(|anchor| anchor.id == id)
    }

    /// Anchor currently holding `mesh_id`.
    pub fn anchor_of(&self, mesh_id: &str) -> Option<&Anchor> {
        self.anchors
            .iter()
            .find(|anchor| anchor.snapped_id.as_deref() == Some(mesh_id))
    }

    /// First free anchor whose footprint covers `point`.
    pub fn free_anchor_at(&self, owner: Vec3, point: Vec3) -> Option<&Anchor> {
        self.anchors
            .iter()
            .find(|anchor| anchor.is_free() && anchor.contains(owner, point))
    }

    pub fn snapped_ids(&self) -> impl Iterator<Item = &str> {
        self.anchors
            .iter()
            .filter_map(|anchor| anchor.snapped_id.as_deref())
    }
}

/// Area of a mesh where other meshes may be dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropZone {
    pub id: String,
    pub offset: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Accepted mesh kinds; empty accepts everything.
    pub accepts: Vec<MeshKind>,
}

impl DropZone {
    pub fn accepts(&self, kind: MeshKind) -> bool {
        self.accepts.is_empty() || self.accepts.contains(&kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetBehavior {
    pub zones: Vec<DropZone>,
}

impl TargetBehavior {
    pub fn zone_at(&self, owner: Vec3, point: Vec3, kind: MeshKind) -> Option<&DropZone> {
        self.zones.iter().find(|zone| {
            zone.accepts(kind) && footprint_contains(owner + zone.offset, zone.width, zone.depth, point)
        })
    }
}

/// Whether `point` lies within a width x depth rectangle on the table plane.
pub fn footprint_contains(center: Vec3, width: f32, depth: f32, point: Vec3) -> bool {
    (point.x - center.x).abs() <= width / 2.0 && (point.z - center.z).abs() <= depth / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_anchor_lookup_skips_occupied() {
        let mut behavior = AnchorBehavior {
            anchors: vec![
                Anchor::new("left", Vec3::new(-2.0, 0.0, 0.0), 3.0, 4.0),
                Anchor::new("right", Vec3::new(2.0, 0.0, 0.0), 3.0, 4.0),
            ],
        };
        let owner = Vec3::new(10.0, 0.0, 0.0);
        let point = Vec3::new(8.5, 0.0, 1.0);
        assert_eq!(behavior.free_anchor_at(owner, point).unwrap().id, "left");

        behavior.anchor_mut("left").unwrap().snapped_id = Some("card".into());
        assert!(behavior.free_anchor_at(owner, point).is_none());
        assert_eq!(behavior.anchor_of("card").unwrap().id, "left");
    }

    #[test]
    fn zones_filter_by_kind() {
        let target = TargetBehavior {
            zones: vec![DropZone {
                id: "discard".into(),
                width: 2.0,
                depth: 2.0,
                accepts: vec![MeshKind::Card],
                ..DropZone::default()
            }],
        };
        assert!(target.zone_at(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.5), MeshKind::Card).is_some());
        assert!(target.zone_at(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.5), MeshKind::Die).is_none());
        assert!(target.zone_at(Vec3::ZERO, Vec3::new(1.5, 0.0, 0.0), MeshKind::Card).is_none());
    }
}
